use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tidemark_lexer::{LexerState, Token};
use tidemark_syntax::{Document, EngineConfig};

#[derive(Args, Debug)]
pub(crate) struct TokenizeArgs {
	/// Grammar description (JSON)
	#[arg(short, long, value_name = "PATH")]
	grammar: PathBuf,

	/// File to tokenize
	file: PathBuf,

	/// State the first line starts in
	#[arg(short, long, default_value = "start")]
	state: String,

	/// Print one JSON object per line
	#[arg(long)]
	json: bool,
}

#[derive(Serialize)]
struct TokenOut<'a> {
	#[serde(rename = "type")]
	kind: &'a str,
	value: &'a str,
}

#[derive(Serialize)]
struct LineOut<'a> {
	row: usize,
	tokens: Vec<TokenOut<'a>>,
	state: String,
}

pub(crate) fn run(args: &TokenizeArgs, config: &EngineConfig, out: &mut impl Write) -> anyhow::Result<()> {
	let tokenizer = crate::load_tokenizer(&args.grammar, config)?;
	let doc = crate::load_document(&args.file)?;

	let mut state = LexerState::flat(&args.state);
	for row in 0..doc.len() {
		let line = tokenizer.tokenize_line(&doc.line(row), &state);
		if args.json {
			let record = LineOut {
				row,
				tokens: line.tokens.iter().map(|t| TokenOut { kind: t.kind.as_str(), value: &t.value }).collect(),
				state: line.state.to_string(),
			};
			serde_json::to_writer(&mut *out, &record)?;
			writeln!(out)?;
		} else {
			writeln!(out, "{row:>4} {:<12} {}", line.state.to_string(), render(&line.tokens))?;
		}
		state = line.state;
	}
	Ok(())
}

/// Renders tokens as `kind("value")` separated by spaces.
pub(crate) fn render(tokens: &[Token]) -> String {
	tokens.iter().map(|t| format!("{}({:?})", t.kind, t.value)).collect::<Vec<_>>().join(" ")
}
