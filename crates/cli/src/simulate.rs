use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tidemark_syntax::{BackgroundTokenizer, Document, EngineConfig, LineBuffer, RowSpan};

use crate::tokenize::render;

#[derive(Args, Debug)]
pub(crate) struct SimulateArgs {
	/// Grammar description (JSON)
	#[arg(short, long, value_name = "PATH")]
	grammar: PathBuf,

	/// File to load
	file: PathBuf,

	/// Replace a row, `ROW:TEXT`; `\n` in TEXT splits it into several rows
	#[arg(short, long = "edit", value_name = "ROW:TEXT", value_parser = parse_edit)]
	edits: Vec<Edit>,

	/// Print every row's tokens after the last pass
	#[arg(long)]
	dump: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Edit {
	row: usize,
	text: String,
}

fn parse_edit(arg: &str) -> Result<Edit, String> {
	let (row, text) = arg.split_once(':').ok_or_else(|| format!("expected ROW:TEXT, got {arg:?}"))?;
	let row = row.trim().parse().map_err(|e| format!("invalid row {row:?}: {e}"))?;
	Ok(Edit {
		row,
		text: text.replace("\\n", "\n"),
	})
}

pub(crate) fn run(args: &SimulateArgs, config: &EngineConfig, out: &mut impl Write) -> anyhow::Result<()> {
	let tokenizer = crate::load_tokenizer(&args.grammar, config)?;
	let doc = crate::load_document(&args.file)?;
	let mut bg = BackgroundTokenizer::new(tokenizer, doc, config.scheduler);

	bg.start(0);
	report(out, "load", &bg.run_until_idle())?;

	for edit in &args.edits {
		let deltas = apply(bg.document_mut(), edit)?;
		for delta in &deltas {
			bg.on_document_change(delta);
		}
		bg.schedule_start();
		report(out, &format!("edit {}", edit.row), &bg.run_until_idle())?;
	}

	let len = bg.document().len();
	writeln!(out, "rows: {len}, watermark: {}", bg.watermark())?;
	if args.dump {
		for row in 0..len {
			let tokens = render(bg.tokens(row));
			writeln!(out, "{row:>4} {:<12} {tokens}", bg.state(row).to_string())?;
		}
	}
	Ok(())
}

fn apply(doc: &mut LineBuffer, edit: &Edit) -> anyhow::Result<Vec<tidemark_syntax::Delta>> {
	doc.replace_line(edit.row, &edit.text)
		.with_context(|| format!("applying edit to row {}", edit.row))
}

fn report(out: &mut impl Write, label: &str, spans: &[RowSpan]) -> anyhow::Result<()> {
	if spans.is_empty() {
		writeln!(out, "{label}: no rows recomputed")?;
		return Ok(());
	}
	let rendered: Vec<String> = spans.iter().map(|s| format!("{}..={}", s.first, s.last)).collect();
	writeln!(out, "{label}: recomputed rows {}", rendered.join(", "))?;
	Ok(())
}
