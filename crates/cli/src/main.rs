//! `tidemark` command-line tool.
//!
//! Tokenizes files with a JSON grammar, or replays edits through the
//! incremental scheduler to show which rows each pass recomputes.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tidemark_lexer::{Grammar, Tokenizer, TracingSink, compile};
use tidemark_syntax::{EngineConfig, LineBuffer};

mod simulate;
mod tokenize;

#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(about = "Stateful line tokenizer with incremental re-tokenization")]
struct Args {
	/// Engine configuration (TOML)
	#[arg(short, long, global = true, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long, global = true)]
	verbose: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Print the tokens and end state of every line in a file
	Tokenize(tokenize::TokenizeArgs),
	/// Run the background scheduler over a file, then replay edits
	Simulate(simulate::SimulateArgs),
}

fn main() -> anyhow::Result<()> {
	let args = Args::parse();
	setup_tracing(args.verbose);

	let config = match &args.config {
		Some(path) => EngineConfig::from_path(path).with_context(|| format!("loading config {}", path.display()))?,
		None => EngineConfig::default(),
	};
	tracing::debug!(?config, "engine config");

	let stdout = std::io::stdout();
	let mut out = stdout.lock();
	match args.command {
		Command::Tokenize(cmd) => tokenize::run(&cmd, &config, &mut out)?,
		Command::Simulate(cmd) => simulate::run(&cmd, &config, &mut out)?,
	}
	out.flush()?;
	Ok(())
}

/// Logs to stderr. `TIDEMARK_LOG` takes precedence over `RUST_LOG`.
fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_env("TIDEMARK_LOG")
		.or_else(|_| EnvFilter::try_from_default_env())
		.unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("tidemark=trace,info")
			} else {
				EnvFilter::new("warn")
			}
		});

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(true)
		.init();
}

fn load_tokenizer(path: &Path, config: &EngineConfig) -> anyhow::Result<Arc<Tokenizer>> {
	let grammar = Grammar::from_path(path).with_context(|| format!("loading grammar {}", path.display()))?;
	Ok(Arc::new(compile(&grammar, Arc::new(TracingSink), config.tokenizer)))
}

fn load_document(path: &Path) -> anyhow::Result<LineBuffer> {
	let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
	Ok(LineBuffer::from_text(&text))
}
