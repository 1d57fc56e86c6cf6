#![allow(unused_crate_dependencies)]

use std::sync::Arc;

use parking_lot::Mutex;
use proptest::prelude::*;
use tidemark_lexer::{Classification, Diagnostic, DiagnosticSink, Grammar, LexerState, Rule, Tokenizer, TokenizerConfig, compile};

fn nested_grammar() -> Grammar {
	Grammar::new()
		.state(
			"start",
			[
				Rule::new(r"/\*").token("comment").push("comment"),
				Rule::new(r#""(?:[^"\\]|\\.)*""#).token("string"),
				Rule::new(r"\{").token("brace").push("block"),
				Rule::new(r"\w+").classify(|m| match m.value {
					"if" | "let" => Classification::Label("keyword".into()),
					_ => Classification::Label("identifier".into()),
				}),
				Rule::fallback("text"),
			],
		)
		.state(
			"block",
			[
				Rule::new(r"\}").token("brace").pop(),
				Rule::new(r"\{").token("brace").push("block"),
				Rule::new(r"/\*").token("comment").push("comment"),
				Rule::new(r"(\w+)(\s*)(=)").tokens(["name", "space", "op"]),
			],
		)
		.state("comment", [Rule::new(r"\*/").token("comment").pop(), Rule::fallback("comment")])
}

fn collecting(config: TokenizerConfig, grammar: &Grammar) -> (Tokenizer, Arc<Mutex<Vec<Diagnostic>>>) {
	let seen = Arc::new(Mutex::new(Vec::new()));
	let sink: Arc<dyn DiagnosticSink> = {
		let seen = Arc::clone(&seen);
		Arc::new(move |d: Diagnostic| seen.lock().push(d))
	};
	(compile(grammar, sink, config), seen)
}

fn arb_line() -> impl Strategy<Value = String> {
	"[a-z =/*{}\"\\\\é€ ]{0,48}"
}

proptest! {
	/// Concatenated token values always spell out the line, whatever state the line starts in.
	#[test]
	fn prop_tokens_reconstruct_lines(lines in prop::collection::vec(arb_line(), 1..12)) {
		let tokenizer = Tokenizer::new(&nested_grammar());
		let mut state = LexerState::default();
		for line in &lines {
			let out = tokenizer.tokenize_line(line, &state);
			prop_assert_eq!(&out.text(), line);
			state = out.state;
		}
	}

	/// The same line and start state always produce the same output.
	#[test]
	fn prop_tokenize_is_deterministic(line in arb_line(), depth in 0usize..4) {
		let tokenizer = Tokenizer::new(&nested_grammar());
		let mut stack = vec!["block"; depth];
		stack.push("comment");
		let state = LexerState::normalized("comment".into(), stack.into_iter().map(Into::into).collect());
		let first = tokenizer.tokenize_line(&line, &state);
		let second = tokenizer.tokenize_line(&line, &state);
		prop_assert_eq!(first, second);
	}

	/// Empty-matching rules hit the attempt ceiling instead of looping forever.
	#[test]
	fn prop_empty_matches_overflow(line in "[a-wyz€]{1,200}", ceiling in 1usize..64, chunk in 1usize..16) {
		let grammar = Grammar::new().state("start", [Rule::new("x*").token("x").next("start")]);
		let config = TokenizerConfig { max_match_attempts: ceiling, overflow_chunk_len: chunk };
		let (tokenizer, seen) = collecting(config, &grammar);
		let out = tokenizer.tokenize_line(&line, &LexerState::flat("start"));
		prop_assert_eq!(&out.text(), &line);
		prop_assert_eq!(out.state, LexerState::default());
		prop_assert!(out.tokens.iter().all(|t| t.kind == "overflow" && !t.value.is_empty()));
		let overflows = seen
			.lock()
			.iter()
			.filter(|d| matches!(d, Diagnostic::PathologicalLineOverflow { .. }))
			.count();
		prop_assert_eq!(overflows, 1);
	}
}
