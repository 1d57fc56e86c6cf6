use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use super::*;
use crate::{Diagnostic, DiagnosticSink, Grammar, Rule, TokenizerConfig, compile};

fn tokenizer_with(grammar: &Grammar, config: TokenizerConfig) -> (Tokenizer, Arc<Mutex<Vec<Diagnostic>>>) {
	let seen = Arc::new(Mutex::new(Vec::new()));
	let sink: Arc<dyn DiagnosticSink> = {
		let seen = Arc::clone(&seen);
		Arc::new(move |d: Diagnostic| seen.lock().push(d))
	};
	(compile(grammar, sink, config), seen)
}

fn block_comments() -> Grammar {
	Grammar::new()
		.state("start", [Rule::new(r"/\*").token("comment").next("blockComment"), Rule::fallback("text")])
		.state("blockComment", [Rule::new(r"\*/").token("comment").next("start"), Rule::fallback("comment")])
}

#[test]
fn test_line_comment_after_text() {
	let grammar = Grammar::new().state("start", [Rule::new("//.*").token("comment"), Rule::fallback("text")]);
	let tokenizer = Tokenizer::new(&grammar);
	let out = tokenizer.tokenize_line("a // b", &LexerState::default());
	assert_eq!(out.tokens, vec![Token::new("text", "a "), Token::new("comment", "// b")]);
	assert_eq!(out.state, LexerState::default());
}

#[test]
fn test_block_comment_spans_lines() {
	let tokenizer = Tokenizer::new(&block_comments());
	let first = tokenizer.tokenize_line("foo /*", &LexerState::default());
	assert_eq!(first.tokens, vec![Token::new("text", "foo "), Token::new("comment", "/*")]);
	assert_eq!(first.state, LexerState::flat("blockComment"));

	let second = tokenizer.tokenize_line("bar*/ baz", &first.state);
	assert_eq!(second.tokens, vec![Token::new("comment", "bar*/"), Token::new("text", " baz")]);
	assert_eq!(second.state, LexerState::default());
}

#[test]
fn test_empty_line_keeps_state() {
	let tokenizer = Tokenizer::new(&block_comments());
	let nested = LexerState::nested("blockComment", &["start", "blockComment"]);
	let out = tokenizer.tokenize_line("", &nested);
	assert!(out.tokens.is_empty());
	assert_eq!(out.state, nested);
}

#[test]
fn test_adjacent_same_kind_merges() {
	let grammar = Grammar::new().state("start", [Rule::new("a").token("x"), Rule::new("b").token("x")]);
	let out = Tokenizer::new(&grammar).tokenize_line("abab", &LexerState::default());
	assert_eq!(out.tokens, vec![Token::new("x", "abab")]);
}

#[test]
fn test_no_merge_keeps_tokens_apart() {
	let grammar = Grammar::new().state("start", [Rule::new(r"\(").token("paren").no_merge()]);
	let out = Tokenizer::new(&grammar).tokenize_line("((", &LexerState::default());
	assert_eq!(out.tokens, vec![Token::new("paren", "("), Token::new("paren", "(")]);
}

#[test]
fn test_transition_at_line_end_stops() {
	let grammar = Grammar::new()
		.state("start", [Rule::new("x+").token("x").next("after")])
		.state("after", [Rule::new("$").token("eol").next("done")]);
	let (tokenizer, seen) = tokenizer_with(&grammar, TokenizerConfig::default());
	let out = tokenizer.tokenize_line("xx", &LexerState::default());
	assert_eq!(out.tokens, vec![Token::new("x", "xx")]);
	assert_eq!(out.state, LexerState::flat("after"));
	assert!(seen.lock().is_empty());
}

#[test]
fn test_consume_line_end_without_transition() {
	let grammar = |first: Rule| {
		Grammar::new()
			.state("start", [first, Rule::new("$").token("eol").next("tail")])
			.state("tail", [Rule::fallback("text")])
	};
	let (consuming, seen) = tokenizer_with(&grammar(Rule::new("a").token("a").consume_line_end()), TokenizerConfig::default());
	assert_eq!(consuming.tokenize_line("a", &LexerState::default()).state, LexerState::default());
	assert_eq!(consuming.tokenize_line("", &LexerState::default()).state, LexerState::flat("tail"));
	assert!(seen.lock().is_empty());

	let plain = Tokenizer::new(&grammar(Rule::new("a").token("a")));
	let out = plain.tokenize_line("a", &LexerState::default());
	assert_eq!(out.tokens, vec![Token::new("a", "a")]);
	assert_eq!(out.state, LexerState::flat("tail"));
}

#[test]
fn test_unknown_start_state_falls_back() {
	let (tokenizer, seen) = tokenizer_with(&block_comments(), TokenizerConfig::default());
	let out = tokenizer.tokenize_line("a /*", &LexerState::flat("missing"));
	assert_eq!(out.tokens, vec![Token::new("text", "a "), Token::new("comment", "/*")]);
	assert_eq!(out.state, LexerState::flat("blockComment"));
	assert_eq!(
		*seen.lock(),
		vec![Diagnostic::UnknownStateTransition {
			state: "missing".into()
		}]
	);
}

#[test]
fn test_unknown_transition_target_falls_back() {
	let grammar = Grammar::new().state("start", [Rule::new("@").token("at").next("nowhere"), Rule::new("b").token("b")]);
	let (tokenizer, seen) = tokenizer_with(&grammar, TokenizerConfig::default());
	let out = tokenizer.tokenize_line("@b", &LexerState::default());
	assert_eq!(out.tokens, vec![Token::new("at", "@"), Token::new("b", "b")]);
	assert_eq!(out.state, LexerState::default());
	assert_eq!(seen.lock().len(), 1);
}

#[test]
fn test_push_and_pop_nest() {
	let grammar = Grammar::new()
		.state("start", [Rule::new(r"<%").token("tag").push("template")])
		.state("template", [Rule::new(r"%>").token("tag").pop(), Rule::new(r"/\*").token("comment").push("comment")])
		.state("comment", [Rule::new(r"\*/").token("comment").pop(), Rule::fallback("comment")]);
	let tokenizer = Tokenizer::new(&grammar);

	let first = tokenizer.tokenize_line("<% /* x", &LexerState::default());
	assert_eq!(first.state, LexerState::nested("comment", &["template", "comment"]));

	let second = tokenizer.tokenize_line("y */ %> z", &first.state);
	assert_eq!(
		second.tokens,
		vec![
			Token::new("comment", "y */"),
			Token::new("text", " "),
			Token::new("tag", "%>"),
			Token::new("text", " z"),
		]
	);
	assert_eq!(second.state, LexerState::default());
}

#[test]
fn test_next_with_sees_state_and_stack() {
	let grammar = Grammar::new()
		.state("start", [Rule::new("!").token("bang").next_with(|current, stack| {
			stack.push(current.into());
			stack.push("loud".into());
			"loud".into()
		})])
		.state("loud", [Rule::fallback("shout")]);
	let out = Tokenizer::new(&grammar).tokenize_line("a!b", &LexerState::default());
	assert_eq!(
		out.tokens,
		vec![Token::new("text", "a"), Token::new("bang", "!"), Token::new("shout", "b")]
	);
	assert_eq!(out.state, LexerState::nested("loud", &["start", "loud"]));
}

#[test]
fn test_labels_fill_text_outside_groups() {
	let grammar = Grammar::new().state("start", [Rule::new("(a)-(b)").tokens(["x", "y"])]);
	let out = Tokenizer::new(&grammar).tokenize_line("a-b", &LexerState::default());
	assert_eq!(
		out.tokens,
		vec![Token::new("x", "a"), Token::new("text", "-"), Token::new("y", "b")]
	);
}

#[test]
fn test_labels_skip_empty_groups() {
	let grammar = Grammar::new().state("start", [Rule::new(r"(\w+)(\s*)(=)").tokens(["name", "space", "op"])]);
	let out = Tokenizer::new(&grammar).tokenize_line("k=", &LexerState::default());
	assert_eq!(out.tokens, vec![Token::new("name", "k"), Token::new("op", "=")]);
}

#[test]
fn test_classifier_by_value() {
	let grammar = Grammar::new().state(
		"start",
		[Rule::new(r"\w+").classify(|m| {
			if matches!(m.value, "fn" | "let") {
				Classification::Label("keyword".into())
			} else {
				Classification::Label("identifier".into())
			}
		})],
	);
	let out = Tokenizer::new(&grammar).tokenize_line("let x", &LexerState::default());
	assert_eq!(
		out.tokens,
		vec![Token::new("keyword", "let"), Token::new("text", " "), Token::new("identifier", "x")]
	);
}

#[test]
fn test_classifier_sees_lexer_context() {
	let grammar = Grammar::new()
		.state("start", [Rule::new(">").token("arrow").next("inner")])
		.state("inner", [Rule::new(r"\w").classify(|m| Classification::Label(format!("{}:{}", m.state, m.line.len()).into()))]);
	let out = Tokenizer::new(&grammar).tokenize_line(">a", &LexerState::default());
	assert_eq!(out.tokens, vec![Token::new("arrow", ">"), Token::new("inner:2", "a")]);
}

#[test]
fn test_classifier_with_groups() {
	let grammar = Grammar::new().state(
		"start",
		[Rule::new(r"(\w+)(:)").classify(|m| {
			assert_eq!(m.groups.len(), 2);
			if m.groups[0] == Some("key") {
				Classification::Groups(vec!["key".into(), "punct".into()])
			} else {
				Classification::Label("other".into())
			}
		})],
	);
	let tokenizer = Tokenizer::new(&grammar);
	let out = tokenizer.tokenize_line("key:", &LexerState::default());
	assert_eq!(out.tokens, vec![Token::new("key", "key"), Token::new("punct", ":")]);
	let out = tokenizer.tokenize_line("val:", &LexerState::default());
	assert_eq!(out.tokens, vec![Token::new("other", "val:")]);
}

#[test]
fn test_classifier_pre_expanded_tokens() {
	let grammar = Grammar::new().state(
		"start",
		[Rule::new(r"\d+\.\d+").classify(|m| {
			let (int, frac) = m.value.split_at(m.value.find('.').unwrap_or(0));
			Classification::Tokens(vec![Token::new("int", int), Token::new("frac", frac)])
		})],
	);
	let out = Tokenizer::new(&grammar).tokenize_line("1.5", &LexerState::default());
	assert_eq!(out.tokens, vec![Token::new("int", "1"), Token::new("frac", ".5")]);
}

#[test]
fn test_classifier_mismatched_tokens_fall_back() {
	let grammar = Grammar::new().state(
		"start",
		[Rule::new("abc").classify(|_| Classification::Tokens(vec![Token::new("x", "zzz")]))],
	);
	let (tokenizer, seen) = tokenizer_with(&grammar, TokenizerConfig::default());
	let out = tokenizer.tokenize_line("abc", &LexerState::default());
	assert_eq!(out.tokens, vec![Token::new("text", "abc")]);
	assert!(matches!(&seen.lock()[0], Diagnostic::MisconfiguredGrammar { .. }));
}

#[test]
fn test_overflow_on_empty_matches() {
	let grammar = Grammar::new().state("start", [Rule::new("x*").token("x")]);
	let config = TokenizerConfig {
		max_match_attempts: 10,
		overflow_chunk_len: 2,
	};
	let (tokenizer, seen) = tokenizer_with(&grammar, config);
	let out = tokenizer.tokenize_line("abcde", &LexerState::nested("a", &["b", "c"]));
	assert_eq!(
		out.tokens,
		vec![Token::new("overflow", "ab"), Token::new("overflow", "cd"), Token::new("overflow", "e")]
	);
	assert_eq!(out.state, LexerState::default());
	let seen = seen.lock();
	assert_eq!(seen.len(), 2, "unknown start state plus overflow: {seen:?}");
	assert!(matches!(seen[1], Diagnostic::PathologicalLineOverflow { line_len: 5, .. }));
}

#[test]
fn test_overflow_keeps_tokens_before_ceiling() {
	let grammar = Grammar::new().state("start", [Rule::new("a").token("a").no_merge()]);
	let config = TokenizerConfig {
		max_match_attempts: 2,
		overflow_chunk_len: 500,
	};
	let (tokenizer, _) = tokenizer_with(&grammar, config);
	let out = tokenizer.tokenize_line("aaaaaa", &LexerState::default());
	assert_eq!(out.text(), "aaaaaa");
	assert_eq!(out.tokens.last(), Some(&Token::new("overflow", "aa")));
	assert_eq!(out.tokens.iter().filter(|t| t.kind == "a").count(), 4);
}

#[test]
fn test_backtrack_limit_takes_overflow_path() {
	let grammar = Grammar::new().state("start", [Rule::new(r"(a|aa)+\1c").token("run")]);
	let (tokenizer, seen) = tokenizer_with(&grammar, TokenizerConfig::default());
	let line = format!("zz{}", "a".repeat(60));
	let out = tokenizer.tokenize_line(&line, &LexerState::default());
	assert_eq!(out.tokens, vec![Token::new("overflow", line.as_str())]);
	assert_eq!(out.state, LexerState::default());
	assert_eq!(
		*seen.lock(),
		vec![Diagnostic::PathologicalLineOverflow {
			attempts: 0,
			line_len: 62,
			start_state: "start".into(),
		}]
	);
}

#[test]
fn test_chunk_end_respects_char_boundaries() {
	let line = "aé€b";
	assert_eq!(chunk_end(line, 0, 2), 1);
	assert_eq!(chunk_end(line, 1, 1), 3);
	assert_eq!(chunk_end(line, 3, 3), 6);
	assert_eq!(chunk_end(line, 6, 10), 7);
}

#[test]
fn test_tokenizer_is_shareable() {
	fn assert_send_sync<T: Send + Sync>() {}
	assert_send_sync::<Tokenizer>();
}
