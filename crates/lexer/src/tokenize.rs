//! Line tokenizer.

use std::ops::Range;
use std::sync::Arc;

use fancy_regex::Regex;

use crate::compile::{CompiledRule, CompiledState, Tokenizer};
use crate::diagnostic::{Diagnostic, Misconfiguration};
use crate::rule::{Classification, MatchContext, TokenSpec};
use crate::state::{LexerState, START, StateName};
use crate::token::{LineTokens, OVERFLOW, TEXT, Token, TokenKind};

/// What a matched rule produces.
enum Emit {
	Label(TokenKind),
	Tokens(Vec<Token>),
}

/// Output buffer that merges adjacent same-kind tokens.
#[derive(Default)]
struct Emitter {
	tokens: Vec<Token>,
	pending: Option<Token>,
}

impl Emitter {
	fn push(&mut self, kind: &TokenKind, text: &str, merge: bool) {
		if text.is_empty() {
			return;
		}
		match &mut self.pending {
			Some(pending) if merge && pending.kind == *kind => pending.value.push_str(text),
			_ => {
				self.flush();
				self.pending = Some(Token::new(kind.clone(), text));
			}
		}
	}

	/// Appends pre-expanded tokens; they never merge with their neighbours.
	fn extend(&mut self, tokens: Vec<Token>) {
		self.flush();
		self.tokens.extend(tokens.into_iter().filter(|t| !t.is_empty()));
	}

	fn flush(&mut self) {
		if let Some(token) = self.pending.take() {
			self.tokens.push(token);
		}
	}

	fn finish(mut self) -> Vec<Token> {
		self.flush();
		self.tokens
	}
}

impl Tokenizer {
	/// Tokenizes one line starting in `start`.
	///
	/// The token values concatenate to `line`. The result depends only on the
	/// compiled grammar, `line`, and `start`.
	pub fn tokenize_line(&self, line: &str, start: &LexerState) -> LineTokens {
		let (mut current, mut stack) = start.decode();
		let mut state = self.resolve(&mut current);
		let mut out = Emitter::default();

		let max_attempts = self.config.max_match_attempts;
		let mut attempts = 0usize;
		// End of the previous match; text between it and the next match is unmatched.
		let mut last = 0usize;
		let mut cursor = 0usize;

		loop {
			let Some(matcher) = &state.matcher else {
				out.push(&state.default_token, &line[last..], true);
				break;
			};
			let caps = match matcher.captures_from_pos(line, cursor) {
				Ok(Some(caps)) => caps,
				Ok(None) => {
					out.push(&state.default_token, &line[last..], true);
					break;
				}
				Err(err) => {
					tracing::debug!(target: "tidemark::lexer", state = %state.name, error = %err, "matcher gave up");
					self.overflow(&mut out, line, last, start, attempts);
					current = Arc::from(START);
					stack.clear();
					break;
				}
			};
			let Some(whole) = caps.get(0) else {
				break;
			};
			let (match_start, match_end) = (whole.start(), whole.end());

			if match_start > last {
				out.push(&state.default_token, &line[last..match_start], true);
			}

			let value = &line[match_start..match_end];
			let mut emit = Emit::Label(state.default_token.clone());
			let mut merge = true;

			if let Some(rule) = state.rules.iter().find(|r| caps.get(r.group).is_some()) {
				emit = self.expand(state, rule, value, &current, &stack, line);
				merge = rule.merge;
				if let Some(next) = &rule.next {
					current = next.resolve(&current, &mut stack);
					state = self.resolve(&mut current);
					last = match_end;
				}
				if rule.consume_line_end {
					last = match_end;
				}
			}

			if !value.is_empty() {
				match emit {
					Emit::Label(kind) => out.push(&kind, value, merge),
					Emit::Tokens(tokens) => out.extend(tokens),
				}
			}

			if last == line.len() {
				break;
			}
			last = match_end;
			cursor = match_end;

			let exhausted = attempts > max_attempts;
			attempts += 1;
			if exhausted {
				self.overflow(&mut out, line, last, start, attempts);
				current = Arc::from(START);
				stack.clear();
				break;
			}
		}

		LineTokens {
			tokens: out.finish(),
			state: LexerState::normalized(current, stack),
		}
	}

	/// Looks up `name`, falling back to `start` (and rewriting `name`) when absent.
	fn resolve(&self, name: &mut StateName) -> &CompiledState {
		match self.index.get(&**name) {
			Some(&i) => &self.states[i],
			None => {
				self.report(Diagnostic::UnknownStateTransition { state: name.to_string() });
				*name = Arc::from(START);
				&self.states[self.start]
			}
		}
	}

	fn expand(&self, state: &CompiledState, rule: &CompiledRule, value: &str, current: &str, stack: &[StateName], line: &str) -> Emit {
		match &rule.token {
			TokenSpec::Label(kind) => Emit::Label(kind.clone()),
			TokenSpec::Labels(kinds) => match rule.splitter.as_ref().and_then(|s| split(s, value)) {
				Some(groups) => Emit::Tokens(fill_groups(kinds, &groups, value, &state.default_token)),
				None => Emit::Label(TokenKind::new(TEXT)),
			},
			TokenSpec::Classify(classify) => {
				let groups = rule.splitter.as_ref().and_then(|s| split(s, value)).unwrap_or_default();
				let texts: Vec<Option<&str>> = groups.iter().map(|g| g.clone().map(|r| &value[r])).collect();
				let ctx = MatchContext {
					value,
					groups: &texts,
					state: current,
					stack,
					line,
				};
				match classify(&ctx) {
					Classification::Label(kind) => Emit::Label(kind),
					Classification::Groups(kinds) if !groups.is_empty() => Emit::Tokens(fill_groups(&kinds, &groups, value, &state.default_token)),
					Classification::Groups(kinds) => Emit::Label(kinds.into_iter().next().unwrap_or_else(|| state.default_token.clone())),
					Classification::Tokens(tokens) => {
						if concat_eq(&tokens, value) {
							Emit::Tokens(tokens)
						} else {
							self.report(Diagnostic::MisconfiguredGrammar {
								state: state.name.to_string(),
								problem: Misconfiguration::ClassifierTextMismatch { rule: rule.index },
							});
							Emit::Label(state.default_token.clone())
						}
					}
				}
			}
		}
	}

	/// Emits `line[from..]` as fixed-size overflow chunks.
	fn overflow(&self, out: &mut Emitter, line: &str, from: usize, start: &LexerState, attempts: usize) {
		self.report(Diagnostic::PathologicalLineOverflow {
			attempts,
			line_len: line.len(),
			start_state: start.to_string(),
		});
		out.flush();
		let kind = TokenKind::new(OVERFLOW);
		let chunk = self.config.overflow_chunk_len.max(1);
		let mut pos = from;
		while pos < line.len() {
			let end = chunk_end(line, pos, chunk);
			out.tokens.push(Token::new(kind.clone(), &line[pos..end]));
			pos = end;
		}
	}
}

/// Runs a splitter over the matched text, returning the byte range of each group.
fn split(splitter: &Regex, value: &str) -> Option<Vec<Option<Range<usize>>>> {
	let caps = splitter.captures(value).ok()??;
	Some((1..caps.len()).map(|i| caps.get(i).map(|m| m.start()..m.end())).collect())
}

/// Labels each non-empty, non-overlapping group; text outside groups gets `fallback`.
fn fill_groups(kinds: &[TokenKind], groups: &[Option<Range<usize>>], value: &str, fallback: &TokenKind) -> Vec<Token> {
	let mut tokens = Vec::with_capacity(kinds.len());
	let mut pos = 0;
	for (kind, range) in kinds.iter().zip(groups) {
		let Some(range) = range else {
			continue;
		};
		if range.is_empty() || range.start < pos {
			continue;
		}
		if range.start > pos {
			tokens.push(Token::new(fallback.clone(), &value[pos..range.start]));
		}
		tokens.push(Token::new(kind.clone(), &value[range.clone()]));
		pos = range.end;
	}
	if pos < value.len() {
		tokens.push(Token::new(fallback.clone(), &value[pos..]));
	}
	tokens
}

fn concat_eq(tokens: &[Token], value: &str) -> bool {
	let mut rest = value;
	for token in tokens {
		match rest.strip_prefix(token.value.as_str()) {
			Some(tail) => rest = tail,
			None => return false,
		}
	}
	rest.is_empty()
}

/// End of the chunk starting at `pos`: at most `len` bytes, on a char boundary, never empty.
fn chunk_end(line: &str, pos: usize, len: usize) -> usize {
	let mut end = (pos + len).min(line.len());
	while end > pos && !line.is_char_boundary(end) {
		end -= 1;
	}
	if end == pos {
		end = pos + line[pos..].chars().next().map_or(1, char::len_utf8);
	}
	end
}

#[cfg(test)]
mod tests;
