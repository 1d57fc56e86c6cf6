//! Declarative grammar descriptions.
//!
//! A description is a JSON object mapping state names to rule lists:
//!
//! ```json
//! {
//!   "start": [
//!     { "regex": "/\\*", "token": "comment", "next": "comment" },
//!     { "defaultToken": "text" }
//!   ],
//!   "comment": [
//!     { "regex": "\\*/", "token": "comment", "next": "start" },
//!     { "defaultToken": "comment" }
//!   ]
//! }
//! ```
//!
//! `next` names a state, or is `"pop"` to return to the stacked state;
//! `push` enters a state while stacking the current one. Classifier
//! functions have no textual form and are only available through [`Rule`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::rule::{Grammar, Next, Rule, TokenSpec};
use crate::token::TokenKind;

/// Errors from loading a grammar description.
#[derive(Debug, Error)]
pub enum GrammarError {
	#[error("invalid grammar description: {0}")]
	Json(#[from] serde_json::Error),

	#[error("I/O error reading {path}: {error}")]
	Io { path: PathBuf, error: std::io::Error },

	#[error("state {state:?} rule {rule}: both `next` and `push` are set")]
	ConflictingTransition { state: String, rule: usize },

	#[error("state {state:?} rule {rule}: empty token label list")]
	EmptyLabels { state: String, rule: usize },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokenField {
	One(String),
	Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RuleDescription {
	#[serde(alias = "regex")]
	pattern: Option<String>,
	token: Option<TokenField>,
	next: Option<String>,
	push: Option<String>,
	#[serde(default)]
	case_insensitive: bool,
	#[serde(default)]
	unicode: bool,
	#[serde(default = "merge_default")]
	merge: bool,
	#[serde(default)]
	consume_line_end: bool,
	default_token: Option<String>,
}

fn merge_default() -> bool {
	true
}

const POP: &str = "pop";

impl RuleDescription {
	fn into_rule(self, state: &str, index: usize) -> Result<Rule, GrammarError> {
		let token = match self.token {
			None => TokenSpec::default(),
			Some(TokenField::One(label)) => TokenSpec::Label(TokenKind::from(label)),
			Some(TokenField::Many(labels)) if labels.is_empty() => {
				return Err(GrammarError::EmptyLabels {
					state: state.to_owned(),
					rule: index,
				});
			}
			Some(TokenField::Many(labels)) => TokenSpec::Labels(labels.into_iter().map(TokenKind::from).collect()),
		};
		let next = match (self.next, self.push) {
			(Some(_), Some(_)) => {
				return Err(GrammarError::ConflictingTransition {
					state: state.to_owned(),
					rule: index,
				});
			}
			(Some(next), None) if next == POP => Some(Next::pop()),
			(Some(next), None) => Some(Next::State(next.into())),
			(None, Some(push)) => Some(Next::push(&push)),
			(None, None) => None,
		};
		Ok(Rule {
			pattern: self.pattern,
			token,
			next,
			case_insensitive: self.case_insensitive,
			unicode: self.unicode,
			merge: self.merge,
			consume_line_end: self.consume_line_end,
			default_token: self.default_token.map(TokenKind::from),
		})
	}
}

impl Grammar {
	/// Parses a JSON grammar description.
	pub fn from_json(source: &str) -> Result<Self, GrammarError> {
		let states: BTreeMap<String, Vec<RuleDescription>> = serde_json::from_str(source)?;
		let mut grammar = Grammar::new();
		for (name, rules) in states {
			let rules = rules
				.into_iter()
				.enumerate()
				.map(|(i, rule)| rule.into_rule(&name, i))
				.collect::<Result<Vec<_>, _>>()?;
			grammar.insert(&name, rules);
		}
		Ok(grammar)
	}

	/// Reads and parses a JSON grammar description from disk.
	pub fn from_path(path: &Path) -> Result<Self, GrammarError> {
		let source = std::fs::read_to_string(path).map_err(|error| GrammarError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_json(&source)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{LexerState, Token, Tokenizer};

	#[test]
	fn test_from_json_block_comment() {
		let grammar = Grammar::from_json(
			r#"{
				"start": [
					{ "regex": "/\\*", "token": "comment", "next": "comment" },
					{ "defaultToken": "text" }
				],
				"comment": [
					{ "regex": "\\*/", "token": "comment", "next": "start" },
					{ "defaultToken": "comment" }
				]
			}"#,
		)
		.unwrap();
		assert_eq!(grammar.len(), 2);
		let tokenizer = Tokenizer::new(&grammar);
		let out = tokenizer.tokenize_line("a /* b", &LexerState::default());
		assert_eq!(out.tokens, vec![Token::new("text", "a "), Token::new("comment", "/* b")]);
		assert_eq!(out.state, LexerState::flat("comment"));
	}

	#[test]
	fn test_from_json_push_pop() {
		let grammar = Grammar::from_json(
			r#"{
				"start": [{ "regex": "\\{", "token": "paren", "push": "block" }],
				"block": [
					{ "regex": "\\{", "token": "paren", "push": "block" },
					{ "regex": "\\}", "token": "paren", "next": "pop" }
				]
			}"#,
		)
		.unwrap();
		let tokenizer = Tokenizer::new(&grammar);
		let out = tokenizer.tokenize_line("{{", &LexerState::default());
		assert_eq!(out.state, LexerState::nested("block", &["block", "block"]));
		let out = tokenizer.tokenize_line("}}", &out.state);
		assert_eq!(out.state, LexerState::default());
	}

	#[test]
	fn test_from_json_flags_and_lists() {
		let grammar = Grammar::from_json(
			r#"{ "start": [{ "pattern": "(a)(b)", "token": ["x", "y"], "caseInsensitive": true, "merge": false, "consumeLineEnd": true }] }"#,
		)
		.unwrap();
		let rule = &grammar.get("start").unwrap()[0];
		assert!(rule.case_insensitive);
		assert!(!rule.merge);
		assert!(rule.consume_line_end);
		assert!(matches!(&rule.token, TokenSpec::Labels(l) if l.len() == 2));
	}

	#[test]
	fn test_from_json_rejects_conflicting_transition() {
		let err = Grammar::from_json(r#"{ "start": [{ "regex": "a", "next": "x", "push": "y" }] }"#).unwrap_err();
		assert!(matches!(err, GrammarError::ConflictingTransition { rule: 0, .. }));
	}

	#[test]
	fn test_from_json_rejects_unknown_fields() {
		assert!(matches!(
			Grammar::from_json(r#"{ "start": [{ "regexp": "a" }] }"#),
			Err(GrammarError::Json(_))
		));
	}
}
