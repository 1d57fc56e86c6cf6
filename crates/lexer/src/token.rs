//! Token values produced by the line tokenizer.

use std::fmt;
use std::sync::Arc;

/// Token classification label (e.g. `comment`, `keyword.operator`).
///
/// Labels are shared between the compiled grammar and every token it emits,
/// so cloning is a reference-count bump.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenKind(Arc<str>);

impl TokenKind {
	pub fn new(label: &str) -> Self {
		Self(Arc::from(label))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Default for TokenKind {
	fn default() -> Self {
		Self::new(TEXT)
	}
}

impl From<&str> for TokenKind {
	fn from(label: &str) -> Self {
		Self::new(label)
	}
}

impl From<String> for TokenKind {
	fn from(label: String) -> Self {
		Self(Arc::from(label))
	}
}

impl PartialEq<str> for TokenKind {
	fn eq(&self, other: &str) -> bool {
		&*self.0 == other
	}
}

impl PartialEq<&str> for TokenKind {
	fn eq(&self, other: &&str) -> bool {
		&*self.0 == *other
	}
}

impl fmt::Debug for TokenKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&*self.0, f)
	}
}

impl fmt::Display for TokenKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Label used for unmatched text when a state declares no default token.
pub const TEXT: &str = "text";

/// Label for the fixed-size chunks emitted once a line exhausts its match budget.
pub const OVERFLOW: &str = "overflow";

/// A lexical unit: a label plus the exact slice of the line it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
	pub kind: TokenKind,
	pub value: String,
}

impl Token {
	pub fn new(kind: impl Into<TokenKind>, value: impl Into<String>) -> Self {
		Self {
			kind: kind.into(),
			value: value.into(),
		}
	}

	/// Returns true if this token carries no text.
	pub fn is_empty(&self) -> bool {
		self.value.is_empty()
	}
}

/// Output of tokenizing one line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineTokens {
	pub tokens: Vec<Token>,
	/// Lexer state to feed into the next line.
	pub state: crate::LexerState,
}

impl LineTokens {
	/// Concatenates all token values; equals the tokenized line.
	pub fn text(&self) -> String {
		self.tokens.iter().map(|t| t.value.as_str()).collect()
	}
}
