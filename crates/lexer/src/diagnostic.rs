//! Side-channel reporting for recoverable grammar and input problems.
//!
//! Nothing here affects control flow: compilation and tokenization always
//! produce a result and hand problems to the host's [`DiagnosticSink`].

use std::fmt;

use thiserror::Error;

/// A recovered problem. Each variant names the fallback that was applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
	/// Rule or grammar shape is inconsistent; the rule was degraded.
	#[error("state {state:?}: {problem}")]
	MisconfiguredGrammar { state: String, problem: Misconfiguration },

	/// A pattern failed to compile; the rule (or state) was disabled.
	#[error("state {state:?} rule {rule:?}: invalid pattern {pattern:?}: {message}")]
	InvalidPattern {
		state: String,
		/// `None` when the combined state pattern failed.
		rule: Option<usize>,
		pattern: String,
		message: String,
	},

	/// A transition named a state absent from the grammar; lexing fell back to `start`.
	#[error("state {state:?} does not exist, falling back to start")]
	UnknownStateTransition { state: String },

	/// The match-attempt ceiling was hit; the rest of the line became overflow chunks.
	#[error("gave up on line of {line_len} bytes after {attempts} match attempts (started in {start_state})")]
	PathologicalLineOverflow {
		attempts: usize,
		line_len: usize,
		start_state: String,
	},
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Misconfiguration {
	/// Label list length differs from the rule's capture groups; only the first label is kept.
	LabelCountMismatch { rule: usize, labels: usize, groups: usize },
	/// The grammar has no `start` state; an empty one was synthesized.
	MissingStartState,
	/// A classifier returned tokens that do not spell out the match; the default token was used.
	ClassifierTextMismatch { rule: usize },
}

impl fmt::Display for Misconfiguration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::LabelCountMismatch { rule, labels, groups } => {
				write!(f, "rule {rule} declares {labels} token labels for {groups} capture groups")
			}
			Self::MissingStartState => f.write_str("grammar has no start state"),
			Self::ClassifierTextMismatch { rule } => write!(f, "rule {rule} classifier output does not match the matched text"),
		}
	}
}

/// Receives diagnostics from the compiler and tokenizer.
pub trait DiagnosticSink: Send + Sync {
	fn report(&self, diagnostic: Diagnostic);
}

impl<F> DiagnosticSink for F
where
	F: Fn(Diagnostic) + Send + Sync,
{
	fn report(&self, diagnostic: Diagnostic) {
		self(diagnostic)
	}
}

/// Default sink: logs every diagnostic at `warn`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
	fn report(&self, diagnostic: Diagnostic) {
		tracing::warn!(target: "tidemark::lexer", %diagnostic, "lexer diagnostic");
	}
}
