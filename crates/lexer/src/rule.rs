//! Grammar model: rules, states, and token classification.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::state::{START, StateName};
use crate::token::{Token, TokenKind};

/// Everything a classifier or transition can observe about a match.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
	/// Full matched text.
	pub value: &'a str,
	/// Capture groups of the rule's own pattern, in order. Empty unless the
	/// rule has capture groups.
	pub groups: &'a [Option<&'a str>],
	/// Active state name at the time of the match.
	pub state: &'a str,
	pub stack: &'a [StateName],
	pub line: &'a str,
}

/// Result of a classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
	/// One token covering the whole match.
	Label(TokenKind),
	/// One label per capture group of the rule's pattern.
	Groups(Vec<TokenKind>),
	/// Pre-expanded tokens; their values must concatenate to the match.
	Tokens(Vec<Token>),
}

pub type ClassifyFn = dyn Fn(&MatchContext<'_>) -> Classification + Send + Sync;

/// Computes the next state from the current state and the mutable stack.
pub type NextFn = dyn Fn(&str, &mut Vec<StateName>) -> StateName + Send + Sync;

/// How a rule labels its match.
#[derive(Clone)]
pub enum TokenSpec {
	Label(TokenKind),
	/// One label per capture group.
	Labels(Vec<TokenKind>),
	Classify(Arc<ClassifyFn>),
}

impl Default for TokenSpec {
	fn default() -> Self {
		Self::Label(TokenKind::default())
	}
}

impl fmt::Debug for TokenSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Label(kind) => f.debug_tuple("Label").field(kind).finish(),
			Self::Labels(kinds) => f.debug_tuple("Labels").field(kinds).finish(),
			Self::Classify(_) => f.write_str("Classify(..)"),
		}
	}
}

/// State transition taken after a rule matches.
#[derive(Clone)]
pub enum Next {
	State(StateName),
	Compute(Arc<NextFn>),
}

impl Next {
	/// Enters `target`, remembering the current state on the stack.
	///
	/// Nothing is stacked when leaving an unstacked `start`, so a single
	/// push/pop pair from the top level stays flat.
	pub fn push(target: &str) -> Self {
		let target: StateName = Arc::from(target);
		Self::Compute(Arc::new(move |current, stack| {
			if current != START || !stack.is_empty() {
				stack.push(Arc::from(current));
				stack.push(target.clone());
			}
			target.clone()
		}))
	}

	/// Leaves the current state, returning to the one stacked beneath it.
	pub fn pop() -> Self {
		Self::Compute(Arc::new(|_, stack| {
			stack.pop();
			stack.pop().unwrap_or_else(|| Arc::from(START))
		}))
	}

	/// Resolves the target state, mutating `stack` for computed transitions.
	pub(crate) fn resolve(&self, current: &str, stack: &mut Vec<StateName>) -> StateName {
		match self {
			Self::State(name) => name.clone(),
			Self::Compute(f) => f(current, stack),
		}
	}
}

impl fmt::Debug for Next {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::State(name) => f.debug_tuple("State").field(name).finish(),
			Self::Compute(_) => f.write_str("Compute(..)"),
		}
	}
}

/// One pattern plus classification and optional transition.
#[derive(Debug, Clone)]
pub struct Rule {
	/// Regular expression source. `None` for rules that only set flags such
	/// as the state's default token.
	pub pattern: Option<String>,
	pub token: TokenSpec,
	pub next: Option<Next>,
	pub case_insensitive: bool,
	pub unicode: bool,
	/// Whether output may merge with an adjacent token of the same kind.
	pub merge: bool,
	/// Stop tokenizing the line when this rule's match reaches its end.
	pub consume_line_end: bool,
	/// Overrides the containing state's default token.
	pub default_token: Option<TokenKind>,
}

impl Default for Rule {
	fn default() -> Self {
		Self {
			pattern: None,
			token: TokenSpec::default(),
			next: None,
			case_insensitive: false,
			unicode: false,
			merge: true,
			consume_line_end: false,
			default_token: None,
		}
	}
}

impl Rule {
	pub fn new(pattern: impl Into<String>) -> Self {
		Self {
			pattern: Some(pattern.into()),
			..Self::default()
		}
	}

	/// A pattern-less rule that sets the state's default token.
	pub fn fallback(label: &str) -> Self {
		Self {
			default_token: Some(TokenKind::new(label)),
			..Self::default()
		}
	}

	pub fn token(mut self, label: &str) -> Self {
		self.token = TokenSpec::Label(TokenKind::new(label));
		self
	}

	pub fn tokens<'a>(mut self, labels: impl IntoIterator<Item = &'a str>) -> Self {
		self.token = TokenSpec::Labels(labels.into_iter().map(TokenKind::new).collect());
		self
	}

	pub fn classify(mut self, f: impl Fn(&MatchContext<'_>) -> Classification + Send + Sync + 'static) -> Self {
		self.token = TokenSpec::Classify(Arc::new(f));
		self
	}

	pub fn next(mut self, state: &str) -> Self {
		self.next = Some(Next::State(Arc::from(state)));
		self
	}

	pub fn next_with(mut self, f: impl Fn(&str, &mut Vec<StateName>) -> StateName + Send + Sync + 'static) -> Self {
		self.next = Some(Next::Compute(Arc::new(f)));
		self
	}

	pub fn push(mut self, state: &str) -> Self {
		self.next = Some(Next::push(state));
		self
	}

	pub fn pop(mut self) -> Self {
		self.next = Some(Next::pop());
		self
	}

	pub fn case_insensitive(mut self) -> Self {
		self.case_insensitive = true;
		self
	}

	pub fn unicode(mut self) -> Self {
		self.unicode = true;
		self
	}

	pub fn no_merge(mut self) -> Self {
		self.merge = false;
		self
	}

	pub fn consume_line_end(mut self) -> Self {
		self.consume_line_end = true;
		self
	}

	pub fn default_token(mut self, label: &str) -> Self {
		self.default_token = Some(TokenKind::new(label));
		self
	}
}

/// Complete named-state rule set. `start` is the initial state.
#[derive(Debug, Clone, Default)]
pub struct Grammar {
	pub(crate) states: BTreeMap<StateName, Vec<Rule>>,
}

impl Grammar {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds or replaces a state.
	pub fn state(mut self, name: &str, rules: impl IntoIterator<Item = Rule>) -> Self {
		self.insert(name, rules);
		self
	}

	pub fn insert(&mut self, name: &str, rules: impl IntoIterator<Item = Rule>) {
		self.states.insert(Arc::from(name), rules.into_iter().collect());
	}

	pub fn get(&self, name: &str) -> Option<&[Rule]> {
		self.states.get(name).map(Vec::as_slice)
	}

	pub fn state_names(&self) -> impl Iterator<Item = &str> {
		self.states.keys().map(|k| &**k)
	}

	pub fn len(&self) -> usize {
		self.states.len()
	}

	pub fn is_empty(&self) -> bool {
		self.states.is_empty()
	}
}
