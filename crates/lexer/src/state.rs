//! Lexer state carried from one line to the next.

use std::fmt;
use std::sync::Arc;

/// Name of a grammar state.
pub type StateName = Arc<str>;

/// Name of the mandatory initial state.
pub const START: &str = "start";

/// State handed from the end of one line to the start of the next.
///
/// `Nested` keeps the active state separately from the stack because a
/// transition may leave the lexer in a state that is not the stack's top.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LexerState {
	Flat(StateName),
	Nested {
		current: StateName,
		/// Ordered bottom to top.
		stack: Vec<StateName>,
	},
}

impl Default for LexerState {
	fn default() -> Self {
		Self::Flat(Arc::from(START))
	}
}

impl LexerState {
	pub fn flat(name: &str) -> Self {
		Self::Flat(Arc::from(name))
	}

	pub fn nested(current: &str, stack: &[&str]) -> Self {
		Self::Nested {
			current: Arc::from(current),
			stack: stack.iter().map(|s| Arc::from(*s)).collect(),
		}
	}

	/// Builds the minimal representation: flat unless more than one entry is stacked.
	pub fn normalized(current: StateName, stack: Vec<StateName>) -> Self {
		if stack.len() > 1 {
			Self::Nested { current, stack }
		} else {
			Self::Flat(current)
		}
	}

	/// Returns the active state name.
	pub fn current(&self) -> &str {
		match self {
			Self::Flat(name) => name,
			Self::Nested { current, .. } => current,
		}
	}

	/// Returns the stacked states, empty for flat states.
	pub fn stack(&self) -> &[StateName] {
		match self {
			Self::Flat(_) => &[],
			Self::Nested { stack, .. } => stack,
		}
	}

	pub fn is_start(&self) -> bool {
		matches!(self, Self::Flat(name) if &**name == START)
	}

	/// Splits into the active state and an owned working stack.
	pub(crate) fn decode(&self) -> (StateName, Vec<StateName>) {
		match self {
			Self::Flat(name) => (name.clone(), Vec::new()),
			Self::Nested { current, stack } => (current.clone(), stack.clone()),
		}
	}
}

impl From<&str> for LexerState {
	fn from(name: &str) -> Self {
		Self::flat(name)
	}
}

impl fmt::Display for LexerState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Flat(name) => f.write_str(name),
			Self::Nested { current, stack } => {
				write!(f, "{current}[")?;
				for (i, name) in stack.iter().enumerate() {
					if i > 0 {
						f.write_str(">")?;
					}
					f.write_str(name)?;
				}
				f.write_str("]")
			}
		}
	}
}
