//! Rule compiler: turns each state's rule list into one combined matcher.
//!
//! Every patterned rule becomes one alternative `( ... )` of the state's
//! pattern, followed by a final `($)` alternative that always matches at the
//! end of the line. The wrapping group of each alternative identifies the
//! rule that matched. Inner capture groups are turned non-capturing unless the
//! rule uses back-references, in which case they stay and the references are
//! renumbered for their position in the combined pattern.

use std::fmt;
use std::sync::Arc;

use fancy_regex::Regex;
use rustc_hash::FxHashMap;

use crate::config::TokenizerConfig;
use crate::diagnostic::{Diagnostic, DiagnosticSink, Misconfiguration, TracingSink};
use crate::pattern;
use crate::rule::{Grammar, Next, Rule, TokenSpec};
use crate::state::{START, StateName};
use crate::token::TokenKind;

/// A rule as placed in its state's combined pattern.
#[derive(Debug)]
pub(crate) struct CompiledRule {
	/// Index of the rule in its state's rule list.
	pub(crate) index: usize,
	/// Group wrapping this rule's alternative in the combined pattern.
	pub(crate) group: usize,
	/// Labels or classifier after validation. `Labels` implies a splitter.
	pub(crate) token: TokenSpec,
	/// The rule's own pattern anchored to the whole match, for group-wise labels.
	pub(crate) splitter: Option<Regex>,
	pub(crate) next: Option<Next>,
	pub(crate) merge: bool,
	pub(crate) consume_line_end: bool,
}

/// Flags unioned over all rules of a state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateFlags {
	pub case_insensitive: bool,
	/// Patterns always match Unicode scalar values; recorded for introspection.
	pub unicode: bool,
}

impl StateFlags {
	fn prefix(self) -> &'static str {
		if self.case_insensitive { "(?i)" } else { "" }
	}
}

/// One state's combined matcher and its group-to-rule mapping.
#[derive(Debug)]
pub struct CompiledState {
	pub(crate) name: StateName,
	/// `None` when the state can only match end-of-line.
	pub(crate) matcher: Option<Regex>,
	pub(crate) rules: Vec<CompiledRule>,
	pub(crate) default_token: TokenKind,
	pub(crate) flags: StateFlags,
}

impl CompiledState {
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Source of the combined pattern, if the state has one.
	pub fn pattern(&self) -> Option<&str> {
		self.matcher.as_ref().map(Regex::as_str)
	}

	pub fn default_token(&self) -> &TokenKind {
		&self.default_token
	}

	pub fn flags(&self) -> StateFlags {
		self.flags
	}

	/// Maps a group of the combined pattern to the index of the rule it wraps.
	pub fn rule_for_group(&self, group: usize) -> Option<usize> {
		self.rules.iter().find(|r| r.group == group).map(|r| r.index)
	}

	/// Returns true if the rule at `index` got a splitter pattern.
	pub fn has_splitter(&self, index: usize) -> bool {
		self.rules.iter().any(|r| r.index == index && r.splitter.is_some())
	}
}

/// A compiled grammar, ready to tokenize lines.
///
/// Immutable after construction and safe to share across threads; each call
/// to [`Tokenizer::tokenize_line`] keeps its own cursor.
pub struct Tokenizer {
	pub(crate) states: Vec<CompiledState>,
	pub(crate) index: FxHashMap<StateName, usize>,
	pub(crate) start: usize,
	pub(crate) config: TokenizerConfig,
	pub(crate) sink: Arc<dyn DiagnosticSink>,
}

impl fmt::Debug for Tokenizer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Tokenizer")
			.field("states", &self.states.iter().map(|s| &s.name).collect::<Vec<_>>())
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}

impl Tokenizer {
	/// Compiles with default limits, logging diagnostics through `tracing`.
	pub fn new(grammar: &Grammar) -> Self {
		compile(grammar, Arc::new(TracingSink), TokenizerConfig::default())
	}

	pub fn state(&self, name: &str) -> Option<&CompiledState> {
		self.index.get(name).map(|&i| &self.states[i])
	}

	pub fn states(&self) -> impl Iterator<Item = &CompiledState> {
		self.states.iter()
	}

	pub fn config(&self) -> &TokenizerConfig {
		&self.config
	}

	pub(crate) fn report(&self, diagnostic: Diagnostic) {
		self.sink.report(diagnostic);
	}
}

/// Compiles every state of `grammar`. Never fails: problems are reported to
/// `sink` and the affected rule or state is degraded.
pub fn compile(grammar: &Grammar, sink: Arc<dyn DiagnosticSink>, config: TokenizerConfig) -> Tokenizer {
	let mut states = Vec::with_capacity(grammar.states.len() + 1);
	let mut index = FxHashMap::default();
	for (name, rules) in &grammar.states {
		index.insert(name.clone(), states.len());
		states.push(compile_state(name, rules, &*sink));
	}

	let start = match index.get(START) {
		Some(&i) => i,
		None => {
			sink.report(Diagnostic::MisconfiguredGrammar {
				state: START.to_owned(),
				problem: Misconfiguration::MissingStartState,
			});
			let name: StateName = Arc::from(START);
			index.insert(name.clone(), states.len());
			states.push(compile_state(&name, &[], &*sink));
			states.len() - 1
		}
	};

	tracing::debug!(
		target: "tidemark::lexer",
		states = states.len(),
		rules = states.iter().map(|s| s.rules.len()).sum::<usize>(),
		"compiled grammar"
	);

	Tokenizer {
		states,
		index,
		start,
		config,
		sink,
	}
}

struct Pending<'a> {
	rule: CompiledRule,
	source: &'a str,
	wants_splitter: bool,
}

fn compile_state(name: &StateName, rules: &[Rule], sink: &dyn DiagnosticSink) -> CompiledState {
	let flags = StateFlags {
		case_insensitive: rules.iter().any(|r| r.case_insensitive),
		unicode: rules.iter().any(|r| r.unicode),
	};
	let default_token = rules.iter().rev().find_map(|r| r.default_token.clone()).unwrap_or_default();

	let mut alternatives = Vec::new();
	let mut pending = Vec::new();
	// Groups used so far in the combined pattern.
	let mut total = 0usize;

	for (index, rule) in rules.iter().enumerate() {
		let Some(source) = rule.pattern.as_deref() else {
			continue;
		};
		let groups = match Regex::new(source) {
			Ok(re) => re.captures_len().saturating_sub(1),
			Err(err) => {
				sink.report(Diagnostic::InvalidPattern {
					state: name.to_string(),
					rule: Some(index),
					pattern: source.to_owned(),
					message: err.to_string(),
				});
				continue;
			}
		};

		let token = match &rule.token {
			TokenSpec::Labels(labels) if labels.len() == 1 || groups == 0 => TokenSpec::Label(labels.first().cloned().unwrap_or_default()),
			TokenSpec::Labels(labels) if labels.len() != groups => {
				sink.report(Diagnostic::MisconfiguredGrammar {
					state: name.to_string(),
					problem: Misconfiguration::LabelCountMismatch {
						rule: index,
						labels: labels.len(),
						groups,
					},
				});
				TokenSpec::Label(labels.first().cloned().unwrap_or_default())
			}
			other => other.clone(),
		};

		let mut kept_groups = 0;
		let alternative = if groups == 0 {
			source.to_owned()
		} else if pattern::has_backrefs(source) {
			kept_groups = groups;
			pattern::shift_backrefs(source, total + 1)
		} else {
			pattern::neutralize_groups(source)
		};

		let wants_splitter = groups > 0 && !matches!(token, TokenSpec::Label(_));
		pending.push(Pending {
			rule: CompiledRule {
				index,
				group: total + 1,
				token,
				splitter: None,
				next: rule.next.clone(),
				merge: rule.merge,
				consume_line_end: rule.consume_line_end,
			},
			source,
			wants_splitter,
		});
		total += 1 + kept_groups;
		alternatives.push(alternative);
	}

	// Splitters take the state's final flags, known only now.
	let mut compiled_rules = Vec::with_capacity(pending.len());
	for Pending {
		mut rule,
		source,
		wants_splitter,
	} in pending
	{
		if wants_splitter {
			let splitter = format!("{}^(?:{})$", flags.prefix(), pattern::strip_trailing_lookahead(source));
			match Regex::new(&splitter) {
				Ok(re) => rule.splitter = Some(re),
				Err(err) => {
					sink.report(Diagnostic::InvalidPattern {
						state: name.to_string(),
						rule: Some(rule.index),
						pattern: splitter,
						message: err.to_string(),
					});
					if let TokenSpec::Labels(labels) = &rule.token {
						rule.token = TokenSpec::Label(labels.first().cloned().unwrap_or_default());
					}
				}
			}
		}
		compiled_rules.push(rule);
	}

	let combined = if alternatives.is_empty() {
		"($)".to_owned()
	} else {
		format!("{}({})|($)", flags.prefix(), alternatives.join(")|("))
	};
	let matcher = match Regex::new(&combined) {
		Ok(re) => Some(re),
		Err(err) => {
			sink.report(Diagnostic::InvalidPattern {
				state: name.to_string(),
				rule: None,
				pattern: combined,
				message: err.to_string(),
			});
			compiled_rules.clear();
			None
		}
	};

	tracing::trace!(
		target: "tidemark::lexer",
		state = %name,
		rules = compiled_rules.len(),
		groups = total,
		"compiled state"
	);

	CompiledState {
		name: name.clone(),
		matcher,
		rules: compiled_rules,
		default_token,
		flags,
	}
}
