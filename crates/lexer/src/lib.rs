// Hosts embed the lexer in terminal UIs; diagnostics must go through sinks/tracing.
#![deny(clippy::print_stderr)]
#![cfg_attr(test, allow(unused_crate_dependencies))]

//! Stateful line lexer.
//!
//! A [`Grammar`] is a set of named states, each an ordered list of [`Rule`]s.
//! [`compile()`] turns every state into one combined matcher, and
//! [`Tokenizer::tokenize_line`] walks a single line with it, producing
//! [`Token`]s plus the [`LexerState`] to start the following line in.
//!
//! # Architecture
//!
//! * [`rule`]: rules, token classification, and state transitions
//! * [`description`]: JSON grammar descriptions
//! * [`compile`](mod@compile): rule compiler and compiled state inspection
//! * [`tokenize`]: the per-line matching loop
//! * [`diagnostic`]: side-channel reporting of recovered problems
//!
//! Broken grammars and pathological input never panic or error out of a
//! tokenization call; see [`Diagnostic`] for the fallbacks.

pub mod compile;
pub mod config;
pub mod description;
pub mod diagnostic;
mod pattern;
pub mod rule;
pub mod state;
pub mod token;
pub mod tokenize;

pub use compile::{CompiledState, StateFlags, Tokenizer, compile};
pub use config::TokenizerConfig;
pub use description::GrammarError;
pub use diagnostic::{Diagnostic, DiagnosticSink, Misconfiguration, TracingSink};
pub use rule::{Classification, Grammar, MatchContext, Next, Rule, TokenSpec};
pub use state::{LexerState, START, StateName};
pub use token::{LineTokens, OVERFLOW, TEXT, Token, TokenKind};
