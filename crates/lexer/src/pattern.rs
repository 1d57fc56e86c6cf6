//! Source-level rewrites of rule patterns.
//!
//! Rules are merged into one alternation per state, so a rule's groups have to
//! be renumbered or removed before it can sit next to its siblings. These
//! helpers work on the pattern text with a small scanner that understands
//! escapes, character classes, and group openers, which is all the rewriting
//! needs.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupKind {
	Capturing,
	Named,
	Lookahead,
	Lookbehind,
	/// `(?:`, inline flags, and anything else starting with `(?`.
	Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece {
	Literal,
	Escape,
	Backref(usize),
	NamedBackref,
	Class,
	Open(GroupKind),
	Close,
}

#[derive(Debug, Clone, Copy)]
struct Span {
	piece: Piece,
	start: usize,
	end: usize,
}

fn char_len_at(src: &str, at: usize) -> usize {
	src[at..].chars().next().map_or(1, char::len_utf8)
}

fn scan(src: &str) -> Vec<Span> {
	let bytes = src.as_bytes();
	let mut spans = Vec::new();
	let mut i = 0;
	while i < bytes.len() {
		let start = i;
		let piece = match bytes[i] {
			b'\\' => {
				i += 1;
				match bytes.get(i) {
					None => Piece::Escape,
					Some(b'1'..=b'9') => {
						let digits = i;
						while i < bytes.len() && bytes[i].is_ascii_digit() {
							i += 1;
						}
						src[digits..i].parse().map_or(Piece::Escape, Piece::Backref)
					}
					Some(b'k') if bytes.get(i + 1) == Some(&b'<') => {
						i += 1;
						Piece::NamedBackref
					}
					Some(_) => {
						i += char_len_at(src, i);
						Piece::Escape
					}
				}
			}
			b'[' => {
				i = class_end(src, i);
				Piece::Class
			}
			b'(' => {
				let (kind, len) = group_open(&src[i..]);
				i += len;
				Piece::Open(kind)
			}
			b')' => {
				i += 1;
				Piece::Close
			}
			_ => {
				i += char_len_at(src, i);
				Piece::Literal
			}
		};
		spans.push(Span { piece, start, end: i });
	}
	spans
}

/// Returns the byte offset just past the class opened at `open`.
fn class_end(src: &str, open: usize) -> usize {
	let bytes = src.as_bytes();
	let mut i = open + 1;
	if bytes.get(i) == Some(&b'^') {
		i += 1;
	}
	// A leading `]` is literal.
	if bytes.get(i) == Some(&b']') {
		i += 1;
	}
	let mut depth = 1usize;
	while i < bytes.len() {
		match bytes[i] {
			b'\\' => {
				i += 1;
				if i < bytes.len() {
					i += char_len_at(src, i);
				}
			}
			b'[' => {
				depth += 1;
				i += 1;
			}
			b']' => {
				depth -= 1;
				i += 1;
				if depth == 0 {
					return i;
				}
			}
			_ => i += char_len_at(src, i),
		}
	}
	bytes.len()
}

fn group_open(rest: &str) -> (GroupKind, usize) {
	if rest.starts_with("(?=") || rest.starts_with("(?!") {
		return (GroupKind::Lookahead, 3);
	}
	if rest.starts_with("(?<=") || rest.starts_with("(?<!") {
		return (GroupKind::Lookbehind, 4);
	}
	let name_start = if rest.starts_with("(?P<") {
		Some(4)
	} else if rest.starts_with("(?<") {
		Some(3)
	} else {
		None
	};
	if let Some(name_start) = name_start
		&& let Some(close) = rest[name_start..].find('>')
	{
		return (GroupKind::Named, name_start + close + 1);
	}
	if rest.starts_with("(?") {
		return (GroupKind::Other, 2);
	}
	(GroupKind::Capturing, 1)
}

/// Returns true if the pattern refers back to one of its own groups.
pub(crate) fn has_backrefs(src: &str) -> bool {
	scan(src)
		.iter()
		.any(|s| matches!(s.piece, Piece::Backref(_) | Piece::NamedBackref))
}

/// Rewrites every capturing group (plain or named) as non-capturing.
pub(crate) fn neutralize_groups(src: &str) -> String {
	let mut out = String::with_capacity(src.len() + 8);
	for span in scan(src) {
		match span.piece {
			Piece::Open(GroupKind::Capturing | GroupKind::Named) => out.push_str("(?:"),
			_ => out.push_str(&src[span.start..span.end]),
		}
	}
	out
}

/// Adds `offset` to every numbered back-reference.
pub(crate) fn shift_backrefs(src: &str, offset: usize) -> String {
	let mut out = String::with_capacity(src.len() + 4);
	for span in scan(src) {
		match span.piece {
			Piece::Backref(n) => {
				out.push('\\');
				out.push_str(&(n + offset).to_string());
			}
			_ => out.push_str(&src[span.start..span.end]),
		}
	}
	out
}

/// Drops a lookahead that closes the pattern, e.g. `(a)(b)(?=c)` becomes
/// `(a)(b)`. Only closing parentheses may follow it.
pub(crate) fn strip_trailing_lookahead(src: &str) -> String {
	let mut depth = 0usize;
	let mut open: Option<(usize, usize)> = None;
	let mut candidate: Option<(usize, usize)> = None;
	for span in scan(src) {
		match span.piece {
			Piece::Open(kind) => {
				depth += 1;
				if kind == GroupKind::Lookahead {
					open = Some((depth, span.start));
					candidate = None;
				}
			}
			Piece::Close => {
				if let Some((at, start)) = open
					&& at == depth
				{
					candidate = Some((start, span.end));
					open = None;
				}
				depth = depth.saturating_sub(1);
			}
			_ => {}
		}
	}
	match candidate {
		Some((start, end)) if src[end..].chars().all(|c| c == ')') => {
			let mut out = String::with_capacity(src.len());
			out.push_str(&src[..start]);
			out.push_str(&src[end..]);
			out
		}
		_ => src.to_owned(),
	}
}
