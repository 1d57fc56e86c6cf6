//! Line-oriented document interface and a minimal in-memory buffer.

use std::borrow::Cow;

use thiserror::Error;

/// Line storage read by the scheduler.
pub trait Document {
	/// Returns the text of `row` without its line terminator, or `""` past the end.
	fn line(&self, row: usize) -> Cow<'_, str>;

	/// Number of rows. A document always has at least one row once loaded.
	fn len(&self) -> usize;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// A row and byte column inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Position {
	pub row: usize,
	pub column: usize,
}

impl Position {
	pub const fn new(row: usize, column: usize) -> Self {
		Self { row, column }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
	Insert,
	Remove,
}

/// One edit, already applied or about to be applied to a document.
///
/// `lines` holds the inserted or removed text split at line breaks, so a
/// delta spanning `n` rows carries `n + 1` entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta {
	pub start: Position,
	pub end: Position,
	pub action: Action,
	pub lines: Vec<String>,
}

impl Delta {
	/// Describes inserting `text` at `start`.
	pub fn insert(start: Position, text: &str) -> Self {
		let lines: Vec<String> = text.split('\n').map(str::to_owned).collect();
		let end = match lines.as_slice() {
			[only] => Position::new(start.row, start.column + only.len()),
			[.., last] => Position::new(start.row + lines.len() - 1, last.len()),
			[] => start,
		};
		Self {
			start,
			end,
			action: Action::Insert,
			lines,
		}
	}

	/// Number of line breaks the edit adds or removes.
	pub fn row_span(&self) -> usize {
		self.end.row.saturating_sub(self.start.row)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeltaError {
	#[error("position {row}:{column} is outside the document")]
	OutOfRange { row: usize, column: usize },

	#[error("position {row}:{column} is not on a character boundary")]
	NotCharBoundary { row: usize, column: usize },

	#[error("range end precedes its start")]
	Reversed,
}

/// A document stored as one `String` per row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBuffer {
	lines: Vec<String>,
}

impl Default for LineBuffer {
	fn default() -> Self {
		Self { lines: vec![String::new()] }
	}
}

impl LineBuffer {
	pub fn new() -> Self {
		Self::default()
	}

	/// Splits `text` at `\n`, dropping a `\r` before each break.
	pub fn from_text(text: &str) -> Self {
		Self {
			lines: text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l).to_owned()).collect(),
		}
	}

	pub fn lines(&self) -> &[String] {
		&self.lines
	}

	pub fn text(&self) -> String {
		self.lines.join("\n")
	}

	/// Inserts `text` at `at` and returns the applied delta.
	pub fn insert(&mut self, at: Position, text: &str) -> Result<Delta, DeltaError> {
		let delta = Delta::insert(at, text);
		self.apply(&delta)?;
		Ok(delta)
	}

	/// Removes the text between `start` and `end` and returns the applied delta.
	pub fn remove(&mut self, start: Position, end: Position) -> Result<Delta, DeltaError> {
		self.check_range(start, end)?;
		let lines = if start.row == end.row {
			vec![self.lines[start.row][start.column..end.column].to_owned()]
		} else {
			let mut lines = Vec::with_capacity(end.row - start.row + 1);
			lines.push(self.lines[start.row][start.column..].to_owned());
			lines.extend(self.lines[start.row + 1..end.row].iter().cloned());
			lines.push(self.lines[end.row][..end.column].to_owned());
			lines
		};
		let delta = Delta {
			start,
			end,
			action: Action::Remove,
			lines,
		};
		self.apply(&delta)?;
		Ok(delta)
	}

	/// Replaces the whole of `row` with `text`, which must not contain line breaks.
	pub fn replace_line(&mut self, row: usize, text: &str) -> Result<Vec<Delta>, DeltaError> {
		let len = self.lines.get(row).map(String::len).ok_or(DeltaError::OutOfRange { row, column: 0 })?;
		let mut deltas = Vec::with_capacity(2);
		if len > 0 {
			deltas.push(self.remove(Position::new(row, 0), Position::new(row, len))?);
		}
		if !text.is_empty() {
			deltas.push(self.insert(Position::new(row, 0), text)?);
		}
		Ok(deltas)
	}

	/// Applies `delta`, leaving the buffer untouched on error.
	pub fn apply(&mut self, delta: &Delta) -> Result<(), DeltaError> {
		match delta.action {
			Action::Insert => {
				let Position { row, column } = delta.start;
				self.check(delta.start)?;
				let tail = self.lines[row].split_off(column);
				match delta.lines.as_slice() {
					[] => self.lines[row].push_str(&tail),
					[only] => {
						self.lines[row].push_str(only);
						self.lines[row].push_str(&tail);
					}
					[first, middle @ .., last] => {
						self.lines[row].push_str(first);
						let inserted = middle.iter().cloned().chain(std::iter::once(format!("{last}{tail}")));
						self.lines.splice(row + 1..row + 1, inserted);
					}
				}
			}
			Action::Remove => {
				let (start, end) = (delta.start, delta.end);
				self.check_range(start, end)?;
				if start.row == end.row {
					self.lines[start.row].replace_range(start.column..end.column, "");
				} else {
					let tail = self.lines[end.row].split_off(end.column);
					self.lines[start.row].truncate(start.column);
					self.lines[start.row].push_str(&tail);
					self.lines.drain(start.row + 1..=end.row);
				}
			}
		}
		Ok(())
	}

	fn check(&self, at: Position) -> Result<(), DeltaError> {
		let Position { row, column } = at;
		let line = self.lines.get(row).ok_or(DeltaError::OutOfRange { row, column })?;
		if column > line.len() {
			return Err(DeltaError::OutOfRange { row, column });
		}
		if !line.is_char_boundary(column) {
			return Err(DeltaError::NotCharBoundary { row, column });
		}
		Ok(())
	}

	fn check_range(&self, start: Position, end: Position) -> Result<(), DeltaError> {
		if end < start {
			return Err(DeltaError::Reversed);
		}
		self.check(start)?;
		self.check(end)
	}
}

impl Document for LineBuffer {
	fn line(&self, row: usize) -> Cow<'_, str> {
		self.lines.get(row).map_or(Cow::Borrowed(""), |l| Cow::Borrowed(l.as_str()))
	}

	fn len(&self) -> usize {
		self.lines.len()
	}
}
