//! Located input text.
//!
//! Every string read from an input file is carried as a [`Text`], which remembers the
//! [`Loc`] of its first character. Slicing, trimming and splitting a `Text` keeps the
//! location in step, so that errors raised deep inside the parser can point at the exact
//! column that caused them.

use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    ops::{Deref, Range},
    path::Path,
};

use crate::error::SixxError;

/// A position in an input file. Lines and columns count from 1.
///
/// Locations order by path, then line, then column, with a missing column sorting before
/// any column on the same line.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Loc {
    pub path: String,
    pub line: usize,
    pub column: Option<usize>,
}

impl Loc {
    pub fn new(path: impl Into<String>, line: usize, column: Option<usize>) -> Loc {
        Loc {
            path: path.into(),
            line,
            column,
        }
    }

    /// The same location without its column.
    pub fn as_line(&self) -> Loc {
        Loc {
            path: self.path.clone(),
            line: self.line,
            column: None,
        }
    }

    /// Shift the column right by `n` characters. Locations without a column are unchanged.
    pub fn offset(&self, n: usize) -> Loc {
        Loc {
            path: self.path.clone(),
            line: self.line,
            column: self.column.map(|c| c + n),
        }
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.path.is_empty() {
            parts.push(format!("'{}'", self.path));
        }
        if self.line > 0 {
            parts.push(format!("line {}", self.line));
        }
        if let Some(column) = self.column {
            parts.push(format!("column {column}"));
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// Anything that can say where in the input it came from.
pub trait Located {
    fn loc(&self) -> Option<Loc>;
}

impl Located for Loc {
    fn loc(&self) -> Option<Loc> {
        Some(self.clone())
    }
}

impl Located for Option<Loc> {
    fn loc(&self) -> Option<Loc> {
        self.clone()
    }
}

impl Located for str {
    fn loc(&self) -> Option<Loc> {
        None
    }
}

impl<T: Located> Located for [T] {
    /// The earliest location among the elements.
    fn loc(&self) -> Option<Loc> {
        self.iter().filter_map(|t| t.loc()).min()
    }
}

/// A string that remembers where it was read from.
///
/// Equality, ordering and hashing consider only the characters, never the location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Text {
    text: String,
    loc: Option<Loc>,
}

impl Text {
    pub fn new(text: impl Into<String>, loc: Option<Loc>) -> Text {
        Text {
            text: text.into(),
            loc,
        }
    }

    /// A text that did not come from any input file.
    pub fn plain(text: impl Into<String>) -> Text {
        Text {
            text: text.into(),
            loc: None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// The sub-text covering the given byte range.
    pub fn slice(&self, range: Range<usize>) -> Text {
        let columns = self.text[..range.start].chars().count();
        Text {
            text: self.text[range].to_string(),
            loc: self.loc.as_ref().map(|loc| loc.offset(columns)),
        }
    }

    /// The sub-text starting at the given byte offset.
    pub fn tail(&self, start: usize) -> Text {
        self.slice(start..self.text.len())
    }

    pub fn trim(&self) -> Text {
        self.trim_start().trim_end()
    }

    pub fn trim_start(&self) -> Text {
        let start = self.text.len() - self.text.trim_start().len();
        self.tail(start)
    }

    pub fn trim_end(&self) -> Text {
        self.slice(0..self.text.trim_end().len())
    }

    /// Split off the first whitespace-delimited word, returning the word and the
    /// (left-trimmed) remainder, if any.
    pub fn split_first_word(&self) -> Option<(Text, Option<Text>)> {
        let trimmed = self.trim();
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.text.find(char::is_whitespace) {
            Some(i) => {
                let rest = trimmed.tail(i).trim_start();
                Some((trimmed.slice(0..i), Some(rest)))
            }
            None => Some((trimmed, None)),
        }
    }

    pub fn split_whitespace(&self) -> Vec<Text> {
        let mut words = Vec::new();
        let mut start = None;
        for (i, c) in self.text.char_indices() {
            match (c.is_whitespace(), start) {
                (true, Some(s)) => {
                    words.push(self.slice(s..i));
                    start = None;
                }
                (false, None) => start = Some(i),
                _ => {}
            }
        }
        if let Some(s) = start {
            words.push(self.tail(s));
        }
        words
    }

    /// Split on every occurrence of `sep`, keeping empty pieces.
    pub fn split(&self, sep: char) -> Vec<Text> {
        let mut pieces = Vec::new();
        let mut start = 0;
        for (i, c) in self.text.char_indices() {
            if c == sep {
                pieces.push(self.slice(start..i));
                start = i + c.len_utf8();
            }
        }
        pieces.push(self.tail(start));
        pieces
    }

    /// Split at the first occurrence of `sep`.
    pub fn split_once(&self, sep: char) -> Option<(Text, Text)> {
        self.text
            .find(sep)
            .map(|i| (self.slice(0..i), self.tail(i + sep.len_utf8())))
    }

    pub fn strip_prefix(&self, prefix: &str) -> Option<Text> {
        if self.text.starts_with(prefix) {
            Some(self.tail(prefix.len()))
        } else {
            None
        }
    }
}

impl Deref for Text {
    type Target = str;

    fn deref(&self) -> &str {
        &self.text
    }
}

impl AsRef<str> for Text {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl PartialEq for Text {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Text {}

impl PartialEq<str> for Text {
    fn eq(&self, other: &str) -> bool {
        self.text == other
    }
}

impl PartialEq<&str> for Text {
    fn eq(&self, other: &&str) -> bool {
        self.text == *other
    }
}

impl PartialOrd for Text {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Text {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text.cmp(&other.text)
    }
}

impl Hash for Text {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state)
    }
}

impl From<&str> for Text {
    fn from(text: &str) -> Text {
        Text::plain(text)
    }
}

impl Located for Text {
    fn loc(&self) -> Option<Loc> {
        self.loc.clone()
    }
}

/// Split source text into located lines, without line terminators.
pub fn lines(source: &str, path: &str) -> Vec<Text> {
    source
        .lines()
        .enumerate()
        .map(|(i, line)| {
            Text::new(
                line.strip_suffix('\r').unwrap_or(line),
                Some(Loc::new(path, i + 1, Some(1))),
            )
        })
        .collect()
}

/// Read a file into located lines.
pub fn read_lines(path: &Path) -> Result<Vec<Text>, SixxError> {
    tracing::debug!("Reading {:?}", path);
    let source = std::fs::read_to_string(path)?;
    Ok(lines(&source, &path.to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn at(col: usize) -> Option<Loc> {
        Some(Loc::new("f", 3, Some(col)))
    }

    #[test]
    fn loc_display_and_order() {
        assert_eq!(Loc::new("name", 4, None).to_string(), "'name', line 4");
        assert_eq!(Loc::new("a", 2, Some(7)).to_string(), "'a', line 2, column 7");
        assert!(Loc::new("a", 2, None) < Loc::new("a", 2, Some(1)));
        assert!(Loc::new("a", 2, Some(10)) < Loc::new("a", 2, Some(11)));
        assert!(Loc::new("a", 9, Some(10)) < Loc::new("b", 1, Some(1)));
    }

    #[test]
    fn slicing_tracks_columns() {
        let t = Text::new("  ph 08 8123 4567", at(1));
        let (key, rest) = t.split_first_word().unwrap();
        assert_eq!(key, "ph");
        assert_eq!(key.loc(), at(3));
        let rest = rest.unwrap();
        assert_eq!(rest, "08 8123 4567");
        assert_eq!(rest.loc(), at(6));
        let words = rest.split_whitespace();
        assert_eq!(words.len(), 3);
        assert_eq!(words[2].loc(), at(14));
    }

    #[test]
    fn equality_ignores_location() {
        assert_eq!(Text::new("x", at(1)), Text::new("x", at(9)));
        assert_eq!(Text::plain("x"), "x");
    }

    #[test]
    fn split_keeps_empty_pieces() {
        let t = Text::new("a;;b", at(1));
        let pieces = t.split(';');
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[2].loc(), at(4));
        assert!(pieces[1].is_empty());
    }

    #[test]
    fn lines_are_numbered_from_one() {
        let ls = lines("a 1\r\nb 2\n", "in.sixx");
        assert_eq!(ls.len(), 2);
        assert_eq!(ls[0], "a 1");
        assert_eq!(ls[1].loc(), Some(Loc::new("in.sixx", 2, Some(1))));
    }
}
