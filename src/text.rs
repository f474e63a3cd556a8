//! Text utilities: collation keys, search keys, and display strings with a collation slice.

use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt, hash::Hash, ops::Range};
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

fn normalised_words<F>(text: &str, keep: F) -> Vec<String>
where
    F: Fn(char) -> bool,
{
    text.nfd()
        .collect::<String>()
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| !is_combining_mark(*c) && keep(*c))
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect()
}

/// Convert a text into the string used for sorting: diacritics removed, lower case, only
/// letters and commas kept.
pub fn text_sort_key(text: &str) -> String {
    normalised_words(text, |c| c.is_alphabetic() || c == ',').join(" ")
}

/// Convert a text into the string used for substring searches. Every word is preceded by a
/// single space, so that a search key matches only at word starts when it too starts with a
/// space.
pub fn text_match_key(text: &str) -> String {
    normalised_words(text, char::is_alphanumeric)
        .iter()
        .fold(String::new(), |mut acc, word| {
            acc.push(' ');
            acc.push_str(word);
            acc
        })
}

/// A display string with a designated slice that is used for collation, so that
/// "Dr Good Fellow, Q.C." can sort on "Good Fellow" while still displaying in full.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortStr {
    text: String,
    sort: Range<usize>,
}

impl SortStr {
    pub fn new(text: impl Into<String>) -> SortStr {
        let text = text.into();
        let sort = 0..text.len();
        SortStr { text, sort }
    }

    /// A display string that collates on `text[sort]`.
    pub fn with_sort(text: impl Into<String>, sort: Range<usize>) -> SortStr {
        let text = text.into();
        debug_assert!(sort.end <= text.len());
        SortStr { text, sort }
    }

    /// Prefix the string with `prefix` and a space, shifting the collation slice.
    pub fn prefixed(prefix: &str, inner: &SortStr) -> SortStr {
        let shift = prefix.len() + 1;
        SortStr {
            text: format!("{prefix} {}", inner.text),
            sort: inner.sort.start + shift..inner.sort.end + shift,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The part of the string used for collation.
    pub fn sort_str(&self) -> &str {
        &self.text[self.sort.clone()]
    }

    /// (before, collated, after) parts, for renderers that emphasise the collated part.
    pub fn sort_split(&self) -> (&str, &str, &str) {
        (
            &self.text[..self.sort.start],
            self.sort_str(),
            &self.text[self.sort.end..],
        )
    }

    pub fn sort_key(&self) -> String {
        text_sort_key(self.sort_str())
    }

    pub fn is_plain(&self) -> bool {
        self.sort == (0..self.text.len())
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for SortStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<String> for SortStr {
    fn from(text: String) -> SortStr {
        SortStr::new(text)
    }
}

impl From<&str> for SortStr {
    fn from(text: &str) -> SortStr {
        SortStr::new(text)
    }
}

/// The items of `items` in order, omitting any equal to an earlier one.
pub fn uniq<T, I>(items: I) -> Vec<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
