use once_cell::sync::Lazy;
use regex::Regex;

use crate::{error::SixxError, input::Text};

static KEYWORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-zA-Z_]+$").expect("keyword pattern"));

/// A keyword for classifying entries. Keywords are equal when their text is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Keyword {
    pub keyword: String,
}

impl Keyword {
    /// Parse the first word of `text` as a keyword; the remainder is a comment.
    pub fn parse(text: &Text) -> Result<(Keyword, Option<Text>), SixxError> {
        let (word, rest) = text
            .split_first_word()
            .ok_or_else(|| SixxError::input(text, "malformed keyword ''"))?;
        if !KEYWORD_RE.is_match(&word) {
            return Err(SixxError::input(
                &word,
                format!("malformed keyword '{word}'"),
            ));
        }
        Ok((
            Keyword {
                keyword: word.to_string(),
            },
            rest,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn keywords_are_word_characters() {
        let (kw, rest) = Keyword::parse(&Text::plain("foo bar")).unwrap();
        assert_eq!(kw.keyword, "foo");
        assert_eq!(rest.unwrap(), "bar");
        for bad in ["-abc", "abc!", "äbc"] {
            let err = Keyword::parse(&Text::plain(bad)).unwrap_err();
            assert_eq!(err.message(), format!("malformed keyword '{bad}'"));
        }
    }
}
