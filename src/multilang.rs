//! Text with forms in more than one language, used for country names, organisation names
//! and the like.
//!
//! Input syntax is a sequence of quoted strings, each optionally prefixed with a two-letter
//! language code: `en:"Spain" es:"España"`. A single unprefixed quoted string is a plain text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

use crate::{
    error::SixxError,
    input::{Loc, Located, Text},
    text::text_match_key,
};

pub const DEFAULT_LANGUAGE: &str = "en";

static MULTILANG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?:([a-z]{2}):)?"([^"]*)"\s*"#).expect("multilang pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Multilang {
    Plain(Text),
    Alt(BTreeMap<String, Text>),
}

impl Multilang {
    pub fn plain(text: impl Into<Text>) -> Multilang {
        Multilang::Plain(text.into())
    }

    /// Build from `(lang, text)` pairs. Language codes are either `xx` or `xx_YY`.
    pub fn alt<I, S, T>(forms: I) -> Multilang
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<Text>,
    {
        Multilang::Alt(
            forms
                .into_iter()
                .map(|(lang, text)| (lang.into(), text.into()))
                .collect(),
        )
    }

    /// Parse leading multilang syntax from `text`, returning the unparsed remainder and the
    /// multilang, if any was present.
    pub fn parse(text: &Text) -> Result<(Text, Option<Multilang>), SixxError> {
        let mut rest = text.clone();
        let mut bare: Option<Text> = None;
        let mut alt: Option<BTreeMap<String, Text>> = None;
        while !rest.is_empty() {
            let Some(caps) = MULTILANG_RE.captures(&rest) else {
                break;
            };
            let (Some(whole), Some(body)) = (caps.get(0), caps.get(2)) else {
                break;
            };
            let matched = rest.slice(whole.range());
            let string = rest.slice(body.range());
            let lang = caps.get(1).map(|m| m.as_str().to_string());
            rest = rest.tail(whole.end());
            match lang {
                Some(lang) => {
                    if bare.is_some() {
                        return Err(SixxError::input(
                            &matched,
                            "bare text mixed with language text",
                        ));
                    }
                    let forms = alt.get_or_insert_with(BTreeMap::new);
                    if forms.contains_key(&lang) {
                        return Err(SixxError::input(
                            &matched,
                            format!("duplicate language '{lang}'"),
                        ));
                    }
                    forms.insert(lang, string);
                }
                None => {
                    if bare.is_some() {
                        return Err(SixxError::input(&matched, "more than one bare text"));
                    }
                    if alt.is_some() {
                        return Err(SixxError::input(
                            &matched,
                            "bare text mixed with language text",
                        ));
                    }
                    bare = Some(string);
                }
            }
        }
        let parsed = match (bare, alt) {
            (Some(text), _) => Some(Multilang::Plain(text)),
            (None, Some(forms)) => Some(Multilang::Alt(forms)),
            (None, None) => None,
        };
        Ok((rest, parsed))
    }

    /// Parse a whole value as a multilang, or failing that, take it as a plain text. A
    /// mixture of the two is an error.
    pub fn optparse(text: &Text) -> Result<Multilang, SixxError> {
        match Multilang::parse(text)? {
            (_, None) => Ok(Multilang::Plain(text.clone())),
            (rest, Some(_)) if !rest.is_empty() => Err(SixxError::input(
                text,
                "multilang mixed with plain text",
            )),
            (_, Some(m)) => Ok(m),
        }
    }

    /// The form in the given language, falling back to the two-letter language prefix of an
    /// `xx_YY` code. A plain text is its own form in every language.
    pub fn local(&self, lang: &str) -> Option<&Text> {
        match self {
            Multilang::Plain(text) => Some(text),
            Multilang::Alt(forms) => forms
                .get(lang)
                .or_else(|| lang.get(..2).and_then(|prefix| forms.get(prefix))),
        }
    }

    /// The best non-empty form for display in the given language.
    pub fn display_in(&self, lang: &str) -> &str {
        match self {
            Multilang::Plain(text) => text.as_str(),
            Multilang::Alt(forms) => self
                .local(lang)
                .filter(|t| !t.is_empty())
                .or_else(|| forms.values().find(|t| !t.is_empty()))
                .map(|t| t.as_str())
                .unwrap_or(""),
        }
    }

    /// All the texts in all languages, the given language first.
    pub fn texts(&self, lang: &str) -> Vec<&Text> {
        let first = self.local(lang);
        let mut texts: Vec<&Text> = first.into_iter().collect();
        match self {
            Multilang::Plain(text) => {
                if first != Some(text) {
                    texts.push(text);
                }
            }
            Multilang::Alt(forms) => {
                texts.extend(forms.values().filter(|t| Some(*t) != first));
            }
        }
        texts
    }

    pub fn matches(&self, text: &str) -> bool {
        match self {
            Multilang::Plain(t) => t == text,
            Multilang::Alt(forms) => forms.values().any(|t| t == text),
        }
    }

    /// Whether the search key `itext` occurs in the match key of any form.
    pub fn imatches(&self, itext: &str) -> bool {
        match self {
            Multilang::Plain(t) => text_match_key(t).contains(itext),
            Multilang::Alt(forms) => forms.values().any(|t| text_match_key(t).contains(itext)),
        }
    }

    pub fn to_uppercase(&self) -> Multilang {
        let upper = |t: &Text| Text::new(t.to_uppercase(), t.loc());
        match self {
            Multilang::Plain(t) => Multilang::Plain(upper(t)),
            Multilang::Alt(forms) => Multilang::Alt(
                forms
                    .iter()
                    .map(|(lang, t)| (lang.clone(), upper(t)))
                    .collect(),
            ),
        }
    }

    /// True if any form is non-empty.
    pub fn is_present(&self) -> bool {
        match self {
            Multilang::Plain(t) => !t.is_empty(),
            Multilang::Alt(forms) => forms.values().any(|t| !t.is_empty()),
        }
    }
}

impl Located for Multilang {
    fn loc(&self) -> Option<Loc> {
        match self {
            Multilang::Plain(t) => t.loc(),
            Multilang::Alt(forms) => forms.values().filter_map(|t| t.loc()).min(),
        }
    }
}

impl fmt::Display for Multilang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_in(DEFAULT_LANGUAGE))
    }
}

impl From<&str> for Multilang {
    fn from(text: &str) -> Multilang {
        Multilang::plain(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn located(s: &str) -> Text {
        Text::new(s, Some(Loc::new("", 1, Some(1))))
    }

    #[test]
    fn parse_plain_and_alternatives() {
        let (rest, m) = Multilang::parse(&Text::plain("")).unwrap();
        assert!(rest.is_empty() && m.is_none());

        let (rest, m) = Multilang::parse(&Text::plain("abc")).unwrap();
        assert_eq!(rest, "abc");
        assert!(m.is_none());

        let (rest, m) = Multilang::parse(&Text::plain("\"abc\" ")).unwrap();
        assert!(rest.is_empty());
        assert_eq!(m, Some(Multilang::plain("abc")));

        let (rest, m) = Multilang::parse(&Text::plain("en:\"Spain\" es:\"España\" abc")).unwrap();
        assert_eq!(rest, "abc");
        let m = m.unwrap();
        assert_eq!(m.local("es").map(|t| t.as_str()), Some("España"));
        assert_eq!(m.local("en_AU").map(|t| t.as_str()), Some("Spain"));
        assert_eq!(m.local("de"), None);
    }

    #[test]
    fn parse_rejects_mixtures() {
        let err = Multilang::parse(&located("en:\"Spain\" \"España\" abc")).unwrap_err();
        assert_eq!(err.message(), "bare text mixed with language text");
        assert_eq!(err.loc().and_then(|l| l.column), Some(12));

        let err = Multilang::parse(&located("en:\"a\" en:\"b\"")).unwrap_err();
        assert_eq!(err.message(), "duplicate language 'en'");

        let err = Multilang::parse(&located("\"a\" \"b\"")).unwrap_err();
        assert_eq!(err.message(), "more than one bare text");

        let err = Multilang::optparse(&located("\"a\" b")).unwrap_err();
        assert_eq!(err.message(), "multilang mixed with plain text");
    }

    #[test]
    fn texts_start_with_requested_language() {
        let m = Multilang::alt([("en", "Spain"), ("es", "España")]);
        let es: Vec<&str> = m.texts("es").iter().map(|t| t.as_str()).collect();
        assert_eq!(es, vec!["España", "Spain"]);
        assert_eq!(m.to_string(), "Spain");
        assert!(m.imatches(" espana"));
        assert!(m.matches("Spain"));
    }
}
