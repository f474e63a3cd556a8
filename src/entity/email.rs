use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::{error::SixxError, input::Text};

// RFC 822 address grammar, as far as an addr-spec.
const ATOM: &str = r#"[!#$%&'*+\-/0-9=?A-Za-z^_`{}|~]+"#;
const QUOTED_STRING: &str = r#""(?:[^"\\\n]|\\.)*""#;
const DOMAIN_LITERAL: &str = r#"\[(?:[^\[\]\\\n]|\\.)*\]"#;

static ADDR_SPEC_RE: Lazy<Regex> = Lazy::new(|| {
    let word = format!("(?:{ATOM}|{QUOTED_STRING})");
    let sub_domain = format!("(?:{ATOM}|{DOMAIN_LITERAL})");
    let pattern = format!(r"^{word}(?:\.{word})*@{sub_domain}(?:\.{sub_domain})*");
    Regex::new(&pattern).expect("addr-spec pattern")
});

static ATOMS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^{ATOM}(?:\s+{ATOM})*$")).expect("atoms pattern"));

/// Split off the trailing free text that follows a parsed value.
fn trailing_comment(text: &Text, end: usize) -> Option<String> {
    let rest = text.tail(end).trim();
    (!rest.is_empty()).then(|| rest.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email {
    pub address: String,
}

impl Email {
    /// Parse an address at the start of `text`; anything after it is returned as a comment.
    pub fn parse(text: &Text) -> Result<(Email, Option<String>), SixxError> {
        let m = ADDR_SPEC_RE
            .find(text)
            .ok_or_else(|| SixxError::input(text, "malformed email address"))?;
        Ok((
            Email {
                address: m.as_str().to_string(),
            },
            trailing_comment(text, m.end()),
        ))
    }

    /// `Name <address>`, quoting the name unless it is a plain run of atoms.
    pub fn format(&self, name: Option<&str>) -> String {
        match name.filter(|n| !n.is_empty()) {
            Some(name) if ATOMS_RE.is_match(name) => format!("{name} <{}>", self.address),
            Some(name) => format!("\"{}\" <{}>", name.replace('"', "\\\""), self.address),
            None => self.address.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Uri {
    pub uri: String,
}

impl Uri {
    /// Parse an absolute URI from the first word of `text`; the rest is a comment.
    pub fn parse(text: &Text) -> Result<(Uri, Option<String>), SixxError> {
        let malformed = || SixxError::input(text, "malformed absolute URI");
        let (word, _) = text.split_first_word().ok_or_else(malformed)?;
        let url = Url::parse(&word).map_err(|_| malformed())?;
        if url.cannot_be_a_base() && url.scheme() != "mailto" {
            return Err(malformed());
        }
        let end = text.len() - text.trim_start().len() + word.len();
        Ok((
            Uri {
                uri: word.to_string(),
            },
            trailing_comment(text, end),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn parse_email_with_comment() {
        let (email, comment) = Email::parse(&Text::plain("andrewb@zip.com.au wah")).unwrap();
        assert_eq!(email.address, "andrewb@zip.com.au");
        assert_eq!(comment.as_deref(), Some("wah"));
        let (email, comment) = Email::parse(&Text::plain("foo@bar")).unwrap();
        assert_eq!(email.address, "foo@bar");
        assert!(comment.is_none());
    }

    #[test]
    fn malformed_emails() {
        for bad in ["andrewb", "@zip.com.au", "andrewb@", "<andrewb@zip.com.au>"] {
            let err = Email::parse(&Text::plain(bad)).unwrap_err();
            assert_eq!(err.message(), "malformed email address", "{bad}");
        }
    }

    #[test]
    fn format_quotes_names_with_specials() {
        let email = Email {
            address: "a@b.c".to_string(),
        };
        assert_eq!(email.format(Some("Jane Smith")), "Jane Smith <a@b.c>");
        assert_eq!(email.format(Some("Smith, Jane")), "\"Smith, Jane\" <a@b.c>");
        assert_eq!(email.format(None), "a@b.c");
    }

    #[test]
    fn parse_uri() {
        let (uri, comment) =
            Uri::parse(&Text::plain("http://www.zip.com.au/~andrewb/ wah")).unwrap();
        assert_eq!(uri.uri, "http://www.zip.com.au/~andrewb/");
        assert_eq!(comment.as_deref(), Some("wah"));
        let err = Uri::parse(&Text::plain("www.zip.com.au")).unwrap_err();
        assert_eq!(err.message(), "malformed absolute URI");
    }
}
