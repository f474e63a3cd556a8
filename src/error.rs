use std::{fmt, io};

use regex::Error as RegexError;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;
use url::ParseError as UrlParseError;

use crate::input::{Loc, Located};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum SixxError {
    /// Malformed or inconsistent input text. Always fatal to the parse run.
    #[error("{}", display_input(.loc, .message))]
    Input { loc: Option<Loc>, message: String },
    #[error("Ambiguous reference: {0}")]
    Ambiguous(String),
    #[error("Custom error: {0}")]
    Custom(String),
    #[error("Predicate expression error: {0}")]
    Expression(String),
    /// A graph invariant was violated, e.g. a department with two parents.
    #[error("Graph invariant violated: {0}")]
    Invariant(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
}

fn display_input(loc: &Option<Loc>, message: &str) -> String {
    match loc {
        Some(loc) => format!("{loc}: {message}"),
        None => message.to_string(),
    }
}

impl SixxError {
    /// An input error located at the given text, dataset, or location.
    pub fn input<L: Located + ?Sized>(at: &L, message: impl Into<String>) -> SixxError {
        SixxError::Input {
            loc: at.loc(),
            message: message.into(),
        }
    }

    /// Like [`SixxError::input`], but reports only the line of the location.
    pub fn input_line<L: Located + ?Sized>(at: &L, message: impl Into<String>) -> SixxError {
        SixxError::Input {
            loc: at.loc().map(|loc| loc.as_line()),
            message: message.into(),
        }
    }

    pub fn unlocated(message: impl Into<String>) -> SixxError {
        SixxError::Input {
            loc: None,
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> SixxError {
        SixxError::Invariant(message.into())
    }

    /// Attach a location to an input error that lacks one.
    pub fn located_at<L: Located + ?Sized>(self, at: &L) -> SixxError {
        match self {
            SixxError::Input { loc: None, message } => SixxError::Input {
                loc: at.loc(),
                message,
            },
            other => other,
        }
    }

    pub fn loc(&self) -> Option<&Loc> {
        match self {
            SixxError::Input { loc, .. } => loc.as_ref(),
            _ => None,
        }
    }

    /// The message without any location prefix.
    pub fn message(&self) -> String {
        match self {
            SixxError::Input { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<toml::de::Error> for SixxError {
    fn from(src: toml::de::Error) -> SixxError {
        SixxError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for SixxError {
    fn from(src: toml::ser::Error) -> SixxError {
        SixxError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for SixxError {
    fn from(src: JsonError) -> SixxError {
        SixxError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<UrlParseError> for SixxError {
    fn from(src: UrlParseError) -> SixxError {
        SixxError::Serialization(format!("Invalid URL: {src}"))
    }
}

impl From<chrono::ParseError> for SixxError {
    fn from(src: chrono::ParseError) -> SixxError {
        SixxError::Serialization(format!("Invalid date: {src}"))
    }
}

impl From<io::Error> for SixxError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => SixxError::NotFound(format!("{x}")),
            _ => SixxError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<walkdir::Error> for SixxError {
    fn from(x: walkdir::Error) -> Self {
        SixxError::Io(format!("Directory walk failed: {x}"))
    }
}

impl From<fmt::Error> for SixxError {
    fn from(x: fmt::Error) -> Self {
        SixxError::Custom(format!("{x}"))
    }
}

impl From<RegexError> for SixxError {
    fn from(x: RegexError) -> Self {
        SixxError::Serialization(format!("Regex parse failed: {x}"))
    }
}
