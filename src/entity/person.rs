//! People and their names.
//!
//! A [PersonName] is either a conventional English or Spanish name (given, middle and
//! family names, with optional short forms and initials) or a single indivisible name
//! like "Sting", optionally decorated with a title, honorific, salutation and letters.
//! Each form of the name either succeeds or yields `None`; which forms succeed depends
//! on which elements are known.

use std::fmt;

use crate::{
    date::{format_day_month, PartialDate},
    error::SixxError,
    input::{Loc, Located, Text},
    multilang::Multilang,
    text::SortStr,
};

/// The undecorated part of a person's name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BaseName {
    Standard {
        given: Option<String>,
        short: Option<String>,
        giveni: Option<String>,
        middle: Option<String>,
        middlei: Option<String>,
        family: Option<String>,
        family2: Option<String>,
    },
    Single(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Decorations {
    pub title: Option<String>,
    pub salutation: Option<String>,
    pub honorific: Option<String>,
    pub letters: Option<String>,
}

impl Decorations {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.salutation.is_none()
            && self.honorific.is_none()
            && self.letters.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PersonName {
    pub base: BaseName,
    pub decorations: Decorations,
}

/// Name element values keyed by their field names, as written in a data block.
#[derive(Debug, Clone, Default)]
pub struct NameFields {
    pub single: Option<Text>,
    pub short: Option<Text>,
    pub giveni: Option<Text>,
    pub given: Option<Text>,
    pub middle: Option<Text>,
    pub middlei: Option<Text>,
    pub family: Option<Text>,
    pub family2: Option<Text>,
    pub title: Option<Text>,
    pub honorific: Option<Text>,
    pub salutation: Option<Text>,
    pub letters: Option<Text>,
}

/// The data block keys of the name elements, in the order they are consulted. A single
/// name (`n`) excludes every other key.
pub const SINGLE_NAME_KEY: &str = "n";
pub const NAME_KEYS: [&str; 11] = [
    "fn-", "fn.", "fn", "mn", "mn.", "ln", "ln2", "tit", "hon", "sal", "let",
];

impl NameFields {
    /// Assign the value of a name element by its data block key.
    pub fn set(&mut self, key: &str, value: Text) {
        let slot = match key {
            "n" => &mut self.single,
            "fn-" => &mut self.short,
            "fn." => &mut self.giveni,
            "fn" => &mut self.given,
            "mn" => &mut self.middle,
            "mn." => &mut self.middlei,
            "ln" => &mut self.family,
            "ln2" => &mut self.family2,
            "tit" => &mut self.title,
            "hon" => &mut self.honorific,
            "sal" => &mut self.salutation,
            "let" => &mut self.letters,
            _ => return,
        };
        *slot = Some(value);
    }

    pub fn is_empty(&self) -> bool {
        self.texts().is_empty()
    }

    fn texts(&self) -> Vec<&Text> {
        [
            &self.single,
            &self.short,
            &self.giveni,
            &self.given,
            &self.middle,
            &self.middlei,
            &self.family,
            &self.family2,
            &self.title,
            &self.honorific,
            &self.salutation,
            &self.letters,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

fn clean(text: &Option<Text>) -> Option<String> {
    text.as_ref()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn join(words: &[Option<&str>]) -> Option<String> {
    let words: Vec<&str> = words.iter().flatten().copied().collect();
    (!words.is_empty()).then(|| words.join(" "))
}

/// The initials of every word that starts with a letter, with `O'G.` for names like
/// "O'Grady".
pub fn extract_initials(name: &str) -> Vec<String> {
    name.split_whitespace()
        .filter_map(|word| {
            let chars: Vec<char> = word.chars().collect();
            let first = *chars.first()?;
            if !first.is_alphabetic() {
                return None;
            }
            if chars.len() > 2 && chars[1] == '\'' && chars[2].is_alphabetic() {
                Some(format!("{}.", chars[..3].iter().collect::<String>().to_uppercase()))
            } else {
                Some(format!("{}.", first.to_uppercase()))
            }
        })
        .collect()
}

/// Prefix `inner` with `prefix` and a space, collating on `inner`.
fn prefixed(prefix: &str, inner: &str) -> SortStr {
    SortStr::prefixed(prefix, &SortStr::new(inner))
}

impl BaseName {
    fn elements(&self) -> Vec<&str> {
        match self {
            BaseName::Standard {
                given,
                short,
                giveni,
                middle,
                middlei,
                family,
                family2,
            } => [giveni, short, given, middlei, middle, family, family2]
                .into_iter()
                .filter_map(|e| e.as_deref())
                .collect(),
            BaseName::Single(single) => vec![single.as_str()],
        }
    }

    fn complete_name(&self) -> Option<String> {
        match self {
            BaseName::Standard {
                given,
                short,
                giveni,
                middle,
                middlei,
                family,
                family2,
            } => join(&[
                given.as_deref().or(short.as_deref()).or(giveni.as_deref()),
                middle.as_deref().or(middlei.as_deref()),
                family.as_deref(),
                family2.as_deref(),
            ]),
            BaseName::Single(single) => Some(single.clone()),
        }
    }

    fn formal_index_name(&self) -> Option<String> {
        match self {
            BaseName::Standard {
                given,
                giveni,
                family,
                family2,
                ..
            } => join(&[
                given.as_deref().or(giveni.as_deref()),
                family.as_deref(),
                family2.as_deref(),
            ]),
            BaseName::Single(single) => Some(single.clone()),
        }
    }

    fn informal_index_name(&self) -> Option<String> {
        match self {
            BaseName::Standard { short, family, .. } => {
                join(&[Some(short.as_deref()?), family.as_deref()])
            }
            BaseName::Single(_) => None,
        }
    }

    fn legal_name(&self) -> Option<String> {
        match self {
            BaseName::Standard {
                given,
                middle,
                family,
                family2,
                ..
            } => join(&[
                Some(given.as_deref()?),
                middle.as_deref(),
                Some(family.as_deref()?),
                family2.as_deref(),
            ]),
            BaseName::Single(single) => Some(single.clone()),
        }
    }

    fn full_name(&self) -> Option<String> {
        match self {
            BaseName::Standard {
                given,
                giveni,
                family,
                family2,
                ..
            } => join(&[
                Some(given.as_deref().or(giveni.as_deref())?),
                Some(family.as_deref()?),
                family2.as_deref(),
            ]),
            BaseName::Single(single) => Some(single.clone()),
        }
    }

    fn familiar_name(&self) -> Option<String> {
        match self {
            BaseName::Standard { given, short, .. } => short.clone().or_else(|| given.clone()),
            BaseName::Single(single) => Some(single.clone()),
        }
    }

    fn initials(&self) -> Option<String> {
        let initials = match self {
            BaseName::Standard {
                given,
                giveni,
                middle,
                middlei,
                ..
            } => {
                let mut r: Vec<String> = match (giveni, given) {
                    (Some(i), _) => vec![i.clone()],
                    (None, Some(g)) => extract_initials(g),
                    (None, None) => Vec::new(),
                };
                if !r.is_empty() {
                    match (middlei, middle) {
                        (Some(i), _) => r.push(i.clone()),
                        (None, Some(m)) => r.extend(extract_initials(m)),
                        (None, None) => {}
                    }
                }
                r.concat()
            }
            BaseName::Single(single) => extract_initials(single).concat(),
        };
        (!initials.is_empty()).then_some(initials)
    }

    fn casual_name(&self) -> Option<String> {
        match self {
            BaseName::Standard {
                given,
                short,
                family,
                ..
            } => join(&[
                Some(short.as_deref().or(given.as_deref())?),
                Some(family.as_deref()?),
            ]),
            BaseName::Single(single) => Some(single.clone()),
        }
    }

    fn title_name(&self) -> Option<String> {
        match self {
            BaseName::Standard {
                family, family2, ..
            } => join(&[Some(family.as_deref()?), family2.as_deref()]),
            BaseName::Single(single) => Some(single.clone()),
        }
    }

    fn single_only(&self) -> Option<String> {
        match self {
            BaseName::Single(single) => Some(single.clone()),
            BaseName::Standard { .. } => None,
        }
    }

    fn collation_name(&self) -> Option<String> {
        match self {
            BaseName::Standard {
                given,
                giveni,
                middle,
                middlei,
                family,
                family2,
                ..
            } => {
                let surname = join(&[Some(family.as_deref()?), family2.as_deref()])?;
                let given = join(&[
                    Some(given.as_deref().or(giveni.as_deref())?),
                    middle.as_deref().or(middlei.as_deref()),
                ])?;
                Some(format!("{surname}, {given}"))
            }
            BaseName::Single(_) => None,
        }
    }
}

impl fmt::Display for BaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseName::Standard {
                given,
                short,
                giveni,
                middle,
                middlei,
                family,
                family2,
            } => {
                let mut r: Vec<String> = Vec::new();
                match (given, giveni) {
                    (Some(g), Some(i)) => {
                        r.push(g.clone());
                        r.push(format!("[{i}]"));
                    }
                    (Some(g), None) => r.push(g.clone()),
                    (None, Some(i)) => r.push(i.clone()),
                    (None, None) => {}
                }
                if let Some(s) = short {
                    r.push(format!("[{s}]"));
                }
                match (middle, middlei) {
                    (Some(m), Some(i)) => {
                        r.push(m.clone());
                        r.push(format!("[{i}]"));
                    }
                    (Some(m), None) => r.push(m.clone()),
                    (None, Some(i)) => r.push(i.clone()),
                    (None, None) => {}
                }
                r.extend(family.iter().cloned());
                r.extend(family2.iter().cloned());
                f.write_str(&r.join(" "))
            }
            BaseName::Single(single) => f.write_str(single),
        }
    }
}

impl PersonName {
    /// Build a name from its fields, checking that the elements make a sensible whole.
    pub fn from_fields(fields: &NameFields) -> Result<PersonName, SixxError> {
        let at = fields.loc();
        let fail = |message: &str| SixxError::input(&at, message);

        let decorations = Decorations {
            title: clean(&fields.title),
            salutation: clean(&fields.salutation),
            honorific: clean(&fields.honorific),
            letters: clean(&fields.letters),
        };
        let base = match clean(&fields.single) {
            Some(single) => BaseName::Single(single),
            None => {
                let given = clean(&fields.given);
                let short = clean(&fields.short);
                let middle = clean(&fields.middle);
                let family = clean(&fields.family);
                let family2 = clean(&fields.family2);
                if short.is_none() && given.is_none() && family.is_none() {
                    return Err(fail("missing name"));
                }
                if family2.is_some() && family.is_none() {
                    return Err(fail("family2 given without family"));
                }
                if middle.is_some() && given.is_none() {
                    return Err(fail("middle name without given name"));
                }
                if short.is_some() && short == given {
                    return Err(fail("short name same as given name"));
                }
                BaseName::Standard {
                    given,
                    short,
                    giveni: clean(&fields.giveni),
                    middle,
                    middlei: clean(&fields.middlei),
                    family,
                    family2,
                }
            }
        };
        if decorations.honorific.is_some() && decorations.title.is_none() {
            return Err(fail("honorific without title"));
        }
        if decorations.title.is_some() && base.title_name().is_none() {
            return Err(fail("title without title name"));
        }
        Ok(PersonName { base, decorations })
    }

    fn is_decorated(&self) -> bool {
        !self.decorations.is_empty()
    }

    /// Every known element, decorations included, in a fixed order.
    pub fn elements(&self) -> Vec<&str> {
        let d = &self.decorations;
        let mut r: Vec<&str> = [&d.title, &d.salutation, &d.honorific]
            .into_iter()
            .filter_map(|e| e.as_deref())
            .collect();
        r.extend(self.base.elements());
        r.extend(d.letters.as_deref());
        r
    }

    /// All known words, with title and letters, preferring whole words over initials.
    pub fn complete_name(&self) -> SortStr {
        let cn = self.base.complete_name().unwrap_or_default();
        let d = &self.decorations;
        let prefix = d.honorific.as_deref().or(d.title.as_deref());
        if prefix.is_none() && d.letters.is_none() {
            return SortStr::new(cn);
        }
        let start = prefix.map_or(0, |p| p.len() + 1);
        let head = join(&[prefix, Some(cn.as_str())]).unwrap_or_default();
        let text = match &d.letters {
            Some(letters) => format!("{head}, {letters}"),
            None => head,
        };
        SortStr::with_sort(text, start..start + cn.len())
    }

    /// The name for an address book index, without middle names or contractions.
    pub fn formal_index_name(&self) -> SortStr {
        let fin = self.base.formal_index_name().unwrap_or_default();
        let d = &self.decorations;
        match d.title.as_deref().or(d.honorific.as_deref()) {
            Some(prefix) => prefixed(prefix, &fin),
            None => SortStr::new(fin),
        }
    }

    /// The index name using the short form of the given name; only if one is known.
    pub fn informal_index_name(&self) -> Option<SortStr> {
        self.base.informal_index_name().map(SortStr::new)
    }

    pub fn legal_name(&self) -> Option<String> {
        self.base.legal_name()
    }

    pub fn full_name(&self) -> Option<String> {
        self.base.full_name()
    }

    /// The name used in daily greeting. A decorated name only has one if it differs from
    /// the first word of the complete name.
    pub fn familiar_name(&self) -> Option<String> {
        let familiar = self.base.familiar_name()?;
        if self.is_decorated() {
            let complete = self.base.complete_name()?;
            if complete.starts_with(&format!("{familiar} ")) {
                return None;
            }
        }
        Some(familiar)
    }

    pub fn initials(&self) -> Option<String> {
        self.base.initials()
    }

    pub fn casual_name(&self) -> Option<String> {
        self.base.casual_name()
    }

    pub fn title_name(&self) -> Option<String> {
        self.base.title_name()
    }

    /// Title and title name, as in "Ms Thatcher", or a single name.
    pub fn social_name(&self) -> Option<SortStr> {
        if let (Some(title), Some(tn)) = (&self.decorations.title, self.base.title_name()) {
            return Some(prefixed(title, &tn));
        }
        self.base.single_only().map(SortStr::new)
    }

    /// The name for an envelope or announcement, with honorific or title and letters.
    pub fn formal_name(&self) -> Option<SortStr> {
        let d = &self.decorations;
        let prefix = d.honorific.as_deref().or(d.title.as_deref());
        if let (Some(prefix), Some(fname)) = (prefix, self.base.full_name()) {
            let start = prefix.len() + 1;
            let head = format!("{prefix} {fname}");
            let text = match &d.letters {
                Some(letters) => format!("{head}, {letters}"),
                None => head,
            };
            return Some(SortStr::with_sort(text, start..start + fname.len()));
        }
        self.base.single_only().map(SortStr::new)
    }

    pub fn formal_salutation_name(&self) -> Option<SortStr> {
        match &self.decorations.salutation {
            Some(salutation) => Some(SortStr::new(salutation.clone())),
            None => self.social_name(),
        }
    }

    /// "Family, Given Middle", as in a telephone directory.
    pub fn collation_name(&self) -> Option<SortStr> {
        let cn = self.base.collation_name()?;
        let d = &self.decorations;
        Some(match d.title.as_deref().or(d.honorific.as_deref()) {
            Some(prefix) => prefixed(prefix, &cn),
            None => SortStr::new(cn),
        })
    }

    /// The sort key tuple used to order people with otherwise equal standing.
    pub fn sortkey(&self) -> Vec<String> {
        match &self.base {
            BaseName::Standard {
                given,
                short,
                giveni,
                middle,
                middlei,
                family,
                family2,
            } => [
                given.as_ref().or(short.as_ref()).or(giveni.as_ref()),
                middle.as_ref().or(middlei.as_ref()),
                family.as_ref(),
                family2.as_ref(),
            ]
            .into_iter()
            .flatten()
            .cloned()
            .collect(),
            BaseName::Single(single) => vec![single.clone()],
        }
    }

    /// True if every word of `text` occurs as a whole element of the name, in order.
    pub fn matches(&self, text: &str) -> bool {
        let mut text = text.trim();
        for part in self.elements() {
            if text.is_empty() {
                break;
            }
            if let Some(rest) = text.strip_prefix(part) {
                if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                    text = rest.trim_start();
                }
            }
        }
        text.is_empty()
    }
}

impl fmt::Display for PersonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.decorations;
        if let Some(honorific) = &d.honorific {
            write!(f, "[{honorific}] ")?;
        }
        if let Some(title) = &d.title {
            write!(f, "{title} ")?;
        }
        write!(f, "{}", self.base)?;
        if let Some(letters) = &d.letters {
            write!(f, ", {letters}")?;
        }
        if let Some(salutation) = &d.salutation {
            write!(f, " [{salutation}]")?;
        }
        Ok(())
    }
}

/// A real person, with a name and possibly other names they are known by.
#[derive(Debug, Clone)]
pub struct Person {
    pub name: PersonName,
    pub aka: Vec<Multilang>,
}

impl Person {
    pub fn new(name: PersonName, aka: Vec<Multilang>) -> Person {
        Person { name, aka }
    }

    /// The name used when greeting the person, falling back to their head-of-family name.
    pub fn familiar_name(&self) -> String {
        self.name
            .familiar_name()
            .unwrap_or_else(|| self.family_head_name())
    }

    /// Given name and surname if known, else as much as is known.
    pub fn family_head_name(&self) -> String {
        self.name
            .casual_name()
            .unwrap_or_else(|| self.name.complete_name().to_string())
    }

    /// The name to show next to an email address.
    pub fn email_address_name(&self) -> String {
        self.name
            .casual_name()
            .or_else(|| self.name.full_name())
            .unwrap_or_else(|| self.name.complete_name().to_string())
    }

    /// People whose full names are known come first among the heads of a family.
    pub fn full_name_known(&self) -> bool {
        self.name.full_name().is_some()
    }

    pub fn matches(&self, text: &str) -> bool {
        self.name.matches(text)
    }
}

/// A day in the year, shared by everyone born on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Birthday {
    pub month: u32,
    pub day: u32,
}

impl Birthday {
    /// Parse a birthday, with an optional year of birth.
    pub fn parse(text: &Text) -> Result<(Birthday, Option<i32>), SixxError> {
        let date = PartialDate::parse(text)?;
        let month = date
            .month
            .ok_or_else(|| SixxError::input(text, "missing month"))?;
        let day = date
            .day
            .ok_or_else(|| SixxError::input(text, "missing day"))?;
        Ok((Birthday { month, day }, date.year))
    }

    /// `9-Oct`, or `9-Oct-1970` with a year.
    pub fn format(&self, year: Option<i32>) -> String {
        format_day_month(self.day, self.month, year)
    }
}

impl fmt::Display for Birthday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(None))
    }
}

impl Located for NameFields {
    fn loc(&self) -> Option<Loc> {
        self.texts().first().and_then(|t| t.loc())
    }
}
