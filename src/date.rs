//! Permissive parsing of dates in which some elements may be missing.
//!
//! Day always precedes month, and both precede the year, as in `9/10/2006` or
//! `9th October 2006`. Month and weekday names are English, in full or abbreviated.
//! ISO dates (`2006-10-09`) are recognised as a whole. A year may be omitted, which is
//! how birthdays of unknown age are written.

use chrono::{Datelike, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{error::SixxError, input::Text};

static ISO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("iso date pattern"));

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<alpha>[[:alpha:]]+)|(?P<num>\d+)(?P<ord>st|nd|rd|th)?")
        .expect("date token pattern")
});

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

const PIVOT_YEAR: i32 = 1969;

fn month_of(word: &str) -> Option<u32> {
    let word = word.to_lowercase();
    MONTHS
        .iter()
        .position(|name| *name == word || (word.len() == 3 && name.starts_with(&word)))
        .map(|i| i as u32 + 1)
}

fn weekday_of(word: &str) -> Option<Weekday> {
    let word = word.to_lowercase();
    WEEKDAYS.iter().copied().find(|day| {
        let name = weekday_name(*day).to_lowercase();
        name == word || (word.len() == 3 && name.starts_with(&word))
    })
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Whether `suffix` is the right English ordinal suffix for `n`.
fn ordinal_fits(n: u32, suffix: &str) -> bool {
    let expected = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    suffix == expected
}

fn days_in_month(month: u32, year: Option<i32>) -> u32 {
    // Without a year, 29 February is allowed.
    let year = year.unwrap_or(2000);
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (first, next) {
        (Some(first), Some(next)) => (next - first).num_days() as u32,
        _ => 31,
    }
}

#[derive(Debug)]
struct Token {
    text: Text,
    word: Option<String>,
    number: Option<u32>,
    digits: usize,
    ordinal: Option<String>,
    used: bool,
}

/// A date with any of its elements possibly unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartialDate {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl PartialDate {
    pub fn parse(text: &Text) -> Result<PartialDate, SixxError> {
        let trimmed = text.trim();
        if let Some(caps) = ISO_RE.captures(&trimmed) {
            let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
            let date = PartialDate {
                year: field(1).map(|y| y as i32),
                month: field(2),
                day: field(3),
            };
            return date.validated(text, None);
        }

        let mut tokens: Vec<Token> = TOKEN_RE
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let token_text = text.slice(whole.range());
                Some(match caps.name("alpha") {
                    Some(alpha) => Token {
                        text: token_text,
                        word: Some(alpha.as_str().to_string()),
                        number: None,
                        digits: 0,
                        ordinal: None,
                        used: false,
                    },
                    None => {
                        let num = caps.name("num")?.as_str();
                        Token {
                            text: token_text,
                            word: None,
                            number: num.parse().ok(),
                            digits: num.len(),
                            ordinal: caps.name("ord").map(|m| m.as_str().to_string()),
                            used: false,
                        }
                    }
                })
            })
            .collect();

        let mut date = PartialDate::default();
        let mut weekday = None;

        if let Some(token) = tokens.iter_mut().find(|t| {
            t.digits == 4 && t.ordinal.is_none() && t.number.is_some_and(|n| n >= 1900)
        }) {
            date.year = token.number.map(|n| n as i32);
            token.used = true;
        }
        if let Some((token, month)) = tokens
            .iter_mut()
            .find_map(|t| t.word.as_deref().and_then(month_of).map(|m| (t, m)))
        {
            date.month = Some(month);
            token.used = true;
        }
        if let Some((token, day)) = tokens
            .iter_mut()
            .filter(|t| !t.used)
            .find_map(|t| t.word.as_deref().and_then(weekday_of).map(|d| (t, d)))
        {
            weekday = Some(day);
            token.used = true;
        }
        if let Some(token) = tokens.iter_mut().filter(|t| !t.used).find(|t| {
            t.digits <= 2
                && t.number.is_some_and(|n| {
                    (1..=31).contains(&n)
                        && t.ordinal.as_deref().map_or(true, |s| ordinal_fits(n, s))
                })
        }) {
            date.day = token.number;
            token.used = true;
        }
        if date.month.is_none() {
            if let Some(token) = tokens.iter_mut().filter(|t| !t.used).find(|t| {
                t.digits <= 2 && t.ordinal.is_none() && t.number.is_some_and(|n| (1..=12).contains(&n))
            }) {
                date.month = token.number;
                token.used = true;
            }
        }
        if date.year.is_none() {
            if let Some(token) = tokens
                .iter_mut()
                .filter(|t| !t.used)
                .find(|t| t.digits == 2 && t.ordinal.is_none())
            {
                date.year = token.number.map(|n| {
                    let year = 1900 + n as i32;
                    if year < PIVOT_YEAR {
                        year + 100
                    } else {
                        year
                    }
                });
                token.used = true;
            }
        }
        if let Some(token) = tokens.iter().find(|t| !t.used) {
            return Err(SixxError::input(
                &token.text,
                format!("malformed date at \"{}\"", token.text),
            ));
        }
        if date == PartialDate::default() {
            return Err(SixxError::input(text, "malformed date"));
        }
        date.validated(text, weekday)
    }

    fn validated(self, text: &Text, weekday: Option<Weekday>) -> Result<PartialDate, SixxError> {
        if let Some(month) = self.month {
            if !(1..=12).contains(&month) {
                return Err(SixxError::input(text, "month is out of range"));
            }
            if let Some(day) = self.day {
                if day == 0 || day > days_in_month(month, self.year) {
                    return Err(SixxError::input(text, "day is out of range for month"));
                }
            }
        }
        if let (Some(date), Some(weekday)) = (self.to_date(), weekday) {
            if date.weekday() != weekday {
                return Err(SixxError::input(
                    text,
                    format!(
                        "incorrect day of week {} (should be {})",
                        weekday_name(weekday),
                        weekday_name(date.weekday())
                    ),
                ));
            }
        }
        Ok(self)
    }

    /// The complete date, if all elements are known.
    pub fn to_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year?, self.month?, self.day?)
    }

    /// The complete date, or an error naming the missing elements.
    pub fn as_date(&self, text: &Text) -> Result<NaiveDate, SixxError> {
        if let Some(date) = self.to_date() {
            return Ok(date);
        }
        let missing: Vec<&str> = [
            ("year", self.year.is_none()),
            ("month", self.month.is_none()),
            ("day", self.day.is_none()),
        ]
        .into_iter()
        .filter_map(|(what, absent)| absent.then_some(what))
        .collect();
        Err(SixxError::input(
            text,
            format!("missing {}", missing.join(" and ")),
        ))
    }
}

/// Format a day and month, and optionally a year, as `9-Oct` or `9-Oct-2006`.
pub fn format_day_month(day: u32, month: u32, year: Option<i32>) -> String {
    let month_name = MONTHS
        .get(month.saturating_sub(1) as usize)
        .map(|name| {
            let mut abbrev: Vec<char> = name.chars().take(3).collect();
            if let Some(first) = abbrev.first_mut() {
                *first = first.to_ascii_uppercase();
            }
            abbrev.into_iter().collect::<String>()
        })
        .unwrap_or_default();
    match year {
        Some(year) => format!("{day}-{month_name}-{year}"),
        None => format!("{day}-{month_name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Loc;
    use test_log::test;

    fn parse(s: &str) -> Result<PartialDate, SixxError> {
        PartialDate::parse(&Text::new(s, Some(Loc::new("d", 1, Some(5)))))
    }

    fn ymd(year: Option<i32>, month: Option<u32>, day: Option<u32>) -> PartialDate {
        PartialDate { year, month, day }
    }

    #[test]
    fn numeric_and_named_forms() {
        assert_eq!(parse("9/10/2006").unwrap(), ymd(Some(2006), Some(10), Some(9)));
        assert_eq!(parse("2006-10-09").unwrap(), ymd(Some(2006), Some(10), Some(9)));
        assert_eq!(parse("9 Oct 2006").unwrap(), ymd(Some(2006), Some(10), Some(9)));
        assert_eq!(parse("Oct 9th 2006").unwrap(), ymd(Some(2006), Some(10), Some(9)));
        assert_eq!(parse("Monday 9 October 2006").unwrap(), ymd(Some(2006), Some(10), Some(9)));
        assert_eq!(parse("11 September").unwrap(), ymd(None, Some(9), Some(11)));
        assert_eq!(parse("11/9").unwrap(), ymd(None, Some(9), Some(11)));
        assert_eq!(parse("October 2006").unwrap(), ymd(Some(2006), Some(10), None));
        assert_eq!(parse("1/1/70").unwrap(), ymd(Some(1970), Some(1), Some(1)));
        assert_eq!(parse("1/1/05").unwrap(), ymd(Some(2005), Some(1), Some(1)));
        assert_eq!(parse("29 Feb").unwrap(), ymd(None, Some(2), Some(29)));
    }

    #[test]
    fn rejects_bad_dates() {
        assert_eq!(
            parse("Tuesday 9 October 2006").unwrap_err().message(),
            "incorrect day of week Tuesday (should be Monday)"
        );
        assert_eq!(
            parse("31 Sep 2006").unwrap_err().message(),
            "day is out of range for month"
        );
        assert_eq!(
            parse("29 Feb 2006").unwrap_err().message(),
            "day is out of range for month"
        );
        let err = parse("9 Oct 2006 xyz").unwrap_err();
        assert_eq!(err.message(), "malformed date at \"xyz\"");
        assert_eq!(err.loc().and_then(|l| l.column), Some(16));
        assert_eq!(parse("").unwrap_err().message(), "malformed date");
    }

    #[test]
    fn complete_dates_only() {
        let text = Text::plain("Oct 2006");
        let date = PartialDate::parse(&text).unwrap();
        assert_eq!(date.as_date(&text).unwrap_err().message(), "missing day");
        let text = Text::plain("2006");
        let date = PartialDate::parse(&text).unwrap();
        assert_eq!(
            date.as_date(&text).unwrap_err().message(),
            "missing month and day"
        );
    }

    #[test]
    fn day_month_format() {
        assert_eq!(format_day_month(9, 10, None), "9-Oct");
        assert_eq!(format_day_month(29, 2, Some(1972)), "29-Feb-1972");
    }
}
