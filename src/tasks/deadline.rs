//! Deadline resolver.
//!
//! Turns a deadline fragment such as `20h59 17/1/2026`, `13h30 17/1` or
//! `13H 17/1` into a local timestamp. Forms are tried in priority order and
//! each one only has to match a prefix of the trimmed text.
//!
//! When the year is given it is used as-is. When it is omitted the current
//! year is assumed, rolling over to next year if the month is already behind
//! `now` or the month is the current one and the moment has passed.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

/// Accepted deadline layouts, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineForm {
    /// `20h59 17/1/2026`
    HourMinuteDayMonthYear,
    /// `13h30 17/1`
    HourMinuteDayMonth,
    /// `13H 17/1`
    HourDayMonth,
}

impl DeadlineForm {
    pub const ALL: [DeadlineForm; 3] = [
        DeadlineForm::HourMinuteDayMonthYear,
        DeadlineForm::HourMinuteDayMonth,
        DeadlineForm::HourDayMonth,
    ];

    fn pattern(self) -> &'static str {
        match self {
            Self::HourMinuteDayMonthYear => r"^([0-9]+)[hH]([0-9]+)\s+([0-9]+)/([0-9]+)/([0-9]+)",
            Self::HourMinuteDayMonth => r"^([0-9]+)[hH]([0-9]+)\s+([0-9]+)/([0-9]+)",
            Self::HourDayMonth => r"^([0-9]+)[hH]\s+([0-9]+)/([0-9]+)",
        }
    }

    fn literal(self, caps: &regex::Captures<'_>) -> LiteralDeadline {
        let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        match self {
            Self::HourMinuteDayMonthYear => LiteralDeadline {
                hour: num(1),
                minute: num(2),
                day: num(3),
                month: num(4),
                year: Some(num(5)),
            },
            Self::HourMinuteDayMonth => LiteralDeadline {
                hour: num(1),
                minute: num(2),
                day: num(3),
                month: num(4),
                year: None,
            },
            Self::HourDayMonth => LiteralDeadline {
                hour: num(1),
                minute: Some(0),
                day: num(2),
                month: num(3),
                year: None,
            },
        }
    }
}

static PATTERNS: LazyLock<Vec<(DeadlineForm, Regex)>> = LazyLock::new(|| {
    DeadlineForm::ALL
        .iter()
        .filter_map(|form| Regex::new(form.pattern()).ok().map(|re| (*form, re)))
        .collect()
});

/// Numbers as written. `None` means the digits overflowed `u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LiteralDeadline {
    hour: Option<u32>,
    minute: Option<u32>,
    day: Option<u32>,
    month: Option<u32>,
    /// Outer `None`: no year written.
    year: Option<Option<u32>>,
}

/// Why a deadline fragment could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeadlineError {
    #[error("`{0}` matches none of `20h59 17/1/2026`, `13h30 17/1`, `13H 17/1`")]
    Unrecognized(String),
    #[error("`{0}` is not a valid date and time")]
    InvalidDateTime(String),
}

/// Which form matched, if any.
#[must_use]
pub fn match_form(text: &str) -> Option<DeadlineForm> {
    let text = text.trim();
    PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(form, _)| *form)
}

/// Resolve a deadline fragment relative to `now`.
pub fn resolve_deadline(text: &str, now: NaiveDateTime) -> Result<NaiveDateTime, DeadlineError> {
    let trimmed = text.trim();
    let literal = PATTERNS
        .iter()
        .find_map(|(form, re)| re.captures(trimmed).map(|caps| form.literal(&caps)))
        .ok_or_else(|| DeadlineError::Unrecognized(trimmed.to_owned()))?;

    let invalid = || DeadlineError::InvalidDateTime(trimmed.to_owned());

    match literal.year {
        Some(year) => {
            let year = year.and_then(|y| i32::try_from(y).ok()).ok_or_else(invalid)?;
            build(year, &literal).ok_or_else(invalid)
        }
        None => {
            let candidate = build(now.year(), &literal).ok_or_else(invalid)?;
            let month = candidate.month();
            if month < now.month() || (month == now.month() && candidate < now) {
                build(now.year() + 1, &literal).ok_or_else(invalid)
            } else {
                Ok(candidate)
            }
        }
    }
}

fn build(year: i32, literal: &LiteralDeadline) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, literal.month?, literal.day?)?.and_hms_opt(
        literal.hour?,
        literal.minute?,
        0,
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    #[test]
    fn all_patterns_compile() {
        assert_eq!(PATTERNS.len(), DeadlineForm::ALL.len());
    }

    #[test]
    fn explicit_year_is_literal() {
        for now in [at(2026, 2, 1, 0, 0), at(2030, 12, 31, 23, 59), at(2020, 1, 1, 0, 0)] {
            assert_eq!(
                resolve_deadline("20h59 17/1/2026", now).unwrap(),
                at(2026, 1, 17, 20, 59)
            );
        }
    }

    #[test]
    fn explicit_year_in_the_past_is_kept() {
        let now = at(2026, 6, 1, 0, 0);
        assert_eq!(
            resolve_deadline("8h05 3/2/2024", now).unwrap(),
            at(2024, 2, 3, 8, 5)
        );
    }

    #[test]
    fn earlier_month_rolls_to_next_year() {
        assert_eq!(
            resolve_deadline("13H 17/1", at(2026, 2, 1, 0, 0)).unwrap(),
            at(2027, 1, 17, 13, 0)
        );
        assert_eq!(
            resolve_deadline("13H 17/1", at(2025, 12, 1, 0, 0)).unwrap(),
            at(2026, 1, 17, 13, 0)
        );
    }

    #[test]
    fn same_month_rolls_only_when_past() {
        let now = at(2026, 1, 17, 12, 0);
        assert_eq!(
            resolve_deadline("13h30 17/1", now).unwrap(),
            at(2026, 1, 17, 13, 30)
        );
        assert_eq!(
            resolve_deadline("11h30 17/1", now).unwrap(),
            at(2027, 1, 17, 11, 30)
        );
    }

    #[test]
    fn later_month_stays_in_current_year() {
        assert_eq!(
            resolve_deadline("9h 3/11", at(2026, 10, 17, 9, 0)).unwrap(),
            at(2026, 11, 3, 9, 0)
        );
    }

    #[test]
    fn lowercase_and_uppercase_h() {
        let now = at(2026, 1, 1, 0, 0);
        assert_eq!(
            resolve_deadline("13h 17/1", now).unwrap(),
            resolve_deadline("13H 17/1", now).unwrap()
        );
    }

    #[test]
    fn only_prefix_has_to_match() {
        let now = at(2026, 1, 1, 0, 0);
        assert_eq!(
            resolve_deadline("  20h59 17/1/2026 (urgent)", now).unwrap(),
            at(2026, 1, 17, 20, 59)
        );
        assert_eq!(match_form("13h30 17/1"), Some(DeadlineForm::HourMinuteDayMonth));
        assert_eq!(match_form("20h59 17/1/2026"), Some(DeadlineForm::HourMinuteDayMonthYear));
        assert_eq!(match_form("13H 17/1"), Some(DeadlineForm::HourDayMonth));
    }

    #[test]
    fn unrecognized_fragments() {
        let now = at(2026, 1, 1, 0, 0);
        for text in ["tomorrow", "17/1 13h", "13:30 17/1", "13H", ""] {
            assert!(matches!(
                resolve_deadline(text, now),
                Err(DeadlineError::Unrecognized(_))
            ));
        }
    }

    #[test]
    fn out_of_range_values_fail_as_invalid_datetime() {
        let now = at(2026, 1, 1, 0, 0);
        for text in [
            "25h00 17/1/2026",
            "10h61 17/1/2026",
            "10h 31/4",
            "10h 1/13",
            "10h00 29/2/2026",
            "99999999999h 1/1",
        ] {
            assert!(
                matches!(resolve_deadline(text, now), Err(DeadlineError::InvalidDateTime(_))),
                "{text}"
            );
        }
    }
}
