//! Grade and date formatting
//!
//! Everything here is a pure function of its inputs so the same output is
//! produced on the server, in stored issue rows and in the browser preview.

use std::fmt::Write;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::models::{DateFormat, GradeFormat};

/// Placeholder shown when no grade can be resolved
pub const NOT_APPLICABLE: &str = "N/A";

/// Default site date pattern used by [`DateFormat::LocaleDefault`]
pub const DEFAULT_LOCALE_PATTERN: &str = "%-d %B %Y";

/// Pattern used for dates in the issued-certificates report
pub const REPORT_DATE_PATTERN: &str = "%A, %-d %B %Y, %-I:%M %p";

/// Default letter boundaries, highest first, as lower percentage bounds
pub const DEFAULT_LETTERS: [(i64, &str); 11] = [
    (93, "A"),
    (90, "A-"),
    (87, "B+"),
    (83, "B"),
    (80, "B-"),
    (77, "C+"),
    (73, "C"),
    (70, "C-"),
    (67, "D+"),
    (60, "D"),
    (0, "F"),
];

/// A raw grade together with the bounds of its grade item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GradeValue {
    pub grade: Option<Decimal>,
    pub min: Decimal,
    pub max: Decimal,
}

impl GradeValue {
    pub fn new(grade: Option<Decimal>, min: Decimal, max: Decimal) -> Self {
        Self { grade, min, max }
    }

    /// Position of the grade between min and max, in percent
    pub fn percentage(&self) -> Option<Decimal> {
        let grade = self.grade?;
        let range = self.max - self.min;
        if range <= Decimal::ZERO {
            return None;
        }
        Some((grade - self.min) / range * Decimal::ONE_HUNDRED)
    }
}

fn two_decimals(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}

/// Format a real value with two decimals, `N/A` when absent
pub fn format_real(value: Option<Decimal>) -> String {
    value.map(two_decimals).unwrap_or_else(|| NOT_APPLICABLE.to_string())
}

/// Letter for a percentage using the given boundary table
pub fn letter_for(percentage: Decimal, letters: &[(i64, &'static str)]) -> &'static str {
    letters
        .iter()
        .find(|(boundary, _)| percentage >= Decimal::from(*boundary))
        .map(|(_, letter)| *letter)
        .unwrap_or(NOT_APPLICABLE)
}

/// Format a grade for display in the requested mode
pub fn format_grade(value: &GradeValue, format: GradeFormat) -> String {
    if value.grade.is_none() {
        return NOT_APPLICABLE.to_string();
    }
    match format {
        GradeFormat::Percentage => value
            .percentage()
            .map(two_decimals)
            .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
        GradeFormat::Points => format_real(value.grade),
        GradeFormat::Letter => value
            .percentage()
            .map(|p| letter_for(p, &DEFAULT_LETTERS).to_string())
            .unwrap_or_else(|| NOT_APPLICABLE.to_string()),
    }
}

/// English ordinal suffix for a day of month
pub fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

fn write_pattern(instant: &DateTime<Utc>, pattern: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", instant.format(pattern)).ok()?;
    Some(out)
}

/// Format a unix timestamp (UTC) in one of the five certificate date shapes
pub fn format_date(timestamp: i64, format: DateFormat, locale_pattern: &str) -> String {
    let Some(instant) = DateTime::<Utc>::from_timestamp(timestamp, 0) else {
        return String::new();
    };
    let formatted = match format {
        DateFormat::LongMonthDay => write_pattern(&instant, "%B %-d, %Y"),
        DateFormat::OrdinalMonthDay => {
            let day = instant.day();
            Some(format!(
                "{} {}{}, {}",
                instant.format("%B"),
                day,
                ordinal_suffix(day),
                instant.year()
            ))
        }
        DateFormat::DayMonthYear => write_pattern(&instant, "%-d %B %Y"),
        DateFormat::MonthYear => write_pattern(&instant, "%B %Y"),
        DateFormat::LocaleDefault => write_pattern(&instant, locale_pattern)
            .or_else(|| write_pattern(&instant, DEFAULT_LOCALE_PATTERN)),
    };
    formatted.unwrap_or_default()
}

/// Format a timestamp the way report rows show it
pub fn format_report_date(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .and_then(|instant| write_pattern(&instant, REPORT_DATE_PATTERN))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // 2024-03-05T00:00:00Z
    const MARCH_5_2024: i64 = 1_709_596_800;

    fn grade(g: i64, max: i64) -> GradeValue {
        GradeValue::new(Some(Decimal::from(g)), Decimal::ZERO, Decimal::from(max))
    }

    #[test]
    fn percentage_has_two_decimals() {
        assert_eq!(format_grade(&grade(85, 100), GradeFormat::Percentage), "85.00");
        assert_eq!(format_grade(&grade(2, 3), GradeFormat::Percentage), "66.67");
    }

    #[test]
    fn points_keep_the_raw_value() {
        let value = GradeValue::new(
            Some(Decimal::new(425, 1)),
            Decimal::ZERO,
            Decimal::from(50),
        );
        assert_eq!(format_grade(&value, GradeFormat::Points), "42.50");
        assert_eq!(format_grade(&value, GradeFormat::Percentage), "85.00");
        assert_eq!(format_grade(&value, GradeFormat::Letter), "B");
    }

    #[test]
    fn letters_follow_boundaries() {
        assert_eq!(format_grade(&grade(93, 100), GradeFormat::Letter), "A");
        assert_eq!(format_grade(&grade(92, 100), GradeFormat::Letter), "A-");
        assert_eq!(format_grade(&grade(60, 100), GradeFormat::Letter), "D");
        assert_eq!(format_grade(&grade(12, 100), GradeFormat::Letter), "F");
    }

    #[test]
    fn missing_grade_is_not_applicable() {
        let value = GradeValue::new(None, Decimal::ZERO, Decimal::from(100));
        for format in [GradeFormat::Percentage, GradeFormat::Points, GradeFormat::Letter] {
            assert_eq!(format_grade(&value, format), NOT_APPLICABLE);
        }
        let degenerate = GradeValue::new(Some(Decimal::ONE), Decimal::ONE, Decimal::ONE);
        assert_eq!(format_grade(&degenerate, GradeFormat::Percentage), NOT_APPLICABLE);
    }

    #[test]
    fn date_shapes() {
        let pattern = DEFAULT_LOCALE_PATTERN;
        assert_eq!(format_date(MARCH_5_2024, DateFormat::LongMonthDay, pattern), "March 5, 2024");
        assert_eq!(
            format_date(MARCH_5_2024, DateFormat::OrdinalMonthDay, pattern),
            "March 5th, 2024"
        );
        assert_eq!(format_date(MARCH_5_2024, DateFormat::DayMonthYear, pattern), "5 March 2024");
        assert_eq!(format_date(MARCH_5_2024, DateFormat::MonthYear, pattern), "March 2024");
        assert_eq!(format_date(MARCH_5_2024, DateFormat::LocaleDefault, pattern), "5 March 2024");
        assert_eq!(
            format_date(MARCH_5_2024, DateFormat::LocaleDefault, "%Y-%m-%d"),
            "2024-03-05"
        );
    }

    #[test]
    fn broken_locale_pattern_falls_back() {
        assert_eq!(
            format_date(MARCH_5_2024, DateFormat::LocaleDefault, "%Q"),
            "5 March 2024"
        );
    }

    #[test]
    fn ordinal_suffixes() {
        assert_eq!(ordinal_suffix(1), "st");
        assert_eq!(ordinal_suffix(2), "nd");
        assert_eq!(ordinal_suffix(3), "rd");
        assert_eq!(ordinal_suffix(11), "th");
        assert_eq!(ordinal_suffix(12), "th");
        assert_eq!(ordinal_suffix(13), "th");
        assert_eq!(ordinal_suffix(21), "st");
        assert_eq!(ordinal_suffix(22), "nd");
        assert_eq!(ordinal_suffix(31), "st");
    }

    #[test]
    fn report_date() {
        assert_eq!(format_report_date(MARCH_5_2024 + 37_800), "Tuesday, 5 March 2024, 10:30 AM");
    }

    proptest! {
        #[test]
        fn prop_percentage_never_leaks_into_letters(g in 0i64..=100) {
            let value = grade(g, 100);
            let letter = format_grade(&value, GradeFormat::Letter);
            prop_assert!(!letter.chars().any(|c| c.is_ascii_digit()));
            let pct = format_grade(&value, GradeFormat::Percentage);
            prop_assert_eq!(pct, format!("{}.00", g));
        }

        #[test]
        fn prop_date_formats_are_non_empty(ts in 0i64..4_102_444_800) {
            for raw in 1..=5 {
                let format = DateFormat::from_raw(raw).unwrap();
                prop_assert!(!format_date(ts, format, DEFAULT_LOCALE_PATTERN).is_empty());
            }
        }
    }
}
