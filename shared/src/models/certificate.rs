//! Certificate definition models

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A stored definition column holds a value outside its enumeration
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid value for {field}: {value}")]
pub struct InvalidColumn {
    pub field: &'static str,
    pub value: String,
}

impl InvalidColumn {
    pub fn new(field: &'static str, value: impl ToString) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

/// Display configuration for one certificate activity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CertificateDefinition {
    pub id: i64,
    pub course_id: i64,
    pub name: String,
    pub intro: String,
    pub email_teachers: bool,
    /// Comma-separated external recipients
    pub email_others: String,
    pub save_cert: bool,
    pub delivery: Delivery,
    pub template: PageTemplate,
    pub orientation: Orientation,
    pub border_style: String,
    pub border_color: BorderColor,
    pub watermark: String,
    pub seal: String,
    pub signature: String,
    pub print_date: DateSource,
    pub date_format: DateFormat,
    pub print_number: bool,
    pub print_grade: GradeSource,
    pub grade_format: GradeFormat,
    /// Outcome grade item id, `None` when no outcome is printed
    pub print_outcome: Option<i64>,
    /// Credit hours text, empty when not printed
    pub print_hours: String,
    pub print_teacher: bool,
    pub custom_text: String,
    pub reissue: bool,
    pub time_created: i64,
    pub time_modified: i64,
}

/// Which grade is printed on the certificate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind", content = "activity")]
pub enum GradeSource {
    None,
    Course,
    /// Course module id of a graded activity
    Activity(i64),
}

impl GradeSource {
    /// Decode the stored `print_grade` column: 0 none, 1 course, >1 module id
    pub fn from_raw(value: i64) -> Self {
        match value {
            v if v <= 0 => GradeSource::None,
            1 => GradeSource::Course,
            v => GradeSource::Activity(v),
        }
    }

    pub fn to_raw(self) -> i64 {
        match self {
            GradeSource::None => 0,
            GradeSource::Course => 1,
            GradeSource::Activity(id) => id,
        }
    }
}

/// Which instant is stamped on the certificate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind", content = "activity")]
pub enum DateSource {
    IssueDate,
    /// Course module id whose date graded is used
    ActivityGraded(i64),
}

impl DateSource {
    /// Decode the stored `print_date` column: 0 and 1 are the issue date
    pub fn from_raw(value: i64) -> Self {
        if value > 1 {
            DateSource::ActivityGraded(value)
        } else {
            DateSource::IssueDate
        }
    }

    pub fn to_raw(self) -> i64 {
        match self {
            DateSource::IssueDate => 1,
            DateSource::ActivityGraded(id) => id,
        }
    }
}

/// Grade display mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GradeFormat {
    Percentage,
    Points,
    Letter,
}

impl GradeFormat {
    pub fn from_raw(value: i16) -> Option<Self> {
        match value {
            1 => Some(GradeFormat::Percentage),
            2 => Some(GradeFormat::Points),
            3 => Some(GradeFormat::Letter),
            _ => None,
        }
    }

    pub fn to_raw(self) -> i16 {
        match self {
            GradeFormat::Percentage => 1,
            GradeFormat::Points => 2,
            GradeFormat::Letter => 3,
        }
    }
}

/// Human-readable date shape
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// March 5, 2024
    LongMonthDay,
    /// March 5th, 2024
    OrdinalMonthDay,
    /// 5 March 2024
    DayMonthYear,
    /// March 2024
    MonthYear,
    /// Site locale pattern
    LocaleDefault,
}

impl DateFormat {
    pub fn from_raw(value: i16) -> Option<Self> {
        match value {
            1 => Some(DateFormat::LongMonthDay),
            2 => Some(DateFormat::OrdinalMonthDay),
            3 => Some(DateFormat::DayMonthYear),
            4 => Some(DateFormat::MonthYear),
            5 => Some(DateFormat::LocaleDefault),
            _ => None,
        }
    }

    pub fn to_raw(self) -> i16 {
        match self {
            DateFormat::LongMonthDay => 1,
            DateFormat::OrdinalMonthDay => 2,
            DateFormat::DayMonthYear => 3,
            DateFormat::MonthYear => 4,
            DateFormat::LocaleDefault => 5,
        }
    }
}

/// Page orientation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Orientation {
    #[serde(rename = "L")]
    Landscape,
    #[serde(rename = "P")]
    Portrait,
}

impl Orientation {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "L" => Some(Orientation::Landscape),
            "P" => Some(Orientation::Portrait),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Orientation::Landscape => "L",
            Orientation::Portrait => "P",
        }
    }
}

/// Page size template
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PageTemplate {
    A4,
    Letter,
}

impl PageTemplate {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "A4_non_embedded" | "a4" => Some(PageTemplate::A4),
            "letter_non_embedded" | "letter" => Some(PageTemplate::Letter),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PageTemplate::A4 => "A4_non_embedded",
            PageTemplate::Letter => "letter_non_embedded",
        }
    }
}

/// Vector frame colour
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BorderColor {
    None,
    Black,
    Brown,
    Blue,
    Green,
}

impl BorderColor {
    pub fn from_raw(value: i16) -> Option<Self> {
        match value {
            0 => Some(BorderColor::None),
            1 => Some(BorderColor::Black),
            2 => Some(BorderColor::Brown),
            3 => Some(BorderColor::Blue),
            4 => Some(BorderColor::Green),
            _ => None,
        }
    }

    pub fn to_raw(self) -> i16 {
        match self {
            BorderColor::None => 0,
            BorderColor::Black => 1,
            BorderColor::Brown => 2,
            BorderColor::Blue => 3,
            BorderColor::Green => 4,
        }
    }

    /// RGB components, `None` when no frame is drawn
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        match self {
            BorderColor::None => None,
            BorderColor::Black => Some((0, 0, 0)),
            BorderColor::Brown => Some((153, 102, 51)),
            BorderColor::Blue => Some((0, 51, 204)),
            BorderColor::Green => Some((0, 180, 0)),
        }
    }
}

/// How the rendered document reaches the student
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    Inline,
    Download,
    Email,
}

impl Delivery {
    pub fn from_raw(value: i16) -> Option<Self> {
        match value {
            0 => Some(Delivery::Inline),
            1 => Some(Delivery::Download),
            2 => Some(Delivery::Email),
            _ => None,
        }
    }

    pub fn to_raw(self) -> i16 {
        match self {
            Delivery::Inline => 0,
            Delivery::Download => 1,
            Delivery::Email => 2,
        }
    }
}

/// Returns true when an image selector means "omit"
pub fn is_empty_selector(selector: &str) -> bool {
    let s = selector.trim();
    s.is_empty() || s == "0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_source_decodes_raw_column() {
        assert_eq!(GradeSource::from_raw(0), GradeSource::None);
        assert_eq!(GradeSource::from_raw(1), GradeSource::Course);
        assert_eq!(GradeSource::from_raw(42), GradeSource::Activity(42));
        assert_eq!(GradeSource::Activity(42).to_raw(), 42);
    }

    #[test]
    fn date_source_zero_and_one_are_issue_date() {
        assert_eq!(DateSource::from_raw(0), DateSource::IssueDate);
        assert_eq!(DateSource::from_raw(1), DateSource::IssueDate);
        assert_eq!(DateSource::from_raw(7), DateSource::ActivityGraded(7));
    }

    #[test]
    fn out_of_range_formats_are_rejected() {
        assert!(GradeFormat::from_raw(0).is_none());
        assert!(DateFormat::from_raw(6).is_none());
        assert!(BorderColor::from_raw(5).is_none());
        assert_eq!(DateFormat::from_raw(2), Some(DateFormat::OrdinalMonthDay));
    }

    #[test]
    fn selectors() {
        assert!(is_empty_selector(""));
        assert!(is_empty_selector("0"));
        assert!(!is_empty_selector("Fancy.png"));
    }
}
