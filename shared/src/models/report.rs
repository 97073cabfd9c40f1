//! Report models

use serde::{Deserialize, Serialize};

/// Column headers shared by every report output
pub const REPORT_COLUMNS: [&str; 7] = [
    "Last name",
    "First name",
    "ID number",
    "Group",
    "Date received",
    "Grade",
    "Code",
];

/// One formatted report row, in column order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportRow {
    pub last_name: String,
    pub first_name: String,
    pub id_number: String,
    pub groups: String,
    pub date: String,
    pub grade: String,
    pub code: String,
}

impl ReportRow {
    pub fn cells(&self) -> [&str; 7] {
        [
            &self.last_name,
            &self.first_name,
            &self.id_number,
            &self.groups,
            &self.date,
            &self.grade,
            &self.code,
        ]
    }
}

/// Report ordering
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportSort {
    #[default]
    StudentName,
    Date,
    LastName,
    Code,
}

/// Report output encodings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Html,
    Ods,
    Xls,
    Txt,
}

impl ReportFormat {
    /// Map the `download` parameter; unknown or absent values render HTML
    pub fn from_download(download: Option<&str>) -> Self {
        match download {
            Some("ods") => ReportFormat::Ods,
            Some("xls") => ReportFormat::Xls,
            Some("txt") => ReportFormat::Txt,
            _ => ReportFormat::Html,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Html => "html",
            ReportFormat::Ods => "ods",
            ReportFormat::Xls => "xlsx",
            ReportFormat::Txt => "txt",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ReportFormat::Html => "text/html; charset=utf-8",
            ReportFormat::Ods => "application/vnd.oasis.opendocument.spreadsheet",
            ReportFormat::Xls => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ReportFormat::Txt => "text/tab-separated-values; charset=utf-8",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_parameter_mapping() {
        assert_eq!(ReportFormat::from_download(Some("ods")), ReportFormat::Ods);
        assert_eq!(ReportFormat::from_download(Some("xls")), ReportFormat::Xls);
        assert_eq!(ReportFormat::from_download(Some("txt")), ReportFormat::Txt);
        assert_eq!(ReportFormat::from_download(Some("pdf")), ReportFormat::Html);
        assert_eq!(ReportFormat::from_download(None), ReportFormat::Html);
    }
}
