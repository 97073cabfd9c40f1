//! Host course, module, user and group models

use serde::{Deserialize, Serialize};

/// A course hosting certificate activities
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Course {
    pub id: i64,
    pub short_name: String,
    pub full_name: String,
}

/// The course module placing one certificate inside a course
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CourseModule {
    pub id: i64,
    pub course_id: i64,
    /// Certificate definition id
    pub instance_id: i64,
    pub group_mode: GroupMode,
    pub group_members_only: bool,
    pub grouping_id: Option<i64>,
}

/// Group visibility policy of an activity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GroupMode {
    None,
    Separate,
    Visible,
}

impl GroupMode {
    pub fn from_raw(value: i16) -> Self {
        match value {
            1 => GroupMode::Separate,
            2 => GroupMode::Visible,
            _ => GroupMode::None,
        }
    }

    pub fn to_raw(self) -> i16 {
        match self {
            GroupMode::None => 0,
            GroupMode::Separate => 1,
            GroupMode::Visible => 2,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, GroupMode::None)
    }
}

/// A user account of the host site
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// External identifier, may be empty
    pub id_number: String,
    /// Prefers HTML mail
    pub mail_html: bool,
}

impl UserRecord {
    /// Display name, "First Last"
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// A course group
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    pub id: i64,
    pub course_id: i64,
    pub name: String,
}

/// Capability names checked by the certificate workflow
pub mod capability {
    pub const VIEW: &str = "mod/certificate:view";
    pub const MANAGE: &str = "mod/certificate:manage";
    pub const PRINT_TEACHER: &str = "mod/certificate:printteacher";
    pub const COURSE_UPDATE: &str = "moodle/course:update";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_joins_first_and_last() {
        let user = UserRecord {
            id: 1,
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            id_number: String::new(),
            mail_html: true,
        };
        assert_eq!(user.full_name(), "Ada Lovelace");
    }

    #[test]
    fn group_mode_activity() {
        assert!(!GroupMode::from_raw(0).is_active());
        assert!(GroupMode::from_raw(1).is_active());
        assert_eq!(GroupMode::from_raw(2), GroupMode::Visible);
    }
}
