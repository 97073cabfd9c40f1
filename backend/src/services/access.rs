//! Per-request authorization
//!
//! A [`RequestContext`] is built once per request from the course module id
//! and the authenticated user; every later step reads its permissions from
//! there instead of asking the directory again.

use std::sync::Arc;

use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::models::{capability, CertificateDefinition, Course, CourseModule, UserRecord};
use crate::repository::{CertificateRepository, Directory};
use crate::AppState;

/// Capabilities of the current user on the current course module
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Permissions {
    pub view: bool,
    pub manage: bool,
    pub print_teacher: bool,
}

impl Permissions {
    pub fn from_capabilities<S: AsRef<str>>(capabilities: &[S]) -> Self {
        let has = |wanted: &str| capabilities.iter().any(|c| c.as_ref() == wanted);
        let manage = has(capability::MANAGE);
        Self {
            view: manage || has(capability::VIEW),
            manage,
            print_teacher: has(capability::PRINT_TEACHER),
        }
    }

    pub fn require_view(&self) -> AppResult<()> {
        if self.view {
            Ok(())
        } else {
            Err(AppError::InsufficientPermissions)
        }
    }

    pub fn require_manage(&self) -> AppResult<()> {
        if self.manage {
            Ok(())
        } else {
            Err(AppError::InsufficientPermissions)
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: UserRecord,
    pub course: Course,
    pub module: CourseModule,
    pub permissions: Permissions,
}

#[derive(Clone)]
pub struct AccessService {
    certificates: Arc<dyn CertificateRepository>,
    directory: Arc<dyn Directory>,
}

impl AccessService {
    pub fn new(state: &AppState) -> Self {
        Self {
            certificates: state.certificates.clone(),
            directory: state.directory.clone(),
        }
    }

    /// Load the module, course and definition behind a course module id
    pub async fn load_module(
        &self,
        cm_id: i64,
    ) -> AppResult<(CourseModule, Course, CertificateDefinition)> {
        let module = self
            .certificates
            .find_course_module(cm_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Course module".to_string()))?;

        let course = self
            .certificates
            .find_course(module.course_id)
            .await?
            .ok_or_else(|| AppError::Misconfigured("Course is misconfigured".to_string()))?;

        let definition = self
            .certificates
            .find_certificate(module.instance_id)
            .await?
            .ok_or_else(|| AppError::Misconfigured("Course module is incorrect".to_string()))?;

        Ok((module, course, definition))
    }

    /// Build the request context of a user on a course module
    pub async fn authorize(
        &self,
        user_id: i64,
        cm_id: i64,
    ) -> AppResult<(RequestContext, CertificateDefinition)> {
        let (module, course, definition) = self.load_module(cm_id).await?;

        let user = self
            .directory
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Unknown user".to_string()))?;

        let capabilities = self.directory.user_capabilities(module.id, user.id).await?;
        let permissions = Permissions::from_capabilities(&capabilities);

        tracing::debug!(user_id, cm_id, ?permissions, "Request authorized");

        Ok((
            RequestContext {
                user,
                course,
                module,
                permissions,
            },
            definition,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manage_implies_view() {
        let perms = Permissions::from_capabilities(&[capability::MANAGE]);
        assert!(perms.view);
        assert!(perms.manage);
        assert!(!perms.print_teacher);
    }

    #[test]
    fn no_capabilities_forbids_everything() {
        let perms = Permissions::from_capabilities::<&str>(&[]);
        assert!(perms.require_view().is_err());
        assert!(perms.require_manage().is_err());
    }
}
