//! Business logic services for the certificate issuance pipeline

pub mod access;
pub mod assets;
pub mod certificate;
pub mod eligibility;
pub mod export;
pub mod grading;
pub mod issuance;
pub mod layout;
pub mod notification;
pub mod rendering;
pub mod reporting;
pub mod workflow;

pub use access::{AccessService, Permissions, RequestContext};
pub use assets::{AssetCatalogue, AssetKind};
pub use certificate::CertificateService;
pub use eligibility::{EligibilityGuard, Prepared};
pub use grading::GradeResolver;
pub use issuance::IssueRecorder;
pub use notification::Notifier;
pub use reporting::ReportService;
pub use workflow::{CertificateWorkflow, ViewOutcome};
