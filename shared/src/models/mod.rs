//! Domain models for the certificate issuance workflow

mod certificate;
mod course;
mod issue;
mod report;

pub use certificate::*;
pub use course::*;
pub use issue::*;
pub use report::*;
