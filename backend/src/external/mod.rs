//! Collaborator backends for mail, PDF output and file storage

pub mod mail;
pub mod pdf;
pub mod storage;

pub use mail::{LogMailer, Mailer, MemoryMailer, SmtpMailer};
pub use storage::{DiskFileStore, FileStore, MemoryFileStore};
