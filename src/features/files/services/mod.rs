pub mod expiry_policy;
pub mod file_service;

pub use file_service::{FileError, FileFilter, FilePayload, FileService};
