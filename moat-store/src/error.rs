use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Key '{0}' not found")]
    KeyNotFound(String),

    #[error("Template not found at {0}")]
    TemplateNotFound(String),

    #[error("Invalid template: {0}")]
    Template(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to repair permissions on {path}: {source}")]
    PermissionRepair {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Validation failed, missing required keys: {}", missing.join(", "))]
    ValidationFailed { missing: Vec<String> },

    #[error("Certificate public key does not match the supplied private key")]
    ImportMismatch,

    #[error("Certificate no longer matches the stored private key")]
    KeyMismatch,

    #[error("Certificate expired {days_ago} day(s) ago")]
    Expired { days_ago: i64 },

    #[error("Certificate generation error: {0}")]
    CertGen(#[from] rcgen::Error),

    #[error("Certificate error: {0}")]
    Certificate(String),

    #[error("Key generation error: {0}")]
    KeyGen(String),

    #[error("Failed to determine config directory")]
    NoConfigDir,
}
