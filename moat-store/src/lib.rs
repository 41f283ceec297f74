//! Secure storage core for the moat operations tooling.
//!
//! Two independent managers built on the same permission and atomic-write
//! primitives: [`ConfigStore`] for the line-oriented secrets file and
//! [`CertManager`] for the TLS certificate bundle. Sensitive files are never
//! partially written, never left with loose permissions, and always backed
//! up before a destructive replacement.

mod cert_manager;
mod config_store;
mod env_file;
mod error;
mod paths;
mod perms;
mod schema;
mod secrets;
mod template;

pub use cert_manager::{CertInfo, CertManager, VerifyReport, CA_FILE, CERT_FILE, KEY_FILE};
pub use config_store::{ConfigStore, MigrateOutcome};
pub use env_file::{Entry, EnvFile};
pub use error::StoreError;
pub use paths::{cert_dir, config_dir, removed_cert_backup_dir, stack_env_path};
pub use perms::{enforce, ensure_dir, write_atomic, DIR_MODE, PUBLIC_MODE, SECRET_MODE};
pub use schema::{Migration, MIGRATIONS, RECOMMENDED_KEYS, REQUIRED_KEYS};
pub use secrets::{generate_secret, Charset};
