//! Fixed configuration schema for the moat stack.

/// Keys that must be present and non-empty for the stack to start.
pub const REQUIRED_KEYS: &[&str] = &[
    "SECRET_KEY",
    "POSTGRES_USER",
    "POSTGRES_PASSWORD",
    "DATABASE_URL",
];

/// Keys worth a warning when absent, but not fatal.
pub const RECOMMENDED_KEYS: &[&str] = &["BASE_URL", "SMTP_HOST"];

/// A key added by a schema revision after the file was first generated.
pub struct Migration {
    pub key: &'static str,
    pub default: &'static str,
    /// Existing key to insert after; appended when absent.
    pub anchor: Option<&'static str>,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        key: "BASE_URL",
        default: "http://localhost:8080",
        anchor: Some("SECRET_KEY"),
    },
    Migration {
        key: "REDIS_URL",
        default: "redis://127.0.0.1:6379/0",
        anchor: Some("DATABASE_URL"),
    },
    Migration {
        key: "SESSION_LIFETIME_HOURS",
        default: "24",
        anchor: None,
    },
];
