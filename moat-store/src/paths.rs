//! Default on-disk locations for moat-managed artifacts.

use std::path::PathBuf;

use crate::cert_manager::utc_stamp;
use crate::error::StoreError;

/// Get XDG config directory for moat
/// Returns ~/.config/moat or $XDG_CONFIG_HOME/moat
pub fn config_dir() -> Result<PathBuf, StoreError> {
    dirs::config_dir()
        .map(|p| p.join("moat"))
        .ok_or(StoreError::NoConfigDir)
}

/// Default configuration file path: ~/.config/moat/stack.env
pub fn stack_env_path() -> Result<PathBuf, StoreError> {
    Ok(config_dir()?.join("stack.env"))
}

/// Default certificate bundle directory: ~/.config/moat/certs
pub fn cert_dir() -> Result<PathBuf, StoreError> {
    Ok(config_dir()?.join("certs"))
}

/// External backup target used when a certificate bundle is removed,
/// e.g. ~/.config/moat/removed-certs-20260829-101500
pub fn removed_cert_backup_dir() -> Result<PathBuf, StoreError> {
    Ok(config_dir()?.join(format!("removed-certs-{}", utc_stamp())))
}
