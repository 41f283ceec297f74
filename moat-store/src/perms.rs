//! Permission enforcement and atomic file replacement.
//!
//! Every write of sensitive material goes through [`write_atomic`], so a
//! crash can never leave a partially written file or one with loose
//! permissions. Drifted modes are repaired wherever they are observed.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::StoreError;

/// Owner-only directory mode (drwx------)
pub const DIR_MODE: u32 = 0o700;
/// Secret file mode (-rw-------): configuration file, private keys
pub const SECRET_MODE: u32 = 0o600;
/// Public file mode (-rw-r--r--): certificates, CA chains
pub const PUBLIC_MODE: u32 = 0o644;

/// Check that `path` carries exactly `expected_mode`, repairing it if not.
///
/// Repair is logged as a warning; a failed repair is fatal. Calling this on
/// an already-correct path is a silent no-op.
pub fn enforce(path: &Path, expected_mode: u32) -> Result<(), StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.display().to_string()));
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let actual = fs::metadata(path)?.permissions().mode() & 0o777;
        if actual != expected_mode {
            tracing::warn!(
                path = %path.display(),
                "mode {:o} differs from expected {:o}, repairing",
                actual,
                expected_mode
            );
            fs::set_permissions(path, fs::Permissions::from_mode(expected_mode)).map_err(
                |source| StoreError::PermissionRepair {
                    path: path.to_path_buf(),
                    source,
                },
            )?;
        }
    }
    #[cfg(not(unix))]
    let _ = expected_mode;
    Ok(())
}

/// Ensure `path` is a directory with `mode`, creating it if necessary.
pub fn ensure_dir(path: &Path, mode: u32) -> Result<(), StoreError> {
    if !path.exists() {
        fs::create_dir_all(path)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
        }
        return Ok(());
    }
    enforce(path, mode)
}

/// Replace the contents of `path` with `content` in one atomic step.
///
/// The content is staged in a temporary file in the same directory (same
/// filesystem, so the final rename is atomic) with `mode` already applied,
/// then renamed over `path`. At every observable instant `path` holds either
/// the previous complete content or the new complete content. On any failure
/// before the rename the temporary file is discarded and `path` is untouched.
pub fn write_atomic(path: &Path, content: &str, mode: u32) -> Result<(), StoreError> {
    let write_err = |source: std::io::Error| StoreError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(content.as_bytes()).map_err(write_err)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(mode))
            .map_err(write_err)?;
    }
    tmp.as_file().sync_all().map_err(write_err)?;
    // Dropping the PersistError removes the temporary file.
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    // The rename carries the temp file's mode, but re-check in case the
    // platform altered it.
    enforce(path, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[cfg(unix)]
    fn mode_of(path: &Path) -> u32 {
        use std::os::unix::fs::PermissionsExt;
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[test]
    fn write_atomic_creates_file_with_mode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("secrets.env");

        write_atomic(&path, "A=1\n", SECRET_MODE).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "A=1\n");
        #[cfg(unix)]
        assert_eq!(mode_of(&path), SECRET_MODE);
    }

    #[test]
    fn write_atomic_replaces_content_completely() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("secrets.env");

        write_atomic(&path, "A=1\nB=2\n", SECRET_MODE).unwrap();
        write_atomic(&path, "C=3\n", SECRET_MODE).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "C=3\n");
    }

    #[test]
    fn write_atomic_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("secrets.env");

        write_atomic(&path, "A=1\n", SECRET_MODE).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("secrets.env")]);
    }

    #[test]
    fn failed_rename_leaves_target_untouched() {
        let dir = tempdir().unwrap();
        // The target is a non-empty directory, so the final rename must fail
        // regardless of process privileges.
        let target = dir.path().join("bundle");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("inner.txt"), "keep me").unwrap();

        let err = write_atomic(&target, "new content", SECRET_MODE).unwrap_err();
        assert!(matches!(err, StoreError::WriteFailed { .. }));

        // Prior state intact, temp file cleaned up.
        assert_eq!(
            fs::read_to_string(target.join("inner.txt")).unwrap(),
            "keep me"
        );
        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("bundle")]);
    }

    #[test]
    fn enforce_missing_path_is_not_found() {
        let dir = tempdir().unwrap();
        let err = enforce(&dir.path().join("absent"), SECRET_MODE).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn enforce_repairs_drifted_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("secrets.env");
        fs::write(&path, "A=1\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        enforce(&path, SECRET_MODE).unwrap();
        assert_eq!(mode_of(&path), SECRET_MODE);

        // Second call on a correct path is a no-op.
        enforce(&path, SECRET_MODE).unwrap();
        assert_eq!(mode_of(&path), SECRET_MODE);
    }

    #[cfg(unix)]
    #[test]
    fn ensure_dir_creates_with_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let sub = dir.path().join("certs");

        ensure_dir(&sub, DIR_MODE).unwrap();
        assert!(sub.is_dir());
        assert_eq!(mode_of(&sub), DIR_MODE);

        // Existing dir with drifted mode gets repaired.
        fs::set_permissions(&sub, fs::Permissions::from_mode(0o755)).unwrap();
        ensure_dir(&sub, DIR_MODE).unwrap();
        assert_eq!(mode_of(&sub), DIR_MODE);
    }
}
