//! TLS certificate bundle management.
//!
//! A bundle directory holds `cert.pem`, `key.pem` and optionally `ca.pem` at
//! fixed names. The directory is owner-only, the key owner-only, the
//! certificate and CA chain world-readable. Renewal snapshots the live
//! bundle into a timestamped backup subdirectory before any new material is
//! generated, and removal attempts an external backup copy before deleting.

use std::fs;
use std::path::{Path, PathBuf};

use rcgen::{CertificateParams, DnType, KeyPair};
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};
use x509_parser::certificate::X509Certificate;
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::FromDer;

use crate::error::StoreError;
use crate::perms::{self, DIR_MODE, PUBLIC_MODE, SECRET_MODE};

pub const CERT_FILE: &str = "cert.pem";
pub const KEY_FILE: &str = "key.pem";
pub const CA_FILE: &str = "ca.pem";

const RSA_BITS: usize = 2048;
/// Remaining validity below which `verify` warns.
const EXPIRY_WARN_DAYS: i64 = 30;

/// Handle on one certificate bundle directory.
pub struct CertManager {
    dir: PathBuf,
}

/// Read-only description of the live certificate.
#[derive(Debug, Clone)]
pub struct CertInfo {
    pub subject: String,
    pub issuer: String,
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
    /// SHA-256 over the certificate DER, hex encoded.
    pub fingerprint: String,
}

/// Successful [`CertManager::verify`] outcome.
#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub days_remaining: i64,
    /// True when fewer than 30 days remain (advisory, also logged).
    pub expiring_soon: bool,
}

struct ParsedCert {
    info: CertInfo,
    /// Raw subject public key bits, for key correspondence checks.
    public_key: Vec<u8>,
}

impl CertManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn cert_path(&self) -> PathBuf {
        self.dir.join(CERT_FILE)
    }

    pub fn key_path(&self) -> PathBuf {
        self.dir.join(KEY_FILE)
    }

    pub fn ca_path(&self) -> PathBuf {
        self.dir.join(CA_FILE)
    }

    /// True when both certificate and key are present.
    pub fn exists(&self) -> bool {
        self.cert_path().exists() && self.key_path().exists()
    }

    /// Generate a fresh RSA-2048 key and self-signed certificate for
    /// `domain`, valid for `validity_days` from now.
    ///
    /// The key and certificate are each written atomically, but not as a
    /// pair; renewal's backup-before-mutate covers recovery if the second
    /// write fails.
    pub fn generate_self_signed(
        &self,
        domain: &str,
        validity_days: u32,
    ) -> Result<CertInfo, StoreError> {
        perms::ensure_dir(&self.dir, DIR_MODE)?;

        let mut rng = rand::thread_rng();
        let rsa_key = RsaPrivateKey::new(&mut rng, RSA_BITS)
            .map_err(|e| StoreError::KeyGen(e.to_string()))?;
        let key_pem = rsa_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| StoreError::KeyGen(e.to_string()))?;
        let key_pair = KeyPair::from_pem_and_sign_algo(&key_pem, &rcgen::PKCS_RSA_SHA256)?;

        let mut params = CertificateParams::new(vec![domain.to_string()])?;
        params.distinguished_name.push(DnType::CommonName, domain);
        let now = OffsetDateTime::now_utc();
        params.not_before = now;
        params.not_after = now + Duration::days(i64::from(validity_days));
        let cert = params.self_signed(&key_pair)?;
        let cert_pem = cert.pem();

        // Key first: a key without a certificate is recoverable by
        // regenerating, a certificate paired with a missing key is not.
        perms::write_atomic(&self.key_path(), &key_pem, SECRET_MODE)?;
        perms::write_atomic(&self.cert_path(), &cert_pem, PUBLIC_MODE)?;
        perms::enforce(&self.key_path(), SECRET_MODE)?;
        perms::enforce(&self.cert_path(), PUBLIC_MODE)?;

        parse_certificate(&cert_pem).map(|p| p.info)
    }

    /// Import externally supplied certificate material into the bundle.
    ///
    /// The certificate's public key must match the private key; on mismatch
    /// nothing is copied.
    pub fn import(
        &self,
        cert_src: &Path,
        key_src: &Path,
        ca_src: Option<&Path>,
    ) -> Result<CertInfo, StoreError> {
        for path in [Some(cert_src), Some(key_src), ca_src].into_iter().flatten() {
            if !path.exists() {
                return Err(StoreError::NotFound(path.display().to_string()));
            }
        }
        let cert_pem = fs::read_to_string(cert_src)?;
        let key_pem = fs::read_to_string(key_src)?;
        let parsed = parse_certificate(&cert_pem)?;
        if parsed.public_key != key_public_bits(&key_pem)? {
            return Err(StoreError::ImportMismatch);
        }

        perms::ensure_dir(&self.dir, DIR_MODE)?;
        perms::write_atomic(&self.key_path(), &key_pem, SECRET_MODE)?;
        perms::write_atomic(&self.cert_path(), &cert_pem, PUBLIC_MODE)?;
        if let Some(ca) = ca_src {
            let ca_pem = fs::read_to_string(ca)?;
            perms::write_atomic(&self.ca_path(), &ca_pem, PUBLIC_MODE)?;
        }
        perms::enforce(&self.key_path(), SECRET_MODE)?;
        perms::enforce(&self.cert_path(), PUBLIC_MODE)?;
        Ok(parsed.info)
    }

    /// Check the live bundle: presence, permissions (self-healing),
    /// key correspondence and expiry.
    pub fn verify(&self) -> Result<VerifyReport, StoreError> {
        let cert_path = self.cert_path();
        let key_path = self.key_path();
        if !cert_path.exists() {
            return Err(StoreError::NotFound(cert_path.display().to_string()));
        }
        if !key_path.exists() {
            return Err(StoreError::NotFound(key_path.display().to_string()));
        }
        // Drifted modes are repaired, not reported as failures.
        perms::enforce(&self.dir, DIR_MODE)?;
        perms::enforce(&cert_path, PUBLIC_MODE)?;
        perms::enforce(&key_path, SECRET_MODE)?;
        let ca_path = self.ca_path();
        if ca_path.exists() {
            perms::enforce(&ca_path, PUBLIC_MODE)?;
        }

        let parsed = parse_certificate(&fs::read_to_string(&cert_path)?)?;
        if parsed.public_key != key_public_bits(&fs::read_to_string(&key_path)?)? {
            return Err(StoreError::KeyMismatch);
        }

        let now = OffsetDateTime::now_utc();
        if parsed.info.not_after < now {
            return Err(StoreError::Expired {
                days_ago: (now - parsed.info.not_after).whole_days(),
            });
        }
        let days_remaining = (parsed.info.not_after - now).whole_days();
        let expiring_soon = days_remaining < EXPIRY_WARN_DAYS;
        if expiring_soon {
            tracing::warn!(days_remaining, "certificate expires soon");
        }
        Ok(VerifyReport {
            days_remaining,
            expiring_soon,
        })
    }

    /// Read-only inspection of the live certificate.
    pub fn info(&self) -> Result<CertInfo, StoreError> {
        let cert_path = self.cert_path();
        if !cert_path.exists() {
            return Err(StoreError::NotFound(cert_path.display().to_string()));
        }
        parse_certificate(&fs::read_to_string(&cert_path)?).map(|p| p.info)
    }

    /// Replace the live bundle with fresh self-signed material.
    ///
    /// When a bundle exists its certificate, key and CA file are first copied
    /// into a new `backup-<timestamp>` subdirectory with their permissions
    /// preserved; only then is anything regenerated. Returns the new
    /// certificate info plus the backup path when one was taken.
    pub fn renew(
        &self,
        domain: &str,
        validity_days: u32,
    ) -> Result<(CertInfo, Option<PathBuf>), StoreError> {
        let backup = if self.exists() {
            let backup = self.snapshot_bundle()?;
            // A self-signed bundle carries no CA chain; drop a stale one.
            let ca = self.ca_path();
            if ca.exists() {
                fs::remove_file(&ca)?;
            }
            Some(backup)
        } else {
            None
        };
        let info = self.generate_self_signed(domain, validity_days)?;
        Ok((info, backup))
    }

    /// Delete the live bundle, first attempting a best-effort copy to
    /// `backup_to`. Backup failure is logged, never fatal.
    pub fn remove(&self, backup_to: &Path) -> Result<(), StoreError> {
        if !self.dir.exists() {
            return Err(StoreError::NotFound(self.dir.display().to_string()));
        }
        if let Err(e) = copy_dir_recursive(&self.dir, backup_to) {
            tracing::warn!(
                error = %e,
                backup = %backup_to.display(),
                "bundle backup failed, removing anyway"
            );
        }
        fs::remove_dir_all(&self.dir)?;
        Ok(())
    }

    /// Copy the live bundle files into a fresh timestamped subdirectory.
    fn snapshot_bundle(&self) -> Result<PathBuf, StoreError> {
        let stamp = utc_stamp();
        let mut backup = self.dir.join(format!("backup-{stamp}"));
        let mut n = 1;
        while backup.exists() {
            backup = self.dir.join(format!("backup-{stamp}-{n}"));
            n += 1;
        }
        fs::create_dir(&backup)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&backup, fs::Permissions::from_mode(DIR_MODE))?;
        }
        for name in [CERT_FILE, KEY_FILE, CA_FILE] {
            let src = self.dir.join(name);
            if src.exists() {
                // fs::copy carries the permission bits, keeping the snapshot
                // mode-identical to the live file.
                fs::copy(&src, backup.join(name))?;
            }
        }
        Ok(backup)
    }
}

/// `YYYYMMDD-HHMMSS` in UTC, used for backup directory names.
pub(crate) fn utc_stamp() -> String {
    let now = OffsetDateTime::now_utc();
    format!(
        "{:04}{:02}{:02}-{:02}{:02}{:02}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

fn parse_certificate(pem_text: &str) -> Result<ParsedCert, StoreError> {
    let (_, pem) = parse_x509_pem(pem_text.as_bytes())
        .map_err(|e| StoreError::Certificate(format!("Invalid PEM: {e}")))?;
    let (_, cert) = X509Certificate::from_der(&pem.contents)
        .map_err(|e| StoreError::Certificate(format!("Invalid certificate: {e}")))?;
    let info = CertInfo {
        subject: cert.subject().to_string(),
        issuer: cert.issuer().to_string(),
        not_before: cert.validity().not_before.to_datetime(),
        not_after: cert.validity().not_after.to_datetime(),
        fingerprint: hex::encode(Sha256::digest(&pem.contents)),
    };
    Ok(ParsedCert {
        info,
        public_key: cert.public_key().subject_public_key.data.to_vec(),
    })
}

/// Raw subject public key bits derived from a private key PEM.
fn key_public_bits(key_pem: &str) -> Result<Vec<u8>, StoreError> {
    let key = KeyPair::from_pem_and_sign_algo(key_pem, &rcgen::PKCS_RSA_SHA256)
        .or_else(|_| KeyPair::from_pem(key_pem))
        .map_err(|e| StoreError::Certificate(format!("Invalid private key: {e}")))?;
    Ok(key.public_key_raw().to_vec())
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(dst)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(src)?.permissions().mode() & 0o777;
        fs::set_permissions(dst, fs::Permissions::from_mode(mode))?;
    }
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
