use std::path::{Path, PathBuf};

use anyhow::Result;
use moat_store::{CertManager, ConfigStore, MigrateOutcome, StoreError};

/// Embedded template used by `config generate` and the wizard when no
/// template file is supplied.
pub const DEFAULT_TEMPLATE: &str = include_str!("../assets/stack.env.template");

/// Resolved target paths for one invocation.
pub struct Context {
    pub store: ConfigStore,
    pub certs: CertManager,
}

impl Context {
    pub fn resolve(file: Option<PathBuf>, cert_dir: Option<PathBuf>) -> Result<Self> {
        let file = match file {
            Some(p) => p,
            None => moat_store::stack_env_path()?,
        };
        let cert_dir = match cert_dir {
            Some(p) => p,
            None => moat_store::cert_dir()?,
        };
        Ok(Self {
            store: ConfigStore::new(file),
            certs: CertManager::new(cert_dir),
        })
    }
}

pub fn config_get(ctx: &Context, key: &str) -> Result<()> {
    println!("{}", ctx.store.get(key)?);
    Ok(())
}

pub fn config_set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    ctx.store.set(key, value)?;
    println!("Set {} in {}", key, ctx.store.path().display());
    Ok(())
}

pub fn config_generate(ctx: &Context, template: Option<&Path>) -> Result<()> {
    let generated = match template {
        Some(path) => ctx.store.generate(path)?,
        None => ctx.store.generate_from_str(DEFAULT_TEMPLATE)?,
    };
    println!("Wrote {}", ctx.store.path().display());
    if !generated.is_empty() {
        println!("Generated values:");
        for (key, value) in &generated {
            println!("  {}={}", key, value);
        }
    }
    Ok(())
}

pub fn config_validate(ctx: &Context) -> Result<()> {
    ctx.store.validate()?;
    println!("Configuration OK");
    Ok(())
}

pub fn config_migrate(ctx: &Context) -> Result<()> {
    match ctx.store.migrate()? {
        MigrateOutcome::Changed(keys) => println!("Added: {}", keys.join(", ")),
        MigrateOutcome::NoChange => println!("Already up to date"),
    }
    Ok(())
}

pub fn cert_generate(ctx: &Context, domain: &str, days: u32) -> Result<()> {
    let info = ctx.certs.generate_self_signed(domain, days)?;
    println!("Generated certificate for {}", domain);
    println!("Fingerprint: {}", info.fingerprint);
    Ok(())
}

pub fn cert_import(ctx: &Context, cert: &Path, key: &Path, ca: Option<&Path>) -> Result<()> {
    let info = ctx.certs.import(cert, key, ca)?;
    println!("Imported certificate");
    println!("Subject:     {}", info.subject);
    println!("Fingerprint: {}", info.fingerprint);
    Ok(())
}

pub fn cert_verify(ctx: &Context) -> Result<()> {
    let report = ctx.certs.verify()?;
    println!(
        "Certificate OK, {} day(s) remaining",
        report.days_remaining
    );
    if report.expiring_soon {
        eprintln!("Warning: certificate expires in fewer than 30 days");
    }
    Ok(())
}

pub fn cert_info(ctx: &Context) -> Result<()> {
    let info = ctx.certs.info()?;
    println!("Subject:     {}", info.subject);
    println!("Issuer:      {}", info.issuer);
    println!("Not before:  {}", info.not_before);
    println!("Not after:   {}", info.not_after);
    println!("Fingerprint: {}", info.fingerprint);
    Ok(())
}

pub fn cert_renew(ctx: &Context, domain: &str, days: u32) -> Result<()> {
    let (info, backup) = ctx.certs.renew(domain, days)?;
    if let Some(backup) = backup {
        println!("Previous bundle saved to {}", backup.display());
    }
    println!("Renewed certificate for {}", domain);
    println!("Fingerprint: {}", info.fingerprint);
    Ok(())
}

pub fn cert_remove(ctx: &Context) -> Result<()> {
    let backup_to = moat_store::removed_cert_backup_dir()?;
    ctx.certs.remove(&backup_to)?;
    println!(
        "Removed certificate bundle (backup attempted at {})",
        backup_to.display()
    );
    Ok(())
}

pub fn show_status(ctx: &Context) -> Result<()> {
    println!();
    println!("Configuration: {}", ctx.store.path().display());
    if ctx.store.exists() {
        match ctx.store.validate() {
            Ok(()) => println!("  present, all required keys set"),
            Err(StoreError::ValidationFailed { missing }) => {
                println!("  present, missing required keys: {}", missing.join(", "))
            }
            Err(e) => println!("  error: {}", e),
        }
    } else {
        println!("  not created yet (run 'moat-setup init')");
    }

    println!("Certificates:  {}", ctx.certs.dir().display());
    if ctx.certs.exists() {
        match ctx.certs.verify() {
            Ok(report) => println!("  valid, {} day(s) remaining", report.days_remaining),
            Err(e) => println!("  {}", e),
        }
    } else {
        println!("  no certificate (run 'moat-setup cert generate <domain>')");
    }
    Ok(())
}
