use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};

use crate::commands::{self, Context, DEFAULT_TEMPLATE};

/// Run the full first-time setup: configuration file plus TLS certificate.
pub fn run_wizard(ctx: &Context) -> Result<()> {
    println!();
    println!("~ Moat Stack Configuration ~");
    println!();

    if ctx.store.exists() {
        let overwrite = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("A configuration file already exists. Regenerate it with fresh secrets?")
            .default(false)
            .interact()?;
        if !overwrite {
            println!("Keeping the existing configuration.");
            // Still pick up any keys added since it was generated.
            commands::config_migrate(ctx)?;
            return finish_certificate(ctx);
        }
    }

    let generated = ctx.store.generate_from_str(DEFAULT_TEMPLATE)?;
    println!("Wrote {}", ctx.store.path().display());

    if let Some(password) = generated.get("ADMIN_PASSWORD") {
        let user = ctx.store.get_or_default("ADMIN_USER", "admin")?;
        println!();
        println!("Admin account (also stored in the configuration file):");
        println!("  user:     {}", user);
        println!("  password: {}", password);
    }

    ctx.store.validate()?;
    finish_certificate(ctx)
}

fn finish_certificate(ctx: &Context) -> Result<()> {
    println!();
    println!("~ TLS Certificate ~");
    println!();

    if ctx.certs.exists() {
        let renew = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("A certificate already exists. Renew it?")
            .default(false)
            .interact()?;
        if !renew {
            return commands::cert_verify(ctx);
        }
    }

    let domain: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Domain for the certificate")
        .default("localhost".to_string())
        .interact_text()?;
    let days: u32 = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Validity in days")
        .default(365)
        .interact_text()?;

    if ctx.certs.exists() {
        commands::cert_renew(ctx, &domain, days)?;
    } else {
        commands::cert_generate(ctx, &domain, days)?;
    }

    println!();
    println!("Setup complete.");
    Ok(())
}
