mod commands;
mod wizard;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dialoguer::{theme::ColorfulTheme, Select};

#[derive(Parser)]
#[command(name = "moat-setup")]
#[command(about = "Provision and maintain moat stack secrets and TLS material")]
struct Cli {
    /// Configuration file (default: ~/.config/moat/stack.env)
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// Certificate bundle directory (default: ~/.config/moat/certs)
    #[arg(long = "cert-dir", global = true)]
    cert_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive first-time setup
    Init,
    /// Configuration file operations
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Certificate bundle operations
    Cert {
        #[command(subcommand)]
        action: CertAction,
    },
    /// Show configuration and certificate status
    Status,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the value of a key
    Get { key: String },
    /// Set a key to a value
    Set { key: String, value: String },
    /// Generate the configuration file with fresh secrets
    Generate {
        /// Template path; the embedded default template when omitted
        #[arg(long)]
        template: Option<PathBuf>,
    },
    /// Check required and recommended keys
    Validate,
    /// Add configuration keys introduced since the file was generated
    Migrate,
}

#[derive(Subcommand)]
enum CertAction {
    /// Generate a self-signed certificate
    Generate {
        domain: String,
        #[arg(long, default_value_t = 365)]
        days: u32,
    },
    /// Import an externally issued certificate and key
    Import {
        #[arg(long)]
        cert: PathBuf,
        #[arg(long)]
        key: PathBuf,
        #[arg(long)]
        ca: Option<PathBuf>,
    },
    /// Check presence, permissions, key correspondence and expiry
    Verify,
    /// Print certificate details
    Info,
    /// Renew the certificate, backing up the current bundle first
    Renew {
        domain: String,
        #[arg(long, default_value_t = 365)]
        days: u32,
    },
    /// Remove the bundle after a best-effort backup
    Remove,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .without_time()
        .init();

    let cli = Cli::parse();
    let ctx = commands::Context::resolve(cli.file, cli.cert_dir)?;

    match cli.command {
        Some(Command::Init) => wizard::run_wizard(&ctx),
        Some(Command::Config { action }) => match action {
            ConfigAction::Get { key } => commands::config_get(&ctx, &key),
            ConfigAction::Set { key, value } => commands::config_set(&ctx, &key, &value),
            ConfigAction::Generate { template } => {
                commands::config_generate(&ctx, template.as_deref())
            }
            ConfigAction::Validate => commands::config_validate(&ctx),
            ConfigAction::Migrate => commands::config_migrate(&ctx),
        },
        Some(Command::Cert { action }) => match action {
            CertAction::Generate { domain, days } => commands::cert_generate(&ctx, &domain, days),
            CertAction::Import { cert, key, ca } => {
                commands::cert_import(&ctx, &cert, &key, ca.as_deref())
            }
            CertAction::Verify => commands::cert_verify(&ctx),
            CertAction::Info => commands::cert_info(&ctx),
            CertAction::Renew { domain, days } => commands::cert_renew(&ctx, &domain, days),
            CertAction::Remove => commands::cert_remove(&ctx),
        },
        Some(Command::Status) => commands::show_status(&ctx),
        None => run_menu(&ctx),
    }
}

fn run_menu(ctx: &commands::Context) -> Result<()> {
    println!();
    println!("~ MOAT STACK SETUP ~");
    println!();

    loop {
        let options = [
            "Run setup wizard",
            "Show status",
            "Verify certificate",
            "Quit",
        ];
        let choice = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("What would you like to do?")
            .items(&options)
            .default(0)
            .interact()?;

        match choice {
            0 => {
                if let Err(e) = wizard::run_wizard(ctx) {
                    eprintln!("Setup failed: {}", e);
                }
            }
            1 => {
                if let Err(e) = commands::show_status(ctx) {
                    eprintln!("Error: {}", e);
                }
            }
            2 => {
                if let Err(e) = commands::cert_verify(ctx) {
                    eprintln!("Verification failed: {}", e);
                }
            }
            _ => return Ok(()),
        }
        println!();
    }
}
