//! # IPN Relay CLI
//!
//! Command-line tools for operating the IPN relay.
//!
//! This module provides CLI commands for:
//! - Computing the signature of a notification
//! - Checking the signature of a captured notification
//! - Configuration validation
//! - Shell completions

use clap::{Args, CommandFactory, Parser, Subcommand};
use ipn_relay_api::{ConfigError, ServiceConfig};
use ipn_relay_core::{sign, InboundMessage, SignatureError, SignatureOptions, SignatureVerifier};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

// ============================================================================
// CLI Structure
// ============================================================================

/// IPN relay CLI - signature and configuration tooling
#[derive(Parser)]
#[command(name = "ipn-relay")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Tools for the IPN relay service")]
#[command(
    long_about = "Compute and check payment notification signatures and validate relay configuration"
)]
pub struct Cli {
    /// Logging level
    #[arg(short, long, default_value = "warn", global = true)]
    pub log_level: String,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Compute the signature of a notification
    Sign {
        #[command(flatten)]
        signing: SigningArgs,

        /// Notification fields as KEY=VALUE
        #[arg(value_parser = parse_field, required = true)]
        fields: Vec<(String, String)>,
    },

    /// Check the `sha_sign` field of a notification
    Verify {
        #[command(flatten)]
        signing: SigningArgs,

        /// Notification fields as KEY=VALUE, including sha_sign
        #[arg(value_parser = parse_field, required = true)]
        fields: Vec<(String, String)>,
    },

    /// Validate configuration
    Config {
        /// Configuration file to validate
        #[arg(short, long, env = "IPN_RELAY_CONFIG_FILE")]
        file: Option<PathBuf>,

        /// Show resolved configuration with secrets redacted
        #[arg(short, long)]
        show: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Passphrase and canonical-form flags shared by `sign` and `verify`
#[derive(Args, Debug, Clone)]
pub struct SigningArgs {
    /// Signing passphrase
    #[arg(short, long, env = "IPN_SIGNING_SECRET", hide_env_values = true)]
    pub secret: String,

    /// Sort on and emit upper-cased field names
    #[arg(long)]
    pub uppercase_keys: bool,

    /// HTML-entity-decode values before signing
    #[arg(long)]
    pub html_decode: bool,
}

impl SigningArgs {
    pub fn options(&self) -> SignatureOptions {
        SignatureOptions {
            uppercase_keys: self.uppercase_keys,
            html_decode: self.html_decode,
        }
    }
}

/// Parse a `KEY=VALUE` argument. The value may be empty or contain `=`.
pub fn parse_field(input: &str) -> Result<(String, String), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("'{}' is not of the form KEY=VALUE", input))?;
    if key.is_empty() {
        return Err(format!("'{}' has an empty key", input));
    }
    Ok((key.to_string(), value.to_string()))
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Signature check failed: {0}")]
    VerificationFailed(#[from] SignatureError),

    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("Output failed: {message}")]
    Output { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 1,
            Self::VerificationFailed(_) => 2,
            Self::InvalidArgument { .. } => 3,
            Self::Output { .. } => 4,
            Self::Io(_) => 5,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();

    initialize_logging(&cli.log_level);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(cli.command, &mut out)
}

/// Execute one command, writing its output to `out`.
pub fn run(command: Commands, out: &mut impl Write) -> Result<(), CliError> {
    match command {
        Commands::Sign { signing, fields } => execute_sign_command(&signing, fields, out),
        Commands::Verify { signing, fields } => execute_verify_command(&signing, fields, out),
        Commands::Config { file, show } => execute_config_command(file, show, out),
        Commands::Completions { shell } => execute_completions_command(shell, out),
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// Log to stderr so command output stays clean.
fn initialize_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn execute_sign_command(
    signing: &SigningArgs,
    fields: Vec<(String, String)>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    if signing.secret.is_empty() {
        return Err(CliError::InvalidArgument {
            arg: "--secret".to_string(),
            message: "passphrase must not be empty".to_string(),
        });
    }

    let message = InboundMessage::from_pairs(fields);
    debug!(field_count = message.len(), options = ?signing.options(), "Signing fields");

    let signature = sign(&message, &signing.secret, signing.options());
    writeln!(out, "{}", signature)?;
    Ok(())
}

fn execute_verify_command(
    signing: &SigningArgs,
    fields: Vec<(String, String)>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let message = InboundMessage::from_pairs(fields);
    let verifier = SignatureVerifier::new(signing.options());

    match verifier.check(&message, &signing.secret) {
        Ok(()) => {
            writeln!(out, "valid")?;
            Ok(())
        }
        Err(e) => {
            writeln!(out, "invalid")?;
            Err(CliError::VerificationFailed(e))
        }
    }
}

fn execute_config_command(
    file: Option<PathBuf>,
    show: bool,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let path = match &file {
        Some(path) => Some(path.to_str().ok_or_else(|| CliError::InvalidArgument {
            arg: "--file".to_string(),
            message: format!("'{}' is not valid UTF-8", path.display()),
        })?),
        None => None,
    };
    info!(file = ?path, show = show, "Validating configuration");

    let config = ServiceConfig::load(path)?;

    writeln!(out, "Configuration is valid")?;
    for name in config.settings.missing_secrets() {
        writeln!(out, "warning: {} is not set", name)?;
    }

    if show {
        let yaml = serde_yaml::to_string(&config).map_err(|e| CliError::Output {
            message: e.to_string(),
        })?;
        write!(out, "{}", yaml)?;
    }
    Ok(())
}

fn execute_completions_command(
    shell: clap_complete::Shell,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(shell, &mut command, name, out);
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
