//! Credit Commons CLI.
//!
//! Offline helpers for operators and relying parties: generate the keys the
//! server expects, verify a disclosed presentation against the issuer's
//! public key, and compute a credential payload's content hash.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use credcommons_core::crypto::EnvelopeKey;
use credcommons_core::presentation::{IssuerKey, verify, verifying_key_from_base64};
use credcommons_core::registry::hash_credential;

/// Credit Commons — consent-gated credit-readiness credentials.
#[derive(Parser)]
#[command(
    name = "credcommons",
    version,
    about = "Credit Commons CLI — service keys, presentation verification, content hashes",
    long_about = None,
    after_help = "Examples:\n  \
         credcommons keygen >> .env\n  \
         credcommons verify --public-key $ISSUER_PUBLIC_KEY eyJhbGciOi...\n  \
         credcommons hash credential.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a fresh envelope key and Ed25519 signing key.
    Keygen,

    /// Verify a presentation token and print its claims.
    Verify {
        /// Issuer public key (standard base64, 32 bytes).
        #[arg(long, env = "CREDCOMMONS_PUBLIC_KEY")]
        public_key: String,

        /// The token, or `-` to read it from stdin.
        token: String,
    },

    /// Print the hex SHA-256 content hash of a payload file.
    Hash {
        /// File to hash, or `-` for stdin.
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("✗ Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Keygen => {
            cmd_keygen();
            Ok(())
        }
        Commands::Verify { public_key, token } => cmd_verify(&public_key, &token),
        Commands::Hash { file } => cmd_hash(&file),
    }
}

/// Prints `.env`-style lines so the output can be appended to a config file.
fn cmd_keygen() {
    let envelope = EnvelopeKey::generate();
    let signing = IssuerKey::generate();
    println!("CREDENTIAL_KEY={}", envelope.to_base64());
    println!("ED25519_PRIVATE_KEY={}", signing.to_base64());
    println!("# public key for verifiers");
    println!("CREDCOMMONS_PUBLIC_KEY={}", signing.public_key_base64());
}

fn cmd_verify(public_key: &str, token: &str) -> Result<()> {
    let key = verifying_key_from_base64(public_key).context("invalid --public-key")?;
    let token = if token == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read token from stdin")?;
        buf
    } else {
        token.to_owned()
    };

    let claims = verify(token.trim(), &key).context("presentation rejected")?;
    let pretty = serde_json::to_string_pretty(&claims).context("failed to render claims")?;
    println!("{pretty}");
    Ok(())
}

fn cmd_hash(file: &Path) -> Result<()> {
    let payload = if file == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        std::fs::read(file).with_context(|| format!("failed to read '{}'", file.display()))?
    };
    println!("{}", hash_credential(&payload));
    Ok(())
}
