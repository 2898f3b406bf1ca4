// ABOUTME: Entry point for the keyshare command.
// ABOUTME: Parses arguments, loads config and keyring, and dispatches to commands.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use keyshare_cli::commands::{self, ExportOutput};
use keyshare_cli::Keyring;
use keyshare_core::{fingerprint, Config, Destination, ExportFormat, ExportRequest};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "keyshare")]
#[command(about = "Share public keys as fingerprints, armored blocks or SSH keys")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, env = "KEYSHARE_CONFIG")]
    config: Option<PathBuf>,

    /// Path to keyring file (overrides config)
    #[arg(long, global = true, env = "KEYSHARE_KEYRING")]
    keyring: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List keys in the keyring
    List,

    /// Print a key's fingerprint
    Fingerprint {
        /// Key ID (16 hex digits, optional 0x)
        key_id: String,

        /// Print as a scheme URI for sharing
        #[arg(long, conflicts_with = "groups")]
        share: bool,

        /// Group hex digits in fours
        #[arg(long)]
        groups: bool,
    },

    /// Print the URI to encode in a QR code
    QrUri {
        /// Key ID (16 hex digits, optional 0x)
        key_id: String,
    },

    /// Export a public key
    Export {
        /// Key ID (16 hex digits, optional 0x)
        key_id: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = FormatArg::Armored)]
        format: FormatArg,

        /// Destination: stdout or a share file
        #[arg(long, value_enum, default_value_t = DestinationArg::Clipboard)]
        to: DestinationArg,

        /// Directory for share files (defaults to share.dir, then a fresh temp dir)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Armored,
    Ssh,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Armored => ExportFormat::Armored,
            FormatArg::Ssh => ExportFormat::Ssh,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DestinationArg {
    Clipboard,
    File,
}

impl From<DestinationArg> for Destination {
    fn from(arg: DestinationArg) -> Self {
        match arg {
            DestinationArg::Clipboard => Destination::Clipboard,
            DestinationArg::File => Destination::ShareFile,
        }
    }
}

fn main() -> Result<()> {
    keyshare_log::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    let keyring_path = cli.keyring.clone().unwrap_or_else(|| config.keyring_path());
    let keyring = Keyring::load(&keyring_path)?;
    let scheme = config.fingerprint.scheme.as_str();

    match cli.command {
        Commands::List => {
            print!("{}", commands::list(&keyring.keys()));
        }
        Commands::Fingerprint {
            key_id,
            share,
            groups,
        } => {
            let id = parse_key_id(&key_id)?;
            println!(
                "{}",
                commands::show_fingerprint(&keyring, id, share, groups, scheme)?
            );
        }
        Commands::QrUri { key_id } => {
            let id = parse_key_id(&key_id)?;
            println!("{}", commands::qr_uri(&keyring, id, scheme)?);
        }
        Commands::Export {
            key_id,
            format,
            to,
            out_dir,
        } => {
            let id = parse_key_id(&key_id)?;
            let request = ExportRequest::new(format.into(), to.into());
            let options = config.export_options();
            let output = match out_dir.or_else(|| config.share.dir.clone()) {
                Some(dir) => commands::export(&keyring, id, request, options, &dir)?,
                None => commands::export_to_share_dir(&keyring, id, request, options)?,
            };
            match output {
                ExportOutput::Text(text) => println!("{text}"),
                ExportOutput::Written(path) => println!("{}", path.display()),
            }
        }
    }

    Ok(())
}

fn parse_key_id(input: &str) -> Result<i64> {
    fingerprint::parse_key_id(input).with_context(|| format!("Invalid key ID {input:?}"))
}
