use crate::init_config::CmdConfig;
use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use clap_verbosity_flag::InfoLevel;
use directories::ProjectDirs;
use std::path::PathBuf;

mod cmd;
mod helpers;
mod init_config;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// registry config file to use instead of the default location
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(flatten)]
    verbosity: clap_verbosity_flag::Verbosity<InfoLevel>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Modify the registry node's config
    Config {
        #[command(subcommand)]
        cmd: CmdConfig,
    },
    /// Generate a random ed25519 secret key
    Keygen {
        /// File to write the 32-byte secret key to
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
        /// Overwrite an existing key file
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
    /// Sign an entry and print it as a hex CREATE frame
    Sign {
        /// Secret key file (raw 32 bytes or hex)
        #[arg(long, value_name = "FILE")]
        key: PathBuf,
        /// Revision of the entry; must be higher than the stored one to win
        #[arg(long)]
        revision: u64,
        /// Entry payload in hex (at most 48 bytes)
        #[arg(long, value_name = "HEX")]
        data: String,
        /// Type byte to put in front of the public key, for registries
        /// running with `key_format = "prefixed"`
        #[arg(long, value_name = "BYTE")]
        prefix: Option<u8>,
    },
    /// Decode a hex frame and print its fields
    Inspect {
        frame: String,
        /// Verify the signature with the first key byte stripped
        #[arg(long, action = ArgAction::SetTrue)]
        prefixed: bool,
    },
    /// Print the entry stored for a public key in the configured store
    Get {
        /// Public key in hex, exactly as sent in frames
        public_key: String,
    },
    /// Run a hex frame through the registry against the configured store,
    /// printing outgoing frames instead of sending them
    Apply {
        frame: String,
        /// Peer the frame appears to come from, in hex; defaults to this
        /// node's own identity
        #[arg(long, value_name = "HEX")]
        from: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .with_writer(std::io::stderr)
        .init();

    // Config and default data live together:
    // - Config: ~/.config/lume/registry.toml
    // - Data:   ~/.config/lume/data/registry/
    let config_file = match cli.config {
        Some(path) => path,
        None => ProjectDirs::from("", "", "lume")
            .context("failed to determine config directory path")?
            .config_dir()
            .join("registry.toml"),
    };

    cmd::run_command(config_file, cli.cmd).await
}
