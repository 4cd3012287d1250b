use clap::{Args, Subcommand};
use std::path::PathBuf;

use relaybridge_peer::AdapterConfig;

use crate::exit::{peer_error, CliResult};
use crate::output::OutputFormat;

pub mod channels;
pub mod loopback;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the resolved channel registry.
    Channels(ChannelsArgs),
    /// Run a host and clients over an in-process loopback relay.
    Loopback(LoopbackArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Channels(args) => channels::run(args, format),
        Command::Loopback(args) => loopback::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Load the adapter config from `path`, or defaults when absent.
pub fn load_config(path: Option<&PathBuf>) -> CliResult<AdapterConfig> {
    match path {
        Some(path) => {
            AdapterConfig::from_json_file(path).map_err(|err| peer_error("config load failed", err))
        }
        None => Ok(AdapterConfig::default()),
    }
}

#[derive(Args, Debug)]
pub struct ChannelsArgs {
    /// Adapter config file (JSON) declaring user channels.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct LoopbackArgs {
    /// Number of clients to connect to the host.
    #[arg(long, default_value = "2")]
    pub clients: usize,
    /// Channel each client sends on.
    #[arg(long, short = 'c', default_value = "2")]
    pub channel: u8,
    /// Payload each client sends; the host echoes it back.
    #[arg(long, default_value = "hello")]
    pub data: String,
    /// Adapter config file (JSON).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Give up after this many poll rounds.
    #[arg(long, default_value = "200")]
    pub max_rounds: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
