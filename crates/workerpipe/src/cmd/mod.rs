use clap::{Args, Subcommand};
use std::path::PathBuf;

use workerpipe_frame::MessageType;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod supervise;
pub mod version;
pub mod worker;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write one frame's wire bytes to stdout.
    Encode(EncodeArgs),
    /// Read frames from a file or stdin and print them.
    Decode(DecodeArgs),
    /// Run the reference worker over stdin/stdout.
    Worker(WorkerArgs),
    /// Spawn a worker, configure it, relay its logs, then shut it down.
    Supervise(SuperviseArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args),
        Command::Decode(args) => decode::run(args, format),
        Command::Worker(args) => worker::run(args),
        Command::Supervise(args) => supervise::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Message type: a reserved name (CONFIGURE, LOG, ...) or a number.
    #[arg(long = "type", short = 't', value_name = "TYPE")]
    pub msg_type: MessageType,
    /// JSON payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File holding concatenated frames. Reads stdin when omitted.
    pub file: Option<PathBuf>,
    /// Exit after printing N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Reject frames whose declared payload is larger than this.
    #[arg(long, value_name = "BYTES")]
    pub max_payload: Option<usize>,
}

#[derive(Args, Debug)]
pub struct WorkerArgs {
    /// Logger name attached to LOG records.
    #[arg(long, default_value = "worker")]
    pub logger: String,
}

#[derive(Args, Debug)]
pub struct SuperviseArgs {
    /// Configuration document sent as CONFIGURE.
    #[arg(long, conflicts_with = "config_file", default_value = "{}")]
    pub config: String,
    /// Read the configuration document from a file.
    #[arg(long, value_name = "PATH")]
    pub config_file: Option<PathBuf>,
    /// Worker program and its arguments.
    #[arg(last = true, required = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
