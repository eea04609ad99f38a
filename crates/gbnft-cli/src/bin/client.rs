use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use gbnft_cli::{ClientOptions, init_logging, run_client};

#[derive(Parser, Debug)]
#[command(author, version, about = "Send a batch of files over the go-back-N protocol")]
struct Args {
    /// Server hostname or IPv4/IPv6 address.
    host: String,

    /// Server UDP port.
    port: u16,

    /// Text file listing the files to send, one path per line.
    file_list: PathBuf,

    /// Simulated packet-loss percentage applied to outgoing datagrams.
    #[arg(value_parser = clap::value_parser!(u8).range(0..=100))]
    loss_percent: u8,

    /// Verbose per-packet logging.
    #[arg(short = 'd', long = "debug", default_value_t = false)]
    debug: bool,

    /// Write a JSON report of the finished run.
    #[arg(long)]
    trace_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let opts = ClientOptions {
        host: args.host,
        port: args.port,
        file_list: args.file_list,
        loss_percent: args.loss_percent,
        trace_out: args.trace_out,
    };
    run_client(&opts)?;
    Ok(())
}
