use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use gbnft_cli::{ServerOptions, init_logging, run_server};

#[derive(Parser, Debug)]
#[command(author, version, about = "Receive files over the go-back-N protocol and match them against a catalog")]
struct Args {
    /// UDP port to listen on.
    port: u16,

    /// Directory of reference files delivered files are compared against.
    catalog_dir: PathBuf,

    /// Output file for match results, one line per delivered file.
    output_file: PathBuf,

    /// Simulated packet-loss percentage applied to outgoing ACKs.
    #[arg(default_value_t = 8, value_parser = clap::value_parser!(u8).range(0..=100))]
    loss_percent: u8,

    /// Verbose per-packet logging.
    #[arg(short = 'd', long = "debug", default_value_t = false)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let opts = ServerOptions {
        port: args.port,
        catalog_dir: args.catalog_dir,
        output_file: args.output_file,
        loss_percent: args.loss_percent,
    };
    run_server(&opts)?;
    Ok(())
}
