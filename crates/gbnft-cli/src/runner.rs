//! Shared plumbing for the client and server binaries.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use gbnft_engine::{
    ChannelConfig, EngineConfig, Receiver, ReceiverReport, Sender, SenderReport, SystemClock,
    UdpChannel,
};
use gbnft_files::{Catalog, CatalogMatcher, FileBlob, MatchLog, read_names_from_file};

/// Initialize process-wide logging. `-d` raises the level to DEBUG.
pub fn init_logging(debug: bool) {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub host: String,
    pub port: u16,
    pub file_list: PathBuf,
    /// Simulated loss in percent, 0..=100.
    pub loss_percent: u8,
    pub trace_out: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub port: u16,
    pub catalog_dir: PathBuf,
    pub output_file: PathBuf,
    pub loss_percent: u8,
}

fn channel_config(loss_percent: u8) -> ChannelConfig {
    ChannelConfig {
        loss: f64::from(loss_percent) / 100.0,
        seed: None,
    }
}

/// Load the listed files and push them through one sender session.
pub fn run_client(opts: &ClientOptions) -> Result<SenderReport> {
    let names = read_names_from_file(&opts.file_list)?;
    let files = names
        .iter()
        .map(|name| FileBlob::read(name).map(Into::into))
        .collect::<Result<Vec<_>>>()?;
    info!(
        count = names.len(),
        host = %opts.host,
        port = opts.port,
        loss = opts.loss_percent,
        "starting transfer"
    );

    let channel = UdpChannel::connect(&opts.host, opts.port, channel_config(opts.loss_percent))
        .context("failed to set up client socket")?;
    let sender = Sender::new(files, channel, SystemClock, EngineConfig::default());
    let report = sender.run().context("transfer failed")?;

    if let Some(path) = &opts.trace_out {
        write_trace(path, &report)?;
    }
    Ok(report)
}

/// Serve one session: receive files until the sender terminates, matching
/// each against the catalog directory.
pub fn run_server(opts: &ServerOptions) -> Result<ReceiverReport> {
    let catalog = Catalog::load_dir(&opts.catalog_dir)?;
    info!(
        entries = catalog.len(),
        port = opts.port,
        loss = opts.loss_percent,
        "serving"
    );
    let log = MatchLog::create(&opts.output_file)?;
    let mut matcher = CatalogMatcher::new(catalog, log);

    let channel = UdpChannel::bind(opts.port, channel_config(opts.loss_percent))
        .context("failed to bind server socket")?;
    let report = Receiver::new(channel)
        .run(&mut matcher)
        .context("session failed")?;
    info!(
        delivered = report.files_delivered,
        duplicates = report.duplicates,
        "session finished"
    );
    Ok(report)
}

fn write_trace(path: &Path, report: &SenderReport) -> Result<()> {
    let data = serde_json::to_vec_pretty(report).context("failed to serialize run report")?;
    fs::write(path, &data)
        .with_context(|| format!("failed to write trace file {}", path.display()))?;
    Ok(())
}
