use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use ltocm_core::session::{DumpConfig, LtoCmSession};
use ltocm_core::transceiver::Pn533Transceiver;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about = "LTO Cartridge Memory dumper (Pure Rust)", long_about = None)]
struct Args {
    /// Output file (default: <serial>.bin)
    output: Option<PathBuf>,

    /// Load settings from a TOML file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective settings to a TOML file and exit
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Use the reader with this USB ID (VID:PID, hex)
    #[arg(long, value_parser = parse_usb_id)]
    device: Option<(u16, u16)>,

    /// Directory for the default-named output file
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Print raw frames (implies -vv)
    #[arg(long)]
    hexdump: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_usb_id(s: &str) -> Result<(u16, u16), String> {
    let (vid, pid) = s
        .split_once(':')
        .ok_or_else(|| format!("expected VID:PID, got '{}'", s))?;
    let parse = |v: &str| u16::from_str_radix(v, 16).map_err(|e| format!("'{}': {}", v, e));
    Ok((parse(vid)?, parse(pid)?))
}

fn build_config(args: &Args) -> Result<DumpConfig> {
    let mut config = match &args.config {
        Some(path) => DumpConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DumpConfig::default(),
    };
    if let Some(output) = &args.output {
        config.output = Some(output.clone());
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = Some(dir.clone());
    }
    if let Some((vid, pid)) = args.device {
        config.usb_vendor_id = Some(vid);
        config.usb_product_id = Some(pid);
    }
    config.hexdump |= args.hexdump;
    Ok(config)
}

fn open_reader(config: &DumpConfig) -> Result<Pn533Transceiver> {
    let reader = match (config.usb_vendor_id, config.usb_product_id) {
        (Some(vid), Some(pid)) => Pn533Transceiver::open_with_ids(vid, pid),
        (None, None) => Pn533Transceiver::open(),
        _ => bail!("usb_vendor_id and usb_product_id must be set together"),
    };
    reader.context("Failed to open NFC reader")
}

fn run(args: &Args) -> Result<()> {
    let config = build_config(args)?;

    if let Some(path) = &args.save_config {
        config
            .save_to_file(path)
            .with_context(|| format!("Failed to save config {}", path.display()))?;
        info!(path = %path.display(), "Config saved");
        return Ok(());
    }

    let reader = open_reader(&config)?;
    let session = LtoCmSession::new(reader)?.with_config(&config);

    let summary = session.run(|tag| {
        let path = config.output_path(tag);
        info!(path = %path.display(), "Writing dump");
        File::create(&path).map(BufWriter::new)
    })?;

    println!(
        "{}: {} blocks, {} bytes -> {}",
        summary.tag.serial,
        summary.blocks,
        summary.bytes,
        config.output_path(&summary.tag).display()
    );
    Ok(())
}

fn main() {
    let args = Args::parse();

    let level = match (args.verbose, args.hexdump) {
        (_, true) | (2.., _) => tracing::Level::TRACE,
        (1, _) => tracing::Level::DEBUG,
        _ => tracing::Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting LTO-CM dumper (nusb backend)...");

    if let Err(e) = run(&args) {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
