//! # kotprint CLI
//!
//! Command-line interface for receipt and KOT printing.
//!
//! ## Usage
//!
//! ```bash
//! # Find nearby printers
//! kotprint scan --timeout 5
//!
//! # Print receipt and KOT for an order
//! kotprint print --order order.json --device AA:BB:CC:DD:EE:FF
//!
//! # Print only the kitchen ticket with smaller frames
//! kotprint print --order order.json --device AA:BB:CC:DD:EE:FF --ticket kot --chunk-size 20
//!
//! # Show the receipt as text
//! kotprint preview --order order.json
//!
//! # Write raw ESC/POS bytes
//! kotprint encode --order order.json --out receipt.bin
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `kotprint=info`).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use clap::{Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use tracing::info;

use kotprint::{
    Result,
    document::{Document, OrderSnapshot},
    preview::TextPreview,
    printer::{ConnectionManager, PrintSpooler, PrinterConfig},
    receipt,
    transport::{BtleplugAdapter, DeviceId, ScanFilter, TransportConfig},
};

/// kotprint - Receipt and KOT printing for BLE thermal printers
#[derive(Parser, Debug)]
#[command(name = "kotprint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan for BLE printers
    Scan {
        /// Scan duration in seconds
        #[arg(long, default_value = "10")]
        timeout: u64,

        /// List every device, not only known printer services
        #[arg(long)]
        all: bool,
    },

    /// Print an order to a BLE printer
    Print {
        /// Order snapshot JSON file
        #[arg(long, value_name = "FILE")]
        order: PathBuf,

        /// Printer device id from `kotprint scan`
        #[arg(long)]
        device: String,

        /// Which tickets to print
        #[arg(long, value_enum, default_value = "both")]
        ticket: Ticket,

        /// Transport config JSON file
        #[arg(long, value_name = "FILE")]
        transport: Option<PathBuf>,

        /// Frame size in bytes (overrides the transport config)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Pause between frames in milliseconds (overrides the transport config)
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Render an order as text without printing
    Preview {
        /// Order snapshot JSON file
        #[arg(long, value_name = "FILE")]
        order: PathBuf,

        /// Preview the KOT instead of the receipt
        #[arg(long)]
        kot: bool,
    },

    /// Write the encoded ESC/POS stream to a file
    Encode {
        /// Order snapshot JSON file
        #[arg(long, value_name = "FILE")]
        order: PathBuf,

        /// Output file
        #[arg(long, value_name = "FILE")]
        out: PathBuf,

        /// Encode the KOT instead of the receipt
        #[arg(long)]
        kot: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Ticket {
    Receipt,
    Kot,
    Both,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kotprint=info".into()),
        )
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {}", e);
        if e.is_reconnectable() {
            eprintln!("Check that the printer is on and in range, then try again.");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Scan { timeout, all } => scan(Duration::from_secs(timeout), all).await,

        Commands::Print {
            order,
            device,
            ticket,
            transport,
            chunk_size,
            delay_ms,
        } => {
            let mut config = match transport {
                Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
                None => TransportConfig::default(),
            };
            if let Some(size) = chunk_size {
                config.chunk_size = size;
            }
            if let Some(ms) = delay_ms {
                config.inter_chunk_delay_ms = ms;
            }
            print(&order, DeviceId::new(device), ticket, config).await
        }

        Commands::Preview { order, kot } => {
            let doc = load_document(&order, kot)?;
            let config = PrinterConfig::GENERIC_58MM;
            let bytes = receipt::encode_with(&doc, &config)?;
            print!("{}", TextPreview::new(config.columns).render(&bytes));
            Ok(())
        }

        Commands::Encode { order, out, kot } => {
            let doc = load_document(&order, kot)?;
            let bytes = receipt::encode(&doc)?;
            std::fs::write(&out, &bytes)?;
            println!("Wrote {} bytes to {}", bytes.len(), out.display());
            Ok(())
        }
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn load_order(path: &Path) -> Result<OrderSnapshot> {
    OrderSnapshot::from_json(&std::fs::read_to_string(path)?)
}

fn load_document(path: &Path, kot: bool) -> Result<Document> {
    let order = load_order(path)?;
    if kot {
        Document::kot_from(&order, now())
    } else {
        Document::receipt_from(&order, now())
    }
}

async fn scan(timeout: Duration, all: bool) -> Result<()> {
    let adapter = Arc::new(BtleplugAdapter::init().await?);
    let manager = ConnectionManager::new(adapter, TransportConfig::default());
    let filter = if all {
        ScanFilter::any()
    } else {
        ScanFilter::printers()
    };

    println!("Scanning for {}s...", timeout.as_secs());
    let mut scan = manager.scan(&filter).await?;
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let mut count = 0;
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            next = scan.next() => match next {
                Some(device) => {
                    count += 1;
                    println!(
                        "  {:<40} {:<20} {}",
                        device.id.as_str(),
                        device.name.as_deref().unwrap_or("(unnamed)"),
                        device.rssi.map(|r| format!("{} dBm", r)).unwrap_or_default()
                    );
                }
                None => break,
            },
        }
    }
    scan.stop().await?;

    println!("{} device(s) found", count);
    Ok(())
}

async fn print(
    order_path: &Path,
    device: DeviceId,
    ticket: Ticket,
    config: TransportConfig,
) -> Result<()> {
    let order = load_order(order_path)?;
    let printed_at = now();

    let adapter = Arc::new(BtleplugAdapter::init().await?);
    let manager = Arc::new(ConnectionManager::new(adapter, config));
    manager.watch_disconnects().await?;
    manager.connect(&device).await?;

    let spooler = PrintSpooler::new(Arc::clone(&manager), PrinterConfig::GENERIC_58MM);
    let result = match ticket {
        Ticket::Both => spooler.print_order(&order, printed_at).await,
        Ticket::Receipt => {
            let doc = Document::receipt_from(&order, printed_at)?;
            spooler.print(&doc).await.map(|r| vec![r])
        }
        Ticket::Kot => {
            let doc = Document::kot_from(&order, printed_at)?;
            spooler.print(&doc).await.map(|r| vec![r])
        }
    };

    if let Err(e) = manager.shutdown().await {
        info!(error = %e, "shutdown after print failed");
    }

    let reports = result?;
    for report in &reports {
        println!(
            "Printed {:?}: {} bytes in {} frames",
            report.kind, report.bytes, report.frames
        );
    }
    Ok(())
}
