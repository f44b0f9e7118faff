//! # kotprint - Receipt and KOT Printing over Bluetooth LE
//!
//! kotprint turns restaurant orders into ESC/POS tickets and delivers them to
//! 58mm BLE thermal printers. It provides:
//!
//! - **Document model**: receipts and kitchen order tickets (KOT)
//! - **Layout**: fixed-width column formatting for 32-character paper
//! - **Protocol implementation**: ESC/POS command builders and a QR group
//! - **Transport**: chunked, acknowledged BLE writes with pacing
//! - **Connection management**: scanning, GATT resolution, one-shot reconnect
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use kotprint::{
//!     document::{Document, Header, LineItem, Payment},
//!     printer::{ConnectionManager, PrintSpooler, PrinterConfig},
//!     transport::{BtleplugAdapter, DeviceId, TransportConfig},
//! };
//!
//! # async fn run() -> kotprint::Result<()> {
//! let adapter = Arc::new(BtleplugAdapter::init().await?);
//! let manager = Arc::new(ConnectionManager::new(adapter, TransportConfig::default()));
//! manager.connect(&DeviceId::new("AA:BB:CC:DD:EE:FF")).await?;
//!
//! let doc = Document::receipt(
//!     Header::new("Udupi Cafe", "12 MG Road", "B-7"),
//!     vec![LineItem::new("Medu Vada", 2, 40.0)],
//! )
//! .payment(Payment::unpaid(80.0));
//!
//! let spooler = PrintSpooler::new(manager, PrinterConfig::GENERIC_58MM);
//! spooler.print(&doc).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`document`] | Printable documents and order snapshots |
//! | [`layout`] | Fixed-width line formatting |
//! | [`receipt`] | Document to ESC/POS encoder |
//! | [`ir`] | Intermediate op representation and codegen |
//! | [`protocol`] | ESC/POS command builders |
//! | [`preview`] | ESC/POS to text decoder |
//! | [`transport`] | BLE adapters and chunked framing |
//! | [`printer`] | Printer profile, connection manager, spooler |
//! | [`error`] | Error types |
//!
//! ## Supported Printers
//!
//! Generic 58mm ESC/POS printers exposing one of the vendor GATT services in
//! [`printer::config::SERVICE_UUIDS`].

pub mod document;
pub mod error;
pub mod ir;
pub mod layout;
pub mod preview;
pub mod printer;
pub mod protocol;
pub mod receipt;
pub mod transport;

// Re-exports for convenience
pub use error::{PrintError, Result};
pub use printer::{ConnectionManager, PrintSpooler, PrinterConfig};
pub use transport::{BtleplugAdapter, MockAdapter};
