//! # Printer Module
//!
//! Printer profiles, the BLE link and the job queue.
//!
//! ## Modules
//!
//! - [`config`]: Printer profile and known GATT UUIDs
//! - [`connection`]: Link state machine, scanning and reconnects
//! - [`spooler`]: FIFO print job queue

pub mod config;
pub mod connection;
pub mod spooler;

pub use config::PrinterConfig;
pub use connection::{ConnectionManager, DeviceScan, LinkState, PrinterLink};
pub use spooler::{JobReport, PrintSpooler};
