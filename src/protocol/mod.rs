//! # ESC/POS Protocol Implementation
//!
//! Low-level command builders for ESC/POS thermal receipt printers.
//!
//! ## Module Structure
//!
//! - [`commands`]: Printer control (init, character table, speed, feed, cut)
//! - [`text`]: Alignment and print mode
//! - [`barcode`]: QR code function group
//!
//! ## Usage Example
//!
//! ```
//! use kotprint::protocol::{commands, text};
//!
//! let mut data = Vec::new();
//! data.extend(commands::init());
//! data.extend(text::align(text::Alignment::Center));
//! data.extend(text::print_mode(text::PrintMode::DOUBLE_HEIGHT));
//! data.extend(b"PAID\n");
//! data.extend(text::print_mode(text::PrintMode::NORMAL));
//! data.extend(commands::cut_full_feed(0x40));
//! ```

pub mod barcode;
pub mod commands;
pub mod text;
