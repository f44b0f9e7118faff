//! # Intermediate Representation (IR)
//!
//! The IR is a "bytecode" representation that sits between a
//! [`Document`](crate::document::Document) and raw ESC/POS bytes.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────┐
//! │  Document   │ ──► │     IR      │ ──► │ Codegen  │
//! │  (receipt)  │     │  (Vec<Op>)  │     │ (bytes)  │
//! └─────────────┘     └─────────────┘     └──────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use kotprint::ir::{Op, Program};
//! use kotprint::protocol::text::Alignment;
//!
//! let mut program = Program::with_init();
//! program.push(Op::SetAlign(Alignment::Center));
//! program.push(Op::Text("HELLO".into()));
//! program.push(Op::Newline);
//! program.push(Op::Cut);
//!
//! let bytes = program.to_bytes().unwrap();
//! assert!(bytes.starts_with(&[0x1B, 0x40]));
//! ```

mod codegen;
mod ops;

pub use codegen::CUT_FEED_DOTS;
pub use ops::*;
