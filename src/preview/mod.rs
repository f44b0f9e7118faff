//! # ESC/POS Text Preview
//!
//! Decodes an encoded ticket back into the text a 58mm printer would show.
//!
//! ## Architecture
//!
//! ```text
//! bytes → TextPreview → String
//!             ↓
//!       Process each command:
//!       - Track alignment and print mode
//!       - Skip control sequences by their known lengths
//!       - Render stored QR data as a unicode block
//!       - Draw cuts as a scissors line
//! ```
//!
//! Unknown `ESC`/`GS` commands are skipped as two-byte sequences. A truncated
//! trailing command is dropped.
//!
//! ## Example
//!
//! ```
//! use kotprint::preview::render_text;
//!
//! let bytes = b"\x1B\x40\x1B\x61\x01PAID\n\x1B\x61\x00Total  1.00\n";
//! let text = render_text(bytes);
//! assert!(text.contains("              PAID\n"));
//! assert!(text.contains("Total  1.00\n"));
//! ```

use qrcode::{Color, EcLevel, QrCode};
use tracing::debug;

use crate::layout::RECEIPT_WIDTH;
use crate::protocol::barcode::qr::QrErrorLevel;
use crate::protocol::commands::{ESC, GS, LF};
use crate::protocol::text::{Alignment, PrintMode};

/// Line drawn where the printer cuts.
pub const CUT_LINE: &str = "✂ - - - - - - - - - - - - - - -";

/// Decode a byte stream to text using the default paper width.
pub fn render_text(bytes: &[u8]) -> String {
    TextPreview::new(RECEIPT_WIDTH).render(bytes)
}

/// Style state tracked while decoding.
#[derive(Debug, Clone, Copy, Default)]
struct PreviewState {
    alignment: Alignment,
    mode: PrintMode,
}

/// Stateful ESC/POS to text decoder.
pub struct TextPreview {
    width: usize,
    state: PreviewState,
    current: Vec<u8>,
    lines: Vec<String>,
    qr_data: Option<Vec<u8>>,
    qr_level: QrErrorLevel,
}

impl TextPreview {
    /// Create a decoder for paper `width` characters wide.
    pub fn new(width: usize) -> Self {
        Self {
            width,
            state: PreviewState::default(),
            current: Vec::new(),
            lines: Vec::new(),
            qr_data: None,
            qr_level: QrErrorLevel::M,
        }
    }

    /// Decode the whole stream. Text left without a trailing line feed is
    /// flushed as a final line.
    pub fn render(mut self, bytes: &[u8]) -> String {
        let mut i = 0;
        while i < bytes.len() {
            let consumed = match bytes[i] {
                ESC => self.escape(&bytes[i..]),
                GS => self.group(&bytes[i..]),
                LF => {
                    self.flush();
                    1
                }
                b'\r' => 1,
                b => {
                    self.current.push(b);
                    1
                }
            };
            i += consumed.max(1);
        }
        if !self.current.is_empty() {
            self.flush();
        }

        debug!(lines = self.lines.len(), "rendered text preview");
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    // ========================================================================
    // COMMAND DECODING
    // ========================================================================

    /// `ESC x ...` commands. Returns bytes consumed.
    fn escape(&mut self, cmd: &[u8]) -> usize {
        let Some(&code) = cmd.get(1) else {
            return cmd.len();
        };
        let arg = cmd.get(2).copied();
        match (code, arg) {
            (b'@', _) => {
                self.state = PreviewState::default();
                2
            }
            (b'a', Some(n)) => {
                self.state.alignment = match n {
                    1 | b'1' => Alignment::Center,
                    2 | b'2' => Alignment::Right,
                    _ => Alignment::Left,
                };
                3
            }
            (b'!', Some(n)) => {
                self.state.mode = PrintMode(n);
                3
            }
            (b'd', Some(n)) => {
                if !self.current.is_empty() {
                    self.flush();
                }
                for _ in 0..n {
                    self.lines.push(String::new());
                }
                3
            }
            (b't' | b'3' | b'J' | b'E' | b'-' | b'M', Some(_)) => 3,
            (_, None) => cmd.len(),
            _ => 2,
        }
    }

    /// `GS x ...` commands. Returns bytes consumed.
    fn group(&mut self, cmd: &[u8]) -> usize {
        let Some(&code) = cmd.get(1) else {
            return cmd.len();
        };
        match code {
            b'V' => {
                if !self.current.is_empty() {
                    self.flush();
                }
                self.lines.push(CUT_LINE.to_string());
                match cmd.get(2) {
                    Some(b'A' | b'B') => 4,
                    _ => 3,
                }
            }
            b'(' => {
                if cmd.len() < 5 {
                    return cmd.len();
                }
                let params = cmd[3] as usize | ((cmd[4] as usize) << 8);
                let end = (5 + params).min(cmd.len());
                if cmd[2] == b'k' {
                    self.qr_function(&cmd[5..end]);
                }
                end
            }
            _ => 2,
        }
    }

    /// `GS ( k` body: `cn fn [m] data...`.
    fn qr_function(&mut self, body: &[u8]) {
        match body {
            [0x31, 0x45, level, ..] => {
                self.qr_level = match level {
                    0x30 => QrErrorLevel::L,
                    0x32 => QrErrorLevel::Q,
                    0x33 => QrErrorLevel::H,
                    _ => QrErrorLevel::M,
                };
            }
            [0x31, 0x50, 0x30, data @ ..] => self.qr_data = Some(data.to_vec()),
            [0x31, 0x51, ..] => {
                if let Some(data) = self.qr_data.take() {
                    self.render_qr(&data);
                }
            }
            _ => {}
        }
    }

    // ========================================================================
    // OUTPUT
    // ========================================================================

    fn flush(&mut self) {
        let text = String::from_utf8_lossy(&self.current).into_owned();
        self.current.clear();
        let line = self.aligned(&text);
        self.lines.push(line);
        if self.state.mode.is_double_height() {
            // Second row of a double-height line
            self.lines.push(String::new());
        }
    }

    fn aligned(&self, text: &str) -> String {
        let len = text.chars().count();
        let slack = self.width.saturating_sub(len);
        let pad = match self.state.alignment {
            Alignment::Left => 0,
            Alignment::Center => slack / 2,
            Alignment::Right => slack,
        };
        format!("{}{}", " ".repeat(pad), text)
    }

    /// Draw a QR code with half-block characters, two modules per row.
    fn render_qr(&mut self, data: &[u8]) {
        let ec_level = match self.qr_level {
            QrErrorLevel::L => EcLevel::L,
            QrErrorLevel::M => EcLevel::M,
            QrErrorLevel::Q => EcLevel::Q,
            QrErrorLevel::H => EcLevel::H,
        };

        let code = match QrCode::with_error_correction_level(data, ec_level) {
            Ok(code) => code,
            Err(e) => {
                let line = self.aligned(&format!("[QR: {}]", e));
                self.lines.push(line);
                return;
            }
        };

        let size = code.width();
        let dark = |x: usize, y: usize| y < size && code[(x, y)] == Color::Dark;
        for y in (0..size).step_by(2) {
            let row: String = (0..size)
                .map(|x| match (dark(x, y), dark(x, y + 1)) {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                })
                .collect();
            let line = self.aligned(&row);
            self.lines.push(line);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
