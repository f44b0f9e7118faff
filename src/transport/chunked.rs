//! # Chunked Frame Transport
//!
//! Cheap BLE printers have a small receive buffer and a small ATT MTU. A
//! ticket is therefore sent as a series of bounded frames, each written with
//! response so the acknowledgment gates the next frame, with a pause between
//! frames to let the print head drain the buffer.
//!
//! ## Timing
//!
//! ```text
//! frame 1 ──ack──► sleep ──► frame 2 ──ack──► sleep ──► frame 3 ──ack──► done
//! ```
//!
//! There is no sleep after the last frame. The first failed or unacknowledged
//! write aborts the remaining frames and the whole job fails with
//! [`PrintError::WriteFailed`]; the printer has already received part of the
//! ticket, so nothing is resent.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PrintError, Result};

/// Default frame size in bytes
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Default pause between frames
pub const DEFAULT_INTER_CHUNK_DELAY_MS: u64 = 200;

/// Default time to wait for a single write response
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 5_000;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Framing parameters.
///
/// ```
/// use kotprint::transport::TransportConfig;
///
/// let config: TransportConfig = serde_json::from_str(r#"{"chunk_size": 180}"#).unwrap();
/// assert_eq!(config.chunk_size, 180);
/// assert_eq!(config.inter_chunk_delay_ms, 200);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub chunk_size: usize,
    pub inter_chunk_delay_ms: u64,
    pub write_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            inter_chunk_delay_ms: DEFAULT_INTER_CHUNK_DELAY_MS,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
        }
    }
}

impl TransportConfig {
    pub fn inter_chunk_delay(&self) -> Duration {
        Duration::from_millis(self.inter_chunk_delay_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Number of frames needed for `len` bytes.
    pub fn frame_count(&self, len: usize) -> usize {
        len.div_ceil(self.chunk_size.max(1))
    }
}

// ============================================================================
// FRAMES
// ============================================================================

/// One bounded slice of an encoded stream, ready for a single write.
///
/// Only [`ChunkedTransport`] creates frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    bytes: Vec<u8>,
}

impl EncodedFrame {
    fn new(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Destination for frames. Returns once the peripheral acknowledged.
#[async_trait]
pub trait FrameWriter: Send + Sync {
    async fn write_frame(&self, frame: &EncodedFrame) -> Result<()>;
}

// ============================================================================
// TRANSPORT
// ============================================================================

/// Splits streams into frames and writes them in order.
#[derive(Debug, Clone, Default)]
pub struct ChunkedTransport {
    config: TransportConfig,
}

impl ChunkedTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Split `bytes` into frames of `chunk_size`; the last may be shorter.
    pub fn frames(&self, bytes: &[u8]) -> Vec<EncodedFrame> {
        bytes
            .chunks(self.config.chunk_size.max(1))
            .map(EncodedFrame::new)
            .collect()
    }

    /// Write `bytes` through `writer`, one acknowledged frame at a time.
    pub async fn send<W>(&self, bytes: &[u8], writer: &W) -> Result<()>
    where
        W: FrameWriter + ?Sized,
    {
        let frames = self.frames(bytes);
        let total = frames.len();
        let delay = self.config.inter_chunk_delay();
        info!(bytes = bytes.len(), frames = total, "sending stream");

        for (i, frame) in frames.iter().enumerate() {
            let index = i + 1;
            let outcome =
                tokio::time::timeout(self.config.write_timeout(), writer.write_frame(frame))
                    .await
                    .unwrap_or_else(|_| {
                        Err(PrintError::Adapter("write response timed out".into()))
                    });

            if let Err(e) = outcome {
                return Err(PrintError::WriteFailed {
                    frame: index,
                    total,
                    reason: e.to_string(),
                });
            }
            debug!(frame = index, total, len = frame.len(), "frame acknowledged");

            if index < total && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
