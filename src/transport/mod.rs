//! # Printer Transport Layer
//!
//! Backends and framing for sending encoded tickets to BLE printers.
//!
//! ## Structure
//!
//! - [`BleAdapter`]: the seam between the connection manager and a radio
//! - [`bluetooth`]: `btleplug` backend for the host's Bluetooth adapter
//! - [`mock`]: scriptable in-memory backend for tests and dry runs
//! - [`chunked`]: splits a stream into acknowledged frames with pacing
//!
//! ```text
//! bytes ──► ChunkedTransport ──► FrameWriter ──► BleAdapter::write
//!            (100 B / 200 ms)     (link)          (with response)
//! ```

pub mod bluetooth;
pub mod chunked;
pub mod mock;

use std::fmt;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::printer::config::SERVICE_UUIDS;

pub use bluetooth::BtleplugAdapter;
pub use chunked::{ChunkedTransport, EncodedFrame, FrameWriter, TransportConfig};
pub use mock::MockAdapter;

// ============================================================================
// DEVICE TYPES
// ============================================================================

/// Platform device identifier (address on Linux, UUID on macOS).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A peripheral seen during a scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscoveredDevice {
    pub id: DeviceId,
    /// Advertised local name, if any
    pub name: Option<String>,
    pub rssi: Option<i16>,
    /// Advertised service UUIDs
    pub services: Vec<Uuid>,
}

/// Which discovered devices a scan yields.
///
/// Cheap printers often advertise no service UUIDs at all, so a name prefix
/// can be given as an alternative match.
#[derive(Debug, Clone, Default)]
pub struct ScanFilter {
    pub services: Vec<Uuid>,
    pub name_prefix: Option<String>,
}

impl ScanFilter {
    /// Match any device.
    pub fn any() -> Self {
        Self::default()
    }

    /// Match devices advertising one of the known printer services.
    pub fn printers() -> Self {
        Self {
            services: SERVICE_UUIDS.to_vec(),
            name_prefix: None,
        }
    }

    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = Some(prefix.into());
        self
    }

    /// Whether `device` passes the filter. An empty filter passes everything.
    pub fn matches(&self, device: &DiscoveredDevice) -> bool {
        if self.services.is_empty() && self.name_prefix.is_none() {
            return true;
        }
        let by_service = device.services.iter().any(|s| self.services.contains(s));
        let by_name = match (&self.name_prefix, &device.name) {
            (Some(prefix), Some(name)) => name.starts_with(prefix.as_str()),
            _ => false,
        };
        by_service || by_name
    }
}

/// A GATT service and the UUIDs of its characteristics.
#[derive(Debug, Clone, PartialEq)]
pub struct GattService {
    pub uuid: Uuid,
    pub characteristics: Vec<Uuid>,
}

/// Stream of devices found by an active scan.
pub type DeviceStream = BoxStream<'static, DiscoveredDevice>;

/// Stream of devices that dropped their connection.
pub type DisconnectStream = BoxStream<'static, DeviceId>;

// ============================================================================
// ADAPTER TRAIT
// ============================================================================

/// A Bluetooth LE central.
///
/// Implementations own whatever platform handles they need; callers only
/// see [`DeviceId`]s. All methods report failures with the crate's
/// [`PrintError`](crate::error::PrintError) taxonomy.
#[async_trait]
pub trait BleAdapter: Send + Sync + 'static {
    /// Fail with `PermissionDenied` or `BluetoothOff` if the radio cannot
    /// be used.
    async fn ensure_ready(&self) -> Result<()>;

    /// Start scanning and return the discovery stream.
    async fn start_scan(&self, filter: &ScanFilter) -> Result<DeviceStream>;

    async fn stop_scan(&self) -> Result<()>;

    /// Connect to a device. Returns the negotiated ATT MTU when the backend
    /// exposes it.
    async fn connect(&self, device: &DeviceId) -> Result<Option<u16>>;

    /// Discover the GATT services of a connected device.
    async fn discover_services(&self, device: &DeviceId) -> Result<Vec<GattService>>;

    /// Write one frame and wait for the peripheral's response.
    async fn write(
        &self,
        device: &DeviceId,
        service: Uuid,
        characteristic: Uuid,
        data: &[u8],
    ) -> Result<()>;

    async fn disconnect(&self, device: &DeviceId) -> Result<()>;

    /// Subscribe to unexpected disconnects.
    async fn disconnects(&self) -> Result<DisconnectStream>;
}
