//! # Mock BLE Adapter
//!
//! In-memory [`BleAdapter`] with scriptable devices, service tables and
//! failures. Every write is recorded with a `tokio` timestamp, so tests
//! running with a paused clock can assert frame pacing exactly.
//!
//! ## Example
//!
//! ```
//! use kotprint::printer::config::SERVICE_UUIDS;
//! use kotprint::transport::{DeviceId, MockAdapter};
//!
//! let mock = MockAdapter::new();
//! mock.add_printer("AA:BB", "MPT-II");
//! assert_eq!(mock.services_of(&DeviceId::from("AA:BB"))[0].uuid, SERVICE_UUIDS[0]);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use super::{
    BleAdapter, DeviceId, DeviceStream, DisconnectStream, DiscoveredDevice, GattService,
    ScanFilter,
};
use crate::error::{PrintError, Result};
use crate::printer::config::{CHARACTERISTIC_UUIDS, SERVICE_UUIDS};

/// Radio state reported by [`BleAdapter::ensure_ready`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RadioState {
    #[default]
    Ready,
    PermissionDenied,
    PoweredOff,
}

/// One recorded write.
#[derive(Debug, Clone)]
pub struct WriteRecord {
    pub device: DeviceId,
    pub service: Uuid,
    pub characteristic: Uuid,
    pub data: Vec<u8>,
    pub at: Instant,
}

#[derive(Default)]
struct MockState {
    radio: RadioState,
    devices: Vec<DiscoveredDevice>,
    services: HashMap<DeviceId, Vec<GattService>>,
    connected: HashSet<DeviceId>,
    mtu: Option<u16>,
    fail_write_at: Option<usize>,
    write_attempts: usize,
    writes: Vec<WriteRecord>,
    connect_calls: usize,
    disconnect_calls: usize,
    scanning: bool,
    listeners: Vec<mpsc::UnboundedSender<DeviceId>>,
}

/// Scriptable in-memory BLE central.
#[derive(Default)]
pub struct MockAdapter {
    state: Mutex<MockState>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========================================================================
    // SCRIPTING
    // ========================================================================

    /// Register a device advertising the first known printer service, with
    /// the matching write characteristic.
    pub fn add_printer(&self, id: &str, name: &str) {
        let id = DeviceId::from(id);
        let mut state = self.state();
        state.devices.push(DiscoveredDevice {
            id: id.clone(),
            name: Some(name.to_string()),
            rssi: Some(-55),
            services: vec![SERVICE_UUIDS[0]],
        });
        state.services.insert(
            id,
            vec![GattService {
                uuid: SERVICE_UUIDS[0],
                characteristics: vec![CHARACTERISTIC_UUIDS[0]],
            }],
        );
    }

    /// Register an arbitrary device.
    pub fn add_device(&self, device: DiscoveredDevice, services: Vec<GattService>) {
        let mut state = self.state();
        state.services.insert(device.id.clone(), services);
        state.devices.push(device);
    }

    /// Replace the GATT table returned by later service discoveries.
    pub fn set_services(&self, id: &DeviceId, services: Vec<GattService>) {
        self.state().services.insert(id.clone(), services);
    }

    pub fn services_of(&self, id: &DeviceId) -> Vec<GattService> {
        self.state().services.get(id).cloned().unwrap_or_default()
    }

    pub fn set_radio(&self, radio: RadioState) {
        self.state().radio = radio;
    }

    /// MTU reported by later connects.
    pub fn set_mtu(&self, mtu: Option<u16>) {
        self.state().mtu = mtu;
    }

    /// Fail the `n`th write attempt (1-based, counted across the adapter's
    /// lifetime).
    pub fn fail_write_at(&self, n: usize) {
        self.state().fail_write_at = Some(n);
    }

    /// Drop the connection and notify disconnect subscribers.
    pub fn simulate_disconnect(&self, id: &DeviceId) {
        let mut state = self.state();
        state.connected.remove(id);
        state
            .listeners
            .retain(|tx| tx.unbounded_send(id.clone()).is_ok());
    }

    // ========================================================================
    // INSPECTION
    // ========================================================================

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.state().writes.clone()
    }

    /// All written bytes, concatenated in order.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.state()
            .writes
            .iter()
            .flat_map(|w| w.data.iter().copied())
            .collect()
    }

    pub fn connect_calls(&self) -> usize {
        self.state().connect_calls
    }

    pub fn disconnect_calls(&self) -> usize {
        self.state().disconnect_calls
    }

    pub fn is_connected(&self, id: &DeviceId) -> bool {
        self.state().connected.contains(id)
    }

    pub fn is_scanning(&self) -> bool {
        self.state().scanning
    }
}

#[async_trait]
impl BleAdapter for MockAdapter {
    async fn ensure_ready(&self) -> Result<()> {
        match self.state().radio {
            RadioState::Ready => Ok(()),
            RadioState::PermissionDenied => Err(PrintError::PermissionDenied),
            RadioState::PoweredOff => Err(PrintError::BluetoothOff),
        }
    }

    async fn start_scan(&self, filter: &ScanFilter) -> Result<DeviceStream> {
        let mut state = self.state();
        state.scanning = true;
        let found: Vec<DiscoveredDevice> = state
            .devices
            .iter()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect();
        debug!(count = found.len(), "mock scan started");
        Ok(futures::stream::iter(found).boxed())
    }

    async fn stop_scan(&self) -> Result<()> {
        self.state().scanning = false;
        Ok(())
    }

    async fn connect(&self, device: &DeviceId) -> Result<Option<u16>> {
        let mut state = self.state();
        state.connect_calls += 1;
        if !state.devices.iter().any(|d| &d.id == device) {
            return Err(PrintError::DeviceNotFound(device.to_string()));
        }
        state.connected.insert(device.clone());
        Ok(state.mtu)
    }

    async fn discover_services(&self, device: &DeviceId) -> Result<Vec<GattService>> {
        let state = self.state();
        if !state.connected.contains(device) {
            return Err(PrintError::ConnectionLost);
        }
        Ok(state.services.get(device).cloned().unwrap_or_default())
    }

    async fn write(
        &self,
        device: &DeviceId,
        service: Uuid,
        characteristic: Uuid,
        data: &[u8],
    ) -> Result<()> {
        let mut state = self.state();
        state.write_attempts += 1;
        if state.fail_write_at == Some(state.write_attempts) {
            return Err(PrintError::Adapter("write not acknowledged".into()));
        }
        if !state.connected.contains(device) {
            return Err(PrintError::ConnectionLost);
        }
        state.writes.push(WriteRecord {
            device: device.clone(),
            service,
            characteristic,
            data: data.to_vec(),
            at: Instant::now(),
        });
        Ok(())
    }

    async fn disconnect(&self, device: &DeviceId) -> Result<()> {
        let mut state = self.state();
        state.disconnect_calls += 1;
        state.connected.remove(device);
        Ok(())
    }

    async fn disconnects(&self) -> Result<DisconnectStream> {
        let (tx, rx) = mpsc::unbounded();
        self.state().listeners.push(tx);
        Ok(rx.boxed())
    }
}
