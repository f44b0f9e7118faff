//! # Bluetooth LE Transport
//!
//! [`BleAdapter`] implementation on `btleplug`, using the first adapter the
//! platform manager reports.
//!
//! ## Platform Notes
//!
//! - **Linux**: BlueZ over D-Bus. Device ids are BlueZ object paths.
//! - **macOS**: CoreBluetooth. Device ids are per-host UUIDs, not MAC
//!   addresses, and the first scan triggers the OS permission prompt.
//! - **Windows**: WinRT. Device ids are addresses.
//!
//! `btleplug` does not expose the negotiated ATT MTU, so [`connect`]
//! returns `None` and the connection manager keeps the configured frame
//! size.
//!
//! [`connect`]: BleAdapter::connect
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use kotprint::printer::ConnectionManager;
//! use kotprint::transport::{BtleplugAdapter, TransportConfig};
//!
//! # async fn run() -> kotprint::error::Result<()> {
//! let adapter = Arc::new(BtleplugAdapter::init().await?);
//! let manager = ConnectionManager::new(adapter, TransportConfig::default());
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, CentralState, Characteristic, Manager as _, Peripheral as _, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    BleAdapter, DeviceId, DeviceStream, DisconnectStream, DiscoveredDevice, GattService,
    ScanFilter,
};
use crate::error::{PrintError, Result};

type PeripheralMap = Arc<Mutex<HashMap<DeviceId, Peripheral>>>;

/// `btleplug`-backed BLE central.
pub struct BtleplugAdapter {
    adapter: Adapter,
    peripherals: PeripheralMap,
}

impl BtleplugAdapter {
    /// Open the platform manager and take its first adapter.
    pub async fn init() -> Result<Self> {
        let manager = Manager::new().await.map_err(map_err)?;
        let adapter = manager
            .adapters()
            .await
            .map_err(map_err)?
            .into_iter()
            .next()
            .ok_or_else(|| PrintError::Adapter("no Bluetooth adapter found".into()))?;

        match adapter.adapter_info().await {
            Ok(info) => info!(adapter = %info, "Bluetooth adapter ready"),
            Err(e) => debug!(error = %e, "adapter info unavailable"),
        }

        Ok(Self {
            adapter,
            peripherals: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Find the peripheral for an id, asking the adapter if the id was not
    /// seen during a scan in this session.
    async fn peripheral(&self, id: &DeviceId) -> Result<Peripheral> {
        let known = self
            .peripherals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned();
        if let Some(p) = known {
            return Ok(p);
        }

        let peripherals = self.adapter.peripherals().await.map_err(map_err)?;
        let found = peripherals.into_iter().find(|p| {
            p.id().to_string() == id.as_str()
                || p.address().to_string().eq_ignore_ascii_case(id.as_str())
        });
        match found {
            Some(p) => {
                remember(&self.peripherals, id.clone(), p.clone());
                Ok(p)
            }
            None => Err(PrintError::DeviceNotFound(id.to_string())),
        }
    }

    fn characteristic(
        &self,
        peripheral: &Peripheral,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<Characteristic> {
        peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == characteristic && c.service_uuid == service)
            .ok_or_else(|| PrintError::CharacteristicNotFound(characteristic.to_string()))
    }
}

fn remember(map: &PeripheralMap, id: DeviceId, peripheral: Peripheral) {
    map.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(id, peripheral);
}

fn map_err(e: btleplug::Error) -> PrintError {
    match e {
        btleplug::Error::PermissionDenied => PrintError::PermissionDenied,
        btleplug::Error::DeviceNotFound => PrintError::DeviceNotFound(String::new()),
        btleplug::Error::NotConnected => PrintError::ConnectionLost,
        other => PrintError::Adapter(other.to_string()),
    }
}

#[async_trait]
impl BleAdapter for BtleplugAdapter {
    async fn ensure_ready(&self) -> Result<()> {
        match self.adapter.adapter_state().await.map_err(map_err)? {
            CentralState::PoweredOff => Err(PrintError::BluetoothOff),
            // Some backends cannot report power state
            _ => Ok(()),
        }
    }

    async fn start_scan(&self, filter: &ScanFilter) -> Result<DeviceStream> {
        let events = self.adapter.events().await.map_err(map_err)?;
        self.adapter
            .start_scan(btleplug::api::ScanFilter::default())
            .await
            .map_err(map_err)?;
        info!("BLE scan started");

        let adapter = self.adapter.clone();
        let peripherals = Arc::clone(&self.peripherals);
        let filter = filter.clone();
        let seen = Arc::new(Mutex::new(HashSet::new()));

        let stream = events.filter_map(move |event| {
            let adapter = adapter.clone();
            let peripherals = Arc::clone(&peripherals);
            let filter = filter.clone();
            let seen = Arc::clone(&seen);
            async move {
                let CentralEvent::DeviceDiscovered(id) = event else {
                    return None;
                };
                let device_id = DeviceId::new(id.to_string());
                if seen
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .contains(&device_id)
                {
                    return None;
                }

                let peripheral = adapter.peripheral(&id).await.ok()?;
                let props = peripheral.properties().await.ok().flatten()?;
                let device = DiscoveredDevice {
                    id: device_id.clone(),
                    name: props.local_name,
                    rssi: props.rssi,
                    services: props.services,
                };
                if !filter.matches(&device) {
                    return None;
                }

                seen.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(device_id.clone());
                remember(&peripherals, device_id, peripheral);
                info!(id = %device.id, name = ?device.name, "found printer");
                Some(device)
            }
        });

        Ok(stream.boxed())
    }

    async fn stop_scan(&self) -> Result<()> {
        self.adapter.stop_scan().await.map_err(map_err)?;
        info!("BLE scan stopped");
        Ok(())
    }

    async fn connect(&self, device: &DeviceId) -> Result<Option<u16>> {
        let peripheral = self.peripheral(device).await?;
        info!(id = %device, "connecting");
        peripheral.connect().await.map_err(|e| match map_err(e) {
            PrintError::DeviceNotFound(_) => PrintError::DeviceNotFound(device.to_string()),
            other => other,
        })?;
        Ok(None)
    }

    async fn discover_services(&self, device: &DeviceId) -> Result<Vec<GattService>> {
        let peripheral = self.peripheral(device).await?;
        peripheral.discover_services().await.map_err(map_err)?;

        let services: Vec<GattService> = peripheral
            .services()
            .into_iter()
            .map(|s| GattService {
                uuid: s.uuid,
                characteristics: s.characteristics.iter().map(|c| c.uuid).collect(),
            })
            .collect();
        debug!(id = %device, count = services.len(), "services discovered");
        Ok(services)
    }

    async fn write(
        &self,
        device: &DeviceId,
        service: Uuid,
        characteristic: Uuid,
        data: &[u8],
    ) -> Result<()> {
        let peripheral = self.peripheral(device).await?;
        let target = self.characteristic(&peripheral, service, characteristic)?;
        peripheral
            .write(&target, data, WriteType::WithResponse)
            .await
            .map_err(map_err)
    }

    async fn disconnect(&self, device: &DeviceId) -> Result<()> {
        let peripheral = self.peripheral(device).await?;
        if let Err(e) = peripheral.disconnect().await {
            warn!(id = %device, error = %e, "disconnect failed");
            return Err(map_err(e));
        }
        info!(id = %device, "disconnected");
        Ok(())
    }

    async fn disconnects(&self) -> Result<DisconnectStream> {
        let events = self.adapter.events().await.map_err(map_err)?;
        let stream = events.filter_map(|event| async move {
            match event {
                CentralEvent::DeviceDisconnected(id) => Some(DeviceId::new(id.to_string())),
                _ => None,
            }
        });
        Ok(stream.boxed())
    }
}
