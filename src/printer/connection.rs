//! # Connection Manager
//!
//! Owns the link to one BLE printer and every transition of its state.
//!
//! ## States
//!
//! ```text
//!                 connect()
//! Disconnected ─────────────► Connecting ──ok──► Ready ◄──────┐
//!      ▲                          │                │ send()    │ ok
//!      │ disconnect()             │ err            ▼           │
//!      └──────────────────────────┘             Writing ───────┘
//!                                                  │ write failed
//!   unexpected drop (Ready/Writing)                ▼
//!   ──► one reconnect ──err──────────────────►   Lost
//! ```
//!
//! `Lost` is sticky: sends fail fast with [`PrintError::ConnectionLost`]
//! without touching the radio until the caller connects again. An unexpected
//! disconnect triggers at most one silent reconnect attempt per event.
//!
//! ## Link generations
//!
//! Every teardown of the link bumps a generation counter. A send remembers
//! the generation it started on and checks it before each frame, so a drop
//! in the middle of a ticket fails that job instead of finishing the stream
//! over a fresh connection. The reconnect waits on the wire lock held by the
//! in-flight send; the state stays `Connecting` until then and no other
//! stream can start.

use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::{CHARACTERISTIC_UUIDS, SERVICE_UUIDS};
use crate::error::{PrintError, Result};
use crate::transport::{
    BleAdapter, ChunkedTransport, DeviceId, DeviceStream, DiscoveredDevice, EncodedFrame,
    FrameWriter, GattService, ScanFilter, TransportConfig,
};

/// ATT header bytes subtracted from the MTU to get the usable payload.
const ATT_HEADER_LEN: usize = 3;

// ============================================================================
// LINK TYPES
// ============================================================================

/// State of the printer link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Ready,
    Writing,
    Lost,
}

/// A resolved connection to a printer's write characteristic.
#[derive(Debug, Clone, PartialEq)]
pub struct PrinterLink {
    pub device_id: DeviceId,
    pub service_uuid: Uuid,
    pub characteristic_uuid: Uuid,
    pub mtu: Option<u16>,
    pub state: LinkState,
}

#[derive(Default)]
struct Inner {
    state: LinkState,
    link: Option<PrinterLink>,
    generation: u64,
    watcher: Option<JoinHandle<()>>,
}

impl Inner {
    fn set_state(&mut self, state: LinkState) {
        self.state = state;
        if let Some(link) = &mut self.link {
            link.state = state;
        }
    }

    fn is_link_to(&self, device: &DeviceId) -> bool {
        self.link.as_ref().is_some_and(|l| &l.device_id == device)
    }

    /// Destroy the current link. Sends started on it fail at their next frame.
    fn take_link(&mut self) -> Option<PrinterLink> {
        self.generation = self.generation.wrapping_add(1);
        self.link.take()
    }
}

// ============================================================================
// SCAN STREAM
// ============================================================================

/// Devices discovered by an active scan.
///
/// Scanning stops when [`stop`](DeviceScan::stop) is awaited or the scan is
/// dropped.
pub struct DeviceScan<A: BleAdapter> {
    stream: DeviceStream,
    adapter: Arc<A>,
    stopped: bool,
}

impl<A: BleAdapter> DeviceScan<A> {
    pub async fn stop(mut self) -> Result<()> {
        self.stopped = true;
        self.adapter.stop_scan().await
    }
}

impl<A: BleAdapter> Stream for DeviceScan<A> {
    type Item = DiscoveredDevice;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.stream.poll_next_unpin(cx)
    }
}

impl<A: BleAdapter> Drop for DeviceScan<A> {
    fn drop(&mut self) {
        if self.stopped {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let adapter = Arc::clone(&self.adapter);
            handle.spawn(async move {
                if let Err(e) = adapter.stop_scan().await {
                    debug!(error = %e, "stop scan on drop failed");
                }
            });
        }
    }
}

// ============================================================================
// FRAME WRITER
// ============================================================================

struct LinkWriter<'a, A: BleAdapter> {
    manager: &'a ConnectionManager<A>,
    link: &'a PrinterLink,
    generation: u64,
}

#[async_trait]
impl<A: BleAdapter> FrameWriter for LinkWriter<'_, A> {
    async fn write_frame(&self, frame: &EncodedFrame) -> Result<()> {
        if self.manager.inner().generation != self.generation {
            return Err(PrintError::ConnectionLost);
        }
        self.manager
            .adapter
            .write(
                &self.link.device_id,
                self.link.service_uuid,
                self.link.characteristic_uuid,
                frame.as_bytes(),
            )
            .await
    }
}

// ============================================================================
// CONNECTION MANAGER
// ============================================================================

/// # Connection Manager
///
/// Scans for printers, resolves the vendor GATT layout, and sends encoded
/// streams over the resulting link.
///
/// ## Example
///
/// ```
/// use std::sync::Arc;
/// use kotprint::printer::{ConnectionManager, LinkState};
/// use kotprint::transport::{DeviceId, MockAdapter, TransportConfig};
///
/// # tokio_test_block_on(async {
/// let mock = Arc::new(MockAdapter::new());
/// mock.add_printer("AA:BB", "MPT-II");
///
/// let manager = ConnectionManager::new(mock.clone(), TransportConfig::default());
/// manager.connect(&DeviceId::from("AA:BB")).await.unwrap();
/// assert_eq!(manager.state(), LinkState::Ready);
///
/// manager.send(b"hello\n").await.unwrap();
/// assert_eq!(mock.written_bytes(), b"hello\n");
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
/// # }
/// ```
pub struct ConnectionManager<A: BleAdapter> {
    adapter: Arc<A>,
    transport: ChunkedTransport,
    inner: Mutex<Inner>,
    /// Held for the whole of a send, and by a reconnect before it touches
    /// the radio.
    wire: AsyncMutex<()>,
}

impl<A: BleAdapter> ConnectionManager<A> {
    pub fn new(adapter: Arc<A>, config: TransportConfig) -> Self {
        Self {
            adapter,
            transport: ChunkedTransport::new(config),
            inner: Mutex::new(Inner::default()),
            wire: AsyncMutex::new(()),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn adapter(&self) -> &Arc<A> {
        &self.adapter
    }

    pub fn transport_config(&self) -> &TransportConfig {
        self.transport.config()
    }

    pub fn state(&self) -> LinkState {
        self.inner().state
    }

    /// Current link, if one is established.
    pub fn link(&self) -> Option<PrinterLink> {
        self.inner().link.clone()
    }

    // ========================================================================
    // DISCOVERY
    // ========================================================================

    /// Start a scan. Fails before scanning if the radio is unusable.
    pub async fn scan(&self, filter: &ScanFilter) -> Result<DeviceScan<A>> {
        self.adapter.ensure_ready().await?;
        let stream = self.adapter.start_scan(filter).await?;
        Ok(DeviceScan {
            stream,
            adapter: Arc::clone(&self.adapter),
            stopped: false,
        })
    }

    // ========================================================================
    // CONNECTION LIFECYCLE
    // ========================================================================

    /// Connect to `device` and resolve its printer service and write
    /// characteristic.
    ///
    /// An existing link is torn down first, including its radio connection.
    pub async fn connect(&self, device: &DeviceId) -> Result<PrinterLink> {
        self.adapter.ensure_ready().await?;
        let previous = {
            let mut inner = self.inner();
            match inner.state {
                LinkState::Connecting | LinkState::Writing => return Err(PrintError::Busy),
                _ => {}
            }
            let previous = inner.take_link();
            inner.set_state(LinkState::Connecting);
            previous
        };
        if let Some(old) = previous {
            info!(id = %old.device_id, "releasing previous printer");
            self.drop_radio_link(&old.device_id).await;
        }

        match self.establish(device).await {
            Ok(link) => Ok(link),
            Err(e) => {
                self.inner().set_state(LinkState::Disconnected);
                Err(e)
            }
        }
    }

    /// Connect, discover and store a Ready link. Leaves the state untouched
    /// on failure.
    async fn establish(&self, device: &DeviceId) -> Result<PrinterLink> {
        info!(id = %device, "connecting to printer");
        let mtu = self.adapter.connect(device).await?;

        let services = match self.adapter.discover_services(device).await {
            Ok(services) => services,
            Err(e) => {
                self.drop_radio_link(device).await;
                return Err(e);
            }
        };
        let (service_uuid, characteristic_uuid) = match resolve_gatt(device, &services) {
            Ok(pair) => pair,
            Err(e) => {
                self.drop_radio_link(device).await;
                return Err(e);
            }
        };

        let chunk_size = self.transport.config().chunk_size;
        if let Some(mtu) = mtu {
            let payload = (mtu as usize).saturating_sub(ATT_HEADER_LEN);
            if payload < chunk_size {
                warn!(mtu, chunk_size, "negotiated MTU is smaller than the frame size");
            }
        }

        let link = PrinterLink {
            device_id: device.clone(),
            service_uuid,
            characteristic_uuid,
            mtu,
            state: LinkState::Ready,
        };
        {
            let mut inner = self.inner();
            inner.link = Some(link.clone());
            inner.set_state(LinkState::Ready);
        }
        info!(
            id = %device,
            service = %service_uuid,
            characteristic = %characteristic_uuid,
            "printer ready"
        );
        Ok(link)
    }

    async fn drop_radio_link(&self, device: &DeviceId) {
        if let Err(e) = self.adapter.disconnect(device).await {
            debug!(id = %device, error = %e, "cleanup disconnect failed");
        }
    }

    /// Explicit teardown. The link is destroyed and the state is
    /// `Disconnected`.
    pub async fn disconnect(&self) -> Result<()> {
        let link = {
            let mut inner = self.inner();
            let link = inner.take_link();
            inner.set_state(LinkState::Disconnected);
            link
        };
        match link {
            Some(link) => {
                info!(id = %link.device_id, "disconnecting");
                self.adapter.disconnect(&link.device_id).await
            }
            None => Ok(()),
        }
    }

    /// React to an unexpected drop of `device`.
    ///
    /// From `Ready` or `Writing` the link is destroyed and one reconnect is
    /// attempted. If it fails the state is `Lost` and the error is returned.
    /// Events for other devices or in other states are ignored.
    ///
    /// A send in flight on the dropped link fails; the reconnect starts only
    /// after that send has returned.
    pub async fn handle_disconnect(&self, device: &DeviceId) -> Result<()> {
        {
            let mut inner = self.inner();
            if !inner.is_link_to(device)
                || !matches!(inner.state, LinkState::Ready | LinkState::Writing)
            {
                debug!(id = %device, state = ?inner.state, "ignoring disconnect");
                return Ok(());
            }
            if inner.state == LinkState::Writing {
                warn!(id = %device, "printer dropped mid-ticket, failing the job");
            }
            inner.take_link();
            inner.set_state(LinkState::Connecting);
        }

        let _wire = self.wire.lock().await;
        warn!(id = %device, "printer disconnected, reconnecting once");
        match self.establish(device).await {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(id = %device, error = %e, "reconnect failed");
                self.inner().set_state(LinkState::Lost);
                Err(e)
            }
        }
    }

    /// Forward adapter disconnect events to [`handle_disconnect`] on a
    /// background task. The task is stopped by [`shutdown`].
    ///
    /// [`handle_disconnect`]: ConnectionManager::handle_disconnect
    /// [`shutdown`]: ConnectionManager::shutdown
    pub async fn watch_disconnects(self: &Arc<Self>) -> Result<()> {
        let mut events = self.adapter.disconnects().await?;
        let manager = Arc::clone(self);
        let handle = tokio::spawn(async move {
            while let Some(device) = events.next().await {
                if let Err(e) = manager.handle_disconnect(&device).await {
                    warn!(id = %device, error = %e, "link lost");
                }
            }
        });
        if let Some(old) = self.inner().watcher.replace(handle) {
            old.abort();
        }
        Ok(())
    }

    /// Stop the disconnect watcher and tear down any link.
    pub async fn shutdown(&self) -> Result<()> {
        if let Some(watcher) = self.inner().watcher.take() {
            watcher.abort();
        }
        self.disconnect().await
    }

    // ========================================================================
    // SENDING
    // ========================================================================

    /// Send an encoded stream over the link.
    ///
    /// ## Errors
    ///
    /// - `ConnectionLost` when there is no usable link; nothing is written
    /// - `Busy` while another send or a reconnect is in progress
    /// - `WriteFailed` when a frame is rejected or the link drops mid-stream;
    ///   the link becomes `Lost` or is handed to the reconnect
    pub async fn send(&self, bytes: &[u8]) -> Result<()> {
        let Ok(_wire) = self.wire.try_lock() else {
            return Err(PrintError::Busy);
        };
        let (link, generation) = {
            let mut inner = self.inner();
            match inner.state {
                LinkState::Ready => {}
                LinkState::Writing | LinkState::Connecting => return Err(PrintError::Busy),
                LinkState::Lost | LinkState::Disconnected => {
                    return Err(PrintError::ConnectionLost);
                }
            }
            let Some(link) = inner.link.clone() else {
                return Err(PrintError::ConnectionLost);
            };
            inner.set_state(LinkState::Writing);
            (link, inner.generation)
        };

        let writer = LinkWriter {
            manager: self,
            link: &link,
            generation,
        };
        let result = self.transport.send(bytes, &writer).await;

        let mut inner = self.inner();
        if inner.generation != generation {
            // The link dropped under us; the disconnect handler owns the state
            return match result {
                Ok(()) => Err(PrintError::ConnectionLost),
                Err(e) => Err(e),
            };
        }
        match &result {
            Ok(()) => inner.set_state(LinkState::Ready),
            Err(e) => {
                warn!(id = %link.device_id, error = %e, "write failed, link lost");
                inner.take_link();
                inner.set_state(LinkState::Lost);
            }
        }
        result
    }
}

/// Pick the first known printer service, then its first known write
/// characteristic.
fn resolve_gatt(device: &DeviceId, services: &[GattService]) -> Result<(Uuid, Uuid)> {
    let service = SERVICE_UUIDS
        .iter()
        .find_map(|known| services.iter().find(|s| &s.uuid == known))
        .ok_or_else(|| PrintError::ServiceNotFound(device.to_string()))?;
    let characteristic = CHARACTERISTIC_UUIDS
        .iter()
        .find(|known| service.characteristics.contains(*known))
        .ok_or_else(|| PrintError::CharacteristicNotFound(device.to_string()))?;
    Ok((service.uuid, *characteristic))
}

// ============================================================================
// TESTS
// ============================================================================
