//! # Connection Tests
//!
//! Drives the connection manager and spooler against the in-memory adapter:
//! frame pacing, one-shot reconnect, and job ordering.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use kotprint::document::{Document, DocumentKind, OrderSnapshot};
use kotprint::printer::{ConnectionManager, LinkState, PrintSpooler, PrinterConfig};
use kotprint::receipt;
use kotprint::transport::{DeviceId, MockAdapter, TransportConfig};
use kotprint::PrintError;

const PRINTER: &str = "AA:BB:CC:DD:EE:FF";

async fn connected() -> (Arc<MockAdapter>, Arc<ConnectionManager<MockAdapter>>) {
    let mock = Arc::new(MockAdapter::new());
    mock.add_printer(PRINTER, "MPT-II");
    let manager = Arc::new(ConnectionManager::new(
        Arc::clone(&mock),
        TransportConfig::default(),
    ));
    manager.connect(&DeviceId::from(PRINTER)).await.unwrap();
    (mock, manager)
}

/// Let the disconnect watcher run until the manager settles.
async fn settle(manager: &ConnectionManager<MockAdapter>, want: LinkState) {
    for _ in 0..100 {
        if manager.state() == want {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("state stuck at {:?}, wanted {:?}", manager.state(), want);
}

// ============================================================================
// PACING
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_send_250_bytes_in_three_paced_frames() {
    let (mock, manager) = connected().await;
    let payload: Vec<u8> = (0..250u32).map(|i| (i % 256) as u8).collect();

    manager.send(&payload).await.unwrap();

    let writes = mock.writes();
    let sizes: Vec<usize> = writes.iter().map(|w| w.data.len()).collect();
    assert_eq!(sizes, vec![100, 100, 50]);
    assert_eq!(mock.written_bytes(), payload);

    assert_eq!(writes[1].at - writes[0].at, Duration::from_millis(200));
    assert_eq!(writes[2].at - writes[1].at, Duration::from_millis(200));
    assert_eq!(manager.state(), LinkState::Ready);
}

#[tokio::test(start_paused = true)]
async fn test_frames_target_resolved_characteristic() {
    let (mock, manager) = connected().await;
    let link = manager.link().unwrap();

    manager.send(b"hello").await.unwrap();

    let writes = mock.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].device, DeviceId::from(PRINTER));
    assert_eq!(writes[0].service, link.service_uuid);
    assert_eq!(writes[0].characteristic, link.characteristic_uuid);
}

#[tokio::test(start_paused = true)]
async fn test_second_frame_failure() {
    let (mock, manager) = connected().await;
    mock.fail_write_at(2);

    let err = manager.send(&[0u8; 250]).await.unwrap_err();
    assert!(matches!(err, PrintError::WriteFailed { frame: 2, total: 3, .. }));
    // The failed attempt is the last one; the third frame is never tried
    assert_eq!(mock.writes().len(), 1);
    assert_eq!(manager.state(), LinkState::Lost);
    assert!(manager.link().is_none());
}

// ============================================================================
// RECONNECT
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_failed_reconnect_is_sticky() {
    let (mock, manager) = connected().await;
    let id = DeviceId::from(PRINTER);
    assert_eq!(mock.connect_calls(), 1);

    // The printer comes back without its print service
    mock.set_services(&id, vec![]);
    mock.simulate_disconnect(&id);

    let err = manager.handle_disconnect(&id).await.unwrap_err();
    assert!(matches!(err, PrintError::ServiceNotFound(_)));
    assert_eq!(mock.connect_calls(), 2);
    assert_eq!(manager.state(), LinkState::Lost);

    // Lost stays lost: no retry, no writes
    assert!(matches!(
        manager.send(b"ticket").await,
        Err(PrintError::ConnectionLost)
    ));
    manager.handle_disconnect(&id).await.unwrap();
    assert_eq!(mock.connect_calls(), 2);
    assert!(mock.writes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_watcher_reconnects_once() {
    let (mock, manager) = connected().await;
    let id = DeviceId::from(PRINTER);
    manager.watch_disconnects().await.unwrap();

    mock.simulate_disconnect(&id);
    while mock.connect_calls() < 2 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    settle(&manager, LinkState::Ready).await;
    assert!(mock.is_connected(&id));

    manager.send(b"after reconnect").await.unwrap();
    assert_eq!(mock.written_bytes(), b"after reconnect".to_vec());

    manager.shutdown().await.unwrap();
    assert_eq!(manager.state(), LinkState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_watcher_marks_lost_when_reconnect_fails() {
    let (mock, manager) = connected().await;
    let id = DeviceId::from(PRINTER);
    manager.watch_disconnects().await.unwrap();

    mock.set_services(&id, vec![]);
    mock.simulate_disconnect(&id);
    settle(&manager, LinkState::Lost).await;

    assert_eq!(mock.connect_calls(), 2);
    assert!(!mock.is_connected(&id));
}

#[tokio::test(start_paused = true)]
async fn test_drop_mid_ticket_fails_the_job() {
    let (mock, manager) = connected().await;
    let id = DeviceId::from(PRINTER);
    manager.watch_disconnects().await.unwrap();

    let sender = Arc::clone(&manager);
    let job = tokio::spawn(async move { sender.send(&[0x41; 250]).await });

    // First frame is out, the transport is pausing before the second
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(mock.writes().len(), 1);
    mock.simulate_disconnect(&id);

    let result = job.await.unwrap();
    assert!(matches!(
        result,
        Err(PrintError::WriteFailed { frame: 2, total: 3, .. })
    ));
    // The tail never reaches the reconnected printer
    assert_eq!(mock.writes().len(), 1);

    settle(&manager, LinkState::Ready).await;
    assert_eq!(mock.connect_calls(), 2);
    assert_eq!(mock.writes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_no_stream_starts_while_dropped_job_unwinds() {
    let (mock, manager) = connected().await;
    let id = DeviceId::from(PRINTER);
    manager.watch_disconnects().await.unwrap();

    let sender = Arc::clone(&manager);
    let first = tokio::spawn(async move { sender.send(&[b'A'; 300]).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    mock.simulate_disconnect(&id);
    tokio::time::sleep(Duration::from_millis(10)).await;

    // The reconnect waits for the dropped job, and nothing else may write
    assert_eq!(manager.state(), LinkState::Connecting);
    assert!(matches!(
        manager.send(&[b'B'; 300]).await,
        Err(PrintError::Busy)
    ));

    assert!(first.await.unwrap().is_err());
    settle(&manager, LinkState::Ready).await;
    manager.send(&[b'B'; 300]).await.unwrap();

    let order: Vec<u8> = mock.writes().iter().map(|w| w.data[0]).collect();
    assert_eq!(order, vec![b'A', b'B', b'B', b'B']);
    assert_eq!(mock.connect_calls(), 2);
}

#[tokio::test]
async fn test_connecting_elsewhere_releases_previous_printer() {
    let mock = Arc::new(MockAdapter::new());
    mock.add_printer("AA:AA", "MPT-II");
    mock.add_printer("BB:BB", "MPT-III");
    let manager = ConnectionManager::new(Arc::clone(&mock), TransportConfig::default());
    let (counter, kitchen) = (DeviceId::from("AA:AA"), DeviceId::from("BB:BB"));

    manager.connect(&counter).await.unwrap();
    manager.connect(&kitchen).await.unwrap();

    assert!(!mock.is_connected(&counter));
    assert!(mock.is_connected(&kitchen));
    assert_eq!(mock.disconnect_calls(), 1);
    assert_eq!(manager.link().unwrap().device_id, kitchen);
    assert_eq!(manager.state(), LinkState::Ready);

    // The old printer's drop no longer concerns this manager
    manager.handle_disconnect(&counter).await.unwrap();
    assert_eq!(mock.connect_calls(), 2);
}

// ============================================================================
// SPOOLER
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_print_order_sends_receipt_then_kot() {
    let (mock, manager) = connected().await;
    let order = OrderSnapshot::from_json(include_str!("fixtures/order.json")).unwrap();
    let printed_at = NaiveDate::from_ymd_opt(2024, 3, 6)
        .and_then(|d| d.and_hms_opt(9, 5, 0))
        .unwrap();

    let spooler = PrintSpooler::new(Arc::clone(&manager), PrinterConfig::GENERIC_58MM);
    let reports = spooler.print_order(&order, printed_at).await.unwrap();

    let receipt_bytes =
        receipt::encode(&Document::receipt_from(&order, printed_at).unwrap()).unwrap();
    let kot_bytes = receipt::encode(&Document::kot_from(&order, printed_at).unwrap()).unwrap();

    let kinds: Vec<DocumentKind> = reports.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![DocumentKind::Receipt, DocumentKind::Kot]);
    assert_eq!(reports[0].bytes, receipt_bytes.len());
    assert_eq!(reports[1].bytes, kot_bytes.len());
    assert_ne!(reports[0].job_id, reports[1].job_id);

    let expected = [receipt_bytes, kot_bytes].concat();
    assert_eq!(mock.written_bytes(), expected);
    let frames: usize = reports.iter().map(|r| r.frames).sum();
    assert_eq!(mock.writes().len(), frames);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_jobs_do_not_interleave() {
    let (mock, manager) = connected().await;
    let order = OrderSnapshot::from_json(include_str!("fixtures/order.json")).unwrap();
    let printed_at = NaiveDate::from_ymd_opt(2024, 3, 6)
        .and_then(|d| d.and_hms_opt(9, 5, 0))
        .unwrap();
    let receipt_doc = Document::receipt_from(&order, printed_at).unwrap();
    let kot_doc = Document::kot_from(&order, printed_at).unwrap();

    let spooler = PrintSpooler::new(manager, PrinterConfig::GENERIC_58MM);
    let (a, b) = tokio::join!(spooler.print(&receipt_doc), spooler.print(&kot_doc));
    a.unwrap();
    b.unwrap();

    let receipt_bytes = receipt::encode(&receipt_doc).unwrap();
    let kot_bytes = receipt::encode(&kot_doc).unwrap();
    let written = mock.written_bytes();
    assert!(
        written == [receipt_bytes.clone(), kot_bytes.clone()].concat()
            || written == [kot_bytes, receipt_bytes].concat()
    );
}
