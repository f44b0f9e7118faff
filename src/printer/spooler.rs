//! # Print Spooler
//!
//! Sequences print jobs onto one [`ConnectionManager`].
//!
//! Each job is validated and encoded before it joins the queue, so a bad
//! document (or an oversized QR payload) fails without a single byte reaching
//! the printer. Jobs then run one at a time in arrival order; the queue is a
//! fair `tokio::sync::Mutex`, so a receipt and its KOT never interleave with
//! another order's tickets.

use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::Mutex;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use super::config::PrinterConfig;
use super::connection::ConnectionManager;
use crate::document::{Document, DocumentKind, OrderSnapshot};
use crate::error::Result;
use crate::receipt;
use crate::transport::BleAdapter;

/// Outcome of one printed ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    pub job_id: Uuid,
    pub kind: DocumentKind,
    pub bytes: usize,
    pub frames: usize,
}

/// A document encoded and ready to send.
struct EncodedJob {
    id: Uuid,
    kind: DocumentKind,
    bytes: Vec<u8>,
}

/// FIFO job queue in front of a printer link.
pub struct PrintSpooler<A: BleAdapter> {
    manager: Arc<ConnectionManager<A>>,
    config: PrinterConfig,
    queue: Mutex<()>,
}

impl<A: BleAdapter> PrintSpooler<A> {
    pub fn new(manager: Arc<ConnectionManager<A>>, config: PrinterConfig) -> Self {
        Self {
            manager,
            config,
            queue: Mutex::new(()),
        }
    }

    pub fn manager(&self) -> &Arc<ConnectionManager<A>> {
        &self.manager
    }

    fn prepare(&self, doc: &Document) -> Result<EncodedJob> {
        doc.validate()?;
        let bytes = receipt::encode_with(doc, &self.config)?;
        Ok(EncodedJob {
            id: Uuid::new_v4(),
            kind: doc.kind,
            bytes,
        })
    }

    /// Print one document.
    pub async fn print(&self, doc: &Document) -> Result<JobReport> {
        let job = self.prepare(doc)?;
        let _turn = self.queue.lock().await;
        self.run(job).await
    }

    /// Print an order's receipt followed by its KOT, back to back.
    ///
    /// Both tickets are encoded before either is sent. If the receipt fails
    /// the KOT is not attempted.
    pub async fn print_order(
        &self,
        order: &OrderSnapshot,
        printed_at: NaiveDateTime,
    ) -> Result<Vec<JobReport>> {
        let jobs = [
            self.prepare(&Document::receipt_from(order, printed_at)?)?,
            self.prepare(&Document::kot_from(order, printed_at)?)?,
        ];

        let _turn = self.queue.lock().await;
        let mut reports = Vec::with_capacity(jobs.len());
        for job in jobs {
            reports.push(self.run(job).await?);
        }
        Ok(reports)
    }

    async fn run(&self, job: EncodedJob) -> Result<JobReport> {
        let span = info_span!("print_job", id = %job.id, kind = ?job.kind);
        async {
            let frames = self.manager.transport_config().frame_count(job.bytes.len());
            self.manager.send(&job.bytes).await?;
            info!(bytes = job.bytes.len(), frames, "job printed");
            Ok(JobReport {
                job_id: job.id,
                kind: job.kind,
                bytes: job.bytes.len(),
                frames,
            })
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Header, LineItem, Payment};
    use crate::error::PrintError;
    use crate::transport::{DeviceId, MockAdapter, TransportConfig};

    async fn spooler() -> (Arc<MockAdapter>, PrintSpooler<MockAdapter>) {
        let mock = Arc::new(MockAdapter::new());
        mock.add_printer("AA:BB", "MPT-II");
        let manager = Arc::new(ConnectionManager::new(
            Arc::clone(&mock),
            TransportConfig::default(),
        ));
        manager.connect(&DeviceId::from("AA:BB")).await.unwrap();
        (mock, PrintSpooler::new(manager, PrinterConfig::default()))
    }

    fn receipt() -> Document {
        Document::receipt(
            Header::new("Udupi Cafe", "12 MG Road", "B-7"),
            vec![LineItem::new("Medu Vada", 2, 40.0)],
        )
        .payment(Payment::unpaid(80.0))
    }

    #[tokio::test(start_paused = true)]
    async fn test_print_writes_encoded_stream() {
        let (mock, spooler) = spooler().await;
        let doc = receipt();

        let report = spooler.print(&doc).await.unwrap();
        let expected = receipt::encode(&doc).unwrap();
        assert_eq!(mock.written_bytes(), expected);
        assert_eq!(report.bytes, expected.len());
        assert_eq!(report.frames, mock.writes().len());
        assert_eq!(report.kind, DocumentKind::Receipt);
    }

    #[tokio::test]
    async fn test_overflow_sends_nothing() {
        let (mock, spooler) = spooler().await;
        let doc = receipt().qr_payload("x".repeat(300));
        assert!(matches!(
            spooler.print(&doc).await,
            Err(PrintError::EncodingOverflow { .. })
        ));
        assert!(mock.writes().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_document_sends_nothing() {
        let (mock, spooler) = spooler().await;
        let doc = Document::receipt(Header::new("Udupi Cafe", "", "B-7"), vec![]);
        assert!(matches!(
            spooler.print(&doc).await,
            Err(PrintError::InvalidDocument(_))
        ));
        assert!(mock.writes().is_empty());
    }
}
