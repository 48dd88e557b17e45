//! Event sinks.
//!
//! # Responsibilities
//! - Console sink: one human-readable line per record plus pretty-printed attributes
//! - HTTP log sink: durable structured transport, batched and fire-and-forget
//! - Memory sink: keeps records for inspection
//!
//! # Design Decisions
//! - `accept` never blocks on I/O to a remote service; the HTTP sink only enqueues
//! - Delivery failures are reported once, then demoted to debug
//! - No retries: a failed batch is dropped
//! - The delivery queue is bounded; records arriving while it is full are dropped

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

use crate::observability::event::EventRecord;

/// Batches the HTTP sink may hold in its queue before it starts dropping.
const QUEUE_BATCHES: usize = 64;

/// Attributes the console rendering leaves out.
pub const CONSOLE_HIDDEN_KEYS: [&str; 5] = ["requestId", "trace_id", "span_id", "trace_flags", "stack"];

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("write failed: {0}")]
    Io(#[from] io::Error),
    #[error("sink is closed")]
    Closed,
    #[error("delivery queue is full, record dropped")]
    QueueFull,
    #[error("sink lock poisoned")]
    Poisoned,
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("{0}")]
    Rejected(String),
}

/// A destination for event records.
pub trait Sink: Send + Sync {
    /// Short name used when reporting failures.
    fn name(&self) -> &'static str;

    /// Hand a record to the sink.
    fn accept(&self, record: &EventRecord) -> Result<(), SinkError>;

    /// Flush pending records and release resources.
    fn close(&self) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }
}

/// Human-readable console output.
pub struct ConsoleSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    /// Console sink writing to stdout.
    pub fn stdout() -> Self {
        Self::with_writer(io::stdout())
    }

    pub fn with_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Render a record the way it appears on the console.
    pub fn render(record: &EventRecord) -> String {
        let mut line = format!(
            "{} [{}] {}: {}",
            record.timestamp_iso(),
            record.level(),
            record.event_type(),
            record.message()
        );

        let visible: Map<String, Value> = record
            .attributes()
            .iter()
            .filter(|(key, _)| !CONSOLE_HIDDEN_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        if !visible.is_empty() {
            if let Ok(pretty) = serde_json::to_string_pretty(&visible) {
                line.push('\n');
                line.push_str(&pretty);
            }
        }
        line
    }
}

impl Sink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn accept(&self, record: &EventRecord) -> Result<(), SinkError> {
        let line = Self::render(record);
        let mut writer = self.writer.lock().map_err(|_| SinkError::Poisoned)?;
        writeln!(writer, "{line}")?;
        Ok(())
    }
}

/// Keeps every accepted record in memory.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<EventRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records accepted so far.
    pub fn records(&self) -> Vec<EventRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Records of one event type.
    pub fn of_type(&self, event_type: &str) -> Vec<EventRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.event_type() == event_type)
            .collect()
    }
}

impl Sink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn accept(&self, record: &EventRecord) -> Result<(), SinkError> {
        self.records
            .lock()
            .map_err(|_| SinkError::Poisoned)?
            .push(record.clone());
        Ok(())
    }
}

/// A cloneable in-memory writer, handy for capturing console output.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("buffer lock poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Durable sink shipping JSON records to a remote log ingestion endpoint.
pub struct HttpLogSink {
    tx: Mutex<Option<mpsc::Sender<Value>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl HttpLogSink {
    /// Start the delivery task. Must be called from within a Tokio runtime.
    pub fn spawn(
        endpoint: Url,
        token: String,
        batch_size: usize,
        timeout: Duration,
    ) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let batch_size = batch_size.max(1);
        let (tx, rx) = mpsc::channel(batch_size * QUEUE_BATCHES);

        tracing::info!(endpoint = %endpoint, batch_size, "HTTP log sink starting");
        let worker = tokio::spawn(deliver(client, endpoint, token, rx, batch_size));

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        })
    }
}

impl Sink for HttpLogSink {
    fn name(&self) -> &'static str {
        "http"
    }

    fn accept(&self, record: &EventRecord) -> Result<(), SinkError> {
        let guard = self.tx.lock().map_err(|_| SinkError::Poisoned)?;
        let tx = guard.as_ref().ok_or(SinkError::Closed)?;
        tx.try_send(record.to_json()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }

    fn close(&self) -> BoxFuture<'static, ()> {
        // Dropping the sender lets the worker drain the queue and exit.
        if let Ok(mut tx) = self.tx.lock() {
            tx.take();
        }
        let worker = self.worker.lock().ok().and_then(|mut w| w.take());
        Box::pin(async move {
            if let Some(worker) = worker {
                if let Err(e) = worker.await {
                    tracing::warn!(error = %e, "HTTP log sink worker ended abnormally");
                }
            }
        })
    }
}

async fn deliver(
    client: reqwest::Client,
    endpoint: Url,
    token: String,
    mut rx: mpsc::Receiver<Value>,
    batch_size: usize,
) {
    let failure_reported = AtomicBool::new(false);
    let mut batch = Vec::with_capacity(batch_size);

    while rx.recv_many(&mut batch, batch_size).await > 0 {
        let result = client
            .post(endpoint.clone())
            .bearer_auth(&token)
            .json(&batch)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => tracing::trace!(records = batch.len(), "Log batch delivered"),
            Err(e) => {
                if !failure_reported.swap(true, Ordering::Relaxed) {
                    tracing::warn!(
                        error = %e,
                        dropped = batch.len(),
                        "Log sink delivery failed; further failures logged at debug"
                    );
                } else {
                    tracing::debug!(error = %e, dropped = batch.len(), "Log sink delivery failed");
                }
            }
        }
        batch.clear();
    }

    tracing::debug!("HTTP log sink drained");
}
