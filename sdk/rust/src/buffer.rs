//! Trace buffer and flush scheduling
//!
//! Traces accumulate in memory and leave in batches: when the buffer reaches
//! the configured batch size, on every flush interval tick, on an explicit
//! [`TraceBuffer::flush`], and once more at shutdown. The buffer is swapped out
//! under the lock before any network I/O, so a trace is sent at most once and
//! traces added during a send land in the next batch. Batches larger than
//! [`MAX_BATCH_SIZE`] go out as several requests.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::task::TaskTracker;

use crate::config::{MAX_BATCH_SIZE, ResolvedConfig};
use crate::transport::TraceTransport;
use crate::types::Trace;

/// Upper bound on waiting for in-flight sends at shutdown
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TraceBuffer {
    config: ResolvedConfig,
    traces: Mutex<Vec<Trace>>,
    transport: Arc<dyn TraceTransport>,
    timer: Mutex<Option<JoinHandle<()>>>,
    in_flight: TaskTracker,
    shutdown: OnceCell<()>,
}

impl TraceBuffer {
    pub fn new(config: ResolvedConfig, transport: Arc<dyn TraceTransport>) -> Arc<Self> {
        let capacity = config.batch_size;
        Arc::new(Self {
            config,
            traces: Mutex::new(Vec::with_capacity(capacity)),
            transport,
            timer: Mutex::new(None),
            in_flight: TaskTracker::new(),
            shutdown: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn len(&self) -> usize {
        self.traces.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.lock().is_empty()
    }

    /// Buffer a trace, handing off a full batch without blocking the caller
    pub fn add(&self, trace: Trace) {
        if !self.is_enabled() {
            return;
        }
        let batch = {
            let mut traces = self.traces.lock();
            traces.push(trace);
            if traces.len() < self.config.batch_size {
                return;
            }
            std::mem::take(&mut *traces)
        };
        self.spawn_delivery(batch);
    }

    fn take_batch(&self) -> Vec<Trace> {
        std::mem::take(&mut *self.traces.lock())
    }

    /// Send a batch in the background, tracked so shutdown can wait for it
    fn spawn_delivery(&self, batch: Vec<Trace>) {
        if batch.is_empty() {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let transport = self.transport.clone();
                self.in_flight.spawn_on(
                    async move {
                        tracing::debug!(count = batch.len(), "Flushing traces");
                        for chunk in batch.chunks(MAX_BATCH_SIZE) {
                            transport.send(chunk).await;
                        }
                    },
                    &handle,
                );
            }
            Err(_) => {
                tracing::warn!(
                    count = batch.len(),
                    "No async runtime available, keeping traces for the next flush"
                );
                let mut traces = self.traces.lock();
                let newer = std::mem::replace(&mut *traces, batch);
                traces.extend(newer);
            }
        }
    }

    /// Send everything currently buffered and wait for the send to settle
    pub async fn flush(&self) {
        if !self.is_enabled() {
            return;
        }
        let batch = self.take_batch();
        if batch.is_empty() {
            return;
        }
        tracing::debug!(count = batch.len(), "Flushing traces");
        for chunk in batch.chunks(MAX_BATCH_SIZE) {
            self.transport.send(chunk).await;
        }
    }

    /// Start periodic flushing, replacing any running timer
    pub fn start_flush_interval(self: &Arc<Self>) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime available, periodic flush disabled");
            return;
        };

        let period = self.config.flush_interval;
        let buffer: Weak<Self> = Arc::downgrade(self);
        let task = handle.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(buffer) = buffer.upgrade() else {
                    break;
                };
                let batch = buffer.take_batch();
                buffer.spawn_delivery(batch);
            }
        });

        if let Some(previous) = self.timer.lock().replace(task) {
            previous.abort();
        }
    }

    pub fn stop_flush_interval(&self) {
        if let Some(task) = self.timer.lock().take() {
            task.abort();
        }
    }

    pub fn is_flush_interval_running(&self) -> bool {
        self.timer.lock().is_some()
    }

    /// Final flush, at most once per buffer
    ///
    /// Concurrent callers all wait for the same flush to finish.
    pub async fn shutdown(&self) {
        self.shutdown
            .get_or_init(|| async {
                self.stop_flush_interval();
                if !self.is_enabled() {
                    return;
                }

                tracing::info!("Pulse SDK: flushing remaining traces");
                self.flush().await;

                self.in_flight.close();
                if tokio::time::timeout(SHUTDOWN_DRAIN_TIMEOUT, self.in_flight.wait())
                    .await
                    .is_err()
                {
                    tracing::warn!(
                        pending = self.in_flight.len(),
                        "Pulse SDK: timed out waiting for in-flight trace batches"
                    );
                }
                tracing::info!("Pulse SDK: final flush complete");
            })
            .await;
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.initialized()
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> Vec<Trace> {
        self.traces.lock().clone()
    }
}

impl Drop for TraceBuffer {
    fn drop(&mut self) {
        if let Some(task) = self.timer.get_mut().take() {
            task.abort();
        }
    }
}
