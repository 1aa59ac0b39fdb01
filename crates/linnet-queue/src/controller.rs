// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admission and lifecycle of the request queue.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use linnet_config::model::QueueConfig;
use linnet_core::{LinnetError, Request, RequestProcessor};
use serde::Serialize;
use strum::Display;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::recording;
use crate::worker::{Counters, Worker};

/// Lifecycle state of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QueueState {
    Stopped,
    Running,
    Draining,
}

/// Queue snapshot for health reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub current_size: usize,
    pub max_size: usize,
    pub running: bool,
    pub state: QueueState,
    pub total_processed: u64,
    pub total_errors: u64,
    pub total_retried: u64,
    pub total_timeouts: u64,
    /// Failed requests dropped because the queue had no room for their retry.
    pub total_abandoned: u64,
    /// Seconds since the worker was last started; `None` if never started.
    pub uptime_secs: Option<u64>,
}

#[derive(Debug)]
struct Lifecycle {
    state: QueueState,
    started_at: Option<Instant>,
    worker: Option<JoinHandle<()>>,
    shutdown: CancellationToken,
    abort: CancellationToken,
}

/// Bounded FIFO of [`Request`]s drained by a single worker.
///
/// Admission never blocks: a full queue rejects immediately. The worker runs
/// the registered [`RequestProcessor`] on one request at a time under a hard
/// deadline; a timed-out attempt is dropped, any other failure is re-enqueued
/// at the tail while the request still has retry budget.
pub struct QueueController {
    max_size: usize,
    timeout: Duration,
    poll_interval: Duration,
    average_processing: Duration,
    sender: mpsc::Sender<Request>,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Request>>>,
    permit: Arc<Semaphore>,
    counters: Arc<Counters>,
    lifecycle: Mutex<Lifecycle>,
}

impl QueueController {
    pub fn new(
        max_size: usize,
        timeout: Duration,
        poll_interval: Duration,
        average_processing: Duration,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(max_size.max(1));
        Self {
            max_size: max_size.max(1),
            timeout,
            poll_interval,
            average_processing,
            sender,
            receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
            permit: Arc::new(Semaphore::new(1)),
            counters: Arc::new(Counters::default()),
            lifecycle: Mutex::new(Lifecycle {
                state: QueueState::Stopped,
                started_at: None,
                worker: None,
                shutdown: CancellationToken::new(),
                abort: CancellationToken::new(),
            }),
        }
    }

    pub fn from_config(config: &QueueConfig) -> Self {
        Self::new(
            config.max_size,
            config.timeout(),
            config.poll_interval(),
            Duration::from_secs(config.average_processing_secs),
        )
    }

    /// Registers `processor` and launches the worker.
    ///
    /// Must be called from within a tokio runtime. Fails with
    /// [`LinnetError::InvalidState`] unless the queue is stopped.
    pub fn start(&self, processor: Arc<dyn RequestProcessor>) -> Result<(), LinnetError> {
        let mut lifecycle = self.lock();
        if lifecycle.state != QueueState::Stopped {
            return Err(LinnetError::InvalidState(format!(
                "queue worker is already {}",
                lifecycle.state
            )));
        }

        let shutdown = CancellationToken::new();
        let abort = CancellationToken::new();
        let worker = Worker {
            receiver: Arc::clone(&self.receiver),
            sender: self.sender.clone(),
            permit: Arc::clone(&self.permit),
            processor,
            counters: Arc::clone(&self.counters),
            timeout: self.timeout,
            poll_interval: self.poll_interval,
            shutdown: shutdown.clone(),
            abort: abort.clone(),
        };

        lifecycle.worker = Some(tokio::spawn(worker.run()));
        lifecycle.shutdown = shutdown;
        lifecycle.abort = abort;
        lifecycle.state = QueueState::Running;
        lifecycle.started_at = Some(Instant::now());

        info!(
            max_size = self.max_size,
            timeout_secs = self.timeout.as_secs(),
            "queue started"
        );
        Ok(())
    }

    /// Stops the worker; the queue always ends up `Stopped`.
    ///
    /// A graceful stop lets the in-flight request finish, waiting at most one
    /// processing deadline before abandoning it. A hard stop abandons it at
    /// once. Requests still waiting stay queued for the next `start`.
    pub async fn stop(&self, graceful: bool) {
        let (worker, shutdown, abort) = {
            let mut lifecycle = self.lock();
            if lifecycle.state != QueueState::Running {
                return;
            }
            lifecycle.state = QueueState::Draining;
            (
                lifecycle.worker.take(),
                lifecycle.shutdown.clone(),
                lifecycle.abort.clone(),
            )
        };

        info!(graceful, pending = self.len(), "stopping queue worker");
        shutdown.cancel();
        if !graceful {
            abort.cancel();
        }

        if let Some(mut handle) = worker {
            let finished = if graceful {
                match tokio::time::timeout(self.timeout, &mut handle).await {
                    Ok(joined) => Some(joined),
                    Err(_) => {
                        warn!("graceful stop timed out, abandoning in-flight request");
                        abort.cancel();
                        None
                    }
                }
            } else {
                None
            };
            let joined = match finished {
                Some(joined) => joined,
                None => handle.await,
            };
            if let Err(e) = joined {
                warn!(error = %e, "queue worker ended abnormally");
            }
        }

        let mut lifecycle = self.lock();
        lifecycle.state = QueueState::Stopped;
        info!(
            processed = self.counters.processed.load(Ordering::Relaxed),
            errors = self.counters.errors.load(Ordering::Relaxed),
            "queue stopped"
        );
    }

    /// Admits `request` without waiting.
    ///
    /// Returns the 1-indexed position of the request, counting itself, or
    /// [`LinnetError::QueueFull`]. The position is taken from the queue length
    /// before the send, so a worker that dequeues immediately cannot make it 0.
    pub fn try_enqueue(&self, request: Request) -> Result<usize, LinnetError> {
        let id = request.id();
        let ahead = self.len();
        match self.sender.try_send(request) {
            Ok(()) => {
                let position = (ahead + 1).min(self.max_size);
                recording::record_enqueued(position);
                info!(request_id = %id, position, "request enqueued");
                Ok(position)
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(request_id = %id, max_size = self.max_size, "queue full, request rejected");
                Err(LinnetError::QueueFull {
                    size: self.len(),
                    max_size: self.max_size,
                })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(LinnetError::Internal("queue channel closed".to_string()))
            }
        }
    }

    /// Requests currently waiting (not counting the one in flight).
    pub fn len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn state(&self) -> QueueState {
        self.lock().state
    }

    /// Rough wait for a newly admitted request: queue length times the
    /// configured average processing time.
    pub fn estimated_wait_secs(&self) -> u64 {
        self.len() as u64 * self.average_processing.as_secs()
    }

    pub fn stats(&self) -> QueueStats {
        let (state, started_at) = {
            let lifecycle = self.lock();
            (lifecycle.state, lifecycle.started_at)
        };
        QueueStats {
            current_size: self.len(),
            max_size: self.max_size,
            running: state == QueueState::Running,
            state,
            total_processed: self.counters.processed.load(Ordering::Relaxed),
            total_errors: self.counters.errors.load(Ordering::Relaxed),
            total_retried: self.counters.retried.load(Ordering::Relaxed),
            total_timeouts: self.counters.timeouts.load(Ordering::Relaxed),
            total_abandoned: self.counters.abandoned.load(Ordering::Relaxed),
            uptime_secs: started_at.map(|t| t.elapsed().as_secs()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for QueueController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueController")
            .field("max_size", &self.max_size)
            .field("timeout", &self.timeout)
            .field("len", &self.len())
            .field("state", &self.state())
            .finish()
    }
}
