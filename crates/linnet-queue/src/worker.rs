// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single queue worker.
//!
//! The worker owns the receiving half of the queue for its whole life and
//! processes one request at a time under a one-permit semaphore. Two tokens
//! steer it: `shutdown` stops it from taking new work, `abort` additionally
//! abandons the request in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use linnet_core::{LinnetError, Request, RequestProcessor};
use tokio::sync::{Mutex, Semaphore, mpsc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::recording;

/// Lifetime counters shared between the worker and the controller.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub processed: AtomicU64,
    pub errors: AtomicU64,
    pub retried: AtomicU64,
    pub timeouts: AtomicU64,
    pub abandoned: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

pub(crate) struct Worker {
    pub receiver: Arc<Mutex<mpsc::Receiver<Request>>>,
    /// Used to put failed requests back at the tail.
    pub sender: mpsc::Sender<Request>,
    pub permit: Arc<Semaphore>,
    pub processor: Arc<dyn RequestProcessor>,
    pub counters: Arc<Counters>,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub shutdown: CancellationToken,
    pub abort: CancellationToken,
}

enum Outcome {
    Done(Result<(), LinnetError>),
    TimedOut,
    Aborted,
}

impl Worker {
    pub async fn run(self) {
        let mut receiver = self.receiver.lock().await;
        info!(
            timeout_secs = self.timeout.as_secs(),
            "queue worker started"
        );

        loop {
            let request = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                received = tokio::time::timeout(self.poll_interval, receiver.recv()) => {
                    match received {
                        Ok(Some(request)) => request,
                        Ok(None) => {
                            warn!("queue channel closed, worker exiting");
                            break;
                        }
                        Err(_) => continue,
                    }
                }
            };
            recording::set_depth(receiver.len());

            if !self.handle(request).await {
                break;
            }
        }

        info!(
            processed = self.counters.processed.load(Ordering::Relaxed),
            errors = self.counters.errors.load(Ordering::Relaxed),
            "queue worker stopped"
        );
    }

    /// Processes one request. Returns `false` when the worker must exit.
    async fn handle(&self, request: Request) -> bool {
        let permit = match Arc::clone(&self.permit).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                error!(request_id = %request.id(), "processing semaphore closed");
                return false;
            }
        };

        let started = Instant::now();
        debug!(
            request_id = %request.id(),
            age_ms = request.age().as_millis() as u64,
            retry_count = request.retry_count(),
            "processing request"
        );

        let outcome = tokio::select! {
            biased;
            _ = self.abort.cancelled() => Outcome::Aborted,
            result = tokio::time::timeout(self.timeout, self.processor.process(&request)) => {
                match result {
                    Ok(result) => Outcome::Done(result),
                    Err(_) => Outcome::TimedOut,
                }
            }
        };
        drop(permit);
        let elapsed = started.elapsed();
        let duration_ms = elapsed.as_millis() as u64;

        match outcome {
            Outcome::Done(Ok(())) => {
                Counters::bump(&self.counters.processed);
                recording::record_processed(elapsed);
                info!(request_id = %request.id(), duration_ms, "request completed");
            }
            Outcome::Done(Err(e)) => {
                Counters::bump(&self.counters.errors);
                recording::record_failed(elapsed);
                error!(
                    request_id = %request.id(),
                    retry_count = request.retry_count(),
                    duration_ms,
                    error = %e,
                    "request processing failed"
                );
                self.requeue(request).await;
            }
            Outcome::TimedOut => {
                Counters::bump(&self.counters.errors);
                Counters::bump(&self.counters.timeouts);
                recording::record_failed(elapsed);
                recording::record_timed_out();
                error!(
                    request_id = %request.id(),
                    timeout_secs = self.timeout.as_secs(),
                    "request timed out, dropping"
                );
            }
            Outcome::Aborted => {
                warn!(request_id = %request.id(), "in-flight request abandoned by hard stop");
                return false;
            }
        }
        true
    }

    async fn requeue(&self, mut request: Request) {
        if !request.increment_retry() {
            warn!(
                request_id = %request.id(),
                max_retries = request.max_retries(),
                "retry budget exhausted, dropping request"
            );
            return;
        }

        let id = request.id();
        let retry_count = request.retry_count();
        match self.sender.try_send(request) {
            Ok(()) => {
                Counters::bump(&self.counters.retried);
                recording::record_retried();
                info!(request_id = %id, retry_count, "request requeued for retry");
            }
            Err(e) => {
                let request = e.into_inner();
                Counters::bump(&self.counters.abandoned);
                recording::record_abandoned();
                error!(
                    request_id = %id,
                    retry_count,
                    "cannot requeue, queue is full; dropping request"
                );
                if tokio::time::timeout(self.timeout, self.processor.abandon(&request))
                    .await
                    .is_err()
                {
                    warn!(request_id = %id, "abandon hook timed out");
                }
            }
        }
    }
}
