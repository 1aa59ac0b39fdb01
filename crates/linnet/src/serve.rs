// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `linnet serve` command implementation.
//!
//! Wires the rate limiter, message cache, context store and queue around the
//! Ollama backend, then feeds newline-delimited JSON events from stdin through
//! the dispatcher. Replies go to stdout as JSON lines; logs go to stderr.

use std::sync::Arc;
use std::time::Duration;

use linnet_agent::{Dispatcher, HealthReport, InferenceProcessor, shutdown};
use linnet_cache::MessageCache;
use linnet_config::model::LinnetConfig;
use linnet_context::ConversationContextStore;
use linnet_core::{HealthStatus, InferenceBackend, LinnetError};
use linnet_limiter::RateLimiter;
use linnet_ollama::OllamaBackend;
use linnet_queue::QueueController;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::console::{ConsoleReplyChannel, parse_event_line};

/// Runs the assistant until stdin closes or a shutdown signal arrives.
pub async fn run_serve(config: LinnetConfig) -> Result<(), LinnetError> {
    init_tracing(&config.agent.log_level);
    linnet_queue::recording::register_metrics();

    info!(
        agent_name = config.agent.name.as_str(),
        model = config.ollama.model.as_str(),
        "starting linnet"
    );

    let backend: Arc<dyn InferenceBackend> = Arc::new(OllamaBackend::new(&config.ollama)?);
    match backend.health_check().await {
        Ok(HealthStatus::Healthy) => info!(backend = backend.name(), "backend reachable"),
        Ok(status) => warn!(backend = backend.name(), ?status, "backend not healthy, continuing"),
        Err(e) => warn!(backend = backend.name(), error = %e, "backend health check failed"),
    }

    let channel = Arc::new(ConsoleReplyChannel::new(tokio::io::stdout()));
    let cache = Arc::new(MessageCache::from_config(&config.message_cache));
    let context = Arc::new(ConversationContextStore::from_config(&config.context));
    let queue = Arc::new(QueueController::from_config(&config.queue));

    let processor = Arc::new(InferenceProcessor::new(
        backend.clone(),
        channel.clone(),
        cache.clone(),
        context.clone(),
        config.agent.assistant_identity.clone(),
    ));
    let dispatcher = Dispatcher::new(
        config.clone(),
        Arc::new(RateLimiter::from_config(&config.rate_limit)),
        cache,
        context,
        queue.clone(),
        channel,
    );

    queue.start(processor)?;
    let cancel = shutdown::install_signal_handler();

    let input = BufReader::new(tokio::io::stdin());
    read_events(input, &dispatcher, &cancel).await;

    if !cancel.is_cancelled() {
        info!("input closed, waiting for queued requests");
        wait_for_empty_queue(&queue, &cancel).await;
    }
    queue.stop(true).await;

    let report = HealthReport::collect(&dispatcher, None).await;
    match serde_json::to_string(&report) {
        Ok(json) => info!(report = json.as_str(), "final pipeline state"),
        Err(e) => debug!(error = %e, "could not encode final report"),
    }
    info!("linnet serve shutdown complete");
    Ok(())
}

async fn read_events<R>(input: R, dispatcher: &Dispatcher, cancel: &CancellationToken)
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "failed to read input");
                break;
            }
        };
        match parse_event_line(&line) {
            Ok(Some(event)) => {
                let outcome = dispatcher.handle_event(event).await;
                debug!(?outcome, "event dispatched");
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "skipping malformed event line"),
        }
    }
}

async fn wait_for_empty_queue(queue: &QueueController, cancel: &CancellationToken) {
    while !queue.is_empty() {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(Duration::from_millis(100)) => {}
        }
    }
}

/// Initialize the tracing subscriber on stderr with the configured log level.
///
/// `RUST_LOG` takes precedence when set.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("linnet={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
