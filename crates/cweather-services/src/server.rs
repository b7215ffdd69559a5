//! Serve loop: receive, handle, reply, and drain on shutdown.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use cweather_weather::WeatherFetcher;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::responder::Responder;
use crate::shutdown::ShutdownHandle;
use crate::transport::{InboundRequest, ReplySink, RequestSource};

/// Counters reported when the serve loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    /// Requests taken off the subscription
    pub received: u64,
    /// Replies published successfully
    pub replied: u64,
}

pub struct Server<F> {
    responder: Arc<Responder<F>>,
    max_in_flight: usize,
    shutdown: ShutdownHandle,
}

impl<F: WeatherFetcher + 'static> Server<F> {
    /// `max_in_flight` bounds concurrently handled requests; 1 handles
    /// them strictly one after another.
    pub fn new(responder: Responder<F>, max_in_flight: usize) -> Self {
        Self {
            responder: Arc::new(responder),
            max_in_flight: max_in_flight.max(1),
            shutdown: ShutdownHandle::new(),
        }
    }

    pub fn responder(&self) -> &Arc<Responder<F>> {
        &self.responder
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Serve until the subscription ends or shutdown completes.
    ///
    /// On shutdown the source is drained, every request already received
    /// is answered, and the sink is closed. Drain and close failures are
    /// logged, never returned.
    pub async fn run<S, R>(self, mut source: S, sink: Arc<R>) -> ServeStats
    where
        S: RequestSource,
        R: ReplySink + 'static,
    {
        let permits = Arc::new(Semaphore::new(self.max_in_flight));
        let replied = Arc::new(AtomicU64::new(0));
        let mut in_flight = JoinSet::new();
        let mut received = 0u64;
        let mut draining = false;

        loop {
            let next = if draining {
                source.next_request().await
            } else {
                tokio::select! {
                    biased;
                    _ = self.shutdown.wait() => {
                        tracing::info!("Draining subscription");
                        if let Err(e) = source.drain().await {
                            tracing::warn!("Drain failed, abandoning queued requests: {}", e);
                            break;
                        }
                        draining = true;
                        continue;
                    }
                    next = source.next_request() => next,
                }
            };

            let Some(request) = next else {
                break;
            };
            received += 1;

            while let Some(result) = in_flight.try_join_next() {
                log_join_error(result);
            }

            let permit = match permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            let responder = self.responder.clone();
            let sink = sink.clone();
            let replied = replied.clone();
            in_flight.spawn(async move {
                if serve_one(&responder, sink.as_ref(), request).await {
                    replied.fetch_add(1, Ordering::Relaxed);
                }
                drop(permit);
            });
        }

        while let Some(result) = in_flight.join_next().await {
            log_join_error(result);
        }

        if let Err(e) = sink.close().await {
            tracing::warn!("Failed to close connection cleanly: {}", e);
        }

        let stats = ServeStats {
            received,
            replied: replied.load(Ordering::Relaxed),
        };
        tracing::info!(
            "Responder stopped after {} requests ({} replies)",
            stats.received,
            stats.replied
        );
        stats
    }
}

/// Handle one request and publish its reply. Returns whether a reply was
/// sent.
async fn serve_one<F, R>(responder: &Responder<F>, sink: &R, request: InboundRequest) -> bool
where
    F: WeatherFetcher,
    R: ReplySink + ?Sized,
{
    let Some(reply_to) = request.reply else {
        tracing::warn!("Request without reply subject, dropping");
        return false;
    };

    let body = responder.handle_request(&request.payload).await;

    match sink.reply(&reply_to, Bytes::from(body)).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Failed to send reply: {}", e);
            false
        }
    }
}

fn log_join_error(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::error!("Request handler task failed: {}", e);
    }
}
