//! In-memory transport and fetcher doubles shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use cweather_core::TransportError;
use cweather_services::{InboundRequest, ReplySink, RequestSource};
use cweather_weather::{FetchError, WeatherFetcher};
use tokio::sync::mpsc;

/// Request source backed by an mpsc channel. Draining closes the channel
/// so buffered requests are still delivered.
pub struct ChannelSource {
    rx: mpsc::Receiver<InboundRequest>,
    pub fail_drain: bool,
}

pub fn channel_source(capacity: usize) -> (mpsc::Sender<InboundRequest>, ChannelSource) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        tx,
        ChannelSource {
            rx,
            fail_drain: false,
        },
    )
}

#[async_trait]
impl RequestSource for ChannelSource {
    async fn next_request(&mut self) -> Option<InboundRequest> {
        self.rx.recv().await
    }

    async fn drain(&mut self) -> Result<(), TransportError> {
        if self.fail_drain {
            return Err(TransportError::DrainFailed("connection lost".into()));
        }
        self.rx.close();
        Ok(())
    }
}

pub fn request(location: &str, reply: &str) -> InboundRequest {
    InboundRequest {
        payload: Bytes::copy_from_slice(location.as_bytes()),
        reply: Some(reply.to_string()),
    }
}

/// Reply sink that forwards replies to a channel and counts closes.
pub struct RecordingSink {
    tx: mpsc::UnboundedSender<(String, String)>,
    pub closes: AtomicUsize,
}

pub fn recording_sink() -> (RecordingSink, mpsc::UnboundedReceiver<(String, String)>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        RecordingSink {
            tx,
            closes: AtomicUsize::new(0),
        },
        rx,
    )
}

impl RecordingSink {
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReplySink for RecordingSink {
    async fn reply(&self, subject: &str, payload: Bytes) -> Result<(), TransportError> {
        let body = String::from_utf8_lossy(&payload).into_owned();
        self.tx
            .send((subject.to_string(), body))
            .map_err(|e| TransportError::PublishFailed {
                subject: subject.to_string(),
                message: e.to_string(),
            })
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Fetcher that answers `{"name":"<location>"}` after an optional delay.
pub struct EchoFetcher {
    pub delay: Duration,
    pub calls: Mutex<Vec<String>>,
}

impl EchoFetcher {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl WeatherFetcher for EchoFetcher {
    async fn fetch(&self, location: &str) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push(location.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if location == "Atlantis" {
            return Err(FetchError::Network("timeout".into()));
        }
        Ok(format!("{{\"name\":\"{}\"}}", location))
    }
}
