//! NATS binding for the serve loop.
//!
//! The serve loop only sees the [`RequestSource`] and [`ReplySink`] seams;
//! the NATS implementations here are thin wrappers over `async-nats`.

use std::sync::Arc;

use async_nats::{Client, ConnectOptions, Subscriber};
use async_trait::async_trait;
use bytes::Bytes;
use cweather_core::{TransportConfig, TransportError};
use futures::StreamExt;

/// One inbound request as delivered by the transport.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub payload: Bytes,
    /// Reply subject; `None` when the sender does not expect an answer.
    pub reply: Option<String>,
}

/// Stream of inbound requests.
#[async_trait]
pub trait RequestSource: Send {
    /// Next request, or `None` once the subscription has ended.
    async fn next_request(&mut self) -> Option<InboundRequest>;

    /// Stop receiving new requests. Requests already buffered are still
    /// returned by `next_request` before it yields `None`.
    async fn drain(&mut self) -> Result<(), TransportError>;
}

/// Outbound side: replies and connection teardown.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn reply(&self, subject: &str, payload: Bytes) -> Result<(), TransportError>;

    /// Flush pending replies and release the connection.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Transport lifecycle events, decoupled from the `async-nats` types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    Disconnected,
    Error(String),
    Other(String),
}

impl From<async_nats::Event> for TransportEvent {
    fn from(event: async_nats::Event) -> Self {
        match event {
            async_nats::Event::Connected => TransportEvent::Connected,
            async_nats::Event::Disconnected => TransportEvent::Disconnected,
            async_nats::Event::ServerError(e) => TransportEvent::Error(e.to_string()),
            async_nats::Event::ClientError(e) => TransportEvent::Error(e.to_string()),
            other => TransportEvent::Other(other.to_string()),
        }
    }
}

/// Receives transport lifecycle events.
pub trait ConnectionObserver: Send + Sync + 'static {
    fn on_event(&self, event: TransportEvent);
}

/// Observer that writes every event to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl ConnectionObserver for LoggingObserver {
    fn on_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => tracing::info!("Connected to message server"),
            TransportEvent::Disconnected => tracing::warn!("Disconnected from message server"),
            TransportEvent::Error(e) => tracing::error!("Transport error: {}", e),
            TransportEvent::Other(e) => tracing::info!("Transport event: {}", e),
        }
    }
}

/// Connect to the NATS server described by `config`.
///
/// A `tls://` URL requires TLS; the credentials file, when set, is handed
/// to the client as-is.
pub async fn connect(
    config: &TransportConfig,
    observer: Arc<dyn ConnectionObserver>,
) -> Result<Client, TransportError> {
    let mut options = ConnectOptions::new()
        .name(config.name.as_str())
        .event_callback(move |event| {
            let observer = observer.clone();
            async move { observer.on_event(TransportEvent::from(event)) }
        });

    if config.requires_tls() {
        options = options.require_tls(true);
    }

    if let Some(path) = &config.creds {
        options = options
            .credentials_file(path.clone())
            .await
            .map_err(|e| TransportError::Credentials {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
    }

    tracing::info!("Connecting to {}", config.url);
    options
        .connect(config.url.as_str())
        .await
        .map_err(|e| TransportError::ConnectFailed {
            url: config.url.clone(),
            message: e.to_string(),
        })
}

/// Join the queue group on `subject`.
pub async fn subscribe(
    client: &Client,
    subject: &str,
    queue_group: &str,
) -> Result<NatsRequestSource, TransportError> {
    let subscriber = client
        .queue_subscribe(subject.to_string(), queue_group.to_string())
        .await
        .map_err(|e| TransportError::SubscribeFailed {
            subject: subject.to_string(),
            message: e.to_string(),
        })?;

    tracing::info!("Listening on {} (queue group {})", subject, queue_group);
    Ok(NatsRequestSource { subscriber })
}

pub struct NatsRequestSource {
    subscriber: Subscriber,
}

#[async_trait]
impl RequestSource for NatsRequestSource {
    async fn next_request(&mut self) -> Option<InboundRequest> {
        self.subscriber.next().await.map(|message| InboundRequest {
            payload: message.payload,
            reply: message.reply.map(|subject| subject.to_string()),
        })
    }

    async fn drain(&mut self) -> Result<(), TransportError> {
        // Unsubscribing closes the channel; messages already buffered in it
        // are still yielded by `next`.
        self.subscriber
            .unsubscribe()
            .await
            .map_err(|e| TransportError::DrainFailed(e.to_string()))
    }
}

#[derive(Clone)]
pub struct NatsReplySink {
    client: Client,
}

impl NatsReplySink {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReplySink for NatsReplySink {
    async fn reply(&self, subject: &str, payload: Bytes) -> Result<(), TransportError> {
        self.client
            .publish(subject.to_string(), payload)
            .await
            .map_err(|e| TransportError::PublishFailed {
                subject: subject.to_string(),
                message: e.to_string(),
            })
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.client
            .flush()
            .await
            .map_err(|e| TransportError::DrainFailed(e.to_string()))
    }
}
