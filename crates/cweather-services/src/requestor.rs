//! One-shot weather request client.

use std::time::Duration;

use async_nats::{Client, RequestErrorKind};
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("No reply within {0:?}")]
    Timeout(Duration),

    #[error("No responders listening on {0}")]
    NoResponders(String),

    #[error("Request failed: {0}")]
    Transport(String),
}

impl RequestError {
    pub fn user_message(&self) -> &'static str {
        match self {
            RequestError::Timeout(_) => "The weather service did not answer in time.",
            RequestError::NoResponders(_) => "No weather service is running.",
            RequestError::Transport(_) => "The request could not be sent.",
        }
    }
}

/// Sends a location on the request subject and waits for one reply.
pub struct Requestor {
    client: Client,
    subject: String,
    timeout: Duration,
}

impl Requestor {
    pub fn new(client: Client, subject: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            subject: subject.into(),
            timeout,
        }
    }

    /// Request the weather for `location` and return the reply payload.
    pub async fn request(&self, location: &str) -> Result<String, RequestError> {
        tracing::debug!("Requesting weather for {} on {}", location, self.subject);

        let request = self.client.request(
            self.subject.clone(),
            Bytes::copy_from_slice(location.as_bytes()),
        );

        let message = match tokio::time::timeout(self.timeout, request).await {
            Err(_) => return Err(RequestError::Timeout(self.timeout)),
            Ok(Err(e)) => {
                return Err(match e.kind() {
                    RequestErrorKind::TimedOut => RequestError::Timeout(self.timeout),
                    RequestErrorKind::NoResponders => {
                        RequestError::NoResponders(self.subject.clone())
                    }
                    _ => RequestError::Transport(e.to_string()),
                })
            }
            Ok(Ok(message)) => message,
        };

        Ok(String::from_utf8_lossy(&message.payload).into_owned())
    }
}
