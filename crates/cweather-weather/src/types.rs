use serde::Deserialize;

/// Longest upstream body text carried into an error reply.
const MAX_BODY_MESSAGE_CHARS: usize = 200;

/// Upstream weather fetch errors.
///
/// The `Display` text of these errors is what clients see inside the
/// `{"error": ...}` reply, so it must never contain the request URL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("{0}")]
    Network(String),
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream returned status {status}: {message}")]
    Status { status: u16, message: String },
}

impl FetchError {
    /// Build a status error from a non-success response body.
    ///
    /// Weather APIs usually answer errors with `{"cod": .., "message": ..}`;
    /// the message is used when present, otherwise the start of the body.
    pub fn from_status(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct ApiError {
            message: Option<String>,
        }

        let message = serde_json::from_str::<ApiError>(body)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| truncate_chars(body.trim(), MAX_BODY_MESSAGE_CHARS));

        FetchError::Status { status, message }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            // The URL carries the API key.
            FetchError::Network(error_chain(&e.without_url()))
        }
    }
}

/// Join an error with its sources: `outer: inner: root cause`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

/// IP geolocation errors
#[derive(Debug, thiserror::Error)]
pub enum GeolocateError {
    #[error("Geolocation request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Geolocation service returned status {0}")]
    Status(u16),
    #[error("Geolocation response had no usable location")]
    NoLocation,
}
