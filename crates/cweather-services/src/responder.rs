//! Cached request handler: location in, weather document (or error) out.

use std::sync::Arc;

use cweather_weather::{ResponseCache, WeatherFetcher};

/// Answers weather requests from the cache, falling back to the upstream
/// fetcher on a miss. Only successful fetches are cached.
pub struct Responder<F> {
    cache: Arc<ResponseCache>,
    fetcher: F,
}

impl<F: WeatherFetcher> Responder<F> {
    pub fn new(cache: Arc<ResponseCache>, fetcher: F) -> Self {
        Self { cache, fetcher }
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Produce the reply body for one request payload.
    ///
    /// The payload is the location, used as-is (lossy UTF-8). The reply is
    /// either the upstream body or `{"error": "<message>"}`.
    pub async fn handle_request(&self, payload: &[u8]) -> String {
        let location = String::from_utf8_lossy(payload);

        if let Some(cached) = self.cache.get(&location) {
            tracing::debug!(location = %location, "Cache hit");
            return cached;
        }

        tracing::debug!(location = %location, "Cache miss, fetching");
        match self.fetcher.fetch(&location).await {
            Ok(body) => {
                self.cache.add(location.as_ref(), body.clone());
                body
            }
            Err(e) => {
                tracing::warn!(location = %location, error = %e, "Weather fetch failed");
                error_reply(&e.to_string())
            }
        }
    }
}

/// JSON error reply: `{"error": "<message>"}` with the message escaped.
pub fn error_reply(message: &str) -> String {
    format!(
        "{{\"error\": {}}}",
        serde_json::Value::String(message.to_owned())
    )
}
