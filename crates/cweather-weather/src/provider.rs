//! Upstream current-weather fetcher.

use crate::types::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

pub const DEFAULT_API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(4);

/// Fetches the raw current-weather document for a location.
#[async_trait]
pub trait WeatherFetcher: Send + Sync {
    /// Return the upstream body verbatim, or why it could not be obtained.
    async fn fetch(&self, location: &str) -> Result<String, FetchError>;
}

#[async_trait]
impl<T: WeatherFetcher + ?Sized> WeatherFetcher for Arc<T> {
    async fn fetch(&self, location: &str) -> Result<String, FetchError> {
        (**self).fetch(location).await
    }
}

/// OpenWeatherMap-style provider: `GET <base>?q=<location>&APPID=<key>`.
#[derive(Clone)]
pub struct OpenWeatherProvider {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for OpenWeatherProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl OpenWeatherProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl WeatherFetcher for OpenWeatherProvider {
    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, location: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", location), ("APPID", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!("Weather API returned status {}", status);
            return Err(FetchError::from_status(status.as_u16(), &body));
        }

        tracing::debug!("Fetched {} bytes of weather data", body.len());
        Ok(body)
    }
}
