//! IP geolocation: find an approximate location for the current machine.
//! Uses an ipinfo.io-compatible endpoint - no API key required.

use crate::types::GeolocateError;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_GEOLOCATE_URL: &str = "https://ipinfo.io/json";
const REQUEST_TIMEOUT_SECS: u64 = 5;
const USER_AGENT: &str = concat!("cweather/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    /// "<lat>,<long>"
    loc: Option<String>,
    city: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IpGeolocator {
    client: Client,
    url: String,
}

impl IpGeolocator {
    pub fn new(url: impl Into<String>) -> Result<Self, GeolocateError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Look up the caller's location as a `"<lat>,<long>"` pair, falling
    /// back to the city name when the service has no coordinates.
    pub async fn locate(&self) -> Result<String, GeolocateError> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            tracing::debug!("Geolocation returned status {}", response.status());
            return Err(GeolocateError::Status(response.status().as_u16()));
        }

        let body: IpInfoResponse = response.json().await?;

        let location = body
            .loc
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .or_else(|| body.city.filter(|c| !c.trim().is_empty()))
            .ok_or(GeolocateError::NoLocation)?;

        tracing::info!("Geolocated to: {}", location);
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn geolocator_returning(template: ResponseTemplate) -> (MockServer, IpGeolocator) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(template)
            .mount(&server)
            .await;
        let geolocator = IpGeolocator::new(format!("{}/json", server.uri())).unwrap();
        (server, geolocator)
    }

    #[tokio::test]
    async fn test_locate_prefers_coordinates() {
        let (_server, geolocator) = geolocator_returning(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({"ip": "203.0.113.7", "city": "Denver", "loc": "39.7392,-104.9903"}),
        ))
        .await;

        assert_eq!(geolocator.locate().await.unwrap(), "39.7392,-104.9903");
    }

    #[tokio::test]
    async fn test_locate_falls_back_to_city() {
        let (_server, geolocator) = geolocator_returning(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"city": "Denver"})),
        )
        .await;

        assert_eq!(geolocator.locate().await.unwrap(), "Denver");
    }

    #[tokio::test]
    async fn test_locate_without_location() {
        let (_server, geolocator) = geolocator_returning(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"ip": "203.0.113.7"})),
        )
        .await;

        assert!(matches!(
            geolocator.locate().await,
            Err(GeolocateError::NoLocation)
        ));
    }

    #[tokio::test]
    async fn test_locate_error_status() {
        let (_server, geolocator) = geolocator_returning(ResponseTemplate::new(429)).await;

        assert!(matches!(
            geolocator.locate().await,
            Err(GeolocateError::Status(429))
        ));
    }

    #[tokio::test]
    #[ignore] // Run with: cargo test -p cweather-weather -- --ignored
    async fn test_locate_live() {
        let geolocator = IpGeolocator::new(DEFAULT_GEOLOCATE_URL).unwrap();
        let location = geolocator.locate().await.unwrap();
        assert!(!location.is_empty());
    }
}
