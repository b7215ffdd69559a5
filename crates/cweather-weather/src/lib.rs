//! Weather data plumbing for cweather
//!
//! Provides the short-TTL response cache, the upstream current-weather
//! fetcher and IP geolocation for clients that do not know their location.

pub mod cache;
pub mod geolocate;
pub mod provider;
pub mod types;

pub use cache::ResponseCache;
pub use geolocate::IpGeolocator;
pub use provider::{OpenWeatherProvider, WeatherFetcher};
pub use types::{FetchError, GeolocateError};
