//! Best-effort device position via IP geolocation.
//!
//! Receipt confirmations may attach a position. Without device GPS the best
//! available signal is IP-based: a primary provider with a fallback, each
//! under the same timeout. Failures become [`Error::Geolocation`] so callers
//! can leave coordinates unset instead of aborting the confirmation.

use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};
use crate::geo::LatLng;

/// Primary provider and the JSON keys it answers with.
const PRIMARY: (&str, &str, &str) = ("https://ipapi.co/json/", "latitude", "longitude");

/// Fallback provider (no key required).
const FALLBACK: (&str, &str, &str) = ("http://ip-api.com/json/", "lat", "lon");

/// Look up the device's approximate position by IP.
///
/// Tries the primary provider, then the fallback, each bounded by `timeout`.
///
/// # Errors
///
/// Fails with [`Error::Geolocation`] when no provider returns a position
/// within its timeout.
pub async fn current_position(timeout: Duration) -> Result<LatLng> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::geolocation(format!("could not build HTTP client: {e}")))?;

    for (url, lat_key, lon_key) in [PRIMARY, FALLBACK] {
        match fetch_position(&client, url, lat_key, lon_key).await {
            Some(position) => {
                debug!(provider = url, lat = position.lat, lon = position.lon, "position found");
                return Ok(position);
            }
            None => debug!(provider = url, "provider returned no position"),
        }
    }

    Err(Error::geolocation("no provider returned a position"))
}

async fn fetch_position(
    client: &reqwest::Client,
    url: &str,
    lat_key: &str,
    lon_key: &str,
) -> Option<LatLng> {
    let response = client.get(url).send().await.ok()?;
    let value: serde_json::Value = response.json().await.ok()?;
    let lat = value.get(lat_key)?.as_f64()?;
    let lon = value.get(lon_key)?.as_f64()?;
    let position = LatLng::new(lat, lon);
    position.is_valid().then_some(position)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_key_shapes() {
        // The two providers answer with differently named coordinate keys.
        assert_eq!(PRIMARY.1, "latitude");
        assert_eq!(FALLBACK.1, "lat");
        assert!(PRIMARY.0.starts_with("https://"));
    }

    #[tokio::test]
    async fn test_unreachable_provider_yields_geolocation_error() {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap();
        // A reserved TEST-NET address: nothing listens there.
        let result = fetch_position(&client, "http://192.0.2.1/json/", "lat", "lon").await;
        assert!(result.is_none());
    }
}
