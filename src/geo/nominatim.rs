use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::geo::{is_valid_point, GeocodeError, Geocoder};
use crate::models::vehicle::GeoPoint;

/// Nominatim search API adapter.
pub struct NominatimGeocoder {
    client: Client,
    endpoint: String,
    user_agent: String,
}

#[derive(Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

impl NominatimGeocoder {
    pub fn new(endpoint: String, user_agent: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            user_agent,
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, postal_code: &str, country: &str) -> Result<GeoPoint, GeocodeError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header(reqwest::header::USER_AGENT, self.user_agent.as_str())
            .query(&[
                ("format", "json"),
                ("postalcode", postal_code),
                ("country", country),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(|err| GeocodeError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Request(format!(
                "nominatim responded with {status}"
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| GeocodeError::Request(err.to_string()))?;

        parse_first_hit(&body).ok_or_else(|| GeocodeError::NoMatch {
            code: postal_code.to_string(),
            country: country.to_string(),
        })
    }
}

fn parse_first_hit(body: &[u8]) -> Option<GeoPoint> {
    let hits: Vec<SearchHit> = serde_json::from_slice(body).ok()?;
    let hit = hits.into_iter().next()?;
    let point = GeoPoint {
        lat: hit.lat.parse().ok()?,
        lng: hit.lon.parse().ok()?,
    };

    is_valid_point(&point).then_some(point)
}
