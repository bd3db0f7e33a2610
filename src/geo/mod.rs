pub mod nominatim;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::vehicle::GeoPoint;

pub use nominatim::NominatimGeocoder;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("no coordinates found for postal code {code} ({country})")]
    NoMatch { code: String, country: String },

    #[error("geocoder request failed: {0}")]
    Request(String),
}

/// Resolves a postal code to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, postal_code: &str, country: &str) -> Result<GeoPoint, GeocodeError>;
}

/// Fixed postal code table, for offline deployments and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    entries: HashMap<String, GeoPoint>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, postal_code: &str, point: GeoPoint) -> Self {
        self.entries.insert(normalize(postal_code), point);
        self
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, postal_code: &str, country: &str) -> Result<GeoPoint, GeocodeError> {
        self.entries
            .get(&normalize(postal_code))
            .copied()
            .ok_or_else(|| GeocodeError::NoMatch {
                code: postal_code.to_string(),
                country: country.to_string(),
            })
    }
}

/// Postal codes of the seeded depots.
pub fn depot_geocoder() -> StaticGeocoder {
    StaticGeocoder::new()
        .with_entry("MD-2020", GeoPoint { lat: 47.0583, lng: 28.8431 })
        .with_entry("MD-2070", GeoPoint { lat: 46.9683, lng: 28.8518 })
        .with_entry("MD-3100", GeoPoint { lat: 47.7599, lng: 27.9199 })
        .with_entry("MD-3500", GeoPoint { lat: 47.3831, lng: 28.8252 })
}

fn normalize(postal_code: &str) -> String {
    postal_code.trim().to_ascii_uppercase()
}

pub fn is_valid_point(point: &GeoPoint) -> bool {
    point.lat.is_finite()
        && point.lng.is_finite()
        && (-90.0..=90.0).contains(&point.lat)
        && (-180.0..=180.0).contains(&point.lng)
}
