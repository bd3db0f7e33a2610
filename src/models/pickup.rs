use serde::{Deserialize, Serialize};

use crate::models::vehicle::GeoPoint;

/// A named depot packages can be picked up from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickupLocation {
    pub id: String,
    pub name: String,
    pub location: GeoPoint,
}

impl PickupLocation {
    pub fn new(id: &str, name: &str, lat: f64, lng: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            location: GeoPoint { lat, lng },
        }
    }
}

pub fn default_pickup_locations() -> Vec<PickupLocation> {
    vec![
        PickupLocation::new(
            "chisinau_north",
            "Chisinau North Depot (ZIP MD-2020)",
            47.0583,
            28.8431,
        ),
        PickupLocation::new(
            "chisinau_south",
            "Chisinau South Terminal (ZIP MD-2070)",
            46.9683,
            28.8518,
        ),
        PickupLocation::new(
            "balti_central",
            "Balti Central Hub (ZIP MD-3100)",
            47.7599,
            27.9199,
        ),
        PickupLocation::new(
            "orhei_logistics",
            "Orhei Logistics Point (ZIP MD-3500)",
            47.3831,
            28.8252,
        ),
    ]
}
