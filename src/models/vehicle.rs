use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub plate_number: String,
    pub display_name: Option<String>,
    pub operator_name: Option<String>,
    pub operator_contact: Option<String>,
    pub current_location: Option<GeoPoint>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin-owned fields of a vehicle. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VehicleUpdate {
    pub plate_number: Option<String>,
    pub display_name: Option<String>,
    pub operator_name: Option<String>,
    pub operator_contact: Option<String>,
    pub is_active: Option<bool>,
}

impl VehicleUpdate {
    pub fn is_empty(&self) -> bool {
        self.plate_number.is_none()
            && self.display_name.is_none()
            && self.operator_name.is_none()
            && self.operator_contact.is_none()
            && self.is_active.is_none()
    }

    pub fn apply(self, vehicle: &mut Vehicle) {
        if let Some(plate_number) = self.plate_number {
            vehicle.plate_number = plate_number;
        }
        if let Some(display_name) = self.display_name {
            vehicle.display_name = Some(display_name);
        }
        if let Some(operator_name) = self.operator_name {
            vehicle.operator_name = Some(operator_name);
        }
        if let Some(operator_contact) = self.operator_contact {
            vehicle.operator_contact = Some(operator_contact);
        }
        if let Some(is_active) = self.is_active {
            vehicle.is_active = is_active;
        }
        vehicle.updated_at = Utc::now();
    }
}
