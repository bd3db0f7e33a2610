//! Typed request payloads, checked before they reach the engine's write path.

use serde::Deserialize;
use uuid::Uuid;

use crate::engine::transition::DispatchEvent;
use crate::error::AppError;
use crate::geo::is_valid_point;
use crate::models::package::PackageDetailsUpdate;
use crate::models::vehicle::GeoPoint;

pub const DEFAULT_COUNTRY: &str = "Moldova";

/// Where a new package is picked up. Exactly one form per request.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PickupInput {
    Coordinates { lat: f64, lng: f64 },
    Predefined { location_id: String },
    PostalCode { code: String, country: Option<String> },
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePackageInput {
    pub recipient_name: String,
    pub delivery_address: String,
    pub sender_name: String,
    pub direction: String,
    pub pickup: PickupInput,
    pub pickup_details: Option<String>,
    pub description: Option<String>,
    pub weight_kg: Option<f64>,
}

impl CreatePackageInput {
    pub fn validate(&self) -> Result<(), AppError> {
        require("recipient_name", &self.recipient_name)?;
        require("delivery_address", &self.delivery_address)?;
        require("sender_name", &self.sender_name)?;
        require("direction", &self.direction)?;
        validate_weight(self.weight_kg)?;

        match &self.pickup {
            PickupInput::Coordinates { lat, lng } => validate_point(&GeoPoint {
                lat: *lat,
                lng: *lng,
            }),
            PickupInput::Predefined { location_id } => require("pickup.location_id", location_id),
            PickupInput::PostalCode { code, .. } => require("pickup.code", code),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AssignInput {
    pub vehicle_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Decline,
}

impl Decision {
    pub fn event(self) -> DispatchEvent {
        match self {
            Decision::Accept => DispatchEvent::Accept,
            Decision::Decline => DispatchEvent::Decline,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RespondInput {
    pub decision: Decision,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct UpdatePackageInput {
    pub details: PackageDetailsUpdate,
}

impl UpdatePackageInput {
    pub fn validate(&self) -> Result<(), AppError> {
        let details = &self.details;
        if details.is_empty() {
            return Err(AppError::InvalidInput(
                "no fields provided for update".to_string(),
            ));
        }

        let required = [
            ("recipient_name", &details.recipient_name),
            ("delivery_address", &details.delivery_address),
            ("sender_name", &details.sender_name),
            ("direction", &details.direction),
        ];
        for (field, value) in required {
            if let Some(value) = value {
                require(field, value)?;
            }
        }

        validate_weight(details.weight_kg)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LocationInput {
    pub lat: f64,
    pub lng: f64,
}

impl LocationInput {
    pub fn into_point(self) -> Result<GeoPoint, AppError> {
        let point = GeoPoint {
            lat: self.lat,
            lng: self.lng,
        };
        validate_point(&point)?;
        Ok(point)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateVehicleInput {
    pub plate_number: String,
    pub display_name: Option<String>,
    pub operator_name: Option<String>,
    pub operator_contact: Option<String>,
    pub is_active: Option<bool>,
}

impl CreateVehicleInput {
    pub fn validate(&self) -> Result<(), AppError> {
        require("plate_number", &self.plate_number)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePickupInput {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl CreatePickupInput {
    pub fn validate(&self) -> Result<(), AppError> {
        require("id", &self.id)?;
        require("name", &self.name)?;
        validate_point(&GeoPoint {
            lat: self.lat,
            lng: self.lng,
        })
    }
}

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        Err(AppError::InvalidInput(format!("{field} is required")))
    } else {
        Ok(())
    }
}

fn validate_point(point: &GeoPoint) -> Result<(), AppError> {
    if is_valid_point(point) {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!(
            "coordinates out of range: lat {}, lng {}",
            point.lat, point.lng
        )))
    }
}

fn validate_weight(weight_kg: Option<f64>) -> Result<(), AppError> {
    match weight_kg {
        Some(weight) if !weight.is_finite() || weight < 0.0 => Err(AppError::InvalidInput(
            "weight_kg must be a non-negative number".to_string(),
        )),
        _ => Ok(()),
    }
}
