use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::vehicle::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    Pending,
    Assigned,
    Accepted,
    Declined,
}

impl PackageStatus {
    pub const ALL: [PackageStatus; 4] = [
        PackageStatus::Pending,
        PackageStatus::Assigned,
        PackageStatus::Accepted,
        PackageStatus::Declined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageStatus::Pending => "pending",
            PackageStatus::Assigned => "assigned",
            PackageStatus::Accepted => "accepted",
            PackageStatus::Declined => "declined",
        }
    }

    /// Statuses in which a package is bound to a vehicle.
    pub fn holds_vehicle(&self) -> bool {
        matches!(self, PackageStatus::Assigned | PackageStatus::Accepted)
    }
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: Uuid,
    pub tracking_code: String,
    pub status: PackageStatus,
    pub assigned_vehicle_id: Option<Uuid>,
    pub pickup_location: GeoPoint,
    pub pickup_details: Option<String>,
    pub delivery_address: String,
    pub recipient_name: String,
    pub sender_name: String,
    pub direction: String,
    pub description: Option<String>,
    pub weight_kg: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Equality filters for package listings. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct PackageFilter {
    pub status: Option<PackageStatus>,
    pub assigned_vehicle_id: Option<Uuid>,
}

impl PackageFilter {
    pub fn matches(&self, package: &Package) -> bool {
        let status_ok = self.status.is_none_or(|status| package.status == status);
        let vehicle_ok = self
            .assigned_vehicle_id
            .is_none_or(|vehicle_id| package.assigned_vehicle_id == Some(vehicle_id));

        status_ok && vehicle_ok
    }
}

/// Descriptive fields an admin may change after creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageDetailsUpdate {
    pub recipient_name: Option<String>,
    pub delivery_address: Option<String>,
    pub sender_name: Option<String>,
    pub direction: Option<String>,
    pub description: Option<String>,
    pub weight_kg: Option<f64>,
    pub pickup_details: Option<String>,
}

impl PackageDetailsUpdate {
    pub fn is_empty(&self) -> bool {
        self.recipient_name.is_none()
            && self.delivery_address.is_none()
            && self.sender_name.is_none()
            && self.direction.is_none()
            && self.description.is_none()
            && self.weight_kg.is_none()
            && self.pickup_details.is_none()
    }

    pub fn apply(self, package: &mut Package) {
        if let Some(recipient_name) = self.recipient_name {
            package.recipient_name = recipient_name;
        }
        if let Some(delivery_address) = self.delivery_address {
            package.delivery_address = delivery_address;
        }
        if let Some(sender_name) = self.sender_name {
            package.sender_name = sender_name;
        }
        if let Some(direction) = self.direction {
            package.direction = direction;
        }
        if let Some(description) = self.description {
            package.description = Some(description);
        }
        if let Some(weight_kg) = self.weight_kg {
            package.weight_kg = Some(weight_kg);
        }
        if let Some(pickup_details) = self.pickup_details {
            package.pickup_details = Some(pickup_details);
        }
        package.updated_at = Utc::now();
    }
}
