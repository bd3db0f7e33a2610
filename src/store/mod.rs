//! Storage ports the dispatch engine depends on, plus the in-memory adapter.
//!
//! Every write the engine performs touches a single row. Adapters must make
//! [`PackageLedger::transition`] a compare-and-set against the status and binding the
//! engine validated, so that two writers racing on one package cannot both succeed.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::package::{Package, PackageDetailsUpdate, PackageFilter, PackageStatus};
use crate::models::pickup::PickupLocation;
use crate::models::vehicle::{GeoPoint, Vehicle, VehicleUpdate};

pub use memory::MemoryStore;

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("duplicate {field}: {value}")]
    Duplicate { field: &'static str, value: String },

    #[error("package changed concurrently: now {actual}")]
    StatusMismatch { actual: PackageStatus },

    #[error("store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => AppError::NotFound(err.to_string()),
            StoreError::Duplicate { .. } => AppError::Conflict(err.to_string()),
            StoreError::StatusMismatch { .. } => AppError::Conflict(err.to_string()),
            StoreError::Backend(msg) => AppError::Unavailable(msg),
        }
    }
}

/// A status write guarded by the state the caller validated against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusChange {
    pub expected_status: PackageStatus,
    pub expected_vehicle_id: Option<Uuid>,
    pub status: PackageStatus,
    pub assigned_vehicle_id: Option<Uuid>,
}

#[async_trait]
pub trait PackageLedger: Send + Sync {
    /// Packages matching `filter`, newest first.
    async fn list(&self, filter: &PackageFilter) -> Result<Vec<Package>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Package>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] when the tracking code is taken.
    async fn insert(&self, package: Package) -> Result<Package, StoreError>;

    async fn update_details(
        &self,
        id: Uuid,
        update: PackageDetailsUpdate,
    ) -> Result<Package, StoreError>;

    /// Applies `change` only if the stored status and binding still match its
    /// expectations, otherwise fails with [`StoreError::StatusMismatch`].
    async fn transition(&self, id: Uuid, change: StatusChange) -> Result<Package, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;

    /// Unbinds every package held by `vehicle_id` and returns them to `pending`.
    async fn release_vehicle(&self, vehicle_id: Uuid) -> Result<usize, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;
}

#[async_trait]
pub trait VehicleRegistry: Send + Sync {
    async fn list(&self) -> Result<Vec<Vehicle>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Vehicle>, StoreError>;

    /// Fails with [`StoreError::Duplicate`] when the plate number is taken.
    async fn insert(&self, vehicle: Vehicle) -> Result<Vehicle, StoreError>;

    async fn update(&self, id: Uuid, update: VehicleUpdate) -> Result<Vehicle, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait LocationDirectory: Send + Sync {
    async fn all(&self) -> Result<Vec<(Uuid, Option<GeoPoint>)>, StoreError>;

    async fn get(&self, vehicle_id: Uuid) -> Result<Option<GeoPoint>, StoreError>;

    /// Last write wins.
    async fn set(&self, vehicle_id: Uuid, location: GeoPoint) -> Result<(), StoreError>;
}

#[async_trait]
pub trait PickupCatalogue: Send + Sync {
    async fn list(&self) -> Result<Vec<PickupLocation>, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<PickupLocation>, StoreError>;

    async fn insert(&self, location: PickupLocation) -> Result<PickupLocation, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}
