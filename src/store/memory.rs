use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::package::{Package, PackageDetailsUpdate, PackageFilter, PackageStatus};
use crate::models::pickup::PickupLocation;
use crate::models::vehicle::{GeoPoint, Vehicle, VehicleUpdate};
use crate::store::{
    LocationDirectory, PackageLedger, PickupCatalogue, StatusChange, StoreError, VehicleRegistry,
};

/// `DashMap`-backed adapter for every storage port.
///
/// Row writes go through `get_mut`, which holds the shard lock for the whole
/// read-modify-write, so compare-and-set on a package is atomic.
#[derive(Default)]
pub struct MemoryStore {
    packages: DashMap<Uuid, Package>,
    tracking_codes: DashMap<String, Uuid>,
    vehicles: DashMap<Uuid, Vehicle>,
    plates: DashMap<String, Uuid>,
    pickups: DashMap<String, PickupLocation>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pickups(locations: impl IntoIterator<Item = PickupLocation>) -> Self {
        let store = Self::new();
        for location in locations {
            store.pickups.insert(location.id.clone(), location);
        }
        store
    }
}

#[async_trait]
impl PackageLedger for MemoryStore {
    async fn list(&self, filter: &PackageFilter) -> Result<Vec<Package>, StoreError> {
        let mut packages: Vec<Package> = self
            .packages
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        packages.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.tracking_code.cmp(&b.tracking_code))
        });
        Ok(packages)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Package>, StoreError> {
        Ok(self.packages.get(&id).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, package: Package) -> Result<Package, StoreError> {
        match self.tracking_codes.entry(package.tracking_code.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate {
                field: "tracking_code",
                value: package.tracking_code,
            }),
            Entry::Vacant(slot) => {
                slot.insert(package.id);
                self.packages.insert(package.id, package.clone());
                Ok(package)
            }
        }
    }

    async fn update_details(
        &self,
        id: Uuid,
        update: PackageDetailsUpdate,
    ) -> Result<Package, StoreError> {
        let mut package = self
            .packages
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("package", id))?;

        update.apply(&mut package);
        Ok(package.clone())
    }

    async fn transition(&self, id: Uuid, change: StatusChange) -> Result<Package, StoreError> {
        let mut package = self
            .packages
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("package", id))?;

        if package.status != change.expected_status
            || package.assigned_vehicle_id != change.expected_vehicle_id
        {
            return Err(StoreError::StatusMismatch {
                actual: package.status,
            });
        }

        package.status = change.status;
        package.assigned_vehicle_id = change.assigned_vehicle_id;
        package.updated_at = Utc::now();
        Ok(package.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let (_, package) = self
            .packages
            .remove(&id)
            .ok_or_else(|| StoreError::not_found("package", id))?;

        self.tracking_codes.remove(&package.tracking_code);
        Ok(())
    }

    async fn release_vehicle(&self, vehicle_id: Uuid) -> Result<usize, StoreError> {
        let mut released = 0;
        for mut entry in self.packages.iter_mut() {
            let package = entry.value_mut();
            if package.assigned_vehicle_id == Some(vehicle_id) {
                package.assigned_vehicle_id = None;
                if package.status.holds_vehicle() {
                    package.status = PackageStatus::Pending;
                }
                package.updated_at = Utc::now();
                released += 1;
            }
        }
        Ok(released)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.packages.len())
    }
}

#[async_trait]
impl VehicleRegistry for MemoryStore {
    async fn list(&self) -> Result<Vec<Vehicle>, StoreError> {
        let mut vehicles: Vec<Vehicle> = self
            .vehicles
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        vehicles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(vehicles)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Vehicle>, StoreError> {
        Ok(self.vehicles.get(&id).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, vehicle: Vehicle) -> Result<Vehicle, StoreError> {
        match self.plates.entry(vehicle.plate_number.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate {
                field: "plate_number",
                value: vehicle.plate_number,
            }),
            Entry::Vacant(slot) => {
                slot.insert(vehicle.id);
                self.vehicles.insert(vehicle.id, vehicle.clone());
                Ok(vehicle)
            }
        }
    }

    async fn update(&self, id: Uuid, update: VehicleUpdate) -> Result<Vehicle, StoreError> {
        let mut vehicle = self
            .vehicles
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("vehicle", id))?;

        if let Some(plate) = update.plate_number.as_ref().filter(|p| **p != vehicle.plate_number) {
            match self.plates.entry(plate.clone()) {
                Entry::Occupied(_) => {
                    return Err(StoreError::Duplicate {
                        field: "plate_number",
                        value: plate.clone(),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
            self.plates.remove(&vehicle.plate_number);
        }

        update.apply(&mut vehicle);
        Ok(vehicle.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let (_, vehicle) = self
            .vehicles
            .remove(&id)
            .ok_or_else(|| StoreError::not_found("vehicle", id))?;

        self.plates.remove(&vehicle.plate_number);
        Ok(())
    }
}

#[async_trait]
impl LocationDirectory for MemoryStore {
    async fn all(&self) -> Result<Vec<(Uuid, Option<GeoPoint>)>, StoreError> {
        Ok(self
            .vehicles
            .iter()
            .map(|entry| (*entry.key(), entry.value().current_location))
            .collect())
    }

    async fn get(&self, vehicle_id: Uuid) -> Result<Option<GeoPoint>, StoreError> {
        self.vehicles
            .get(&vehicle_id)
            .map(|entry| entry.value().current_location)
            .ok_or_else(|| StoreError::not_found("vehicle", vehicle_id))
    }

    async fn set(&self, vehicle_id: Uuid, location: GeoPoint) -> Result<(), StoreError> {
        let mut vehicle = self
            .vehicles
            .get_mut(&vehicle_id)
            .ok_or_else(|| StoreError::not_found("vehicle", vehicle_id))?;

        vehicle.current_location = Some(location);
        vehicle.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl PickupCatalogue for MemoryStore {
    async fn list(&self) -> Result<Vec<PickupLocation>, StoreError> {
        let mut locations: Vec<PickupLocation> = self
            .pickups
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        locations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(locations)
    }

    async fn get(&self, id: &str) -> Result<Option<PickupLocation>, StoreError> {
        Ok(self.pickups.get(id).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, location: PickupLocation) -> Result<PickupLocation, StoreError> {
        match self.pickups.entry(location.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate {
                field: "pickup_location_id",
                value: location.id,
            }),
            Entry::Vacant(slot) => {
                slot.insert(location.clone());
                Ok(location)
            }
        }
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.pickups
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("pickup location", id))
    }
}
