use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::authority::{authorize, Action};
use crate::engine::input::CreateVehicleInput;
use crate::engine::DispatchEngine;
use crate::error::AppError;
use crate::models::principal::Principal;
use crate::models::vehicle::{Vehicle, VehicleUpdate};

impl DispatchEngine {
    pub async fn create_vehicle(
        &self,
        principal: &Principal,
        input: CreateVehicleInput,
    ) -> Result<Vehicle, AppError> {
        authorize(principal, Action::ManageVehicles)?;
        input.validate()?;

        let now = Utc::now();
        let vehicle = Vehicle {
            id: Uuid::new_v4(),
            plate_number: input.plate_number.trim().to_string(),
            display_name: input.display_name,
            operator_name: input.operator_name,
            operator_contact: input.operator_contact,
            current_location: None,
            is_active: input.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };

        let vehicle = self
            .store("vehicle insert", self.ports.vehicles.insert(vehicle))
            .await?;

        info!(vehicle_id = %vehicle.id, plate = %vehicle.plate_number, "vehicle registered");
        Ok(vehicle)
    }

    pub async fn list_vehicles(&self, principal: &Principal) -> Result<Vec<Vehicle>, AppError> {
        authorize(principal, Action::ManageVehicles)?;
        Ok(self
            .store("vehicle listing", self.ports.vehicles.list())
            .await?)
    }

    pub async fn get_vehicle(
        &self,
        principal: &Principal,
        vehicle_id: Uuid,
    ) -> Result<Vehicle, AppError> {
        authorize(principal, Action::ManageVehicles)?;
        self.store("vehicle lookup", self.ports.vehicles.get(vehicle_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("vehicle {vehicle_id} not found")))
    }

    pub async fn update_vehicle(
        &self,
        principal: &Principal,
        vehicle_id: Uuid,
        update: VehicleUpdate,
    ) -> Result<Vehicle, AppError> {
        authorize(principal, Action::ManageVehicles)?;
        if update.is_empty() {
            return Err(AppError::InvalidInput(
                "no fields provided for update".to_string(),
            ));
        }
        if update
            .plate_number
            .as_deref()
            .is_some_and(|plate| plate.trim().is_empty())
        {
            return Err(AppError::InvalidInput(
                "plate_number cannot be empty".to_string(),
            ));
        }

        let vehicle = self
            .store(
                "vehicle update",
                self.ports.vehicles.update(vehicle_id, update),
            )
            .await?;

        info!(vehicle_id = %vehicle.id, active = vehicle.is_active, "vehicle updated");
        Ok(vehicle)
    }

    /// Unbinds whatever the vehicle was carrying, then removes it. Returns how many
    /// packages went back to dispatch.
    ///
    /// Packages are released before the row goes, so a failed release leaves the
    /// vehicle in place and the call can be retried. The sweep after the delete
    /// catches an assign that committed between the first release and the delete.
    pub async fn delete_vehicle(
        &self,
        principal: &Principal,
        vehicle_id: Uuid,
    ) -> Result<usize, AppError> {
        authorize(principal, Action::ManageVehicles)?;
        if self
            .store("vehicle lookup", self.ports.vehicles.get(vehicle_id))
            .await?
            .is_none()
        {
            return Err(AppError::NotFound(format!("vehicle {vehicle_id} not found")));
        }

        let mut released = self
            .store(
                "package release",
                self.ports.ledger.release_vehicle(vehicle_id),
            )
            .await?;

        self.store("vehicle delete", self.ports.vehicles.delete(vehicle_id))
            .await?;

        match self
            .store(
                "package release",
                self.ports.ledger.release_vehicle(vehicle_id),
            )
            .await
        {
            Ok(late) => released += late,
            Err(err) => warn!(
                vehicle_id = %vehicle_id,
                error = %err,
                "post-delete package sweep failed"
            ),
        }

        info!(vehicle_id = %vehicle_id, released, "vehicle removed");
        Ok(released)
    }
}
