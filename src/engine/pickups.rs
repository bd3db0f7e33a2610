use tracing::info;

use crate::engine::authority::{authorize, Action};
use crate::engine::input::CreatePickupInput;
use crate::engine::DispatchEngine;
use crate::error::AppError;
use crate::models::pickup::PickupLocation;
use crate::models::principal::Principal;

impl DispatchEngine {
    pub async fn list_pickup_locations(
        &self,
        principal: &Principal,
    ) -> Result<Vec<PickupLocation>, AppError> {
        authorize(principal, Action::Read)?;
        Ok(self
            .store("pickup listing", self.ports.pickups.list())
            .await?)
    }

    pub async fn create_pickup_location(
        &self,
        principal: &Principal,
        input: CreatePickupInput,
    ) -> Result<PickupLocation, AppError> {
        authorize(principal, Action::ManagePickups)?;
        input.validate()?;

        let location = PickupLocation::new(input.id.trim(), input.name.trim(), input.lat, input.lng);
        let location = self
            .store("pickup insert", self.ports.pickups.insert(location))
            .await?;

        info!(pickup_id = %location.id, "pickup location added");
        Ok(location)
    }

    pub async fn delete_pickup_location(
        &self,
        principal: &Principal,
        location_id: &str,
    ) -> Result<(), AppError> {
        authorize(principal, Action::ManagePickups)?;
        self.store("pickup delete", self.ports.pickups.delete(location_id))
            .await?;

        info!(pickup_id = %location_id, "pickup location removed");
        Ok(())
    }
}
