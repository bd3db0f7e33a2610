use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use crate::engine::authority::{authorize, Action};
use crate::engine::input::LocationInput;
use crate::engine::DispatchEngine;
use crate::error::AppError;
use crate::models::principal::Principal;
use crate::models::vehicle::GeoPoint;

impl DispatchEngine {
    /// Overwrites the vehicle's position. Last write wins, with no ordering beyond
    /// arrival at the directory.
    pub async fn report_vehicle_location(
        &self,
        principal: &Principal,
        vehicle_id: Uuid,
        input: LocationInput,
    ) -> Result<(), AppError> {
        authorize(principal, Action::ReportLocation { vehicle_id })?;
        let point = input.into_point()?;

        self.store(
            "location update",
            self.ports.locations.set(vehicle_id, point),
        )
        .await?;

        self.metrics.location_reports_total.inc();
        debug!(
            vehicle_id = %vehicle_id,
            lat = point.lat,
            lng = point.lng,
            reporter = principal.kind(),
            "vehicle location updated"
        );
        Ok(())
    }

    /// Every vehicle's last known position. A vehicle only sees its own entry.
    pub async fn vehicle_locations(
        &self,
        principal: &Principal,
    ) -> Result<HashMap<Uuid, Option<GeoPoint>>, AppError> {
        authorize(principal, Action::Read)?;

        let all = self
            .store("location listing", self.ports.locations.all())
            .await?;

        Ok(all
            .into_iter()
            .filter(|(vehicle_id, _)| {
                principal
                    .vehicle_id()
                    .is_none_or(|own| own == *vehicle_id)
            })
            .collect())
    }

    pub async fn vehicle_location(
        &self,
        principal: &Principal,
        vehicle_id: Uuid,
    ) -> Result<Option<GeoPoint>, AppError> {
        authorize(principal, Action::Read)?;
        if principal.vehicle_id().is_some_and(|own| own != vehicle_id) {
            return Err(AppError::Forbidden(format!(
                "vehicle {} may not read the location of vehicle {vehicle_id}",
                principal.id()
            )));
        }

        Ok(self
            .store("location lookup", self.ports.locations.get(vehicle_id))
            .await?)
    }
}
