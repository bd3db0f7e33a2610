use chrono::Utc;
use tokio::time::timeout;
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::authority::{authorize, ensure_bound, Action};
use crate::engine::input::{CreatePackageInput, PickupInput, UpdatePackageInput, DEFAULT_COUNTRY};
use crate::engine::tracking::tracking_code;
use crate::engine::DispatchEngine;
use crate::error::AppError;
use crate::models::package::{Package, PackageFilter, PackageStatus};
use crate::models::principal::Principal;
use crate::models::vehicle::GeoPoint;
use crate::store::StoreError;

const TRACKING_CODE_ATTEMPTS: usize = 5;

impl DispatchEngine {
    pub async fn create_package(
        &self,
        principal: &Principal,
        input: CreatePackageInput,
    ) -> Result<Package, AppError> {
        authorize(principal, Action::CreatePackage)?;
        input.validate()?;

        let (pickup_location, pickup_details) = self
            .resolve_pickup(&input.pickup, input.pickup_details)
            .await?;

        let now = Utc::now();
        let mut package = Package {
            id: Uuid::new_v4(),
            tracking_code: tracking_code(now),
            status: PackageStatus::Pending,
            assigned_vehicle_id: None,
            pickup_location,
            pickup_details,
            delivery_address: input.delivery_address,
            recipient_name: input.recipient_name,
            sender_name: input.sender_name,
            direction: input.direction,
            description: input.description,
            weight_kg: input.weight_kg,
            created_at: now,
            updated_at: now,
        };

        for _ in 0..TRACKING_CODE_ATTEMPTS {
            match self
                .store("package insert", self.ports.ledger.insert(package.clone()))
                .await
            {
                Ok(stored) => {
                    self.metrics.packages_total.inc();
                    info!(
                        package_id = %stored.id,
                        tracking_code = %stored.tracking_code,
                        "package created"
                    );
                    return Ok(stored);
                }
                Err(StoreError::Duplicate {
                    field: "tracking_code",
                    value,
                }) => {
                    debug!(tracking_code = %value, "tracking code collision; regenerating");
                    package.tracking_code = tracking_code(Utc::now());
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(AppError::Conflict(
            "could not allocate a unique tracking code".to_string(),
        ))
    }

    /// Packages visible to `principal`. Vehicles only ever see their own.
    pub async fn list_packages(
        &self,
        principal: &Principal,
        filter: PackageFilter,
    ) -> Result<Vec<Package>, AppError> {
        authorize(principal, Action::Read)?;
        let filter = scope_filter(principal, filter)?;

        Ok(self
            .store("package listing", self.ports.ledger.list(&filter))
            .await?)
    }

    pub async fn get_package(
        &self,
        principal: &Principal,
        package_id: Uuid,
    ) -> Result<Package, AppError> {
        authorize(principal, Action::Read)?;
        let package = self.fetch_package(package_id).await?;
        ensure_bound(principal, &package)?;
        Ok(package)
    }

    pub async fn update_package(
        &self,
        principal: &Principal,
        package_id: Uuid,
        input: UpdatePackageInput,
    ) -> Result<Package, AppError> {
        authorize(principal, Action::UpdatePackage)?;
        input.validate()?;

        let updated = self
            .store(
                "package update",
                self.ports.ledger.update_details(package_id, input.details),
            )
            .await?;

        info!(package_id = %updated.id, "package details updated");
        Ok(updated)
    }

    /// Allowed at any status.
    pub async fn delete_package(
        &self,
        principal: &Principal,
        package_id: Uuid,
    ) -> Result<(), AppError> {
        authorize(principal, Action::DeletePackage)?;
        self.store("package delete", self.ports.ledger.delete(package_id))
            .await?;

        self.metrics.packages_total.dec();
        info!(package_id = %package_id, "package deleted");
        Ok(())
    }

    pub async fn package_count(&self) -> Result<usize, AppError> {
        Ok(self
            .store("package count", self.ports.ledger.count())
            .await?)
    }

    async fn resolve_pickup(
        &self,
        pickup: &PickupInput,
        details: Option<String>,
    ) -> Result<(GeoPoint, Option<String>), AppError> {
        match pickup {
            PickupInput::Coordinates { lat, lng } => Ok((
                GeoPoint {
                    lat: *lat,
                    lng: *lng,
                },
                details,
            )),
            PickupInput::Predefined { location_id } => {
                let location = self
                    .store("pickup lookup", self.ports.pickups.get(location_id))
                    .await?
                    .ok_or_else(|| {
                        AppError::InvalidInput(format!("unknown pickup location {location_id}"))
                    })?;

                Ok((location.location, details.or(Some(location.name))))
            }
            PickupInput::PostalCode { code, country } => {
                let country = country.as_deref().unwrap_or(DEFAULT_COUNTRY);
                let point = match timeout(
                    self.timeouts.geocode,
                    self.ports.geocoder.geocode(code, country),
                )
                .await
                {
                    Ok(Ok(point)) => point,
                    Ok(Err(err)) => {
                        return Err(AppError::InvalidInput(format!(
                            "pickup location unresolved: {err}"
                        )));
                    }
                    Err(_) => {
                        return Err(AppError::InvalidInput(format!(
                            "pickup location unresolved: geocoding {code} timed out"
                        )));
                    }
                };

                let details =
                    details.unwrap_or_else(|| format!("Geocoded from ZIP: {code}, {country}"));
                Ok((point, Some(details)))
            }
        }
    }
}

fn scope_filter(principal: &Principal, filter: PackageFilter) -> Result<PackageFilter, AppError> {
    let Some(own) = principal.vehicle_id() else {
        return Ok(filter);
    };

    match filter.assigned_vehicle_id {
        Some(requested) if requested != own => Err(AppError::Forbidden(format!(
            "vehicle {own} may not list packages of vehicle {requested}"
        ))),
        _ => Ok(PackageFilter {
            assigned_vehicle_id: Some(own),
            ..filter
        }),
    }
}
