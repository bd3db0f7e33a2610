//! Bearer-token identity: who is making this request.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use crate::models::principal::Principal;
use crate::store::VehicleRegistry;

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// `None` for unknown tokens and for vehicles that are gone or inactive.
    async fn resolve(&self, token: &str) -> Option<Principal>;
}

/// In-memory token table. Vehicle tokens are re-checked against the registry on
/// every request so deactivation takes effect immediately.
pub struct TokenRegistry {
    tokens: DashMap<String, Principal>,
    vehicles: Arc<dyn VehicleRegistry>,
}

impl TokenRegistry {
    pub fn new(vehicles: Arc<dyn VehicleRegistry>) -> Self {
        Self {
            tokens: DashMap::new(),
            vehicles,
        }
    }

    pub fn register(&self, token: impl Into<String>, principal: Principal) {
        self.tokens.insert(token.into(), principal);
    }

    pub fn issue_vehicle_token(&self, vehicle_id: Uuid) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens
            .insert(token.clone(), Principal::vehicle(vehicle_id));
        token
    }

    pub fn revoke_vehicle(&self, vehicle_id: Uuid) {
        self.tokens
            .retain(|_, principal| principal.vehicle_id() != Some(vehicle_id));
    }
}

#[async_trait]
impl IdentityResolver for TokenRegistry {
    async fn resolve(&self, token: &str) -> Option<Principal> {
        let principal = *self.tokens.get(token)?;

        let Some(vehicle_id) = principal.vehicle_id() else {
            return Some(principal);
        };

        match self.vehicles.get(vehicle_id).await {
            Ok(Some(vehicle)) if vehicle.is_active => Some(principal),
            Ok(_) => {
                debug!(vehicle_id = %vehicle_id, "token of missing or inactive vehicle rejected");
                None
            }
            Err(err) => {
                debug!(vehicle_id = %vehicle_id, error = %err, "vehicle lookup failed during auth");
                None
            }
        }
    }
}
