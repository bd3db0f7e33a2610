use std::sync::Arc;

use uuid::Uuid;

use crate::engine::{DispatchEngine, EnginePorts, Timeouts};
use crate::geo::{depot_geocoder, Geocoder};
use crate::identity::TokenRegistry;
use crate::models::pickup::default_pickup_locations;
use crate::models::principal::Principal;
use crate::notify::{LogEmitter, NotificationEmitter};
use crate::observability::metrics::Metrics;
use crate::store::MemoryStore;

/// User id carried by the configured admin token.
pub const ADMIN_USER_ID: Uuid = Uuid::from_u128(1);

pub struct AppState {
    pub engine: DispatchEngine,
    pub identity: TokenRegistry,
    pub metrics: Metrics,
}

impl AppState {
    /// In-memory store seeded with the default depots, offline geocoding and
    /// log-only notifications.
    pub fn in_memory(admin_token: &str) -> Self {
        Self::with_collaborators(
            admin_token,
            Arc::new(depot_geocoder()),
            Arc::new(LogEmitter),
            Timeouts::default(),
            1024,
        )
    }

    pub fn with_collaborators(
        admin_token: &str,
        geocoder: Arc<dyn Geocoder>,
        notifier: Arc<dyn NotificationEmitter>,
        timeouts: Timeouts,
        event_buffer_size: usize,
    ) -> Self {
        let store = Arc::new(MemoryStore::with_pickups(default_pickup_locations()));
        let metrics = Metrics::new();

        let identity = TokenRegistry::new(store.clone());
        identity.register(admin_token, Principal::admin(ADMIN_USER_ID));

        let ports = EnginePorts::in_memory(store, geocoder, notifier);
        let engine = DispatchEngine::new(ports, timeouts, metrics.clone(), event_buffer_size);

        Self {
            engine,
            identity,
            metrics,
        }
    }
}
