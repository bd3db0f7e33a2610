//! The dispatch engine: package lifecycle, authority rules and location coordination.
//!
//! Every mutating operation runs the same gate sequence: authority, existence,
//! binding scope, state legality, references, then one conditional write against the
//! ledger. Notification follows the write and can never undo it.

pub mod authority;
pub mod dispatch;
pub mod input;
pub mod location;
pub mod packages;
pub mod pickups;
pub mod tracking;
pub mod transition;
pub mod vehicles;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::timeout;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::Geocoder;
use crate::models::package::Package;
use crate::notify::{NotificationEmitter, TransitionEvent};
use crate::observability::metrics::Metrics;
use crate::store::{
    LocationDirectory, MemoryStore, PackageLedger, PickupCatalogue, StoreError, VehicleRegistry,
};

/// External collaborators the engine reads and writes through.
#[derive(Clone)]
pub struct EnginePorts {
    pub ledger: Arc<dyn PackageLedger>,
    pub vehicles: Arc<dyn VehicleRegistry>,
    pub locations: Arc<dyn LocationDirectory>,
    pub pickups: Arc<dyn PickupCatalogue>,
    pub geocoder: Arc<dyn Geocoder>,
    pub notifier: Arc<dyn NotificationEmitter>,
}

impl EnginePorts {
    pub fn in_memory(
        store: Arc<MemoryStore>,
        geocoder: Arc<dyn Geocoder>,
        notifier: Arc<dyn NotificationEmitter>,
    ) -> Self {
        Self {
            ledger: store.clone(),
            vehicles: store.clone(),
            locations: store.clone(),
            pickups: store,
            geocoder,
            notifier,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub store: Duration,
    pub geocode: Duration,
    pub notify: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            store: Duration::from_millis(2_000),
            geocode: Duration::from_millis(5_000),
            notify: Duration::from_millis(3_000),
        }
    }
}

pub struct DispatchEngine {
    ports: EnginePorts,
    timeouts: Timeouts,
    events_tx: broadcast::Sender<TransitionEvent>,
    metrics: Metrics,
}

impl DispatchEngine {
    pub fn new(
        ports: EnginePorts,
        timeouts: Timeouts,
        metrics: Metrics,
        event_buffer_size: usize,
    ) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(event_buffer_size.max(1));

        Self {
            ports,
            timeouts,
            events_tx,
            metrics,
        }
    }

    /// Committed transitions, for live dashboards.
    pub fn subscribe(&self) -> broadcast::Receiver<TransitionEvent> {
        self.events_tx.subscribe()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Bounds a store call by the store timeout.
    async fn store<T, F>(&self, what: &'static str, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match timeout(self.timeouts.store, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Backend(format!(
                "{what} timed out after {}ms",
                self.timeouts.store.as_millis()
            ))),
        }
    }

    async fn fetch_package(&self, package_id: Uuid) -> Result<Package, AppError> {
        self.store("package lookup", self.ports.ledger.get(package_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("package {package_id} not found")))
    }
}
