use std::future::Future;
use std::time::Instant;

use chrono::Utc;
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::authority::{authorize, ensure_bound, Action};
use crate::engine::input::{AssignInput, RespondInput};
use crate::engine::transition::{self, DispatchEvent};
use crate::engine::DispatchEngine;
use crate::error::AppError;
use crate::models::package::{Package, PackageStatus};
use crate::models::principal::Principal;
use crate::notify::{Notice, NotificationFailure, TransitionEvent};
use crate::store::{StatusChange, StoreError};

impl DispatchEngine {
    /// Binds a package to a vehicle. Admin only.
    pub async fn assign_package(
        &self,
        principal: &Principal,
        package_id: Uuid,
        input: AssignInput,
    ) -> Result<Package, AppError> {
        self.observe(DispatchEvent::Assign, self.assign(principal, package_id, input))
            .await
    }

    /// The bound vehicle accepts or declines its assignment.
    pub async fn respond_to_assignment(
        &self,
        principal: &Principal,
        package_id: Uuid,
        input: RespondInput,
    ) -> Result<Package, AppError> {
        let event = input.decision.event();
        self.observe(event, self.respond(principal, package_id, event))
            .await
    }

    async fn assign(
        &self,
        principal: &Principal,
        package_id: Uuid,
        input: AssignInput,
    ) -> Result<Package, AppError> {
        authorize(principal, Action::Dispatch(DispatchEvent::Assign))?;
        let package = self.fetch_package(package_id).await?;
        let next = transition::apply(package.status, DispatchEvent::Assign)?;
        self.ensure_assignable(input.vehicle_id).await?;

        self.commit(
            &package,
            DispatchEvent::Assign,
            next,
            Some(input.vehicle_id),
            input.vehicle_id,
        )
        .await
    }

    async fn respond(
        &self,
        principal: &Principal,
        package_id: Uuid,
        event: DispatchEvent,
    ) -> Result<Package, AppError> {
        authorize(principal, Action::Dispatch(event))?;
        let package = self.fetch_package(package_id).await?;
        ensure_bound(principal, &package)?;
        let next = transition::apply(package.status, event)?;

        let vehicle_id = package.assigned_vehicle_id.ok_or_else(|| {
            AppError::Internal(format!("package {package_id} is bound without a vehicle"))
        })?;
        let assigned_vehicle_id = match next {
            PackageStatus::Declined => None,
            _ => Some(vehicle_id),
        };

        self.commit(&package, event, next, assigned_vehicle_id, vehicle_id)
            .await
    }

    async fn ensure_assignable(&self, vehicle_id: Uuid) -> Result<(), AppError> {
        let vehicle = self
            .store("vehicle lookup", self.ports.vehicles.get(vehicle_id))
            .await?
            .ok_or_else(|| AppError::InvalidReference(format!("vehicle {vehicle_id} does not exist")))?;

        if !vehicle.is_active {
            return Err(AppError::InvalidReference(format!(
                "vehicle {vehicle_id} is inactive"
            )));
        }

        Ok(())
    }

    /// A vehicle deleted between the reference check and the write must not keep the
    /// package. The bind is undone by releasing the vehicle's packages.
    async fn ensure_still_registered(
        &self,
        package: &Package,
        vehicle_id: Uuid,
    ) -> Result<(), AppError> {
        match self
            .store("vehicle lookup", self.ports.vehicles.get(vehicle_id))
            .await
        {
            Ok(Some(_)) => return Ok(()),
            Ok(None) => {}
            // The write stands; the delete's own sweep covers this case.
            Err(err) => {
                warn!(vehicle_id = %vehicle_id, error = %err, "post-assign vehicle check failed");
                return Ok(());
            }
        }

        warn!(
            package_id = %package.id,
            vehicle_id = %vehicle_id,
            "vehicle removed while being assigned; releasing package"
        );
        self.store(
            "package release",
            self.ports.ledger.release_vehicle(vehicle_id),
        )
        .await?;

        Err(AppError::InvalidReference(format!(
            "vehicle {vehicle_id} does not exist"
        )))
    }

    /// Writes the transition conditionally on the state it was validated against,
    /// then publishes and notifies.
    async fn commit(
        &self,
        package: &Package,
        event: DispatchEvent,
        next: PackageStatus,
        assigned_vehicle_id: Option<Uuid>,
        vehicle_id: Uuid,
    ) -> Result<Package, AppError> {
        let change = StatusChange {
            expected_status: package.status,
            expected_vehicle_id: package.assigned_vehicle_id,
            status: next,
            assigned_vehicle_id,
        };

        let updated = match self
            .store("package transition", self.ports.ledger.transition(package.id, change))
            .await
        {
            Ok(updated) => updated,
            Err(StoreError::StatusMismatch { actual }) => {
                warn!(
                    package_id = %package.id,
                    event = %event,
                    expected = %package.status,
                    actual = %actual,
                    "package changed between validation and write"
                );
                return Err(AppError::InvalidTransition {
                    event: event.as_str(),
                    status: actual,
                });
            }
            Err(err) => return Err(err.into()),
        };

        if event == DispatchEvent::Assign {
            self.ensure_still_registered(&updated, vehicle_id).await?;
        }

        info!(
            package_id = %updated.id,
            vehicle_id = %vehicle_id,
            event = %event,
            from = %package.status,
            to = %updated.status,
            "package transitioned"
        );

        let transition_event = TransitionEvent {
            event,
            package_id: updated.id,
            tracking_code: updated.tracking_code.clone(),
            from: package.status,
            to: updated.status,
            vehicle_id,
            package: updated.clone(),
            occurred_at: Utc::now(),
        };

        // Err only means nobody is subscribed.
        self.events_tx.send(transition_event.clone()).ok();
        self.notify(&transition_event).await;

        Ok(updated)
    }

    /// Failures here are logged and counted, never returned.
    async fn notify(&self, event: &TransitionEvent) {
        let Some(notice) = Notice::for_event(event) else {
            return;
        };

        let outcome = match timeout(self.timeouts.notify, self.ports.notifier.emit(&notice)).await
        {
            Ok(result) => result,
            Err(_) => Err(NotificationFailure(format!(
                "timed out after {}ms",
                self.timeouts.notify.as_millis()
            ))),
        };

        if let Err(err) = outcome {
            self.metrics.notification_failures_total.inc();
            warn!(
                package_id = %event.package_id,
                vehicle_id = %notice.vehicle_id,
                error = %err,
                "vehicle notification failed"
            );
        }
    }

    async fn observe<F>(&self, event: DispatchEvent, call: F) -> Result<Package, AppError>
    where
        F: Future<Output = Result<Package, AppError>>,
    {
        let start = Instant::now();
        let result = call.await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(err) => err.kind(),
        };
        self.metrics
            .transition_latency_seconds
            .with_label_values(&[event.as_str()])
            .observe(start.elapsed().as_secs_f64());
        self.metrics
            .transitions_total
            .with_label_values(&[event.as_str(), outcome])
            .inc();

        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use uuid::Uuid;

    use crate::engine::input::{
        AssignInput, CreatePackageInput, CreateVehicleInput, Decision, PickupInput, RespondInput,
    };
    use crate::engine::transition::DispatchEvent;
    use crate::engine::{DispatchEngine, EnginePorts, Timeouts};
    use crate::error::AppError;
    use crate::geo::depot_geocoder;
    use crate::models::package::{
        Package, PackageDetailsUpdate, PackageFilter, PackageStatus,
    };
    use crate::models::principal::Principal;
    use crate::notify::{LogEmitter, Notice, NotificationEmitter, NotificationFailure};
    use crate::observability::metrics::Metrics;
    use crate::models::vehicle::{Vehicle, VehicleUpdate};
    use crate::store::{
        MemoryStore, PackageLedger, StatusChange, StoreError, VehicleRegistry,
    };

    struct Unreachable;

    #[async_trait]
    impl NotificationEmitter for Unreachable {
        async fn emit(&self, _notice: &Notice) -> Result<(), NotificationFailure> {
            Err(NotificationFailure("connection refused".to_string()))
        }
    }

    struct Hanging;

    #[async_trait]
    impl NotificationEmitter for Hanging {
        async fn emit(&self, _notice: &Notice) -> Result<(), NotificationFailure> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    }

    /// Serves a fixed snapshot on reads so the engine validates against stale state.
    struct StaleLedger {
        inner: Arc<MemoryStore>,
        snapshot: Package,
    }

    #[async_trait]
    impl PackageLedger for StaleLedger {
        async fn list(&self, filter: &PackageFilter) -> Result<Vec<Package>, StoreError> {
            PackageLedger::list(self.inner.as_ref(), filter).await
        }

        async fn get(&self, _id: Uuid) -> Result<Option<Package>, StoreError> {
            Ok(Some(self.snapshot.clone()))
        }

        async fn insert(&self, package: Package) -> Result<Package, StoreError> {
            PackageLedger::insert(self.inner.as_ref(), package).await
        }

        async fn update_details(
            &self,
            id: Uuid,
            update: PackageDetailsUpdate,
        ) -> Result<Package, StoreError> {
            self.inner.update_details(id, update).await
        }

        async fn transition(&self, id: Uuid, change: StatusChange) -> Result<Package, StoreError> {
            self.inner.transition(id, change).await
        }

        async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
            PackageLedger::delete(self.inner.as_ref(), id).await
        }

        async fn release_vehicle(&self, vehicle_id: Uuid) -> Result<usize, StoreError> {
            self.inner.release_vehicle(vehicle_id).await
        }

        async fn count(&self) -> Result<usize, StoreError> {
            self.inner.count().await
        }
    }

    /// Fails the first `failures` package releases, then delegates.
    struct FlakyReleaseLedger {
        inner: Arc<MemoryStore>,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl PackageLedger for FlakyReleaseLedger {
        async fn list(&self, filter: &PackageFilter) -> Result<Vec<Package>, StoreError> {
            PackageLedger::list(self.inner.as_ref(), filter).await
        }

        async fn get(&self, id: Uuid) -> Result<Option<Package>, StoreError> {
            PackageLedger::get(self.inner.as_ref(), id).await
        }

        async fn insert(&self, package: Package) -> Result<Package, StoreError> {
            PackageLedger::insert(self.inner.as_ref(), package).await
        }

        async fn update_details(
            &self,
            id: Uuid,
            update: PackageDetailsUpdate,
        ) -> Result<Package, StoreError> {
            self.inner.update_details(id, update).await
        }

        async fn transition(&self, id: Uuid, change: StatusChange) -> Result<Package, StoreError> {
            self.inner.transition(id, change).await
        }

        async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
            PackageLedger::delete(self.inner.as_ref(), id).await
        }

        async fn release_vehicle(&self, vehicle_id: Uuid) -> Result<usize, StoreError> {
            let failing = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
            if failing {
                return Err(StoreError::Backend("timeout".to_string()));
            }
            self.inner.release_vehicle(vehicle_id).await
        }

        async fn count(&self) -> Result<usize, StoreError> {
            self.inner.count().await
        }
    }

    /// Finds the vehicle on the first lookup only, as if it were deleted right after.
    struct VanishingRegistry {
        inner: Arc<MemoryStore>,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl VehicleRegistry for VanishingRegistry {
        async fn list(&self) -> Result<Vec<Vehicle>, StoreError> {
            VehicleRegistry::list(self.inner.as_ref()).await
        }

        async fn get(&self, id: Uuid) -> Result<Option<Vehicle>, StoreError> {
            if self.lookups.fetch_add(1, Ordering::SeqCst) > 0 {
                return Ok(None);
            }
            VehicleRegistry::get(self.inner.as_ref(), id).await
        }

        async fn insert(&self, vehicle: Vehicle) -> Result<Vehicle, StoreError> {
            VehicleRegistry::insert(self.inner.as_ref(), vehicle).await
        }

        async fn update(&self, id: Uuid, update: VehicleUpdate) -> Result<Vehicle, StoreError> {
            self.inner.update(id, update).await
        }

        async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
            VehicleRegistry::delete(self.inner.as_ref(), id).await
        }
    }

    fn admin() -> Principal {
        Principal::admin(Uuid::from_u128(1))
    }

    fn engine(store: Arc<MemoryStore>, notifier: Arc<dyn NotificationEmitter>) -> DispatchEngine {
        let timeouts = Timeouts {
            notify: Duration::from_millis(50),
            ..Timeouts::default()
        };
        let ports = EnginePorts::in_memory(store, Arc::new(depot_geocoder()), notifier);
        DispatchEngine::new(ports, timeouts, Metrics::new(), 16)
    }

    async fn vehicle(engine: &DispatchEngine, plate: &str) -> Uuid {
        engine
            .create_vehicle(
                &admin(),
                CreateVehicleInput {
                    plate_number: plate.to_string(),
                    display_name: None,
                    operator_name: None,
                    operator_contact: None,
                    is_active: None,
                },
            )
            .await
            .unwrap()
            .id
    }

    async fn package(engine: &DispatchEngine) -> Package {
        engine
            .create_package(
                &admin(),
                CreatePackageInput {
                    recipient_name: "Maria".to_string(),
                    delivery_address: "Str. Puskin 22".to_string(),
                    sender_name: "Ion".to_string(),
                    direction: "Balti".to_string(),
                    pickup: PickupInput::Coordinates {
                        lat: 47.0105,
                        lng: 28.8638,
                    },
                    pickup_details: None,
                    description: None,
                    weight_kg: None,
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn failed_notification_does_not_fail_assignment() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(store, Arc::new(Unreachable));
        let vehicle_id = vehicle(&engine, "C NT 1").await;
        let package = package(&engine).await;

        let assigned = engine
            .assign_package(&admin(), package.id, AssignInput { vehicle_id })
            .await
            .unwrap();

        assert_eq!(assigned.status, PackageStatus::Assigned);
        assert_eq!(engine.metrics().notification_failures_total.get(), 1);
    }

    #[tokio::test]
    async fn notification_timeout_does_not_fail_assignment() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(store, Arc::new(Hanging));
        let vehicle_id = vehicle(&engine, "C NT 2").await;
        let package = package(&engine).await;

        let assigned = engine
            .assign_package(&admin(), package.id, AssignInput { vehicle_id })
            .await
            .unwrap();

        assert_eq!(assigned.assigned_vehicle_id, Some(vehicle_id));
        assert_eq!(engine.metrics().notification_failures_total.get(), 1);
    }

    #[tokio::test]
    async fn stale_validation_loses_to_committed_write() {
        let store = Arc::new(MemoryStore::new());
        let live = engine(store.clone(), Arc::new(LogEmitter));
        let first = vehicle(&live, "C ST 1").await;
        let second = vehicle(&live, "C ST 2").await;
        let snapshot = package(&live).await;

        live.assign_package(&admin(), snapshot.id, AssignInput { vehicle_id: first })
            .await
            .unwrap();

        let ports = EnginePorts {
            ledger: Arc::new(StaleLedger {
                inner: store.clone(),
                snapshot: snapshot.clone(),
            }),
            ..EnginePorts::in_memory(store.clone(), Arc::new(depot_geocoder()), Arc::new(LogEmitter))
        };
        let stale = DispatchEngine::new(ports, Timeouts::default(), Metrics::new(), 16);

        let err = stale
            .assign_package(&admin(), snapshot.id, AssignInput { vehicle_id: second })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::InvalidTransition {
                event: "assign",
                status: PackageStatus::Assigned
            }
        ));
        let current = PackageLedger::get(store.as_ref(), snapshot.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.assigned_vehicle_id, Some(first));
    }

    #[tokio::test]
    async fn inactive_vehicle_is_invalid_reference() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(store, Arc::new(LogEmitter));
        let package = package(&engine).await;

        let err = engine
            .assign_package(
                &admin(),
                package.id,
                AssignInput {
                    vehicle_id: Uuid::from_u128(404),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidReference(_)));

        let vehicle_id = vehicle(&engine, "C IR 1").await;
        engine
            .update_vehicle(
                &admin(),
                vehicle_id,
                crate::models::vehicle::VehicleUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = engine
            .assign_package(&admin(), package.id, AssignInput { vehicle_id })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidReference(_)));
    }

    #[tokio::test]
    async fn committed_transitions_reach_subscribers() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(store, Arc::new(LogEmitter));
        let mut feed = engine.subscribe();
        let vehicle_id = vehicle(&engine, "C FD 1").await;
        let package = package(&engine).await;

        engine
            .assign_package(&admin(), package.id, AssignInput { vehicle_id })
            .await
            .unwrap();
        engine
            .respond_to_assignment(
                &Principal::vehicle(vehicle_id),
                package.id,
                RespondInput {
                    decision: Decision::Decline,
                },
            )
            .await
            .unwrap();

        let assigned = feed.recv().await.unwrap();
        assert_eq!(assigned.event, DispatchEvent::Assign);
        assert_eq!(assigned.from, PackageStatus::Pending);

        let declined = feed.recv().await.unwrap();
        assert_eq!(declined.event, DispatchEvent::Decline);
        assert_eq!(declined.to, PackageStatus::Declined);
        assert_eq!(declined.vehicle_id, vehicle_id);
        assert_eq!(declined.package.assigned_vehicle_id, None);
    }

    #[tokio::test]
    async fn failed_release_keeps_vehicle_so_delete_can_be_retried() {
        let store = Arc::new(MemoryStore::new());
        let ports = EnginePorts {
            ledger: Arc::new(FlakyReleaseLedger {
                inner: store.clone(),
                failures: AtomicUsize::new(1),
            }),
            ..EnginePorts::in_memory(store.clone(), Arc::new(depot_geocoder()), Arc::new(LogEmitter))
        };
        let engine = DispatchEngine::new(ports, Timeouts::default(), Metrics::new(), 16);
        let vehicle_id = vehicle(&engine, "C FR 1").await;
        let package = package(&engine).await;
        engine
            .assign_package(&admin(), package.id, AssignInput { vehicle_id })
            .await
            .unwrap();

        let err = engine.delete_vehicle(&admin(), vehicle_id).await.unwrap_err();
        assert!(matches!(err, AppError::Unavailable(_)));
        assert!(VehicleRegistry::get(store.as_ref(), vehicle_id)
            .await
            .unwrap()
            .is_some());

        let released = engine.delete_vehicle(&admin(), vehicle_id).await.unwrap();
        assert_eq!(released, 1);
        assert!(VehicleRegistry::get(store.as_ref(), vehicle_id)
            .await
            .unwrap()
            .is_none());

        let current = PackageLedger::get(store.as_ref(), package.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.status, PackageStatus::Pending);
        assert_eq!(current.assigned_vehicle_id, None);
    }

    #[tokio::test]
    async fn assign_racing_vehicle_removal_is_undone() {
        let store = Arc::new(MemoryStore::new());
        let setup = engine(store.clone(), Arc::new(LogEmitter));
        let vehicle_id = vehicle(&setup, "C VR 1").await;
        let package = package(&setup).await;

        let ports = EnginePorts {
            vehicles: Arc::new(VanishingRegistry {
                inner: store.clone(),
                lookups: AtomicUsize::new(0),
            }),
            ..EnginePorts::in_memory(store.clone(), Arc::new(depot_geocoder()), Arc::new(LogEmitter))
        };
        let racing = DispatchEngine::new(ports, Timeouts::default(), Metrics::new(), 16);
        let mut feed = racing.subscribe();

        let err = racing
            .assign_package(&admin(), package.id, AssignInput { vehicle_id })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidReference(_)));

        let current = PackageLedger::get(store.as_ref(), package.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.status, PackageStatus::Pending);
        assert_eq!(current.assigned_vehicle_id, None);
        assert!(feed.try_recv().is_err());
    }
}
