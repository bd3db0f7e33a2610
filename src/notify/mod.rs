//! Best-effort messages produced by dispatch transitions.
//!
//! Emission never decides the outcome of a transition: the engine logs and counts a
//! [`NotificationFailure`] and carries on.

pub mod log;
pub mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::engine::transition::DispatchEvent;
use crate::models::package::{Package, PackageStatus};

pub use log::LogEmitter;
pub use webhook::WebhookEmitter;

#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotificationFailure(pub String);

/// A committed transition, as published to the dispatch feed.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionEvent {
    pub event: DispatchEvent,
    pub package_id: Uuid,
    pub tracking_code: String,
    pub from: PackageStatus,
    pub to: PackageStatus,
    /// The assignee for `assign`, the responding vehicle otherwise.
    pub vehicle_id: Uuid,
    pub package: Package,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub vehicle_id: Uuid,
    pub kind: &'static str,
    pub tracking_code: String,
    pub message: String,
}

impl Notice {
    /// Only a fresh assignment addresses the vehicle.
    pub fn for_event(event: &TransitionEvent) -> Option<Notice> {
        match event.event {
            DispatchEvent::Assign => Some(assignment_notice(event)),
            DispatchEvent::Accept | DispatchEvent::Decline => None,
        }
    }
}

fn assignment_notice(event: &TransitionEvent) -> Notice {
    let package = &event.package;
    let lat = package.pickup_location.lat;
    let lng = package.pickup_location.lng;

    let message = format!(
        "To vehicle {vehicle}:\n\
         Type: package_assigned_pending_acceptance\n\
         Package Code: {code}\n\
         Recipient: {recipient}\n\
         Delivery Address: {address}\n\
         Pickup Location: Lat: {lat:.5}, Lng: {lng:.5}\n\
         Map: https://www.google.com/maps?q={lat},{lng}\n",
        vehicle = event.vehicle_id,
        code = package.tracking_code,
        recipient = package.recipient_name,
        address = package.delivery_address,
    );

    Notice {
        vehicle_id: event.vehicle_id,
        kind: "package_assigned_pending_acceptance",
        tracking_code: package.tracking_code.clone(),
        message,
    }
}

#[async_trait]
pub trait NotificationEmitter: Send + Sync {
    async fn emit(&self, notice: &Notice) -> Result<(), NotificationFailure>;
}

/// Sends every notice to each emitter, reporting the first failure after all ran.
pub struct FanoutEmitter {
    emitters: Vec<Arc<dyn NotificationEmitter>>,
}

impl FanoutEmitter {
    pub fn new(emitters: Vec<Arc<dyn NotificationEmitter>>) -> Self {
        Self { emitters }
    }
}

#[async_trait]
impl NotificationEmitter for FanoutEmitter {
    async fn emit(&self, notice: &Notice) -> Result<(), NotificationFailure> {
        let mut first_failure = None;
        for emitter in &self.emitters {
            if let Err(err) = emitter.emit(notice).await {
                first_failure.get_or_insert(err);
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
