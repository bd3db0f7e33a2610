//! The one place that decides what a principal may do.

use uuid::Uuid;

use crate::engine::transition::DispatchEvent;
use crate::error::AppError;
use crate::models::package::Package;
use crate::models::principal::Principal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    CreatePackage,
    UpdatePackage,
    DeletePackage,
    Dispatch(DispatchEvent),
    ReportLocation { vehicle_id: Uuid },
    ManageVehicles,
    ManagePickups,
}

pub fn authorize(principal: &Principal, action: Action) -> Result<(), AppError> {
    let allowed = match action {
        Action::Read => true,
        Action::Dispatch(DispatchEvent::Accept | DispatchEvent::Decline) => {
            principal.vehicle_id().is_some()
        }
        Action::ReportLocation { vehicle_id } => {
            principal.is_admin() || principal.vehicle_id() == Some(vehicle_id)
        }
        Action::CreatePackage
        | Action::UpdatePackage
        | Action::DeletePackage
        | Action::Dispatch(DispatchEvent::Assign)
        | Action::ManageVehicles
        | Action::ManagePickups => principal.is_admin(),
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::Forbidden(describe(principal, action)))
    }
}

/// Vehicles may only touch packages bound to them. Users are not scoped.
pub fn ensure_bound(principal: &Principal, package: &Package) -> Result<(), AppError> {
    match principal.vehicle_id() {
        Some(vehicle_id) if package.assigned_vehicle_id != Some(vehicle_id) => {
            Err(AppError::Forbidden(format!(
                "package {} is not assigned to vehicle {vehicle_id}",
                package.id
            )))
        }
        _ => Ok(()),
    }
}

fn describe(principal: &Principal, action: Action) -> String {
    let what = match action {
        Action::Read => "read".to_string(),
        Action::CreatePackage => "create packages".to_string(),
        Action::UpdatePackage => "update packages".to_string(),
        Action::DeletePackage => "delete packages".to_string(),
        Action::Dispatch(event) => format!("{event} packages"),
        Action::ReportLocation { vehicle_id } => format!("set the location of vehicle {vehicle_id}"),
        Action::ManageVehicles => "manage vehicles".to_string(),
        Action::ManagePickups => "manage pickup locations".to_string(),
    };

    format!("{} {} may not {what}", principal.kind(), principal.id())
}
