use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Viewer,
}

/// The authenticated actor behind a request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Principal {
    User { user_id: Uuid, role: Role },
    Vehicle { vehicle_id: Uuid },
}

impl Principal {
    pub fn admin(user_id: Uuid) -> Self {
        Principal::User {
            user_id,
            role: Role::Admin,
        }
    }

    pub fn vehicle(vehicle_id: Uuid) -> Self {
        Principal::Vehicle { vehicle_id }
    }

    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Principal::User {
                role: Role::Admin,
                ..
            }
        )
    }

    pub fn vehicle_id(&self) -> Option<Uuid> {
        match self {
            Principal::Vehicle { vehicle_id } => Some(*vehicle_id),
            Principal::User { .. } => None,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Principal::User { user_id, .. } => *user_id,
            Principal::Vehicle { vehicle_id } => *vehicle_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Principal::User { .. } => "user",
            Principal::Vehicle { .. } => "vehicle",
        }
    }
}
