use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::package::PackageStatus;

/// Events that move a package between statuses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DispatchEvent {
    Assign,
    Accept,
    Decline,
}

impl DispatchEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchEvent::Assign => "assign",
            DispatchEvent::Accept => "accept",
            DispatchEvent::Decline => "decline",
        }
    }
}

impl fmt::Display for DispatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The transition table. `None` means the edge does not exist.
///
/// `assign` is refused while a package awaits the assignee's answer, which is what
/// makes the second of two racing assigns fail.
pub fn next_status(from: PackageStatus, event: DispatchEvent) -> Option<PackageStatus> {
    use DispatchEvent::*;
    use PackageStatus::*;

    match (from, event) {
        (Pending | Declined | Accepted, Assign) => Some(Assigned),
        (Assigned, Accept) => Some(Accepted),
        (Assigned | Accepted, Decline) => Some(Declined),
        _ => None,
    }
}

pub fn apply(from: PackageStatus, event: DispatchEvent) -> Result<PackageStatus, AppError> {
    next_status(from, event).ok_or(AppError::InvalidTransition {
        event: event.as_str(),
        status: from,
    })
}
