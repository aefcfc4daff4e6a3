use serde::{Deserialize, Serialize};

use crate::world::DistrictId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PolicyEffect,
    Election,
    Crisis,
    Milestone,
    Migration,
    Budget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Presentation-facing record of something that happened during a tick.
/// The engine only ever appends these; it never reads them back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvent {
    pub kind: EventKind,
    pub severity: Severity,
    pub message: String,
    pub district: Option<DistrictId>,
}

impl GameEvent {
    pub fn new(kind: EventKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            district: None,
        }
    }

    pub fn for_district(
        kind: EventKind,
        severity: Severity,
        message: impl Into<String>,
        district: DistrictId,
    ) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            district: Some(district),
        }
    }
}
