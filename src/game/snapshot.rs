//! Persistence seam for mission and progress state
//!
//! The store itself never touches storage; callers move these records to and
//! from whatever key-value store they use.

use crate::data::{MissionState, PlayerProgress};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Saved completion flag of one objective
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveSnapshot {
    pub id: String,
    pub completed: bool,
}

/// Saved runtime state of one mission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionSnapshot {
    pub id: String,
    pub state: MissionState,
    pub objectives: Vec<ObjectiveSnapshot>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
}

/// Everything needed to restore a player's progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub missions: Vec<MissionSnapshot>,
    pub progress: PlayerProgress,
    #[serde(default)]
    pub active_mission: Option<String>,
}

impl StateSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
