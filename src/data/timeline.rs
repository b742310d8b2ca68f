//! Progression event log
//!
//! Records what happened to the player's missions and progress, in order.
//! Subscribers (the interpreter, a UI) drain the events they have not seen yet.

use super::{Color, Id, Rank};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Types of progression events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressEventKind {
    MissionStarted { mission_id: String, title: String },
    ObjectiveCompleted { mission_id: String, objective_id: String, description: String },
    MissionCompleted { mission_id: String, title: String, xp: u64 },
    MissionUnlocked { mission_id: String, title: String },
    LevelUp { from: u32, to: u32 },
    RankUp { from: Rank, to: Rank },
}

/// A single entry in the progression log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub id: Id,
    pub timestamp: DateTime<Utc>,
    pub kind: ProgressEventKind,
}

impl ProgressEvent {
    pub fn new(kind: ProgressEventKind) -> Self {
        Self {
            id: Id::new(),
            timestamp: Utc::now(),
            kind,
        }
    }

    /// One-line description for the terminal
    pub fn message(&self) -> String {
        match &self.kind {
            ProgressEventKind::MissionStarted { title, .. } => {
                format!("[MISSION] Started: {}", title)
            }
            ProgressEventKind::ObjectiveCompleted { description, .. } => {
                format!("[MISSION] Objective complete: {}", description)
            }
            ProgressEventKind::MissionCompleted { title, xp, .. } => {
                format!("[MISSION] Completed: {} (+{} XP)", title, xp)
            }
            ProgressEventKind::MissionUnlocked { title, .. } => {
                format!("[MISSION] Unlocked: {}", title)
            }
            ProgressEventKind::LevelUp { from, to } => {
                format!("[LEVEL UP] Level {} -> Level {}", from, to)
            }
            ProgressEventKind::RankUp { from, to } => {
                format!("[RANK UP] {} -> {}", from, to)
            }
        }
    }

    pub fn color(&self) -> Color {
        match &self.kind {
            ProgressEventKind::MissionStarted { .. } => Color::Cyan,
            ProgressEventKind::ObjectiveCompleted { .. } => Color::Green,
            ProgressEventKind::MissionCompleted { .. } => Color::Green,
            ProgressEventKind::MissionUnlocked { .. } => Color::Cyan,
            ProgressEventKind::LevelUp { .. } => Color::Yellow,
            ProgressEventKind::RankUp { .. } => Color::Magenta,
        }
    }
}

/// Drained events kept around for [`EventLog::events`]
pub const MAX_RETAINED_EVENTS: usize = 256;

/// Ordered log of progression events.
///
/// Pending events are never dropped; once drained only the most recent
/// [`MAX_RETAINED_EVENTS`] are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<ProgressEvent>,
    /// Index of the first event not yet drained
    cursor: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: ProgressEventKind) {
        self.events.push(ProgressEvent::new(kind));
    }

    /// Events recorded since the previous drain
    pub fn drain_pending(&mut self) -> Vec<ProgressEvent> {
        let pending = self.events[self.cursor..].to_vec();
        if self.events.len() > MAX_RETAINED_EVENTS {
            let excess = self.events.len() - MAX_RETAINED_EVENTS;
            self.events.drain(..excess);
        }
        self.cursor = self.events.len();
        pending
    }

    pub fn events(&self) -> &[ProgressEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
