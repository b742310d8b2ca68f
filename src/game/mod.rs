//! Mission engine and progression
//!
//! Owns every mission record and the single [`PlayerProgress`]. Objective
//! checks, completion and reward application all go through here.

pub mod catalog;
pub mod snapshot;

use crate::data::*;
use chrono::Utc;
use log::{debug, info};
use snapshot::{MissionSnapshot, ObjectiveSnapshot, StateSnapshot};
use std::collections::HashMap;

/// Registry of missions plus the player's progress
#[derive(Debug, Clone, Default)]
pub struct MissionStore {
    missions: HashMap<String, Mission>,
    /// Registration order, used for listing
    order: Vec<String>,
    progress: PlayerProgress,
    active_mission: Option<String>,
    events: EventLog,
}

impl MissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store preloaded with `missions`
    pub fn with_missions(missions: impl IntoIterator<Item = Mission>) -> Self {
        let mut store = Self::new();
        for mission in missions {
            store.register_mission(mission);
        }
        store
    }

    /// Insert a mission definition.
    ///
    /// Re-registering an id replaces the earlier definition (last one wins).
    /// A locked mission whose prerequisites are already met becomes available.
    pub fn register_mission(&mut self, mut mission: Mission) {
        if mission.state == MissionState::Locked && self.prerequisites_met(&mission) {
            mission.state = MissionState::Available;
        }
        if !self.missions.contains_key(&mission.id) {
            self.order.push(mission.id.clone());
        }
        debug!("registered mission {} ({})", mission.id, mission.state);
        self.missions.insert(mission.id.clone(), mission);
    }

    pub fn mission(&self, id: &str) -> Option<&Mission> {
        self.missions.get(id)
    }

    /// Missions in registration order
    pub fn missions(&self) -> impl Iterator<Item = &Mission> {
        self.order.iter().filter_map(|id| self.missions.get(id))
    }

    pub fn progress(&self) -> &PlayerProgress {
        &self.progress
    }

    pub fn active_mission(&self) -> Option<&Mission> {
        self.active_mission.as_deref().and_then(|id| self.missions.get(id))
    }

    pub fn active_mission_id(&self) -> Option<&str> {
        self.active_mission.as_deref()
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Progression events not yet handed out
    pub fn drain_events(&mut self) -> Vec<ProgressEvent> {
        self.events.drain_pending()
    }

    fn prerequisites_met(&self, mission: &Mission) -> bool {
        mission
            .prerequisites
            .iter()
            .all(|id| self.progress.has_completed(id))
    }

    /// The mission currently in progress, if any
    pub fn in_progress(&self) -> Option<&Mission> {
        self.missions()
            .find(|mission| mission.state == MissionState::InProgress)
    }

    /// Begin an available mission whose prerequisites are all completed.
    ///
    /// Only one mission runs at a time: this fails while another mission is
    /// still in progress.
    pub fn start_mission(&mut self, id: &str) -> bool {
        let Some(mission) = self.missions.get(id) else {
            return false;
        };
        if mission.state != MissionState::Available || !self.prerequisites_met(mission) {
            return false;
        }
        if let Some(running) = self.in_progress() {
            debug!("cannot start {} while {} is in progress", id, running.id);
            return false;
        }

        let Some(mission) = self.missions.get_mut(id) else {
            return false;
        };
        for objective in &mut mission.objectives {
            objective.completed = false;
        }
        mission.start_time = Some(Utc::now());
        mission.state = MissionState::InProgress;
        let title = mission.title.clone();

        self.active_mission = Some(id.to_string());
        info!("mission {} started", id);
        self.events.push(ProgressEventKind::MissionStarted {
            mission_id: id.to_string(),
            title,
        });
        true
    }

    /// Mark one objective done by hand.
    ///
    /// Returns true when the objective was newly completed.
    pub fn complete_objective(&mut self, mission_id: &str, objective_id: &str) -> bool {
        self.mark_objectives(mission_id, |objective| objective.id == objective_id)
    }

    /// Complete objectives satisfied by an executed command or its output.
    pub fn check_command_objective(&mut self, mission_id: &str, command: &str, output: &str) -> bool {
        self.mark_objectives(mission_id, |objective| objective.matches_command(command, output))
    }

    /// Complete objectives satisfied by a file write.
    pub fn check_file_objective(&mut self, mission_id: &str, path: &str, content: &str) -> bool {
        self.mark_objectives(mission_id, |objective| objective.matches_file(path, content))
    }

    /// Post-command hook: check the active mission against a command.
    pub fn on_command(&mut self, command: &str, output: &str) -> bool {
        match self.active_mission.clone() {
            Some(id) => self.check_command_objective(&id, command, output),
            None => false,
        }
    }

    /// Post-write hook: check the active mission against a file write.
    pub fn on_file_write(&mut self, path: &str, content: &str) -> bool {
        match self.active_mission.clone() {
            Some(id) => self.check_file_objective(&id, path, content),
            None => false,
        }
    }

    fn mark_objectives<F>(&mut self, mission_id: &str, matches: F) -> bool
    where
        F: Fn(&Objective) -> bool,
    {
        let Some(mission) = self.missions.get_mut(mission_id) else {
            return false;
        };
        if mission.state != MissionState::InProgress {
            return false;
        }

        let mut newly_completed = Vec::new();
        for objective in mission.objectives.iter_mut() {
            if !objective.completed && matches(objective) {
                objective.completed = true;
                newly_completed.push((objective.id.clone(), objective.description.clone()));
            }
        }
        let all_done = mission.all_objectives_complete();

        let marked = !newly_completed.is_empty();
        for (objective_id, description) in newly_completed {
            debug!("objective {}/{} completed", mission_id, objective_id);
            self.events.push(ProgressEventKind::ObjectiveCompleted {
                mission_id: mission_id.to_string(),
                objective_id,
                description,
            });
        }
        if marked && all_done {
            self.complete_mission(mission_id);
        }
        marked
    }

    /// Finish a mission whose objectives are all complete.
    ///
    /// The reward is applied only on the first transition into `Completed`;
    /// later calls return true and change nothing.
    pub fn complete_mission(&mut self, id: &str) -> bool {
        let Some(mission) = self.missions.get_mut(id) else {
            return false;
        };
        match mission.state {
            MissionState::Completed => return true,
            MissionState::InProgress if mission.all_objectives_complete() => {}
            _ => return false,
        }

        mission.state = MissionState::Completed;
        let reward = mission.reward.clone();
        let title = mission.title.clone();

        self.progress.completed_missions.insert(id.to_string());
        if self.active_mission.as_deref() == Some(id) {
            self.active_mission = None;
        }
        info!("mission {} completed (+{} XP)", id, reward.xp);
        self.events.push(ProgressEventKind::MissionCompleted {
            mission_id: id.to_string(),
            title,
            xp: reward.xp,
        });

        self.apply_reward(&reward);
        self.unlock_ready_missions(&reward.unlocks);
        true
    }

    fn apply_reward(&mut self, reward: &Reward) {
        let change = self.progress.apply_reward(reward);
        if change.leveled_up() {
            info!("level up: {} -> {}", change.old_level, change.new_level);
            self.events.push(ProgressEventKind::LevelUp {
                from: change.old_level,
                to: change.new_level,
            });
        }
        if change.ranked_up() {
            info!("rank up: {} -> {}", change.old_rank, change.new_rank);
            self.events.push(ProgressEventKind::RankUp {
                from: change.old_rank,
                to: change.new_rank,
            });
        }
    }

    /// Move Locked missions to Available: the explicit reward unlocks first,
    /// then any other mission whose prerequisites are now all completed.
    fn unlock_ready_missions(&mut self, unlocks: &[String]) {
        let candidates: Vec<String> = unlocks
            .iter()
            .cloned()
            .chain(self.order.iter().cloned())
            .collect();
        for id in candidates {
            let ready = match self.missions.get(&id) {
                Some(mission) => {
                    mission.state == MissionState::Locked && self.prerequisites_met(mission)
                }
                None => false,
            };
            if !ready {
                continue;
            }
            if let Some(mission) = self.missions.get_mut(&id) {
                mission.state = MissionState::Available;
                let title = mission.title.clone();
                debug!("mission {} unlocked", id);
                self.events.push(ProgressEventKind::MissionUnlocked {
                    mission_id: id,
                    title,
                });
            }
        }
    }

    /// Snapshot of mission states and player progress for persistence
    pub fn export_state(&self) -> StateSnapshot {
        StateSnapshot {
            missions: self
                .missions()
                .map(|mission| MissionSnapshot {
                    id: mission.id.clone(),
                    state: mission.state,
                    objectives: mission
                        .objectives
                        .iter()
                        .map(|o| ObjectiveSnapshot {
                            id: o.id.clone(),
                            completed: o.completed,
                        })
                        .collect(),
                    start_time: mission.start_time,
                })
                .collect(),
            progress: self.progress.clone(),
            active_mission: self.active_mission.clone(),
        }
    }

    /// Re-associate a snapshot with the registered missions by id.
    ///
    /// Saved missions that are no longer registered are ignored; registered
    /// missions missing from the save keep their current state.
    pub fn import_state(&mut self, snapshot: StateSnapshot) {
        for saved in snapshot.missions {
            let Some(mission) = self.missions.get_mut(&saved.id) else {
                debug!("ignoring saved state for unknown mission {}", saved.id);
                continue;
            };
            mission.state = saved.state;
            mission.start_time = saved.start_time;
            for saved_objective in saved.objectives {
                if let Some(objective) = mission
                    .objectives
                    .iter_mut()
                    .find(|o| o.id == saved_objective.id)
                {
                    objective.completed = saved_objective.completed;
                }
            }
        }

        self.progress = snapshot.progress;
        self.progress.recompute();
        self.active_mission = snapshot.active_mission.filter(|id| {
            self.missions
                .get(id)
                .is_some_and(|m| m.state == MissionState::InProgress)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ls_mission() -> Mission {
        Mission::new("m1", "List things", "Run ls")
            .objective(Objective::command("ls", "Run ls", CommandPattern::Exact("ls".into())))
            .reward(Reward::xp(120).skill("navigation", 1).unlock("m2"))
    }

    fn follow_up() -> Mission {
        Mission::new("m2", "Follow up", "")
            .requires("m1")
            .objective(Objective::new("manual", "Do it"))
            .reward(Reward::xp(10))
    }

    #[test]
    fn test_start_requires_available() {
        let mut store = MissionStore::with_missions([ls_mission(), follow_up()]);
        assert!(!store.start_mission("m2"));
        assert!(!store.start_mission("missing"));
        assert!(store.start_mission("m1"));
        assert!(!store.start_mission("m1"));
        let mission = store.mission("m1").unwrap();
        assert_eq!(mission.state, MissionState::InProgress);
        assert!(mission.start_time.is_some());
        assert_eq!(store.active_mission_id(), Some("m1"));
    }

    #[test]
    fn test_command_objective_completes_mission() {
        let mut store = MissionStore::with_missions([ls_mission(), follow_up()]);
        store.start_mission("m1");
        assert!(!store.on_command("pwd", "/home/user"));
        assert!(store.on_command("ls", "readme.txt"));

        let mission = store.mission("m1").unwrap();
        assert_eq!(mission.state, MissionState::Completed);
        assert_eq!(store.progress().xp, 120);
        assert_eq!(store.progress().level, 2);
        assert!(store.progress().has_completed("m1"));
        assert_eq!(store.active_mission_id(), None);
        assert_eq!(store.mission("m2").unwrap().state, MissionState::Available);
    }

    #[test]
    fn test_completion_is_idempotent() {
        let mut store = MissionStore::with_missions([ls_mission()]);
        store.start_mission("m1");
        store.complete_objective("m1", "ls");
        let xp = store.progress().xp;
        let completed = store.progress().completed_missions.len();
        for _ in 0..3 {
            assert!(store.complete_mission("m1"));
        }
        assert_eq!(store.progress().xp, xp);
        assert_eq!(store.progress().completed_missions.len(), completed);
        assert_eq!(store.progress().skills.get("navigation"), Some(&1));
    }

    #[test]
    fn test_complete_requires_objectives() {
        let mut store = MissionStore::with_missions([
            Mission::new("m", "M", "")
                .objective(Objective::new("a", "A"))
                .objective(Objective::new("b", "B")),
        ]);
        assert!(!store.complete_mission("m"));
        store.start_mission("m");
        assert!(store.complete_objective("m", "a"));
        assert!(!store.complete_objective("m", "a"));
        assert!(!store.complete_mission("m"));
        assert!(store.complete_objective("m", "b"));
        assert_eq!(store.mission("m").unwrap().state, MissionState::Completed);
    }

    #[test]
    fn test_file_objective() {
        let mut store = MissionStore::with_missions([Mission::new("f", "F", "")
            .objective(Objective::file("w", "write", "/tmp/x", "secret"))]);
        store.start_mission("f");
        assert!(!store.on_file_write("/tmp/x", "nothing"));
        assert!(store.on_file_write("/tmp/x", "the secret"));
        assert_eq!(store.mission("f").unwrap().state, MissionState::Completed);
    }

    #[test]
    fn test_events_are_emitted() {
        let mut store = MissionStore::with_missions([ls_mission(), follow_up()]);
        store.start_mission("m1");
        store.on_command("ls", "");
        let messages: Vec<String> = store.drain_events().iter().map(|e| e.message()).collect();
        assert!(messages.iter().any(|m| m.starts_with("[MISSION] Started")));
        assert!(messages.iter().any(|m| m.starts_with("[MISSION] Completed")));
        assert!(messages.iter().any(|m| m.starts_with("[LEVEL UP]")));
        assert!(messages.iter().any(|m| m.starts_with("[MISSION] Unlocked: Follow up")));
        assert!(store.drain_events().is_empty());
    }

    #[test]
    fn test_one_mission_at_a_time() {
        let second = Mission::new("m3", "Other", "")
            .objective(Objective::command("pwd", "Run pwd", CommandPattern::Exact("pwd".into())))
            .reward(Reward::xp(5));
        let mut store = MissionStore::with_missions([ls_mission(), second]);
        assert!(store.start_mission("m1"));
        assert!(!store.start_mission("m3"));
        assert_eq!(store.mission("m3").unwrap().state, MissionState::Available);
        assert_eq!(store.active_mission_id(), Some("m1"));

        assert!(store.on_command("ls", ""));
        assert!(store.in_progress().is_none());
        assert!(store.start_mission("m3"));
    }

    #[test]
    fn test_register_last_wins() {
        let mut store = MissionStore::new();
        store.register_mission(Mission::new("m", "First", ""));
        store.register_mission(Mission::new("m", "Second", ""));
        assert_eq!(store.missions().count(), 1);
        assert_eq!(store.mission("m").unwrap().title, "Second");
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut store = MissionStore::with_missions([ls_mission(), follow_up()]);
        store.start_mission("m1");
        store.on_command("ls", "");
        store.start_mission("m2");
        let saved = store.export_state();

        let mut restored = MissionStore::with_missions([ls_mission(), follow_up()]);
        restored.import_state(saved);
        assert_eq!(restored.mission("m1").unwrap().state, MissionState::Completed);
        assert_eq!(restored.mission("m2").unwrap().state, MissionState::InProgress);
        assert_eq!(restored.active_mission_id(), Some("m2"));
        assert_eq!(restored.progress(), store.progress());
    }

    #[test]
    fn test_import_ignores_unknown_missions() {
        let mut store = MissionStore::with_missions([ls_mission()]);
        let mut snapshot = store.export_state();
        snapshot.missions.push(MissionSnapshot {
            id: "gone".into(),
            state: MissionState::Completed,
            objectives: Vec::new(),
            start_time: None,
        });
        snapshot.active_mission = Some("gone".into());
        store.import_state(snapshot);
        assert!(store.mission("gone").is_none());
        assert_eq!(store.active_mission_id(), None);
    }
}
