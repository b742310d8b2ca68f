//! Player state and progression

use super::Reward;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Cumulative XP needed to reach each level; index 0 is level 1.
pub const LEVEL_THRESHOLDS: [u64; 10] = [0, 100, 250, 500, 1000, 2000, 3500, 5500, 8000, 12000];

/// ELO every new player starts with.
pub const STARTING_ELO: u64 = 1000;

/// ELO gained per point of XP.
pub const ELO_PER_XP: u64 = 2;

/// Player ranks, ordered from lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    ScriptKiddie,
    Apprentice,
    Operator,
    Specialist,
    Expert,
    Elite,
    Legend,
}

impl Rank {
    pub const ALL: [Rank; 7] = [
        Rank::ScriptKiddie,
        Rank::Apprentice,
        Rank::Operator,
        Rank::Specialist,
        Rank::Expert,
        Rank::Elite,
        Rank::Legend,
    ];

    /// Minimum ELO for this rank
    pub fn threshold(&self) -> u64 {
        match self {
            Rank::ScriptKiddie => 0,
            Rank::Apprentice => 1200,
            Rank::Operator => 1500,
            Rank::Specialist => 2000,
            Rank::Expert => 3000,
            Rank::Elite => 4500,
            Rank::Legend => 6500,
        }
    }

    /// Highest rank whose threshold `elo` meets
    pub fn for_elo(elo: u64) -> Self {
        Rank::ALL
            .iter()
            .rev()
            .copied()
            .find(|rank| elo >= rank.threshold())
            .unwrap_or(Rank::ScriptKiddie)
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rank::ScriptKiddie => write!(f, "Script Kiddie"),
            Rank::Apprentice => write!(f, "Apprentice"),
            Rank::Operator => write!(f, "Operator"),
            Rank::Specialist => write!(f, "Specialist"),
            Rank::Expert => write!(f, "Expert"),
            Rank::Elite => write!(f, "Elite"),
            Rank::Legend => write!(f, "Legend"),
        }
    }
}

/// Level reached with `xp` cumulative experience (1-based).
pub fn level_for_xp(xp: u64) -> u32 {
    LEVEL_THRESHOLDS
        .iter()
        .rposition(|&threshold| xp >= threshold)
        .map_or(1, |index| index as u32 + 1)
}

/// XP still missing for the next level, `None` once the table is exhausted.
pub fn xp_to_next_level(xp: u64) -> Option<u64> {
    LEVEL_THRESHOLDS
        .iter()
        .find(|&&threshold| threshold > xp)
        .map(|threshold| threshold - xp)
}

/// What changed after a reward was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressChange {
    pub old_level: u32,
    pub new_level: u32,
    pub old_rank: Rank,
    pub new_rank: Rank,
}

impl ProgressChange {
    pub fn leveled_up(&self) -> bool {
        self.new_level > self.old_level
    }

    pub fn ranked_up(&self) -> bool {
        self.new_rank > self.old_rank
    }
}

/// The player's persistent progression record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProgress {
    pub level: u32,
    pub xp: u64,
    pub xp_to_next_level: Option<u64>,
    pub rank: Rank,
    pub elo: u64,
    pub completed_missions: BTreeSet<String>,
    pub skills: BTreeMap<String, u32>,
    pub inventory: Vec<String>,
}

impl PlayerProgress {
    pub fn new() -> Self {
        let mut progress = Self {
            level: 1,
            xp: 0,
            xp_to_next_level: None,
            rank: Rank::ScriptKiddie,
            elo: STARTING_ELO,
            completed_missions: BTreeSet::new(),
            skills: BTreeMap::new(),
            inventory: Vec::new(),
        };
        progress.recompute();
        progress
    }

    /// Derive level, rank and the next-level gap from the totals.
    ///
    /// Always recomputed from `xp` and `elo`, never adjusted incrementally.
    pub fn recompute(&mut self) {
        self.level = level_for_xp(self.xp);
        self.xp_to_next_level = xp_to_next_level(self.xp);
        self.rank = Rank::for_elo(self.elo);
    }

    /// Apply a mission reward
    pub fn apply_reward(&mut self, reward: &Reward) -> ProgressChange {
        let old_level = self.level;
        let old_rank = self.rank;

        self.xp = self.xp.saturating_add(reward.xp);
        self.elo = self.elo.saturating_add(reward.xp.saturating_mul(ELO_PER_XP));
        for (skill, points) in &reward.skills {
            let total = self.skills.entry(skill.clone()).or_insert(0);
            *total = total.saturating_add(*points);
        }
        // Duplicates are allowed in the inventory
        self.inventory.extend(reward.items.iter().cloned());
        self.recompute();

        ProgressChange {
            old_level,
            new_level: self.level,
            old_rank,
            new_rank: self.rank,
        }
    }

    pub fn has_completed(&self, mission_id: &str) -> bool {
        self.completed_missions.contains(mission_id)
    }

    pub fn is_max_level(&self) -> bool {
        self.xp_to_next_level.is_none()
    }
}

impl Default for PlayerProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reward(xp: u64) -> Reward {
        Reward {
            xp,
            ..Reward::default()
        }
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(99), 1);
        assert_eq!(level_for_xp(100), 2);
        assert_eq!(level_for_xp(11_999), 9);
        assert_eq!(level_for_xp(12_000), 10);
        assert_eq!(level_for_xp(u64::MAX), 10);
    }

    #[test]
    fn test_xp_to_next_level() {
        assert_eq!(xp_to_next_level(0), Some(100));
        assert_eq!(xp_to_next_level(130), Some(120));
        assert_eq!(xp_to_next_level(12_000), None);
    }

    #[test]
    fn test_rank_for_elo() {
        assert_eq!(Rank::for_elo(0), Rank::ScriptKiddie);
        assert_eq!(Rank::for_elo(STARTING_ELO), Rank::ScriptKiddie);
        assert_eq!(Rank::for_elo(1200), Rank::Apprentice);
        assert_eq!(Rank::for_elo(6499), Rank::Elite);
        assert_eq!(Rank::for_elo(100_000), Rank::Legend);
    }

    #[test]
    fn test_new_progress() {
        let progress = PlayerProgress::new();
        assert_eq!(progress.level, 1);
        assert_eq!(progress.xp_to_next_level, Some(100));
        assert_eq!(progress.rank, Rank::ScriptKiddie);
        assert_eq!(progress.elo, STARTING_ELO);
    }

    #[test]
    fn test_apply_reward_levels_and_ranks() {
        let mut progress = PlayerProgress::new();
        let change = progress.apply_reward(&reward(150));
        assert!(change.leveled_up());
        assert_eq!(progress.level, 2);
        assert_eq!(progress.xp_to_next_level, Some(100));
        assert_eq!(progress.elo, STARTING_ELO + 300);
        assert_eq!(progress.rank, Rank::Apprentice);
        assert!(change.ranked_up());
    }

    #[test]
    fn test_order_independence() {
        let mut a = PlayerProgress::new();
        let mut b = PlayerProgress::new();
        for xp in [40, 300, 75] {
            a.apply_reward(&reward(xp));
        }
        for xp in [75, 40, 300] {
            b.apply_reward(&reward(xp));
        }
        assert_eq!(a.level, b.level);
        assert_eq!(a.rank, b.rank);
        assert_eq!(a.xp_to_next_level, b.xp_to_next_level);
    }

    #[test]
    fn test_skills_and_items_accumulate() {
        let mut progress = PlayerProgress::new();
        let mut r = reward(10);
        r.skills.insert("navigation".to_string(), 2);
        r.items.push("lockpick".to_string());
        progress.apply_reward(&r);
        progress.apply_reward(&r);
        assert_eq!(progress.skills.get("navigation"), Some(&4));
        assert_eq!(progress.inventory, vec!["lockpick", "lockpick"]);
    }

    #[test]
    fn test_skill_points_saturate() {
        let mut progress = PlayerProgress::new();
        let mut r = reward(0);
        r.skills.insert("forensics".to_string(), u32::MAX - 1);
        progress.apply_reward(&r);
        progress.apply_reward(&r);
        assert_eq!(progress.skills.get("forensics"), Some(&u32::MAX));
    }

    #[test]
    fn test_max_level() {
        let mut progress = PlayerProgress::new();
        progress.apply_reward(&reward(50_000));
        assert_eq!(progress.level, 10);
        assert!(progress.is_max_level());
    }
}
