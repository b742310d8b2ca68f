//! Mission definitions, objectives and rewards

use chrono::{DateTime, Utc};
use log::warn;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// Lifecycle of a mission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissionState {
    Locked,
    Available,
    InProgress,
    Completed,
}

impl std::fmt::Display for MissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissionState::Locked => write!(f, "LOCKED"),
            MissionState::Available => write!(f, "AVAILABLE"),
            MissionState::InProgress => write!(f, "IN PROGRESS"),
            MissionState::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// How hard a mission is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difficulty::Beginner => write!(f, "Beginner"),
            Difficulty::Intermediate => write!(f, "Intermediate"),
            Difficulty::Advanced => write!(f, "Advanced"),
            Difficulty::Expert => write!(f, "Expert"),
        }
    }
}

/// Broad topic a mission teaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissionCategory {
    Tutorial,
    FileSystem,
    Permissions,
    Networking,
    Forensics,
}

impl std::fmt::Display for MissionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissionCategory::Tutorial => write!(f, "Tutorial"),
            MissionCategory::FileSystem => write!(f, "File System"),
            MissionCategory::Permissions => write!(f, "Permissions"),
            MissionCategory::Networking => write!(f, "Networking"),
            MissionCategory::Forensics => write!(f, "Forensics"),
        }
    }
}

/// Regex source for a command objective, compiled once on first use.
///
/// Serializes as the plain pattern string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CommandRegex {
    source: String,
    compiled: OnceLock<Option<Regex>>,
}

impl CommandRegex {
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The compiled regex; `None` when the source is invalid
    fn regex(&self) -> Option<&Regex> {
        self.compiled
            .get_or_init(|| match Regex::new(&self.source) {
                Ok(re) => Some(re),
                Err(err) => {
                    warn!("objective regex {:?} is invalid: {}", self.source, err);
                    None
                }
            })
            .as_ref()
    }
}

impl From<String> for CommandRegex {
    fn from(source: String) -> Self {
        Self {
            source,
            compiled: OnceLock::new(),
        }
    }
}

impl From<&str> for CommandRegex {
    fn from(source: &str) -> Self {
        Self::from(source.to_string())
    }
}

impl From<CommandRegex> for String {
    fn from(pattern: CommandRegex) -> Self {
        pattern.source
    }
}

impl PartialEq for CommandRegex {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for CommandRegex {}

/// How a required command is matched against the executed line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandPattern {
    Exact(String),
    Prefix(String),
    Regex(CommandRegex),
}

impl CommandPattern {
    pub fn matches(&self, command: &str) -> bool {
        let command = command.trim();
        match self {
            CommandPattern::Exact(expected) => command == expected,
            CommandPattern::Prefix(prefix) => command.starts_with(prefix.as_str()),
            CommandPattern::Regex(pattern) => {
                pattern.regex().is_some_and(|re| re.is_match(command))
            }
        }
    }
}

/// Rule that lets an objective complete itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveRule {
    /// The player ran a matching command
    Command(CommandPattern),
    /// A command's output contained this text
    OutputContains(String),
    /// A file at `path` was written with content containing `contains`
    FileContent { path: String, contains: String },
}

/// A single step of a mission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    pub id: String,
    pub description: String,
    pub completed: bool,
    pub rule: Option<ObjectiveRule>,
}

impl Objective {
    pub fn new(id: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            completed: false,
            rule: None,
        }
    }

    pub fn rule(mut self, rule: ObjectiveRule) -> Self {
        self.rule = Some(rule);
        self
    }

    pub fn command(id: &str, description: &str, pattern: CommandPattern) -> Self {
        Self::new(id, description).rule(ObjectiveRule::Command(pattern))
    }

    pub fn output(id: &str, description: &str, needle: &str) -> Self {
        Self::new(id, description).rule(ObjectiveRule::OutputContains(needle.to_string()))
    }

    pub fn file(id: &str, description: &str, path: &str, contains: &str) -> Self {
        Self::new(id, description).rule(ObjectiveRule::FileContent {
            path: path.to_string(),
            contains: contains.to_string(),
        })
    }

    pub fn matches_command(&self, command: &str, output: &str) -> bool {
        match &self.rule {
            Some(ObjectiveRule::Command(pattern)) => pattern.matches(command),
            Some(ObjectiveRule::OutputContains(needle)) => output.contains(needle.as_str()),
            _ => false,
        }
    }

    pub fn matches_file(&self, path: &str, content: &str) -> bool {
        match &self.rule {
            Some(ObjectiveRule::FileContent { path: expected, contains }) => {
                expected == path && content.contains(contains.as_str())
            }
            _ => false,
        }
    }
}

/// What completing a mission grants
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub xp: u64,
    pub skills: BTreeMap<String, u32>,
    pub items: Vec<String>,
    /// Missions moved from Locked to Available
    pub unlocks: Vec<String>,
}

impl Reward {
    pub fn xp(xp: u64) -> Self {
        Self {
            xp,
            ..Self::default()
        }
    }

    pub fn skill(mut self, name: &str, points: u32) -> Self {
        *self.skills.entry(name.to_string()).or_insert(0) += points;
        self
    }

    pub fn item(mut self, item: &str) -> Self {
        self.items.push(item.to_string());
        self
    }

    pub fn unlock(mut self, mission_id: &str) -> Self {
        self.unlocks.push(mission_id.to_string());
        self
    }
}

/// A mission the player can take on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: MissionCategory,
    pub difficulty: Difficulty,
    pub objectives: Vec<Objective>,
    pub reward: Reward,
    pub state: MissionState,
    pub prerequisites: BTreeSet<String>,
    pub start_time: Option<DateTime<Utc>>,
}

impl Mission {
    pub fn new(id: &str, title: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            category: MissionCategory::Tutorial,
            difficulty: Difficulty::Beginner,
            objectives: Vec::new(),
            reward: Reward::default(),
            state: MissionState::Available,
            prerequisites: BTreeSet::new(),
            start_time: None,
        }
    }

    pub fn category(mut self, category: MissionCategory) -> Self {
        self.category = category;
        self
    }

    pub fn difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn objective(mut self, objective: Objective) -> Self {
        self.objectives.push(objective);
        self
    }

    pub fn reward(mut self, reward: Reward) -> Self {
        self.reward = reward;
        self
    }

    /// Adds a prerequisite and locks the mission
    pub fn requires(mut self, mission_id: &str) -> Self {
        self.prerequisites.insert(mission_id.to_string());
        self.state = MissionState::Locked;
        self
    }

    pub fn all_objectives_complete(&self) -> bool {
        self.objectives.iter().all(|o| o.completed)
    }

    /// (completed, total) objective counts
    pub fn progress(&self) -> (usize, usize) {
        let done = self.objectives.iter().filter(|o| o.completed).count();
        (done, self.objectives.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_patterns() {
        assert!(CommandPattern::Exact("ls".into()).matches("  ls "));
        assert!(!CommandPattern::Exact("ls".into()).matches("ls -l"));
        assert!(CommandPattern::Prefix("cd".into()).matches("cd /tmp"));
        assert!(CommandPattern::Regex(r"^cat\s+.*\.log$".into()).matches("cat /var/log/auth.log"));
        assert!(!CommandPattern::Regex("(".into()).matches("("));
    }

    #[test]
    fn test_command_regex_compiles_once() {
        let pattern = CommandPattern::Regex(r"^grep\s+".into());
        let CommandPattern::Regex(inner) = &pattern else {
            unreachable!()
        };
        assert!(inner.compiled.get().is_none());
        assert!(pattern.matches("grep root /etc/passwd"));
        assert!(inner.compiled.get().is_some());
        assert!(!pattern.matches("cat grep"));
        assert_eq!(inner.as_str(), r"^grep\s+");

        let json = serde_json::to_string(&pattern).unwrap();
        assert_eq!(json, r#"{"Regex":"^grep\\s+"}"#);
        let back: CommandPattern = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pattern);
    }

    #[test]
    fn test_objective_matching() {
        let by_output = Objective::output("o", "see root", "root");
        assert!(by_output.matches_command("cat /etc/passwd", "root:x:0:0"));
        assert!(!by_output.matches_file("/etc/passwd", "root"));

        let by_file = Objective::file("f", "write", "/tmp/a", "flag");
        assert!(by_file.matches_file("/tmp/a", "the flag"));
        assert!(!by_file.matches_file("/tmp/b", "the flag"));
        assert!(!by_file.matches_command("echo flag", "flag"));

        assert!(!Objective::new("manual", "no rule").matches_command("ls", ""));
    }

    #[test]
    fn test_requires_locks() {
        let mission = Mission::new("m2", "Second", "").requires("m1");
        assert_eq!(mission.state, MissionState::Locked);
        assert!(mission.prerequisites.contains("m1"));
    }

    #[test]
    fn test_progress_counts() {
        let mut mission = Mission::new("m", "M", "")
            .objective(Objective::new("a", "A"))
            .objective(Objective::new("b", "B"));
        assert_eq!(mission.progress(), (0, 2));
        mission.objectives[0].completed = true;
        assert_eq!(mission.progress(), (1, 2));
        assert!(!mission.all_objectives_complete());
    }

    #[test]
    fn test_reward_builder() {
        let reward = Reward::xp(50).skill("files", 1).skill("files", 2).item("key").unlock("m2");
        assert_eq!(reward.skills.get("files"), Some(&3));
        assert_eq!(reward.items, vec!["key"]);
        assert_eq!(reward.unlocks, vec!["m2"]);
    }
}
