//! Built-in missions
//!
//! A short campaign that walks a new player from moving around the tree to
//! escalating privileges and pulling files off a remote host.

use crate::data::*;

pub const FIRST_STEPS: &str = "first-steps";
pub const FILE_OPS: &str = "file-ops";
pub const LOG_HUNT: &str = "log-hunt";
pub const ROOT_ACCESS: &str = "root-access";
pub const REMOTE_DROP: &str = "remote-drop";
pub const FIELD_REPORT: &str = "field-report";

/// Address that shows up in the seeded auth log
pub const ATTACKER_IP: &str = "203.0.113.42";

/// The default campaign. File objectives are anchored at `home`.
pub fn default_missions(home: &str) -> Vec<Mission> {
    vec![
        Mission::new(
            FIRST_STEPS,
            "First Steps",
            "Get your bearings: find out where you are, look around and read the readme.",
        )
        .category(MissionCategory::Tutorial)
        .objective(Objective::command(
            "pwd",
            "Print the working directory",
            CommandPattern::Exact("pwd".into()),
        ))
        .objective(Objective::command(
            "ls",
            "List the files in your home directory",
            CommandPattern::Prefix("ls".into()),
        ))
        .objective(Objective::command(
            "read-readme",
            "Read readme.txt",
            CommandPattern::Regex(r"^cat\s+\S*readme\.txt$".into()),
        ))
        .reward(Reward::xp(100).skill("navigation", 1).unlock(FILE_OPS)),
        Mission::new(
            FILE_OPS,
            "Paper Trail",
            "Create a projects directory and leave a note saying hello inside it.",
        )
        .category(MissionCategory::FileSystem)
        .requires(FIRST_STEPS)
        .objective(Objective::command(
            "mkdir",
            "Create a directory",
            CommandPattern::Prefix("mkdir".into()),
        ))
        .objective(Objective::file(
            "note",
            "Write 'hello' into ~/projects/notes.txt",
            &format!("{}/projects/notes.txt", home),
            "hello",
        ))
        .reward(
            Reward::xp(150)
                .skill("files", 1)
                .item("usb-drive")
                .unlock(LOG_HUNT),
        ),
        Mission::new(
            LOG_HUNT,
            "Log Hunt",
            "Someone has been knocking on the door. Search the auth log for failed logins.",
        )
        .category(MissionCategory::Forensics)
        .difficulty(Difficulty::Intermediate)
        .requires(FILE_OPS)
        .objective(Objective::command(
            "grep-auth",
            "grep through /var/log/auth.log",
            CommandPattern::Regex(r"^grep\s+.*auth\.log".into()),
        ))
        .objective(Objective::output(
            "attacker",
            "Spot the attacker's address",
            ATTACKER_IP,
        ))
        .reward(
            Reward::xp(250)
                .skill("forensics", 2)
                .unlock(ROOT_ACCESS)
                .unlock(REMOTE_DROP),
        ),
        Mission::new(
            ROOT_ACCESS,
            "Root Access",
            "Use sudo to read the flag in /root, then make the scanner executable for everyone.",
        )
        .category(MissionCategory::Permissions)
        .difficulty(Difficulty::Intermediate)
        .requires(LOG_HUNT)
        .objective(Objective::command(
            "sudo",
            "Run a command with sudo",
            CommandPattern::Prefix("sudo ".into()),
        ))
        .objective(Objective::output(
            "flag",
            "Read /root/flag.txt with elevated rights",
            "FLAG{elevated_access}",
        ))
        .objective(Objective::command(
            "chmod",
            "Change permissions on a file",
            CommandPattern::Prefix("chmod".into()),
        ))
        .reward(Reward::xp(300).skill("permissions", 2).item("root-badge")),
        Mission::new(
            REMOTE_DROP,
            "Dead Drop",
            "Connect to the drop server over ftp and retrieve intel.txt.",
        )
        .category(MissionCategory::Networking)
        .difficulty(Difficulty::Advanced)
        .requires(LOG_HUNT)
        .objective(Objective::command(
            "connect",
            "Open an ftp session",
            CommandPattern::Prefix("ftp".into()),
        ))
        .objective(Objective::file(
            "intel",
            "Download intel.txt into your home directory",
            &format!("{}/intel.txt", home),
            "operation",
        ))
        .reward(Reward::xp(400).skill("networking", 2).unlock(FIELD_REPORT)),
        Mission::new(
            FIELD_REPORT,
            "Field Report",
            "Write ~/report.txt with nano and name the attacker's address.",
        )
        .category(MissionCategory::Forensics)
        .difficulty(Difficulty::Advanced)
        .requires(REMOTE_DROP)
        .objective(Objective::file(
            "report",
            "Save a report naming the attacker",
            &format!("{}/report.txt", home),
            ATTACKER_IP,
        ))
        .reward(Reward::xp(800).skill("forensics", 3).item("analyst-certificate")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_is_consistent() {
        let missions = default_missions("/home/user");
        let ids: HashSet<&str> = missions.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids.len(), missions.len());

        for mission in &missions {
            assert!(!mission.objectives.is_empty(), "{} has no objectives", mission.id);
            for prerequisite in &mission.prerequisites {
                assert!(ids.contains(prerequisite.as_str()));
            }
            for unlock in &mission.reward.unlocks {
                assert!(ids.contains(unlock.as_str()));
            }
        }
    }

    #[test]
    fn test_only_first_mission_starts_available() {
        let missions = default_missions("/home/user");
        let available: Vec<&str> = missions
            .iter()
            .filter(|m| m.state == MissionState::Available)
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(available, vec![FIRST_STEPS]);
    }
}
