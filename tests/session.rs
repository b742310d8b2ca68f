//! End-to-end tests driving a session through committed lines

use terminal_quest::game::catalog;
use terminal_quest::game::snapshot::StateSnapshot;
use terminal_quest::shell::{BufferedOutput, EditorKey};
use terminal_quest::*;

fn seeded() -> SessionInterpreter {
    SessionInterpreter::new(ShellConfig::default())
}

fn run(session: &mut SessionInterpreter, line: &str) -> BufferedOutput {
    let mut out = BufferedOutput::new();
    session.submit_line(line, &mut out);
    out
}

fn run_all(session: &mut SessionInterpreter, lines: &[&str]) -> BufferedOutput {
    let mut out = BufferedOutput::new();
    for line in lines {
        session.submit_line(line, &mut out);
    }
    out
}

#[test]
fn test_file_lifecycle() {
    let mut session = seeded();
    let out = run_all(
        &mut session,
        &[
            "mkdir -p ~/work/notes",
            "touch ~/work/notes/today.txt",
            "echo hi > ~/work/notes/today.txt",
        ],
    );
    assert!(!out.has_errors(), "unexpected errors: {}", out.text());

    let out = run(&mut session, "cat ~/work/notes/today.txt");
    assert_eq!(out.text(), "hi");

    run(&mut session, "echo there >> ~/work/notes/today.txt");
    assert_eq!(
        session.fs().read_file("~/work/notes/today.txt").unwrap(),
        "hi\nthere"
    );
}

#[test]
fn test_navigation_updates_pwd() {
    let mut session = seeded();
    run(&mut session, "cd /var/log");
    assert_eq!(session.env_var("PWD"), Some("/var/log"));
    assert_eq!(run(&mut session, "pwd").text(), "/var/log");

    run(&mut session, "cd -");
    assert_eq!(run(&mut session, "pwd").text(), "/home/user");

    let out = run(&mut session, "cd /nowhere");
    assert!(out.text().starts_with("cd: "));
    assert!(out.text().contains("No such file or directory"));
}

#[test]
fn test_command_objective_awards_once() {
    let mission = Mission::new("m1", "Look Around", "List something")
        .objective(Objective::command(
            "ls",
            "Run ls",
            CommandPattern::Prefix("ls".into()),
        ))
        .reward(Reward::xp(100));
    let fs = VirtualFilesystem::new("user", "/home/user");
    let missions = MissionStore::with_missions([mission]);
    let mut session = SessionInterpreter::with_parts(ShellConfig::default(), fs, missions);

    let out = run(&mut session, "mission start m1");
    assert!(out.text().contains("[MISSION] Started: Look Around"));

    let out = run(&mut session, "ls");
    assert!(out.text().contains("[MISSION] Completed: Look Around (+100 XP)"));
    assert_eq!(session.missions().progress().xp, 100);
    assert_eq!(
        session.missions().mission("m1").map(|m| m.state),
        Some(MissionState::Completed)
    );

    run(&mut session, "ls");
    assert_eq!(session.missions().progress().xp, 100);
}

#[test]
fn test_rm_errors_and_force() {
    let mut session = seeded();

    let out = run(&mut session, "rm ~/Documents");
    assert!(out.text().contains("Is a directory"));
    assert!(session.fs().is_directory("~/Documents"));

    let out = run(&mut session, "rm ~/missing.txt");
    assert!(out.text().contains("No such file or directory"));

    let out = run(&mut session, "rm -f ~/missing.txt");
    assert!(!out.has_errors());

    let out = run(&mut session, "rm -r ~/Documents");
    assert!(!out.has_errors());
    assert!(!session.fs().exists("~/Documents"));
}

#[test]
fn test_sudo_lockout_after_three_failures() {
    let mut session = seeded();
    run(&mut session, "sudo cat /root/flag.txt");
    assert!(matches!(session.mode(), Mode::PasswordPrompt { .. }));

    let out = run_all(&mut session, &["wrong", "nope", "letmein"]);
    assert_eq!(out.text().matches("Sorry, try again.").count(), 2);
    assert!(out.text().contains("sudo: 3 incorrect password attempts"));
    assert!(!out.text().contains("FLAG{"));
    assert!(matches!(session.mode(), Mode::Normal));
}

#[test]
fn test_sudo_runs_deferred_command_once() {
    for failures in 0..3 {
        let mut session = seeded();
        let mut out = run(&mut session, "sudo cat /root/flag.txt");
        for _ in 0..failures {
            session.submit_line("wrong", &mut out);
        }
        session.submit_line("password", &mut out);

        assert_eq!(out.text().matches("FLAG{elevated_access}").count(), 1);
        assert!(matches!(session.mode(), Mode::Normal));
        assert_eq!(session.current_user(), "user");
    }
}

#[test]
fn test_passwords_stay_out_of_history() {
    let mut session = seeded();
    run_all(&mut session, &["sudo whoami", "password"]);
    let history: Vec<&str> = session.history().collect();
    assert_eq!(history, vec!["sudo whoami"]);
}

#[test]
fn test_sudo_whoami_reports_root() {
    let mut session = seeded();
    let out = run_all(&mut session, &["sudo whoami", "password"]);
    assert_eq!(out.text(), "root");
    assert_eq!(run(&mut session, "whoami").text(), "user");
}

#[test]
fn test_editor_save_and_exit() {
    let mut session = seeded();
    run(&mut session, "nano ~/report.txt");
    assert!(matches!(session.mode(), Mode::Editor(_)));

    run(&mut session, "suspect 203.0.113.42");
    let out = run(&mut session, "x");
    assert!(out.text().contains("Wrote 1 lines"));
    assert!(matches!(session.mode(), Mode::Normal));
    assert_eq!(
        session.fs().read_file("~/report.txt").unwrap(),
        "suspect 203.0.113.42"
    );
}

#[test]
fn test_editor_refuses_to_drop_changes() {
    let mut session = seeded();
    run_all(&mut session, &["nano ~/draft.txt", "half a thought"]);

    let out = run(&mut session, "exit");
    assert!(out.text().contains("Unsaved changes"));
    assert!(matches!(session.mode(), Mode::Editor(_)));

    run(&mut session, "exit!");
    assert!(matches!(session.mode(), Mode::Normal));
    assert!(!session.fs().exists("~/draft.txt"));
}

#[test]
fn test_ftp_download() {
    let mut session = seeded();
    let out = run(&mut session, "ftp drop.example");
    assert!(out.text().contains("Connected to drop.example."));
    assert!(matches!(session.mode(), Mode::RemoteSessionPassword(_)));

    let out = run(&mut session, "hunter2");
    assert!(out.text().contains("230 Login successful."));
    assert_eq!(session.prompt(), "ftp> ");

    run_all(&mut session, &["cd pub", "get intel.txt"]);
    let out = run(&mut session, "bye");
    assert!(out.text().contains("221 Goodbye."));
    assert!(matches!(session.mode(), Mode::Normal));

    let intel = session.fs().read_file("~/intel.txt").unwrap();
    assert!(intel.contains("operation nightfall"));
    assert!(!session.history().any(|line| line == "hunter2"));
}

#[test]
fn test_pipelines_are_rejected() {
    let mut session = seeded();
    let out = run(&mut session, "cat /var/log/auth.log | grep Failed");
    assert!(out.has_errors());
    assert!(out.text().contains("not supported"));
}

#[test]
fn test_alias_and_variables() {
    let mut session = seeded();
    run(&mut session, "export GREETING=hello");
    assert_eq!(run(&mut session, "echo $GREETING world").text(), "hello world");
    assert_eq!(run(&mut session, "echo ${GREETING}!").text(), "hello!");
    assert_eq!(run(&mut session, "echo '$GREETING'").text(), "$GREETING");

    run(&mut session, "alias hi='echo hey'");
    assert_eq!(run(&mut session, "hi there").text(), "hey there");

    run(&mut session, "unalias hi");
    assert!(run(&mut session, "hi").text().contains("command not found"));
}

#[test]
fn test_history_listing() {
    let mut session = seeded();
    run_all(&mut session, &["pwd", "whoami"]);
    let out = run(&mut session, "history");
    assert_eq!(
        out.text(),
        "    1  pwd\n    2  whoami\n    3  history"
    );

    run(&mut session, "history -c");
    assert_eq!(session.history().count(), 0);
}

#[test]
fn test_path_lookup_for_unknown_commands() {
    let mut session = seeded();
    assert_eq!(
        run(&mut session, "scanner.sh").text(),
        "scanner.sh: executed successfully"
    );
    assert_eq!(
        run(&mut session, "frobnicate").text(),
        "frobnicate: command not found"
    );
}

#[test]
fn test_progress_survives_persistence() {
    let mut session = seeded();
    run_all(
        &mut session,
        &[
            "mission start first-steps",
            "pwd",
            "ls",
            "cat readme.txt",
        ],
    );
    assert_eq!(session.missions().progress().xp, 100);

    let json = session.missions().export_state().to_json().unwrap();
    let snapshot = StateSnapshot::from_json(&json).unwrap();

    let mut restored = MissionStore::with_missions(catalog::default_missions("/home/user"));
    restored.import_state(snapshot);
    assert_eq!(restored.progress().xp, 100);
    assert!(restored.progress().has_completed(catalog::FIRST_STEPS));
    assert_eq!(
        restored.mission(catalog::FILE_OPS).map(|m| m.state),
        Some(MissionState::Available)
    );
    assert!(restored.active_mission().is_none());
}

fn plain_session(missions: Vec<Mission>) -> SessionInterpreter {
    let fs = VirtualFilesystem::new("user", "/home/user");
    SessionInterpreter::with_parts(
        ShellConfig::default(),
        fs,
        MissionStore::with_missions(missions),
    )
}

fn command_mission(id: &str, command: &str, xp: u64) -> Mission {
    Mission::new(id, id, "")
        .objective(Objective::command(
            command,
            command,
            CommandPattern::Exact(command.into()),
        ))
        .reward(Reward::xp(xp))
}

fn sorted_lines(out: &BufferedOutput) -> Vec<String> {
    let mut lines: Vec<String> = out.lines.iter().map(|line| line.text.clone()).collect();
    lines.sort();
    lines
}

#[test]
fn test_second_mission_waits_for_the_first() {
    let mut session = plain_session(vec![
        command_mission("a", "ls", 50),
        command_mission("b", "pwd", 70),
    ]);
    run(&mut session, "mission start a");

    let out = run(&mut session, "mission start b");
    assert_eq!(out.errors().len(), 1);
    assert!(out
        .text()
        .starts_with("mission: b: finish 'a' before starting another mission"));
    assert_eq!(
        session.missions().mission("b").map(|m| m.state),
        Some(MissionState::Available)
    );
    assert_eq!(session.missions().active_mission_id(), Some("a"));

    run(&mut session, "ls");
    assert!(!run(&mut session, "mission start b").has_errors());
    run(&mut session, "pwd");

    for id in ["a", "b"] {
        assert_eq!(
            session.missions().mission(id).map(|m| m.state),
            Some(MissionState::Completed)
        );
    }
    assert_eq!(session.missions().progress().xp, 120);
}

#[test]
fn test_variable_values_are_not_shell_syntax() {
    let mut session = seeded();
    run(&mut session, "export Q=\"it's\"");
    assert_eq!(run(&mut session, "echo $Q").text(), "it's");
    assert_eq!(run(&mut session, "echo \"$Q here\"").text(), "it's here");

    run(&mut session, "export P='a|b'");
    let out = run(&mut session, "echo $P");
    assert!(!out.has_errors());
    assert_eq!(out.text(), "a|b");

    run(&mut session, "export R='> x'");
    assert_eq!(run(&mut session, "echo $R").text(), "> x");
    assert!(!session.fs().exists("~/x"));
}

#[test]
fn test_grep_flags() {
    let mut session = seeded();

    let out = run(&mut session, "grep -n Failed /var/log/auth.log");
    let numbers: Vec<&str> = out
        .lines
        .iter()
        .map(|line| line.text.split(':').next().unwrap_or_default())
        .collect();
    assert_eq!(numbers, vec!["2", "3", "4"]);

    assert!(run(&mut session, "grep failed /var/log/auth.log").lines.is_empty());
    assert_eq!(run(&mut session, "grep -i failed /var/log/auth.log").lines.len(), 3);

    let out = run(&mut session, "grep -r 203.0.113.42 /var/log");
    assert_eq!(out.lines.len(), 3);
    assert!(out
        .lines
        .iter()
        .all(|line| line.text.starts_with("/var/log/auth.log:")));

    let out = run(&mut session, "grep root /var/log");
    assert!(out.text().contains("Is a directory"));
}

#[test]
fn test_grep_invalid_regex_matches_literally() {
    let mut session = seeded();
    run(&mut session, "echo 'call(x)' > ~/code.txt");
    run(&mut session, "echo 'call x' >> ~/code.txt");

    let out = run(&mut session, "grep 'call(' ~/code.txt");
    assert!(!out.has_errors());
    assert_eq!(out.text(), "call(x)");
}

#[test]
fn test_find_by_name_and_type() {
    let mut session = seeded();
    run_all(
        &mut session,
        &[
            "mkdir -p ~/proj/src",
            "touch ~/proj/a.log ~/proj/src/b.log ~/proj/src/c.txt",
        ],
    );

    let out = run(&mut session, "find ~/proj -name '*.log'");
    assert_eq!(
        sorted_lines(&out),
        vec!["/home/user/proj/a.log", "/home/user/proj/src/b.log"]
    );

    let out = run(&mut session, "find ~/proj -type d");
    assert_eq!(sorted_lines(&out), vec!["/home/user/proj", "/home/user/proj/src"]);

    let out = run(&mut session, "find ~/proj -type f -name 'c.*'");
    assert_eq!(out.text(), "/home/user/proj/src/c.txt");

    let out = run(&mut session, "find ~/proj -type x");
    assert_eq!(out.text(), "find: Unknown argument to -type: x");
}

#[test]
fn test_cp_and_mv_into_directories() {
    let mut session = seeded();

    let out = run(&mut session, "cp ~/readme.txt ~/Documents");
    assert!(!out.has_errors(), "{}", out.text());
    assert!(session.fs().is_file("~/Documents/readme.txt"));
    assert!(session.fs().is_file("~/readme.txt"));

    run(&mut session, "mv ~/Documents/todo.txt ~/Downloads");
    assert!(session.fs().is_file("~/Downloads/todo.txt"));
    assert!(!session.fs().exists("~/Documents/todo.txt"));

    let out = run(&mut session, "cp ~/Documents ~/backup");
    assert!(out.text().contains("Is a directory"));
    run(&mut session, "cp -r ~/Documents ~/backup");
    assert!(session.fs().is_file("~/backup/readme.txt"));
}

#[test]
fn test_cp_and_mv_complete_file_objectives() {
    let copy = Mission::new("copy", "Copy", "")
        .objective(Objective::file("c", "copy it", "/home/user/archive/notes.txt", "hello"))
        .reward(Reward::xp(10));
    let moved = Mission::new("move", "Move", "")
        .objective(Objective::file("m", "move it", "/home/user/projects/notes.txt", "hello"))
        .reward(Reward::xp(20));
    let mut session = plain_session(vec![copy, moved]);
    run_all(
        &mut session,
        &["echo hello > ~/notes.txt", "mkdir ~/archive ~/projects"],
    );

    run(&mut session, "mission start copy");
    let out = run(&mut session, "cp ~/notes.txt ~/archive");
    assert!(out.text().contains("[MISSION] Completed: Copy"));

    run(&mut session, "mission start move");
    let out = run(&mut session, "mv ~/notes.txt ~/projects");
    assert!(out.text().contains("[MISSION] Completed: Move"));
    assert_eq!(session.missions().progress().xp, 30);
}

#[test]
fn test_chmod_and_chown() {
    let mut session = seeded();
    run(&mut session, "touch ~/tool");
    assert!(run(&mut session, "./tool").text().contains("command not found"));

    let out = run(&mut session, "chmod 755 ~/tool");
    assert!(!out.has_errors());
    assert_eq!(
        session.fs().node("~/tool").map(|n| n.permissions.as_str()),
        Some("rwxr-xr-x")
    );
    assert_eq!(run(&mut session, "./tool").text(), "./tool: executed successfully");

    run(&mut session, "chown root:staff ~/tool");
    assert_eq!(
        session.fs().node("~/tool").map(|n| n.owner.as_str()),
        Some("root")
    );

    assert!(run(&mut session, "chmod bogus ~/tool").text().starts_with("chmod: "));
    assert!(run(&mut session, "chmod 644 ~/missing")
        .text()
        .contains("No such file or directory"));
}

#[test]
fn test_missing_operands_give_usage() {
    let mut session = seeded();
    let cases = [
        ("mkdir", "mkdir: missing operand"),
        ("cat", "cat: missing operand"),
        ("touch", "touch: missing operand"),
        ("rm", "rm: missing operand"),
        ("cp ~/readme.txt", "cp: missing destination file operand"),
        ("mv", "mv: missing file operand"),
        ("grep foo", "grep: usage: grep [-i] [-n] [-r] PATTERN PATH..."),
        ("chmod 755", "chmod: usage: chmod MODE PATH..."),
        ("chown root", "chown: usage: chown OWNER PATH..."),
        ("nano", "nano: usage: nano FILE"),
        ("sudo", "sudo: usage: sudo COMMAND"),
        ("mission start", "mission: usage: mission start ID"),
    ];
    for (line, expected) in cases {
        let out = run(&mut session, line);
        assert_eq!(out.text(), expected, "for `{}`", line);
        assert!(out.has_errors());
    }
    assert!(matches!(session.mode(), Mode::Normal));
}

#[test]
fn test_editor_key_api() {
    let mut session = seeded();
    let mut out = BufferedOutput::new();
    assert!(!session.editor_key(EditorKey::Char('x'), &mut out));

    run(&mut session, "nano ~/keys.txt");
    for key in [
        EditorKey::Char('h'),
        EditorKey::Char('i'),
        EditorKey::Enter,
        EditorKey::Char('x'),
        EditorKey::Save,
    ] {
        assert!(session.editor_key(key, &mut out));
    }
    assert!(out.text().contains("Wrote 2 lines"));
    assert_eq!(session.fs().read_file("~/keys.txt").unwrap(), "hi\nx");
    assert!(matches!(session.mode(), Mode::Editor(_)));

    for key in [EditorKey::Up, EditorKey::End, EditorKey::Backspace] {
        session.editor_key(key, &mut out);
    }
    session.editor_key(EditorKey::Exit, &mut out);
    assert!(out.text().contains("Unsaved changes"));
    assert!(matches!(session.mode(), Mode::Editor(_)));

    session.editor_key(EditorKey::ExitWithoutSaving, &mut out);
    assert!(matches!(session.mode(), Mode::Normal));
    assert_eq!(session.fs().read_file("~/keys.txt").unwrap(), "hi\nx");
}

#[test]
fn test_editor_replace_then_save() {
    let mut session = seeded();
    assert!(!session.editor_replace("nothing open"));

    run(&mut session, "nano ~/notes/plan.txt");
    assert!(session.fs().is_directory("~/notes"));
    assert!(session.editor_replace("line one\nline two"));

    let mut out = BufferedOutput::new();
    session.editor_key(EditorKey::SaveAndExit, &mut out);
    assert!(matches!(session.mode(), Mode::Normal));
    assert_eq!(
        session.fs().read_file("~/notes/plan.txt").unwrap(),
        "line one\nline two"
    );
    assert!(!session.editor_replace("again"));
}
