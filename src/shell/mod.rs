//! Session interpreter
//!
//! Owns one session's filesystem and mission store and turns committed input
//! lines into output. What a line means depends on the current [`Mode`]:
//! a shell command, a sudo password, an ftp command, or editor input.

mod commands;
pub mod editor;
pub mod output;
pub mod parser;
pub mod remote;

pub use editor::{EditorAction, EditorKey, EditorSession, Position, TextBuffer};
pub use output::{BufferedOutput, OutputLine, OutputSink};
pub use remote::{RemoteNext, RemoteReply, RemoteSession};

use crate::config::ShellConfig;
use crate::data::Color;
use crate::fs::{path, seed, VirtualFilesystem, ROOT_USER};
use crate::game::{catalog, MissionStore};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parser::CommandLine;
use std::collections::{BTreeMap, VecDeque};

pub const SHELL_PATH: &str = "/bin/qsh";
pub const DEFAULT_PATH: &str = "/usr/bin:/bin";

/// Input mode of the session, with the state each mode needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Normal,
    /// Waiting for the sudo password; `deferred` runs once it is accepted
    PasswordPrompt { attempts: u32, deferred: String },
    RemoteSession(RemoteSession),
    /// The next line is the remote password
    RemoteSessionPassword(RemoteSession),
    Editor(EditorSession),
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::PasswordPrompt { .. } => "password",
            Mode::RemoteSession(_) => "ftp",
            Mode::RemoteSessionPassword(_) => "ftp-password",
            Mode::Editor(_) => "editor",
        }
    }

    /// True when the next line is a secret and must not be echoed or recorded
    pub fn is_secret(&self) -> bool {
        matches!(
            self,
            Mode::PasswordPrompt { .. } | Mode::RemoteSessionPassword(_)
        )
    }
}

/// One interactive shell session
pub struct SessionInterpreter {
    fs: VirtualFilesystem,
    missions: MissionStore,
    config: ShellConfig,
    mode: Mode,
    env: BTreeMap<String, String>,
    aliases: BTreeMap<String, String>,
    /// Most recent first
    history: VecDeque<String>,
    /// Set while a sudo-deferred command runs
    elevated: bool,
    /// Files written by the running command, checked against file objectives
    pending_writes: Vec<String>,
    started_at: DateTime<Utc>,
}

impl SessionInterpreter {
    /// Session with a seeded world (unless disabled) and the built-in missions
    pub fn new(config: ShellConfig) -> Self {
        let mut fs = VirtualFilesystem::new(&config.username, &config.home);
        if config.seed_world {
            if let Err(err) = seed::populate(&mut fs, &config.username, &config.hostname) {
                warn!("failed to seed filesystem: {}", err);
            }
        }
        let missions = MissionStore::with_missions(catalog::default_missions(fs.home()));
        Self::with_parts(config, fs, missions)
    }

    /// Session over an existing filesystem and mission store
    pub fn with_parts(config: ShellConfig, fs: VirtualFilesystem, missions: MissionStore) -> Self {
        let mut env = BTreeMap::new();
        env.insert("USER".to_string(), config.username.clone());
        env.insert("HOME".to_string(), fs.home().to_string());
        env.insert("PWD".to_string(), fs.current_path().to_string());
        env.insert("SHELL".to_string(), SHELL_PATH.to_string());
        env.insert("HOSTNAME".to_string(), config.hostname.clone());
        env.insert("PATH".to_string(), DEFAULT_PATH.to_string());

        let mut aliases = BTreeMap::new();
        aliases.insert("ll".to_string(), "ls -l".to_string());
        aliases.insert("la".to_string(), "ls -a".to_string());

        info!("session started for {}@{}", config.username, config.hostname);
        Self {
            fs,
            missions,
            config,
            mode: Mode::Normal,
            env,
            aliases,
            history: VecDeque::new(),
            elevated: false,
            pending_writes: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn fs(&self) -> &VirtualFilesystem {
        &self.fs
    }

    pub fn fs_mut(&mut self) -> &mut VirtualFilesystem {
        &mut self.fs
    }

    pub fn missions(&self) -> &MissionStore {
        &self.missions
    }

    pub fn missions_mut(&mut self) -> &mut MissionStore {
        &mut self.missions
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }

    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    /// Recorded commands, most recent first
    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    /// User commands run as right now
    pub fn current_user(&self) -> &str {
        if self.elevated {
            ROOT_USER
        } else {
            &self.config.username
        }
    }

    pub fn prompt(&self) -> String {
        match &self.mode {
            Mode::Normal => format!(
                "{}@{}:{}$ ",
                self.current_user(),
                self.config.hostname,
                path::display(self.fs.current_path(), self.fs.home())
            ),
            Mode::PasswordPrompt { .. } => {
                format!("[sudo] password for {}: ", self.config.username)
            }
            Mode::RemoteSession(_) => "ftp> ".to_string(),
            Mode::RemoteSessionPassword(_) => "Password: ".to_string(),
            Mode::Editor(session) => format!("-- EDITOR {} --", session.path),
        }
    }

    /// Feed one committed line to the session
    pub fn submit_line(&mut self, raw: &str, sink: &mut dyn OutputSink) {
        let line = raw.trim_end_matches(|c: char| c == '\n' || c == '\r');
        match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Normal => self.run_line(line, sink),
            Mode::PasswordPrompt { attempts, deferred } => {
                self.check_password(line, attempts, deferred, sink)
            }
            Mode::RemoteSession(session) => self.remote_line(line, session, sink),
            Mode::RemoteSessionPassword(mut session) => {
                for reply in session.authenticate() {
                    sink.emit(reply);
                }
                self.mode = Mode::RemoteSession(session);
            }
            Mode::Editor(mut session) => {
                let action = session.apply_line(line);
                self.finish_editor_input(session, action, sink);
            }
        }
    }

    /// Feed a structured key to the editor. Returns false outside the editor.
    pub fn editor_key(&mut self, key: EditorKey, sink: &mut dyn OutputSink) -> bool {
        match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Editor(mut session) => {
                let action = session.apply_key(key);
                self.finish_editor_input(session, action, sink);
                true
            }
            other => {
                self.mode = other;
                false
            }
        }
    }

    /// Replace the whole editor buffer. Returns false outside the editor.
    pub fn editor_replace(&mut self, content: &str) -> bool {
        match &mut self.mode {
            Mode::Editor(session) => {
                session.replace(content);
                true
            }
            _ => false,
        }
    }

    fn record_history(&mut self, line: &str) {
        if self.config.history_capacity == 0 {
            return;
        }
        self.history.push_front(line.to_string());
        self.history.truncate(self.config.history_capacity);
    }

    fn run_line(&mut self, line: &str, sink: &mut dyn OutputSink) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        self.record_history(line);
        let lines = self.execute(line, sink);

        // sudo only asked for a password; the command has not run yet
        if matches!(self.mode, Mode::PasswordPrompt { .. }) {
            for output in lines {
                sink.emit(output);
            }
            return;
        }
        self.post_command(line, lines, sink);
    }

    /// Substitute, expand, tokenize and dispatch one command line
    fn execute(&mut self, line: &str, sink: &mut dyn OutputSink) -> Vec<OutputLine> {
        let substituted = parser::substitute_env(line, &self.env);
        let expanded = parser::expand_alias(&substituted, &self.aliases);
        let command = match parser::tokenize(&expanded).and_then(CommandLine::from_tokens) {
            Ok(Some(command)) => command,
            Ok(None) => return Vec::new(),
            Err(err) => {
                let name = expanded.split_whitespace().next().unwrap_or("qsh");
                return vec![OutputLine::error(format!("{}: {}", name, err))];
            }
        };

        debug!("dispatch {} {:?}", command.name, command.args);
        match self.dispatch(&command, sink) {
            Ok(lines) => lines,
            Err(err) => vec![OutputLine::error(format!("{}: {}", command.name, err))],
        }
    }

    fn execute_elevated(&mut self, line: &str, sink: &mut dyn OutputSink) -> Vec<OutputLine> {
        let previous = self.fs.acting_user().to_string();
        self.elevated = true;
        self.fs.set_acting_user(ROOT_USER);
        let lines = self.execute(line, sink);
        self.fs.set_acting_user(&previous);
        self.elevated = false;
        lines
    }

    fn check_password(
        &mut self,
        line: &str,
        attempts: u32,
        deferred: String,
        sink: &mut dyn OutputSink,
    ) {
        if line == self.config.sudo_password {
            info!("sudo accepted: {}", deferred);
            let lines = self.execute_elevated(&deferred, sink);
            self.post_command(&format!("sudo {}", deferred), lines, sink);
            return;
        }

        let attempts = attempts + 1;
        if attempts >= self.config.max_password_attempts {
            warn!("sudo: {} incorrect password attempts", attempts);
            sink.emit(OutputLine::error(format!(
                "sudo: {} incorrect password attempts",
                attempts
            )));
        } else {
            sink.emit(OutputLine::error("Sorry, try again."));
            self.mode = Mode::PasswordPrompt { attempts, deferred };
        }
    }

    fn remote_line(&mut self, line: &str, mut session: RemoteSession, sink: &mut dyn OutputSink) {
        let line = line.trim();
        let reply = session.handle(line, &mut self.fs);
        if let Some(written) = reply.written.clone() {
            self.pending_writes.push(written);
        }
        self.mode = match reply.next {
            RemoteNext::Stay => Mode::RemoteSession(session),
            RemoteNext::AwaitPassword => Mode::RemoteSessionPassword(session),
            RemoteNext::Quit => Mode::Normal,
        };
        if line.is_empty() {
            return;
        }
        self.record_history(line);
        self.post_command(line, reply.lines, sink);
    }

    fn finish_editor_input(
        &mut self,
        mut session: EditorSession,
        action: EditorAction,
        sink: &mut dyn OutputSink,
    ) {
        self.mode = match action {
            EditorAction::Continue => Mode::Editor(session),
            EditorAction::Save => {
                self.save_buffer(&mut session, sink);
                Mode::Editor(session)
            }
            EditorAction::SaveAndExit => {
                if self.save_buffer(&mut session, sink) {
                    Mode::Normal
                } else {
                    Mode::Editor(session)
                }
            }
            EditorAction::Exit => {
                sink.emit(OutputLine::plain(format!("[ Closed {} ]", session.path)));
                Mode::Normal
            }
            EditorAction::ExitRefused => {
                sink.emit(OutputLine::error(
                    "Unsaved changes. Use 'save', 'x' to save and exit, or 'exit!' to discard.",
                ));
                Mode::Editor(session)
            }
            EditorAction::Discard => {
                sink.emit(OutputLine::colored(
                    format!("[ Discarded changes to {} ]", session.path),
                    Color::Yellow,
                ));
                Mode::Normal
            }
        };
    }

    /// Write the buffer back; creates the file when it does not exist yet
    fn save_buffer(&mut self, session: &mut EditorSession, sink: &mut dyn OutputSink) -> bool {
        let content = session.content();
        let result = if self.fs.is_file(&session.path) {
            self.fs.write_file(&session.path, &content)
        } else {
            self.fs.create_file(&session.path, &content)
        };
        match result {
            Ok(()) => {
                session.mark_saved();
                sink.emit(OutputLine::colored(
                    format!(
                        "[ Wrote {} lines to {} ]",
                        session.buffer.line_count(),
                        path::display(&session.path, self.fs.home())
                    ),
                    Color::Green,
                ));
                self.pending_writes.push(session.path.clone());
                self.check_writes(sink);
                true
            }
            Err(err) => {
                sink.emit(OutputLine::error(format!("nano: {}", err)));
                false
            }
        }
    }

    /// Runs after every executed command: emit its output, resync `PWD`,
    /// then check command, output and file objectives of the active mission.
    fn post_command(&mut self, command: &str, lines: Vec<OutputLine>, sink: &mut dyn OutputSink) {
        let output = lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        for line in lines {
            sink.emit(line);
        }
        self.env
            .insert("PWD".to_string(), self.fs.current_path().to_string());
        self.missions.on_command(command, &output);
        self.check_writes(sink);
    }

    fn check_writes(&mut self, sink: &mut dyn OutputSink) {
        for written in std::mem::take(&mut self.pending_writes) {
            if let Ok(content) = self.fs.read_file(&written) {
                self.missions.on_file_write(&written, content);
            }
        }
        for event in self.missions.drain_events() {
            debug!("progress event {:?}", event.kind);
            sink.emit(OutputLine::colored(event.message(), event.color()));
        }
    }
}
