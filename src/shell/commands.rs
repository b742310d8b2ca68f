//! Normal-mode command table

use super::editor::EditorSession;
use super::output::{OutputLine, OutputSink};
use super::parser::{self, CommandLine};
use super::remote::{RemoteNext, RemoteSession};
use super::{Mode, SessionInterpreter};
use crate::data::{Color, MissionState};
use crate::fs::{path, ListOptions, RemoveOptions};
use crate::{Result, ShellError};
use chrono::Utc;
use regex::Regex;

type CommandResult = Result<Vec<OutputLine>>;

/// Name, synopsis and summary of every built-in
const COMMANDS: &[(&str, &str, &str)] = &[
    ("cd", "cd [DIR | -]", "Change the current directory"),
    ("pwd", "pwd", "Print the current directory"),
    ("ls", "ls [-l] [-a] [PATH...]", "List directory contents"),
    ("mkdir", "mkdir [-p] DIR...", "Create directories"),
    ("rmdir", "rmdir DIR...", "Remove empty directories"),
    ("touch", "touch FILE...", "Create empty files"),
    ("rm", "rm [-r] [-f] PATH...", "Remove files or directories"),
    ("cp", "cp [-r] SOURCE DEST", "Copy a file or directory"),
    ("mv", "mv SOURCE DEST", "Move or rename a file or directory"),
    ("cat", "cat FILE...", "Print file contents"),
    ("echo", "echo [TEXT...] [> FILE | >> FILE]", "Print text or write it to a file"),
    ("grep", "grep [-i] [-n] [-r] PATTERN PATH...", "Search files for a pattern"),
    ("find", "find [PATH] [-name GLOB] [-type f|d]", "Search for files in a tree"),
    ("chmod", "chmod MODE PATH...", "Change permissions"),
    ("chown", "chown OWNER PATH...", "Change owner"),
    ("nano", "nano FILE", "Edit a file"),
    ("sudo", "sudo COMMAND", "Run a command as root"),
    ("ftp", "ftp [HOST]", "Connect to a remote host"),
    ("history", "history [-c]", "Show or clear command history"),
    ("env", "env", "Print the environment"),
    ("printenv", "printenv [NAME]", "Print one or all environment variables"),
    ("export", "export [NAME=VALUE...]", "Set environment variables"),
    ("alias", "alias [NAME[=VALUE]...]", "Define or show aliases"),
    ("unalias", "unalias [-a] NAME...", "Remove aliases"),
    ("ps", "ps", "List processes"),
    ("df", "df", "Show filesystem usage"),
    ("date", "date", "Print the current date and time"),
    ("uname", "uname [-a] [-r] [-n]", "Print system information"),
    ("whoami", "whoami", "Print the current user"),
    ("hostname", "hostname", "Print the host name"),
    ("uptime", "uptime", "Show how long the session has been running"),
    ("man", "man COMMAND", "Show the manual for a command"),
    ("help", "help [COMMAND]", "List commands"),
    ("clear", "clear", "Clear the screen"),
    ("profile", "profile", "Show level, rank and rewards"),
    ("mission", "mission list | start ID | info ID | status", "Manage missions"),
];

const KERNEL_RELEASE: &str = "5.15.0-quest";

fn usage(synopsis: &str) -> ShellError {
    ShellError::InvalidArgument(format!("usage: {}", synopsis))
}

fn missing_operand() -> ShellError {
    ShellError::InvalidArgument("missing operand".to_string())
}

/// Reject flags outside `allowed`
fn check_flags(flags: &[char], allowed: &str) -> Result<()> {
    match flags.iter().find(|flag| !allowed.contains(**flag)) {
        Some(flag) => Err(ShellError::InvalidArgument(format!(
            "invalid option -- '{}'",
            flag
        ))),
        None => Ok(()),
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quote a word so the tokenizer reads it back unchanged
fn quote_word(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%~".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}

fn state_color(state: MissionState) -> Color {
    match state {
        MissionState::Locked => Color::Gray,
        MissionState::Available => Color::Cyan,
        MissionState::InProgress => Color::Yellow,
        MissionState::Completed => Color::Green,
    }
}

impl SessionInterpreter {
    pub(super) fn dispatch(&mut self, command: &CommandLine, sink: &mut dyn OutputSink) -> CommandResult {
        let args = command.args.as_slice();
        if command.redirect.is_some() && !matches!(command.name.as_str(), "echo" | "sudo") {
            return Err(ShellError::Unsupported("output redirection".to_string()));
        }

        match command.name.as_str() {
            // navigation
            "cd" => self.cmd_cd(args),
            "pwd" => Ok(vec![OutputLine::plain(self.fs.current_path())]),

            // files
            "ls" => self.cmd_ls(args),
            "mkdir" => self.cmd_mkdir(args),
            "rmdir" => self.cmd_rmdir(args),
            "touch" => self.cmd_touch(args),
            "rm" => self.cmd_rm(args),
            "cp" => self.cmd_cp(args),
            "mv" => self.cmd_mv(args),
            "cat" => self.cmd_cat(args),
            "echo" => self.cmd_echo(command),
            "grep" => self.cmd_grep(args),
            "find" => self.cmd_find(args),
            "chmod" => self.cmd_chmod(args),
            "chown" => self.cmd_chown(args),

            // modes
            "sudo" => self.cmd_sudo(command, sink),
            "nano" | "edit" => self.cmd_edit(args),
            "ftp" | "connect" => Ok(self.cmd_ftp(args)),

            // session
            "history" => self.cmd_history(args),
            "env" => Ok(self.env_lines()),
            "printenv" => Ok(self.cmd_printenv(args)),
            "export" => self.cmd_export(args),
            "alias" => self.cmd_alias(args),
            "unalias" => self.cmd_unalias(args),
            "clear" | "cls" => {
                sink.clear();
                Ok(Vec::new())
            }
            "exit" | "logout" => Ok(vec![OutputLine::colored(
                "There is no outer shell to return to. Keep hacking.",
                Color::Yellow,
            )]),

            // system info
            "whoami" => Ok(vec![OutputLine::plain(self.current_user())]),
            "hostname" => Ok(vec![OutputLine::plain(self.config.hostname.as_str())]),
            "uname" => self.cmd_uname(args),
            "date" => Ok(vec![OutputLine::plain(
                Utc::now().format("%a %b %e %H:%M:%S UTC %Y").to_string(),
            )]),
            "uptime" => Ok(self.cmd_uptime()),
            "ps" => Ok(self.cmd_ps()),
            "df" => Ok(self.cmd_df()),
            "help" | "?" => self.cmd_help(args),
            "man" => self.cmd_man(args),

            // progression
            "mission" | "missions" => self.cmd_mission(args),
            "profile" | "status" => Ok(self.cmd_profile()),

            name => self.cmd_external(name),
        }
    }

    fn cmd_cd(&mut self, args: &[String]) -> CommandResult {
        if args.len() > 1 {
            return Err(ShellError::InvalidArgument("too many arguments".to_string()));
        }
        let back = args.first().map(String::as_str) == Some("-");
        let target = match args.first() {
            None => self.fs.home().to_string(),
            Some(_) if back => self
                .env
                .get("OLDPWD")
                .cloned()
                .ok_or_else(|| ShellError::InvalidArgument("OLDPWD not set".to_string()))?,
            Some(dir) => dir.clone(),
        };

        let previous = self.fs.current_path().to_string();
        self.fs.change_current_path(&target)?;
        self.env.insert("OLDPWD".to_string(), previous);
        if back {
            Ok(vec![OutputLine::plain(self.fs.current_path())])
        } else {
            Ok(Vec::new())
        }
    }

    fn cmd_ls(&mut self, args: &[String]) -> CommandResult {
        let (flags, operands) = parser::split_flags(args);
        check_flags(&flags, "la1")?;
        let options = ListOptions {
            show_hidden: flags.contains(&'a'),
            long_format: flags.contains(&'l'),
        };
        let targets = if operands.is_empty() {
            vec![".".to_string()]
        } else {
            operands
        };

        let mut lines = Vec::new();
        for (index, target) in targets.iter().enumerate() {
            let abs = self.fs.resolve(target);
            if self.fs.is_file(&abs) {
                let parent = path::parent_of(&abs).unwrap_or_else(|| "/".to_string());
                let name = path::file_name(&abs);
                let hidden = ListOptions {
                    show_hidden: true,
                    ..options
                };
                if let Some(entry) = self
                    .fs
                    .list(&parent, hidden)?
                    .into_iter()
                    .find(|entry| entry.name == name)
                {
                    lines.push(OutputLine::plain(entry.render(options.long_format)));
                }
                continue;
            }

            let entries = self.fs.list(&abs, options)?;
            if targets.len() > 1 {
                if index > 0 {
                    lines.push(OutputLine::plain(""));
                }
                lines.push(OutputLine::plain(format!("{}:", target)));
            }
            for entry in entries {
                let text = entry.render(options.long_format);
                let line = if entry.is_dir {
                    OutputLine::colored(text, Color::Cyan)
                } else if self.fs.is_executable(&path::join(&abs, &entry.name)) {
                    OutputLine::colored(text, Color::Green)
                } else {
                    OutputLine::plain(text)
                };
                lines.push(line);
            }
        }
        Ok(lines)
    }

    fn cmd_mkdir(&mut self, args: &[String]) -> CommandResult {
        let (flags, operands) = parser::split_flags(args);
        check_flags(&flags, "p")?;
        if operands.is_empty() {
            return Err(missing_operand());
        }
        for dir in &operands {
            self.fs.create_directory(dir, flags.contains(&'p'))?;
        }
        Ok(Vec::new())
    }

    fn cmd_rmdir(&mut self, args: &[String]) -> CommandResult {
        if args.is_empty() {
            return Err(missing_operand());
        }
        for dir in args {
            if self.fs.is_file(dir) {
                return Err(ShellError::NotADirectory(self.fs.resolve(dir)));
            }
            self.fs.remove(dir, RemoveOptions::default())?;
        }
        Ok(Vec::new())
    }

    fn cmd_touch(&mut self, args: &[String]) -> CommandResult {
        if args.is_empty() {
            return Err(missing_operand());
        }
        for file in args {
            let abs = self.fs.resolve(file);
            if !self.fs.exists(&abs) {
                self.fs.create_file(&abs, "")?;
                self.pending_writes.push(abs);
            }
        }
        Ok(Vec::new())
    }

    fn cmd_rm(&mut self, args: &[String]) -> CommandResult {
        let (flags, operands) = parser::split_flags(args);
        check_flags(&flags, "rRf")?;
        let options = RemoveOptions {
            recursive: flags.contains(&'r') || flags.contains(&'R'),
            force: flags.contains(&'f'),
        };
        if operands.is_empty() {
            return if options.force {
                Ok(Vec::new())
            } else {
                Err(missing_operand())
            };
        }
        for target in &operands {
            let abs = self.fs.resolve(target);
            if self.fs.is_directory(&abs) && !options.recursive {
                return Err(ShellError::IsADirectory(abs));
            }
            self.fs.remove(&abs, options)?;
        }
        Ok(Vec::new())
    }

    /// Where `src` ends up when placed at `dst`
    fn placed_path(&self, src: &str, dst: &str) -> String {
        let dst_abs = self.fs.resolve(dst);
        if self.fs.is_directory(&dst_abs) {
            path::join(&dst_abs, path::file_name(&self.fs.resolve(src)))
        } else {
            dst_abs
        }
    }

    fn two_operands(operands: &[String]) -> Result<(&str, &str)> {
        match operands {
            [] => Err(ShellError::InvalidArgument("missing file operand".to_string())),
            [_] => Err(ShellError::InvalidArgument(
                "missing destination file operand".to_string(),
            )),
            [src, dst] => Ok((src.as_str(), dst.as_str())),
            [_, _, extra, ..] => Err(ShellError::InvalidArgument(format!(
                "extra operand '{}'",
                extra
            ))),
        }
    }

    fn cmd_cp(&mut self, args: &[String]) -> CommandResult {
        let (flags, operands) = parser::split_flags(args);
        check_flags(&flags, "rR")?;
        let (src, dst) = Self::two_operands(&operands)?;
        let placed = self.placed_path(src, dst);
        self.fs
            .copy(src, dst, flags.contains(&'r') || flags.contains(&'R'))?;
        if self.fs.is_file(&placed) {
            self.pending_writes.push(placed);
        }
        Ok(Vec::new())
    }

    fn cmd_mv(&mut self, args: &[String]) -> CommandResult {
        let (flags, operands) = parser::split_flags(args);
        check_flags(&flags, "")?;
        let (src, dst) = Self::two_operands(&operands)?;
        let placed = self.placed_path(src, dst);
        self.fs.move_node(src, dst)?;
        if self.fs.is_file(&placed) {
            self.pending_writes.push(placed);
        }
        Ok(Vec::new())
    }

    fn cmd_cat(&mut self, args: &[String]) -> CommandResult {
        if args.is_empty() {
            return Err(missing_operand());
        }
        let mut lines = Vec::new();
        for file in args {
            let content = self.fs.read_file(file)?;
            let content = content.strip_suffix('\n').unwrap_or(content);
            if !content.is_empty() {
                lines.push(OutputLine::plain(content));
            }
        }
        Ok(lines)
    }

    fn cmd_echo(&mut self, command: &CommandLine) -> CommandResult {
        let text = command.args.join(" ");
        let Some(redirect) = &command.redirect else {
            return Ok(vec![OutputLine::plain(text)]);
        };

        let abs = self.fs.resolve(&redirect.target);
        if !self.fs.exists(&abs) {
            self.fs.create_file(&abs, &text)?;
        } else if redirect.append {
            self.fs.append_file(&abs, &text)?;
        } else {
            self.fs.write_file(&abs, &text)?;
        }
        self.pending_writes.push(abs);
        Ok(Vec::new())
    }

    fn cmd_grep(&mut self, args: &[String]) -> CommandResult {
        let (flags, operands) = parser::split_flags(args);
        check_flags(&flags, "inrR")?;
        let ignore_case = flags.contains(&'i');
        let numbered = flags.contains(&'n');
        let recursive = flags.contains(&'r') || flags.contains(&'R');
        let [pattern, targets @ ..] = operands.as_slice() else {
            return Err(usage("grep [-i] [-n] [-r] PATTERN PATH..."));
        };
        if targets.is_empty() {
            return Err(usage("grep [-i] [-n] [-r] PATTERN PATH..."));
        }

        let prefix = if ignore_case { "(?i)" } else { "" };
        let regex = Regex::new(&format!("{}{}", prefix, pattern))
            .or_else(|_| Regex::new(&format!("{}{}", prefix, regex::escape(pattern))))
            .map_err(|err| ShellError::InvalidArgument(err.to_string()))?;

        let mut files = Vec::new();
        for target in targets {
            let abs = self.fs.resolve(target);
            if self.fs.is_directory(&abs) {
                if !recursive {
                    return Err(ShellError::IsADirectory(abs));
                }
                files.extend(self.fs.find_matching(&abs, |_, node| node.is_file())?);
            } else if self.fs.is_file(&abs) {
                files.push(abs);
            } else {
                return Err(ShellError::NotFound(abs));
            }
        }

        let show_names = files.len() > 1 || recursive;
        let mut lines = Vec::new();
        for file in &files {
            let content = self.fs.read_file(file)?;
            for (number, line) in content.lines().enumerate() {
                if !regex.is_match(line) {
                    continue;
                }
                let mut text = String::new();
                if show_names {
                    text.push_str(file);
                    text.push(':');
                }
                if numbered {
                    text.push_str(&format!("{}:", number + 1));
                }
                text.push_str(line);
                lines.push(OutputLine::plain(text));
            }
        }
        Ok(lines)
    }

    fn cmd_find(&mut self, args: &[String]) -> CommandResult {
        let mut start: Option<&str> = None;
        let mut name: Option<Regex> = None;
        let mut kind: Option<char> = None;
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-name" | "-iname" => {
                    let glob = iter.next().ok_or_else(|| {
                        ShellError::InvalidArgument(format!("missing argument to `{}'", arg))
                    })?;
                    let source = if arg == "-iname" {
                        format!("(?i){}", parser::glob_to_regex(glob))
                    } else {
                        parser::glob_to_regex(glob)
                    };
                    name = Some(
                        Regex::new(&source)
                            .map_err(|err| ShellError::InvalidArgument(err.to_string()))?,
                    );
                }
                "-type" => match iter.next().map(String::as_str) {
                    Some("f") => kind = Some('f'),
                    Some("d") => kind = Some('d'),
                    Some(other) => {
                        return Err(ShellError::InvalidArgument(format!(
                            "Unknown argument to -type: {}",
                            other
                        )))
                    }
                    None => {
                        return Err(ShellError::InvalidArgument(
                            "missing argument to `-type'".to_string(),
                        ))
                    }
                },
                other if other.starts_with('-') => {
                    return Err(ShellError::InvalidArgument(format!(
                        "unknown predicate `{}'",
                        other
                    )))
                }
                other if start.is_none() => start = Some(other),
                other => {
                    return Err(ShellError::InvalidArgument(format!(
                        "paths must precede expression: `{}'",
                        other
                    )))
                }
            }
        }

        let paths: Vec<String> = self
            .fs
            .find_matching(start.unwrap_or("."), move |found, node| {
                let kind_ok = match kind {
                    Some('f') => node.is_file(),
                    Some('d') => node.is_dir(),
                    _ => true,
                };
                kind_ok
                    && name
                        .as_ref()
                        .map_or(true, |re| re.is_match(path::file_name(found)))
            })?
            .collect();
        Ok(paths.into_iter().map(OutputLine::plain).collect())
    }

    fn cmd_chmod(&mut self, args: &[String]) -> CommandResult {
        let [mode, paths @ ..] = args else {
            return Err(usage("chmod MODE PATH..."));
        };
        if paths.is_empty() {
            return Err(usage("chmod MODE PATH..."));
        }
        for target in paths {
            self.fs.change_permissions(target, mode)?;
        }
        Ok(Vec::new())
    }

    fn cmd_chown(&mut self, args: &[String]) -> CommandResult {
        let [owner, paths @ ..] = args else {
            return Err(usage("chown OWNER PATH..."));
        };
        if paths.is_empty() {
            return Err(usage("chown OWNER PATH..."));
        }
        let owner = owner.split(':').next().unwrap_or_default();
        for target in paths {
            self.fs.change_owner(target, owner)?;
        }
        Ok(Vec::new())
    }

    fn cmd_sudo(&mut self, command: &CommandLine, sink: &mut dyn OutputSink) -> CommandResult {
        match command.args.first().map(String::as_str) {
            None => return Err(usage("sudo COMMAND")),
            Some("-k") => return Ok(Vec::new()),
            Some(_) => {}
        }

        let mut deferred = command
            .args
            .iter()
            .map(|arg| quote_word(arg))
            .collect::<Vec<_>>()
            .join(" ");
        if let Some(redirect) = &command.redirect {
            let operator = if redirect.append { ">>" } else { ">" };
            deferred.push_str(&format!(" {} {}", operator, quote_word(&redirect.target)));
        }

        if self.elevated {
            return Ok(self.execute(&deferred, sink));
        }
        self.mode = Mode::PasswordPrompt {
            attempts: 0,
            deferred,
        };
        Ok(Vec::new())
    }

    fn cmd_edit(&mut self, args: &[String]) -> CommandResult {
        let Some(target) = args.first() else {
            return Err(usage("nano FILE"));
        };
        let abs = self.fs.resolve(target);
        if self.fs.is_directory(&abs) {
            return Err(ShellError::IsADirectory(abs));
        }

        let content = if self.fs.is_file(&abs) {
            self.fs.read_file(&abs)?.to_string()
        } else {
            if let Some(parent) = path::parent_of(&abs) {
                self.fs.create_directory(&parent, true)?;
            }
            String::new()
        };

        let lines = vec![
            OutputLine::colored(
                format!("  GNU nano  {}", path::display(&abs, self.fs.home())),
                Color::Cyan,
            ),
            OutputLine::plain(
                "Type lines to append. 'save' writes, 'x' saves and exits, 'exit' closes, 'exit!' discards.",
            ),
        ];
        self.mode = Mode::Editor(EditorSession::open(&abs, &content));
        Ok(lines)
    }

    fn cmd_ftp(&mut self, args: &[String]) -> Vec<OutputLine> {
        let mut session = RemoteSession::new(&self.config.username);
        let Some(host) = args.first() else {
            self.mode = Mode::RemoteSession(session);
            return Vec::new();
        };
        let reply = session.open(Some(host));
        self.mode = match reply.next {
            RemoteNext::AwaitPassword => Mode::RemoteSessionPassword(session),
            _ => Mode::RemoteSession(session),
        };
        reply.lines
    }

    fn cmd_history(&mut self, args: &[String]) -> CommandResult {
        match args.first().map(String::as_str) {
            Some("-c") => {
                self.history.clear();
                Ok(Vec::new())
            }
            Some(other) => Err(ShellError::InvalidArgument(format!(
                "{}: invalid option",
                other
            ))),
            None => Ok(self
                .history
                .iter()
                .rev()
                .enumerate()
                .map(|(index, line)| OutputLine::plain(format!("{:>5}  {}", index + 1, line)))
                .collect()),
        }
    }

    fn env_lines(&self) -> Vec<OutputLine> {
        self.env
            .iter()
            .map(|(name, value)| OutputLine::plain(format!("{}={}", name, value)))
            .collect()
    }

    fn cmd_printenv(&self, args: &[String]) -> Vec<OutputLine> {
        if args.is_empty() {
            return self.env_lines();
        }
        args.iter()
            .filter_map(|name| self.env.get(name))
            .map(|value| OutputLine::plain(value.as_str()))
            .collect()
    }

    fn cmd_export(&mut self, args: &[String]) -> CommandResult {
        if args.is_empty() {
            return Ok(self
                .env
                .iter()
                .map(|(name, value)| OutputLine::plain(format!("declare -x {}=\"{}\"", name, value)))
                .collect());
        }
        for arg in args {
            let (name, value) = match arg.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (arg.as_str(), None),
            };
            if !is_identifier(name) {
                return Err(ShellError::InvalidArgument(format!(
                    "`{}': not a valid identifier",
                    arg
                )));
            }
            if let Some(value) = value {
                self.env.insert(name.to_string(), value.to_string());
            }
        }
        Ok(Vec::new())
    }

    fn cmd_alias(&mut self, args: &[String]) -> CommandResult {
        if args.is_empty() {
            return Ok(self
                .aliases
                .iter()
                .map(|(name, value)| OutputLine::plain(format!("alias {}='{}'", name, value)))
                .collect());
        }
        let mut lines = Vec::new();
        for arg in args {
            match arg.split_once('=') {
                Some((name, _)) if name.is_empty() || name.contains(char::is_whitespace) => {
                    return Err(ShellError::InvalidArgument(format!(
                        "`{}': invalid alias name",
                        name
                    )))
                }
                Some((name, value)) => {
                    self.aliases.insert(name.to_string(), value.to_string());
                }
                None => match self.aliases.get(arg) {
                    Some(value) => lines.push(OutputLine::plain(format!("alias {}='{}'", arg, value))),
                    None => {
                        return Err(ShellError::InvalidArgument(format!("{}: not found", arg)))
                    }
                },
            }
        }
        Ok(lines)
    }

    fn cmd_unalias(&mut self, args: &[String]) -> CommandResult {
        if args.is_empty() {
            return Err(usage("unalias [-a] NAME..."));
        }
        if args.iter().any(|arg| arg == "-a") {
            self.aliases.clear();
            return Ok(Vec::new());
        }
        for name in args {
            if self.aliases.remove(name).is_none() {
                return Err(ShellError::InvalidArgument(format!("{}: not found", name)));
            }
        }
        Ok(Vec::new())
    }

    fn cmd_uname(&self, args: &[String]) -> CommandResult {
        let (flags, _) = parser::split_flags(args);
        check_flags(&flags, "arns")?;
        let text = if flags.contains(&'a') {
            format!(
                "Linux {} {} #1 SMP x86_64 GNU/Linux",
                self.config.hostname, KERNEL_RELEASE
            )
        } else {
            let mut parts = Vec::new();
            if flags.is_empty() || flags.contains(&'s') {
                parts.push("Linux".to_string());
            }
            if flags.contains(&'n') {
                parts.push(self.config.hostname.clone());
            }
            if flags.contains(&'r') {
                parts.push(KERNEL_RELEASE.to_string());
            }
            parts.join(" ")
        };
        Ok(vec![OutputLine::plain(text)])
    }

    fn cmd_uptime(&self) -> Vec<OutputLine> {
        let now = Utc::now();
        let minutes = (now - self.started_at).num_minutes();
        vec![OutputLine::plain(format!(
            " {} up {} min,  1 user,  load average: 0.00, 0.01, 0.05",
            now.format("%H:%M:%S"),
            minutes
        ))]
    }

    fn cmd_ps(&self) -> Vec<OutputLine> {
        let user = self.current_user();
        [
            "    PID USER     TTY          TIME CMD".to_string(),
            "      1 root     ?        00:00:01 init".to_string(),
            "    412 root     ?        00:00:00 sshd".to_string(),
            "    420 root     ?        00:00:00 cron".to_string(),
            format!("    733 {:<8} pts/0    00:00:00 qsh", user),
            format!("    801 {:<8} pts/0    00:00:00 ps", user),
        ]
        .into_iter()
        .map(OutputLine::plain)
        .collect()
    }

    fn cmd_df(&self) -> Vec<OutputLine> {
        const TOTAL_BLOCKS: usize = 1_048_576;
        let (bytes, nodes) = self.fs.usage();
        let used = bytes.div_ceil(1024) + nodes * 4;
        let percent = (used * 100).div_ceil(TOTAL_BLOCKS);
        vec![
            OutputLine::plain("Filesystem     1K-blocks    Used Available Use% Mounted on"),
            OutputLine::plain(format!(
                "vfs            {:>9} {:>7} {:>9} {:>3}% /",
                TOTAL_BLOCKS,
                used,
                TOTAL_BLOCKS.saturating_sub(used),
                percent
            )),
        ]
    }

    fn cmd_help(&self, args: &[String]) -> CommandResult {
        if let Some(name) = args.first() {
            return match COMMANDS.iter().find(|(command, _, _)| command == name) {
                Some((_, synopsis, summary)) => Ok(vec![
                    OutputLine::plain(format!("{}: {}", name, synopsis)),
                    OutputLine::plain(format!("    {}", summary)),
                ]),
                None => Err(ShellError::InvalidArgument(format!(
                    "no help topics match `{}'",
                    name
                ))),
            };
        }

        let mut lines = vec![
            OutputLine::colored("╔════════════════════════════════════════════════════════════╗", Color::Cyan),
            OutputLine::colored("║                    AVAILABLE COMMANDS                      ║", Color::Cyan),
            OutputLine::colored("╚════════════════════════════════════════════════════════════╝", Color::Cyan),
        ];
        for (_, synopsis, summary) in COMMANDS {
            lines.push(OutputLine::plain(format!("  {:<40} {}", synopsis, summary)));
        }
        lines.push(OutputLine::plain(""));
        lines.push(OutputLine::colored(
            "Tip: start with 'mission list'. Aliases: ll, la.",
            Color::Gray,
        ));
        Ok(lines)
    }

    fn cmd_man(&self, args: &[String]) -> CommandResult {
        let Some(name) = args.first() else {
            return Err(ShellError::InvalidArgument(
                "What manual page do you want?".to_string(),
            ));
        };
        let Some((command, synopsis, summary)) =
            COMMANDS.iter().find(|(command, _, _)| command == name)
        else {
            return Err(ShellError::InvalidArgument(format!(
                "No manual entry for {}",
                name
            )));
        };
        Ok(vec![
            OutputLine::colored(
                format!("{}(1)              User Commands              {}(1)", command.to_uppercase(), command.to_uppercase()),
                Color::Yellow,
            ),
            OutputLine::plain(""),
            OutputLine::plain("NAME"),
            OutputLine::plain(format!("       {} - {}", command, summary.to_lowercase())),
            OutputLine::plain(""),
            OutputLine::plain("SYNOPSIS"),
            OutputLine::plain(format!("       {}", synopsis)),
        ])
    }

    /// Anything not in the table: a known executable "runs", otherwise not found
    fn cmd_external(&self, name: &str) -> CommandResult {
        let candidates: Vec<String> = if name.contains('/') {
            vec![self.fs.resolve(name)]
        } else {
            self.env
                .get("PATH")
                .map(|dirs| {
                    dirs.split(':')
                        .filter(|dir| !dir.is_empty())
                        .map(|dir| path::join(dir, name))
                        .collect()
                })
                .unwrap_or_default()
        };

        if candidates
            .iter()
            .any(|candidate| self.fs.is_file(candidate) && self.fs.is_executable(candidate))
        {
            return Ok(vec![OutputLine::colored(
                format!("{}: executed successfully", name),
                Color::Green,
            )]);
        }
        Err(ShellError::InvalidArgument("command not found".to_string()))
    }

    fn cmd_mission(&mut self, args: &[String]) -> CommandResult {
        let subcommand = args.first().map(String::as_str);
        let id = args.get(1).map(String::as_str);
        match (subcommand, id) {
            (Some("list"), _) => Ok(self.mission_list()),
            (Some("status"), _) => Ok(self.mission_status()),
            (Some("start"), Some(id)) => self.mission_start(id),
            (Some("info"), Some(id)) => self.mission_info(id),
            (Some("start"), None) => Err(usage("mission start ID")),
            (Some("info"), None) => Err(usage("mission info ID")),
            (Some(other), _) => Err(ShellError::InvalidArgument(format!(
                "unknown subcommand '{}'",
                other
            ))),
            (None, _) => Err(usage("mission list | start ID | info ID | status")),
        }
    }

    fn mission_list(&self) -> Vec<OutputLine> {
        let mut lines = vec![OutputLine::colored("[MISSIONS]", Color::Cyan)];
        for mission in self.missions.missions() {
            let (done, total) = mission.progress();
            lines.push(OutputLine::colored(
                format!(
                    "  {:<14} {:<14} {} ({}, {}/{})",
                    format!("[{}]", mission.state),
                    mission.id,
                    mission.title,
                    mission.difficulty,
                    done,
                    total
                ),
                state_color(mission.state),
            ));
        }
        lines
    }

    fn mission_start(&mut self, id: &str) -> CommandResult {
        let Some(mission) = self.missions.mission(id) else {
            return Err(ShellError::InvalidArgument(format!("{}: no such mission", id)));
        };
        let state = mission.state;
        if state == MissionState::Available {
            if let Some(running) = self.missions.in_progress() {
                return Err(ShellError::InvalidArgument(format!(
                    "{}: finish '{}' before starting another mission",
                    id, running.id
                )));
            }
        }
        if !self.missions.start_mission(id) {
            return Err(ShellError::InvalidArgument(format!(
                "{}: cannot start a mission that is {}",
                id,
                state.to_string().to_lowercase()
            )));
        }

        let mut lines = Vec::new();
        if let Some(mission) = self.missions.mission(id) {
            lines.push(OutputLine::plain(mission.description.as_str()));
            for objective in &mission.objectives {
                lines.push(OutputLine::plain(format!("  [ ] {}", objective.description)));
            }
        }
        Ok(lines)
    }

    fn mission_info(&self, id: &str) -> CommandResult {
        let Some(mission) = self.missions.mission(id) else {
            return Err(ShellError::InvalidArgument(format!("{}: no such mission", id)));
        };
        let mut lines = vec![
            OutputLine::colored(format!("{} [{}]", mission.title, mission.id), Color::Cyan),
            OutputLine::plain(mission.description.as_str()),
            OutputLine::plain(format!(
                "Category: {}  Difficulty: {}  State: {}",
                mission.category, mission.difficulty, mission.state
            )),
        ];
        if !mission.prerequisites.is_empty() {
            let prerequisites: Vec<&str> = mission.prerequisites.iter().map(String::as_str).collect();
            lines.push(OutputLine::plain(format!("Requires: {}", prerequisites.join(", "))));
        }
        lines.push(OutputLine::plain("Objectives:"));
        for objective in &mission.objectives {
            let mark = if objective.completed { "x" } else { " " };
            lines.push(OutputLine::plain(format!("  [{}] {}", mark, objective.description)));
        }
        let reward = &mission.reward;
        let mut reward_text = format!("Reward: {} XP", reward.xp);
        if !reward.items.is_empty() {
            reward_text.push_str(&format!(", items: {}", reward.items.join(", ")));
        }
        lines.push(OutputLine::colored(reward_text, Color::Yellow));
        Ok(lines)
    }

    fn mission_status(&self) -> Vec<OutputLine> {
        let Some(mission) = self.missions.active_mission() else {
            return vec![OutputLine::plain(
                "No active mission. Use 'mission list' to see what is available.",
            )];
        };
        let (done, total) = mission.progress();
        let mut lines = vec![OutputLine::colored(
            format!("{} ({}/{})", mission.title, done, total),
            Color::Yellow,
        )];
        for objective in &mission.objectives {
            let mark = if objective.completed { "x" } else { " " };
            lines.push(OutputLine::plain(format!("  [{}] {}", mark, objective.description)));
        }
        lines
    }

    fn cmd_profile(&self) -> Vec<OutputLine> {
        let progress = self.missions.progress();
        let next = match progress.xp_to_next_level {
            Some(gap) => format!("{} XP to next level", gap),
            None => "max level".to_string(),
        };
        let skills = if progress.skills.is_empty() {
            "none".to_string()
        } else {
            progress
                .skills
                .iter()
                .map(|(skill, points)| format!("{} {}", skill, points))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let inventory = if progress.inventory.is_empty() {
            "empty".to_string()
        } else {
            progress.inventory.join(", ")
        };

        vec![
            OutputLine::colored("┌──────────────────────────────────────────────┐", Color::Cyan),
            OutputLine::colored(format!("│ {:<44} │", "PLAYER PROFILE"), Color::Cyan),
            OutputLine::colored("├──────────────────────────────────────────────┤", Color::Cyan),
            OutputLine::plain(format!("│ {:<44} │", format!("User: {}", self.config.username))),
            OutputLine::plain(format!("│ {:<44} │", format!("Level: {} ({})", progress.level, next))),
            OutputLine::plain(format!("│ {:<44} │", format!("XP: {}", progress.xp))),
            OutputLine::plain(format!("│ {:<44} │", format!("Rank: {} (ELO {})", progress.rank, progress.elo))),
            OutputLine::plain(format!(
                "│ {:<44} │",
                format!("Missions completed: {}", progress.completed_missions.len())
            )),
            OutputLine::plain(format!("│ {:<44} │", format!("Skills: {}", skills))),
            OutputLine::plain(format!("│ {:<44} │", format!("Inventory: {}", inventory))),
            OutputLine::colored("└──────────────────────────────────────────────┘", Color::Cyan),
        ]
    }
}
