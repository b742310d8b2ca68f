//! Simulated FTP client session
//!
//! The remote host is a fixed table of directories and files, so every reply
//! is deterministic. `get` is the only command that touches the local
//! filesystem.

use super::output::OutputLine;
use crate::data::Color;
use crate::fs::{path, VirtualFilesystem};
use log::debug;
use std::collections::BTreeMap;

const REMOTE_DIRS: &[&str] = &["/", "/pub", "/incoming"];

const REMOTE_FILES: &[(&str, &str)] = &[
    (
        "/welcome.msg",
        "Welcome to the drop server.\nPublic files live in /pub. Uploads go to /incoming.\n",
    ),
    (
        "/pub/readme.txt",
        "Anonymous drop point. Collect what you came for and disconnect.\n",
    ),
    (
        "/pub/intel.txt",
        "operation nightfall\nsource: 203.0.113.42\nstatus: active\n",
    ),
    ("/pub/tools.tar.gz", "[binary data]\n"),
];

const HELP: &str = "Commands may be abbreviated.  Commands are:\n\
    open     ls       dir      cd       pwd\n\
    get      put      close    help     ?\n\
    quit     bye      exit";

/// What the interpreter should do after a remote command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteNext {
    Stay,
    AwaitPassword,
    Quit,
}

/// Replies to one remote command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteReply {
    pub lines: Vec<OutputLine>,
    pub next: RemoteNext,
    /// Local path written by a download
    pub written: Option<String>,
}

impl RemoteReply {
    fn stay(lines: Vec<OutputLine>) -> Self {
        Self {
            lines,
            next: RemoteNext::Stay,
            written: None,
        }
    }
}

/// State of the ftp client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSession {
    user: String,
    host: Option<String>,
    authenticated: bool,
    cwd: String,
    /// Files uploaded with `put` this session, by remote path
    uploads: BTreeMap<String, String>,
}

impl RemoteSession {
    pub fn new(user: &str) -> Self {
        Self {
            user: user.to_string(),
            host: None,
            authenticated: false,
            cwd: "/".to_string(),
            uploads: BTreeMap::new(),
        }
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    /// Accept any credential for the open connection
    pub fn authenticate(&mut self) -> Vec<OutputLine> {
        self.authenticated = true;
        vec![
            OutputLine::colored("230 Login successful.", Color::Green),
            OutputLine::plain("Remote system type is UNIX."),
            OutputLine::plain("Using binary mode to transfer files."),
        ]
    }

    pub fn handle(&mut self, line: &str, fs: &mut VirtualFilesystem) -> RemoteReply {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(&command) = parts.first() else {
            return RemoteReply::stay(Vec::new());
        };
        let arg = parts.get(1).copied();
        debug!("ftp command {}", command);

        match command {
            "open" => self.open(arg),
            "quit" | "bye" | "exit" => RemoteReply {
                lines: if self.host.is_some() {
                    vec![OutputLine::plain("221 Goodbye.")]
                } else {
                    Vec::new()
                },
                next: RemoteNext::Quit,
                written: None,
            },
            "close" => {
                if self.host.take().is_none() {
                    return RemoteReply::stay(vec![OutputLine::error("Not connected.")]);
                }
                self.authenticated = false;
                self.cwd = "/".to_string();
                RemoteReply::stay(vec![OutputLine::plain("221 Goodbye.")])
            }
            "help" | "?" => RemoteReply::stay(vec![OutputLine::plain(HELP)]),
            "ls" | "dir" | "cd" | "pwd" | "get" | "put" => match self.require_login() {
                Some(error) => RemoteReply::stay(vec![error]),
                None => match command {
                    "ls" | "dir" => RemoteReply::stay(self.list()),
                    "cd" => RemoteReply::stay(vec![self.change_dir(arg)]),
                    "pwd" => RemoteReply::stay(vec![OutputLine::plain(format!(
                        "257 \"{}\" is the current directory",
                        self.cwd
                    ))]),
                    "get" => self.get(arg, fs),
                    _ => RemoteReply::stay(self.put(arg, fs)),
                },
            },
            _ => RemoteReply::stay(vec![OutputLine::error("?Invalid command")]),
        }
    }

    fn require_login(&self) -> Option<OutputLine> {
        if self.host.is_none() {
            Some(OutputLine::error("Not connected."))
        } else if !self.authenticated {
            Some(OutputLine::error("530 Please login with USER and PASS."))
        } else {
            None
        }
    }

    pub fn open(&mut self, host: Option<&str>) -> RemoteReply {
        if let Some(current) = &self.host {
            return RemoteReply::stay(vec![OutputLine::error(format!(
                "Already connected to {}, use close first.",
                current
            ))]);
        }
        let Some(host) = host else {
            return RemoteReply::stay(vec![OutputLine::error("usage: open host-name")]);
        };
        self.host = Some(host.to_string());
        self.authenticated = false;
        self.cwd = "/".to_string();
        RemoteReply {
            lines: vec![
                OutputLine::plain(format!("Connected to {}.", host)),
                OutputLine::plain("220 (vsFTPd 3.0.3)"),
                OutputLine::plain(format!("Name ({}:{}): {}", host, self.user, self.user)),
                OutputLine::plain("331 Please specify the password."),
            ],
            next: RemoteNext::AwaitPassword,
            written: None,
        }
    }

    fn remote_file(&self, remote_path: &str) -> Option<String> {
        REMOTE_FILES
            .iter()
            .find(|(path, _)| *path == remote_path)
            .map(|(_, content)| content.to_string())
            .or_else(|| self.uploads.get(remote_path).cloned())
    }

    fn list(&self) -> Vec<OutputLine> {
        let mut rows: Vec<String> = Vec::new();
        for dir in REMOTE_DIRS {
            if *dir != "/" && path::parent_of(dir).as_deref() == Some(self.cwd.as_str()) {
                rows.push(format!(
                    "drwxr-xr-x    2 ftp      ftp          4096 Jan 06 09:00 {}",
                    path::file_name(dir)
                ));
            }
        }
        let uploads = self.uploads.iter().map(|(p, c)| (p.as_str(), c.as_str()));
        for (file, content) in REMOTE_FILES.iter().copied().chain(uploads) {
            if path::parent_of(file).as_deref() == Some(self.cwd.as_str()) {
                rows.push(format!(
                    "-rw-r--r--    1 ftp      ftp    {:>10} Jan 06 09:00 {}",
                    content.len(),
                    path::file_name(file)
                ));
            }
        }

        let mut lines = vec![
            OutputLine::plain("200 PORT command successful. Consider using PASV."),
            OutputLine::plain("150 Here comes the directory listing."),
        ];
        lines.extend(rows.into_iter().map(OutputLine::plain));
        lines.push(OutputLine::plain("226 Directory send OK."));
        lines
    }

    fn change_dir(&mut self, arg: Option<&str>) -> OutputLine {
        let target = path::resolve(arg.unwrap_or("/"), &self.cwd, "/");
        if REMOTE_DIRS.contains(&target.as_str()) {
            self.cwd = target;
            OutputLine::plain("250 Directory successfully changed.")
        } else {
            OutputLine::error("550 Failed to change directory.")
        }
    }

    fn get(&mut self, arg: Option<&str>, fs: &mut VirtualFilesystem) -> RemoteReply {
        let Some(name) = arg else {
            return RemoteReply::stay(vec![OutputLine::error("usage: get remote-file")]);
        };
        let remote_path = path::resolve(name, &self.cwd, "/");
        let Some(content) = self.remote_file(&remote_path) else {
            return RemoteReply::stay(vec![OutputLine::error(
                "550 Failed to open file.",
            )]);
        };

        let local = fs.resolve(path::file_name(&remote_path));
        let result = if fs.is_file(&local) {
            fs.write_file(&local, &content)
        } else {
            fs.create_file(&local, &content)
        };
        if let Err(err) = result {
            return RemoteReply::stay(vec![OutputLine::error(format!("local: {}", err))]);
        }

        RemoteReply {
            lines: vec![
                OutputLine::plain(format!(
                    "local: {} remote: {}",
                    path::file_name(&local),
                    path::file_name(&remote_path)
                )),
                OutputLine::plain("200 PORT command successful. Consider using PASV."),
                OutputLine::plain(format!(
                    "150 Opening BINARY mode data connection for {} ({} bytes).",
                    path::file_name(&remote_path),
                    content.len()
                )),
                OutputLine::colored("226 Transfer complete.", Color::Green),
            ],
            next: RemoteNext::Stay,
            written: Some(local),
        }
    }

    fn put(&mut self, arg: Option<&str>, fs: &VirtualFilesystem) -> Vec<OutputLine> {
        let Some(name) = arg else {
            return vec![OutputLine::error("usage: put local-file")];
        };
        let content = match fs.read_file(name) {
            Ok(content) => content.to_string(),
            Err(err) => return vec![OutputLine::error(format!("local: {}", err))],
        };
        let remote_path = path::join(&self.cwd, path::file_name(&fs.resolve(name)));
        let size = content.len();
        self.uploads.insert(remote_path, content);
        vec![
            OutputLine::plain(format!("local: {} remote: {}", name, path::file_name(name))),
            OutputLine::plain("200 PORT command successful. Consider using PASV."),
            OutputLine::plain("150 Ok to send data."),
            OutputLine::colored(format!("226 Transfer complete. {} bytes sent.", size), Color::Green),
        ]
    }
}
