//! Terminal Quest: a simulated shell for learning the command line
//!
//! The player types commands into a fake shell, a virtual filesystem is
//! queried or mutated, and a mission engine hands out experience, levels,
//! rank and rewards as objectives are met.
//!
//! # Architecture
//!
//! - `fs` - In-memory hierarchical filesystem and path resolution
//! - `shell` - Command interpreter and its modal sub-machines
//! - `game` - Mission registry, objective tracking and reward application
//! - `data` - Plain data types shared by the engine (missions, progress, events)
//! - `config` - Session configuration loaded from TOML
//! - `tui` - Terminal frontend with ratatui

pub mod config;
pub mod data;
pub mod fs;
pub mod game;
pub mod shell;
pub mod tui;

pub use config::ShellConfig;
pub use data::*;
pub use fs::VirtualFilesystem;
pub use game::MissionStore;
pub use shell::{Mode, SessionInterpreter};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type for filesystem and command operations
pub type Result<T> = std::result::Result<T, ShellError>;

/// Errors surfaced by the filesystem and the command layer.
///
/// Every variant is recovered at the dispatch boundary and rendered as a
/// single `"<cmd>: <message>"` line.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShellError {
    #[error("{0}: No such file or directory")]
    NotFound(String),

    #[error("{0}: File exists")]
    AlreadyExists(String),

    #[error("{0}: Not a directory")]
    NotADirectory(String),

    #[error("{0}: Is a directory")]
    IsADirectory(String),

    #[error("{0}: Directory not empty")]
    NotEmpty(String),

    #[error("{0}: No such file or directory (parent missing)")]
    NoSuchParent(String),

    /// Permission bits are stored but not enforced yet.
    #[error("{0}: Permission denied")]
    PermissionDenied(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}: not supported")]
    Unsupported(String),
}
