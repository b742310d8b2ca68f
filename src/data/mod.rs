//! Data structures for the game world
//!
//! Defines missions, player progress, progression events and the
//! presentation hints attached to output.

pub mod mission;
pub mod player;
pub mod timeline;

pub use mission::*;
pub use player::*;
pub use timeline::*;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Presentation hint attached to an output line.
///
/// Carries no meaning for the engine; the frontend maps it to a real color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Default,
    Green,
    Cyan,
    Yellow,
    Red,
    Magenta,
    Gray,
}

impl Color {
    pub fn name(&self) -> &'static str {
        match self {
            Color::Default => "default",
            Color::Green => "green",
            Color::Cyan => "cyan",
            Color::Yellow => "yellow",
            Color::Red => "red",
            Color::Magenta => "magenta",
            Color::Gray => "gray",
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A unique identifier wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Id(pub Uuid);

impl Id {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}
