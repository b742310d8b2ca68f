//! Filesystem nodes and permission strings

use crate::{Result, ShellError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default permissions for new directories
pub const DIR_PERMISSIONS: &str = "rwxr-xr-x";

/// Default permissions for new files
pub const FILE_PERMISSIONS: &str = "rw-r--r--";

/// Size reported for every directory in long listings
pub const DIR_SIZE: usize = 4096;

/// Extensions treated as executable regardless of permission bits
const EXECUTABLE_EXTENSIONS: [&str; 4] = [".sh", ".bin", ".exe", ".py"];

/// What a node holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    File { content: String },
    /// Children keyed by name; the parent owns them exclusively.
    Directory { children: BTreeMap<String, FsNode> },
}

/// A file or directory in the virtual tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsNode {
    pub name: String,
    /// Symbolic, e.g. "rwxr-xr-x"
    pub permissions: String,
    pub owner: String,
    pub kind: NodeKind,
}

impl FsNode {
    pub fn file(name: &str, content: &str, owner: &str) -> Self {
        Self {
            name: name.to_string(),
            permissions: FILE_PERMISSIONS.to_string(),
            owner: owner.to_string(),
            kind: NodeKind::File {
                content: content.to_string(),
            },
        }
    }

    pub fn directory(name: &str, owner: &str) -> Self {
        Self {
            name: name.to_string(),
            permissions: DIR_PERMISSIONS.to_string(),
            owner: owner.to_string(),
            kind: NodeKind::Directory {
                children: BTreeMap::new(),
            },
        }
    }

    pub fn with_permissions(mut self, permissions: &str) -> Self {
        self.permissions = permissions.to_string();
        self
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File { .. })
    }

    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }

    /// Owner-execute bit or a script-like extension.
    pub fn is_executable(&self) -> bool {
        if !self.is_file() {
            return false;
        }
        self.permissions.chars().nth(2) == Some('x')
            || EXECUTABLE_EXTENSIONS.iter().any(|ext| self.name.ends_with(ext))
    }

    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::File { content } => Some(content),
            NodeKind::Directory { .. } => None,
        }
    }

    pub fn children(&self) -> Option<&BTreeMap<String, FsNode>> {
        match &self.kind {
            NodeKind::Directory { children } => Some(children),
            NodeKind::File { .. } => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut BTreeMap<String, FsNode>> {
        match &mut self.kind {
            NodeKind::Directory { children } => Some(children),
            NodeKind::File { .. } => None,
        }
    }

    /// Children in listing order: directories first, then files, each by name.
    pub fn sorted_children(&self) -> Vec<&FsNode> {
        let mut entries: Vec<&FsNode> = match self.children() {
            Some(children) => children.values().collect(),
            None => return Vec::new(),
        };
        entries.sort_by(|a, b| b.is_dir().cmp(&a.is_dir()).then_with(|| a.name.cmp(&b.name)));
        entries
    }

    /// Size proxy: content length for files, a constant for directories
    pub fn size(&self) -> usize {
        match &self.kind {
            NodeKind::File { content } => content.len(),
            NodeKind::Directory { .. } => DIR_SIZE,
        }
    }

    /// Total bytes of file content beneath this node
    pub fn content_bytes(&self) -> usize {
        match &self.kind {
            NodeKind::File { content } => content.len(),
            NodeKind::Directory { children } => children.values().map(FsNode::content_bytes).sum(),
        }
    }

    /// Number of nodes in this subtree, including itself
    pub fn node_count(&self) -> usize {
        1 + self
            .children()
            .map(|children| children.values().map(FsNode::node_count).sum())
            .unwrap_or(0)
    }

    /// `ls -l` style mode, e.g. "drwxr-xr-x"
    pub fn mode_string(&self) -> String {
        let type_char = if self.is_dir() { 'd' } else { '-' };
        format!("{}{}", type_char, self.permissions)
    }

    /// Rename this node and fix the name recorded for it.
    pub(crate) fn renamed(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Set the owner of this node and everything beneath it.
    pub(crate) fn set_owner_recursive(&mut self, owner: &str) {
        self.owner = owner.to_string();
        if let Some(children) = self.children_mut() {
            for child in children.values_mut() {
                child.set_owner_recursive(owner);
            }
        }
    }
}

/// Apply a chmod-style `mode` to the `current` permission string.
///
/// Accepts three octal digits (`755`), a full symbolic string (`rwxr-x---`)
/// or `[ugoa]*[+-][rwx]+` (`+x`, `u-w`, `go+r`).
pub fn apply_mode(current: &str, mode: &str) -> Result<String> {
    let invalid = || ShellError::InvalidArgument(format!("invalid mode: '{}'", mode));

    if mode.len() == 3 && mode.chars().all(|c| ('0'..='7').contains(&c)) {
        let mut out = String::with_capacity(9);
        for digit in mode.chars() {
            let bits = digit.to_digit(8).ok_or_else(invalid)?;
            out.push(if bits & 4 != 0 { 'r' } else { '-' });
            out.push(if bits & 2 != 0 { 'w' } else { '-' });
            out.push(if bits & 1 != 0 { 'x' } else { '-' });
        }
        return Ok(out);
    }

    if is_symbolic(mode) {
        return Ok(mode.to_string());
    }

    let op_index = mode.find(['+', '-']).ok_or_else(invalid)?;
    let (who, rest) = mode.split_at(op_index);
    let add = rest.starts_with('+');
    let perms = &rest[1..];
    if perms.is_empty() || !perms.chars().all(|c| matches!(c, 'r' | 'w' | 'x')) {
        return Err(invalid());
    }
    if !who.chars().all(|c| matches!(c, 'u' | 'g' | 'o' | 'a')) {
        return Err(invalid());
    }

    let classes: Vec<usize> = if who.is_empty() || who.contains('a') {
        vec![0, 1, 2]
    } else {
        let mut classes = Vec::new();
        if who.contains('u') {
            classes.push(0);
        }
        if who.contains('g') {
            classes.push(1);
        }
        if who.contains('o') {
            classes.push(2);
        }
        classes
    };

    let base = if is_symbolic(current) { current } else { FILE_PERMISSIONS };
    let mut chars: Vec<char> = base.chars().collect();
    for class in classes {
        for perm in perms.chars() {
            let offset = match perm {
                'r' => 0,
                'w' => 1,
                _ => 2,
            };
            chars[class * 3 + offset] = if add { perm } else { '-' };
        }
    }
    Ok(chars.into_iter().collect())
}

fn is_symbolic(mode: &str) -> bool {
    mode.len() == 9
        && mode.chars().enumerate().all(|(i, c)| {
            c == '-'
                || match i % 3 {
                    0 => c == 'r',
                    1 => c == 'w',
                    _ => c == 'x',
                }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_mode_octal() {
        assert_eq!(apply_mode("rw-r--r--", "755").unwrap(), "rwxr-xr-x");
        assert_eq!(apply_mode("rw-r--r--", "600").unwrap(), "rw-------");
        assert_eq!(apply_mode("rw-r--r--", "000").unwrap(), "---------");
    }

    #[test]
    fn test_apply_mode_symbolic() {
        assert_eq!(apply_mode("rw-r--r--", "rwx------").unwrap(), "rwx------");
        assert_eq!(apply_mode("rw-r--r--", "+x").unwrap(), "rwxr-xr-x");
        assert_eq!(apply_mode("rwxr-xr-x", "go-rx").unwrap(), "rwx------");
        assert_eq!(apply_mode("rw-r--r--", "u+x").unwrap(), "rwxr--r--");
    }

    #[test]
    fn test_apply_mode_rejects_garbage() {
        assert!(apply_mode("rw-r--r--", "999").is_err());
        assert!(apply_mode("rw-r--r--", "z+x").is_err());
        assert!(apply_mode("rw-r--r--", "+q").is_err());
        assert!(apply_mode("rw-r--r--", "hello").is_err());
    }

    #[test]
    fn test_executable_detection() {
        let script = FsNode::file("run.sh", "", "user");
        assert!(script.is_executable());
        let plain = FsNode::file("notes.txt", "", "user");
        assert!(!plain.is_executable());
        let marked = plain.with_permissions("rwxr--r--");
        assert!(marked.is_executable());
        assert!(!FsNode::directory("bin", "root").is_executable());
    }

    #[test]
    fn test_sorted_children_directories_first() {
        let mut dir = FsNode::directory("d", "user");
        if let Some(children) = dir.children_mut() {
            children.insert("b.txt".into(), FsNode::file("b.txt", "", "user"));
            children.insert("a.txt".into(), FsNode::file("a.txt", "", "user"));
            children.insert("zdir".into(), FsNode::directory("zdir", "user"));
        }
        let names: Vec<&str> = dir.sorted_children().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["zdir", "a.txt", "b.txt"]);
    }

    #[test]
    fn test_mode_string_and_size() {
        let file = FsNode::file("f", "hello", "user");
        assert_eq!(file.mode_string(), "-rw-r--r--");
        assert_eq!(file.size(), 5);
        assert_eq!(FsNode::directory("d", "user").mode_string(), "drwxr-xr-x");
    }
}
