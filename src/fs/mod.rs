//! Virtual filesystem
//!
//! An in-memory tree of files and directories. All paths are accepted in
//! absolute, `~`-relative or cwd-relative form and resolved through
//! [`path::resolve`] before touching the tree.

pub mod node;
pub mod path;
pub mod seed;

pub use node::{FsNode, NodeKind};

use crate::{Result, ShellError};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Owner of the root and system directories
pub const ROOT_USER: &str = "root";

/// Flags for [`VirtualFilesystem::list`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub show_hidden: bool,
    pub long_format: bool,
}

/// Flags for [`VirtualFilesystem::remove`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    pub recursive: bool,
    /// A missing target counts as already removed
    pub force: bool,
}

/// One row of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
    pub permissions: String,
    pub owner: String,
    pub size: usize,
}

impl DirEntry {
    fn from_node(node: &FsNode) -> Self {
        Self {
            name: node.name.clone(),
            is_dir: node.is_dir(),
            permissions: node.permissions.clone(),
            owner: node.owner.clone(),
            size: node.size(),
        }
    }

    /// Render as a listing line; name only unless `long_format`
    pub fn render(&self, long_format: bool) -> String {
        if long_format {
            let type_char = if self.is_dir { 'd' } else { '-' };
            format!(
                "{}{} {:<8} {:>6} {}",
                type_char, self.permissions, self.owner, self.size, self.name
            )
        } else if self.is_dir {
            format!("{}/", self.name)
        } else {
            self.name.clone()
        }
    }
}

/// A path yielded by [`VirtualFilesystem::find`] together with its node
#[derive(Debug, Clone)]
pub struct FindEntry<'a> {
    pub path: String,
    pub node: &'a FsNode,
}

/// Lazy pre-order traversal. Each call to `find` starts a fresh one.
pub struct Find<'a> {
    stack: Vec<(String, &'a FsNode)>,
}

impl<'a> Iterator for Find<'a> {
    type Item = FindEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (current, node) = self.stack.pop()?;
        for child in node.sorted_children().into_iter().rev() {
            self.stack.push((path::join(&current, &child.name), child));
        }
        Some(FindEntry { path: current, node })
    }
}

/// The in-memory filesystem owned by one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualFilesystem {
    root: FsNode,
    current_path: String,
    home: String,
    /// Owner stamped onto newly created nodes
    acting_user: String,
}

impl VirtualFilesystem {
    /// Create an empty tree containing only `home` (owned by `user`),
    /// with the current path set to `home`.
    pub fn new(user: &str, home: &str) -> Self {
        let home = path::normalize(home);
        let mut fs = Self {
            root: FsNode::directory("/", ROOT_USER),
            current_path: "/".to_string(),
            home: home.clone(),
            acting_user: ROOT_USER.to_string(),
        };
        if home != "/" && fs.create_directory(&home, true).is_ok() {
            if let Some(node) = fs.lookup_mut(&home) {
                node.owner = user.to_string();
            }
        }
        fs.current_path = home;
        fs.acting_user = user.to_string();
        fs
    }

    pub fn resolve(&self, path: &str) -> String {
        path::resolve(path, &self.current_path, &self.home)
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    pub fn home(&self) -> &str {
        &self.home
    }

    pub fn acting_user(&self) -> &str {
        &self.acting_user
    }

    /// Switch the owner recorded on new nodes (used while elevated).
    pub fn set_acting_user(&mut self, user: &str) {
        self.acting_user = user.to_string();
    }

    pub fn root(&self) -> &FsNode {
        &self.root
    }

    pub fn node(&self, path: &str) -> Option<&FsNode> {
        let abs = self.resolve(path);
        self.lookup(&abs)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.node(path).is_some()
    }

    pub fn is_directory(&self, path: &str) -> bool {
        self.node(path).is_some_and(FsNode::is_dir)
    }

    pub fn is_file(&self, path: &str) -> bool {
        self.node(path).is_some_and(FsNode::is_file)
    }

    pub fn is_executable(&self, path: &str) -> bool {
        self.node(path).is_some_and(FsNode::is_executable)
    }

    /// List a directory: directories first, then files, each sorted by name.
    pub fn list(&self, path: &str, options: ListOptions) -> Result<Vec<DirEntry>> {
        let abs = self.resolve(path);
        let node = self.lookup(&abs).ok_or_else(|| ShellError::NotFound(abs.clone()))?;
        if !node.is_dir() {
            return Err(ShellError::NotADirectory(abs));
        }
        Ok(node
            .sorted_children()
            .into_iter()
            .filter(|child| options.show_hidden || !child.is_hidden())
            .map(DirEntry::from_node)
            .collect())
    }

    pub fn create_directory(&mut self, path: &str, recursive: bool) -> Result<()> {
        let abs = self.resolve(path);
        if let Some(existing) = self.lookup(&abs) {
            return if recursive && existing.is_dir() {
                Ok(())
            } else {
                Err(ShellError::AlreadyExists(abs))
            };
        }

        if recursive {
            let mut current = String::from("/");
            for component in path::components(&abs) {
                current = path::join(&current, component);
                match self.lookup(&current) {
                    Some(node) if node.is_dir() => continue,
                    Some(_) => return Err(ShellError::NotADirectory(current)),
                    None => {
                        let dir = FsNode::directory(component, &self.acting_user);
                        self.insert(&current, dir)?;
                    }
                }
            }
            debug!("mkdir -p {}", abs);
            return Ok(());
        }

        let dir = FsNode::directory(path::file_name(&abs), &self.acting_user);
        self.insert(&abs, dir)?;
        debug!("mkdir {}", abs);
        Ok(())
    }

    pub fn create_file(&mut self, path: &str, content: &str) -> Result<()> {
        let abs = self.resolve(path);
        if self.lookup(&abs).is_some() {
            return Err(ShellError::AlreadyExists(abs));
        }
        let file = FsNode::file(path::file_name(&abs), content, &self.acting_user);
        self.insert(&abs, file)
    }

    pub fn read_file(&self, path: &str) -> Result<&str> {
        let abs = self.resolve(path);
        let node = self.lookup(&abs).ok_or_else(|| ShellError::NotFound(abs.clone()))?;
        node.content().ok_or(ShellError::IsADirectory(abs))
    }

    /// Overwrite the content of an existing file
    pub fn write_file(&mut self, path: &str, content: &str) -> Result<()> {
        let abs = self.resolve(path);
        let node = self
            .lookup_mut(&abs)
            .ok_or_else(|| ShellError::NotFound(abs.clone()))?;
        match &mut node.kind {
            NodeKind::File { content: existing } => {
                *existing = content.to_string();
                Ok(())
            }
            NodeKind::Directory { .. } => Err(ShellError::IsADirectory(abs)),
        }
    }

    /// Append to an existing file, separating with a newline when non-empty
    pub fn append_file(&mut self, path: &str, content: &str) -> Result<()> {
        let existing = self.read_file(path)?;
        let combined = if existing.is_empty() {
            content.to_string()
        } else if existing.ends_with('\n') {
            format!("{}{}", existing, content)
        } else {
            format!("{}\n{}", existing, content)
        };
        self.write_file(path, &combined)
    }

    pub fn remove(&mut self, path: &str, options: RemoveOptions) -> Result<()> {
        let abs = self.resolve(path);
        if abs == "/" {
            return Err(ShellError::InvalidArgument(
                "refusing to remove '/'".to_string(),
            ));
        }

        let node = match self.lookup(&abs) {
            Some(node) => node,
            None if options.force => return Ok(()),
            None => return Err(ShellError::NotFound(abs)),
        };
        if let Some(children) = node.children() {
            if !children.is_empty() && !options.recursive {
                return Err(ShellError::NotEmpty(abs));
            }
        }

        self.detach(&abs)?;
        if path::is_within(&self.current_path, &abs) {
            self.current_path = path::parent_of(&abs).unwrap_or_else(|| "/".to_string());
        }
        debug!("removed {}", abs);
        Ok(())
    }

    pub fn copy(&mut self, src: &str, dst: &str, recursive: bool) -> Result<()> {
        let src_abs = self.resolve(src);
        let node = self
            .lookup(&src_abs)
            .ok_or_else(|| ShellError::NotFound(src_abs.clone()))?;
        if node.is_dir() && !recursive {
            return Err(ShellError::IsADirectory(src_abs));
        }

        let target = self.placement_target(&src_abs, dst)?;
        let mut copy = node.clone().renamed(path::file_name(&target));
        copy.set_owner_recursive(&self.acting_user);
        self.insert(&target, copy)?;
        debug!("copied {} -> {}", src_abs, target);
        Ok(())
    }

    pub fn move_node(&mut self, src: &str, dst: &str) -> Result<()> {
        let src_abs = self.resolve(src);
        if src_abs == "/" {
            return Err(ShellError::InvalidArgument("cannot move '/'".to_string()));
        }
        if self.lookup(&src_abs).is_none() {
            return Err(ShellError::NotFound(src_abs));
        }

        let target = self.placement_target(&src_abs, dst)?;
        // Validate the destination parent before detaching the source
        self.parent_children(&target)?;
        let node = self.detach(&src_abs)?.renamed(path::file_name(&target));
        self.insert(&target, node)?;

        if path::is_within(&self.current_path, &src_abs) {
            self.current_path = format!("{}{}", target, &self.current_path[src_abs.len()..]);
        }
        debug!("moved {} -> {}", src_abs, target);
        Ok(())
    }

    pub fn change_permissions(&mut self, path: &str, mode: &str) -> Result<()> {
        let abs = self.resolve(path);
        let node = self
            .lookup_mut(&abs)
            .ok_or_else(|| ShellError::NotFound(abs.clone()))?;
        node.permissions = node::apply_mode(&node.permissions, mode)?;
        Ok(())
    }

    pub fn change_owner(&mut self, path: &str, owner: &str) -> Result<()> {
        if owner.is_empty() {
            return Err(ShellError::InvalidArgument("missing owner".to_string()));
        }
        let abs = self.resolve(path);
        let node = self
            .lookup_mut(&abs)
            .ok_or_else(|| ShellError::NotFound(abs.clone()))?;
        node.owner = owner.to_string();
        Ok(())
    }

    /// The only way the current path changes on request.
    pub fn change_current_path(&mut self, path: &str) -> Result<()> {
        let abs = self.resolve(path);
        match self.lookup(&abs) {
            None => Err(ShellError::NotFound(abs)),
            Some(node) if !node.is_dir() => Err(ShellError::NotADirectory(abs)),
            Some(_) => {
                self.current_path = abs;
                Ok(())
            }
        }
    }

    /// Recursive pre-order walk starting at `path` (included).
    pub fn find(&self, path: &str) -> Result<Find<'_>> {
        let abs = self.resolve(path);
        let node = self.lookup(&abs).ok_or_else(|| ShellError::NotFound(abs.clone()))?;
        Ok(Find {
            stack: vec![(abs, node)],
        })
    }

    /// Paths under `path` accepted by `predicate`, lazily.
    pub fn find_matching<'a, P>(
        &'a self,
        path: &str,
        predicate: P,
    ) -> Result<impl Iterator<Item = String> + 'a>
    where
        P: Fn(&str, &FsNode) -> bool + 'a,
    {
        Ok(self
            .find(path)?
            .filter(move |entry| predicate(&entry.path, entry.node))
            .map(|entry| entry.path))
    }

    /// (bytes of file content, node count) for the whole tree
    pub fn usage(&self) -> (usize, usize) {
        (self.root.content_bytes(), self.root.node_count())
    }

    fn lookup(&self, abs: &str) -> Option<&FsNode> {
        let mut node = &self.root;
        for component in path::components(abs) {
            node = node.children()?.get(component)?;
        }
        Some(node)
    }

    fn lookup_mut(&mut self, abs: &str) -> Option<&mut FsNode> {
        let mut node = &mut self.root;
        for component in path::components(abs) {
            node = node.children_mut()?.get_mut(component)?;
        }
        Some(node)
    }

    /// Children map of the parent of `abs`, checking the parent exists
    fn parent_children(&mut self, abs: &str) -> Result<&mut BTreeMap<String, FsNode>> {
        let parent = path::parent_of(abs).ok_or_else(|| ShellError::AlreadyExists(abs.to_string()))?;
        match self.lookup_mut(&parent) {
            None => Err(ShellError::NoSuchParent(abs.to_string())),
            Some(node) => node
                .children_mut()
                .ok_or(ShellError::NotADirectory(parent)),
        }
    }

    /// Insert `node` at `abs`, rejecting name collisions
    fn insert(&mut self, abs: &str, node: FsNode) -> Result<()> {
        let name = path::file_name(abs).to_string();
        let children = self.parent_children(abs)?;
        if children.contains_key(&name) {
            return Err(ShellError::AlreadyExists(abs.to_string()));
        }
        children.insert(name, node);
        Ok(())
    }

    fn detach(&mut self, abs: &str) -> Result<FsNode> {
        let name = path::file_name(abs).to_string();
        self.parent_children(abs)?
            .remove(&name)
            .ok_or_else(|| ShellError::NotFound(abs.to_string()))
    }

    /// Where a copy/move of `src_abs` to `dst` lands: inside `dst` when it is
    /// an existing directory, otherwise at `dst` itself.
    fn placement_target(&self, src_abs: &str, dst: &str) -> Result<String> {
        let dst_abs = self.resolve(dst);
        let target = match self.lookup(&dst_abs) {
            Some(node) if node.is_dir() => path::join(&dst_abs, path::file_name(src_abs)),
            Some(_) => return Err(ShellError::AlreadyExists(dst_abs)),
            None => dst_abs,
        };
        if path::is_within(&target, src_abs) {
            return Err(ShellError::InvalidArgument(format!(
                "cannot copy or move '{}' into itself",
                src_abs
            )));
        }
        if self.lookup(&target).is_some() {
            return Err(ShellError::AlreadyExists(target));
        }
        Ok(target)
    }
}
