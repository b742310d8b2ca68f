//! Path resolution
//!
//! Pure string transforms: nothing here looks at the tree.

/// Resolve `path` against `cwd` and `home` into a canonical absolute path.
///
/// Handles absolute paths, `~` and `~/...`, and paths relative to `cwd`.
/// `.` and empty components are dropped, `..` pops (stopping at `/`).
/// Never fails, and `resolve(resolve(p)) == resolve(p)`.
pub fn resolve(path: &str, cwd: &str, home: &str) -> String {
    let joined = if path.is_empty() {
        cwd.to_string()
    } else if path == "~" {
        home.to_string()
    } else if let Some(rest) = path.strip_prefix("~/") {
        format!("{}/{}", home, rest)
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{}/{}", cwd, path)
    };
    normalize(&joined)
}

/// Canonicalize an absolute path string.
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            name => parts.push(name),
        }
    }
    format!("/{}", parts.join("/"))
}

/// Components of a canonical absolute path (empty for `/`).
pub fn components(path: &str) -> Vec<&str> {
    path.split('/').filter(|c| !c.is_empty()).collect()
}

/// Parent of a canonical absolute path; `None` for the root.
pub fn parent_of(path: &str) -> Option<String> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(index) => Some(path[..index].to_string()),
        None => None,
    }
}

/// Last component of a path (`/` for the root).
pub fn file_name(path: &str) -> &str {
    if path == "/" {
        return "/";
    }
    path.rsplit('/').next().unwrap_or(path)
}

/// Append `name` to a canonical directory path.
pub fn join(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", dir, name)
    }
}

/// True when `path` is `ancestor` itself or lies beneath it.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    if ancestor == "/" {
        return true;
    }
    path == ancestor
        || (path.starts_with(ancestor) && path.as_bytes().get(ancestor.len()) == Some(&b'/'))
}

/// Shorten a path for display by replacing the home prefix with `~`.
pub fn display(path: &str, home: &str) -> String {
    if path == home {
        "~".to_string()
    } else if is_within(path, home) && home != "/" {
        format!("~{}", &path[home.len()..])
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: &str = "/home/user";

    #[test]
    fn test_resolve_forms() {
        assert_eq!(resolve("/etc/../var/./log", "/", HOME), "/var/log");
        assert_eq!(resolve("~", "/tmp", HOME), "/home/user");
        assert_eq!(resolve("~/docs/", "/tmp", HOME), "/home/user/docs");
        assert_eq!(resolve("a/b", "/tmp", HOME), "/tmp/a/b");
        assert_eq!(resolve("..", "/tmp", HOME), "/");
        assert_eq!(resolve("../../..", "/tmp", HOME), "/");
        assert_eq!(resolve("", "/tmp", HOME), "/tmp");
        assert_eq!(resolve("//x//y", "/", HOME), "/x/y");
    }

    #[test]
    fn test_tilde_inside_name_is_literal() {
        assert_eq!(resolve("~backup", "/tmp", HOME), "/tmp/~backup");
        assert_eq!(resolve("a/~", "/tmp", HOME), "/tmp/a/~");
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let inputs = ["", ".", "..", "~", "~/a/../b", "x/./y/..", "/../..", "~x", "a//b/"];
        for input in inputs {
            let once = resolve(input, "/home/user/work", HOME);
            let twice = resolve(&once, "/home/user/work", HOME);
            assert_eq!(once, twice, "input {:?}", input);
        }
    }

    #[test]
    fn test_parent_and_name() {
        assert_eq!(parent_of("/"), None);
        assert_eq!(parent_of("/etc").as_deref(), Some("/"));
        assert_eq!(parent_of("/etc/passwd").as_deref(), Some("/etc"));
        assert_eq!(file_name("/etc/passwd"), "passwd");
        assert_eq!(file_name("/"), "/");
        assert_eq!(join("/", "etc"), "/etc");
        assert_eq!(join("/etc", "hosts"), "/etc/hosts");
    }

    #[test]
    fn test_is_within() {
        assert!(is_within("/a/b", "/a"));
        assert!(is_within("/a", "/a"));
        assert!(!is_within("/ab", "/a"));
        assert!(is_within("/anything", "/"));
    }

    #[test]
    fn test_display() {
        assert_eq!(display("/home/user", HOME), "~");
        assert_eq!(display("/home/user/docs", HOME), "~/docs");
        assert_eq!(display("/home/username", HOME), "/home/username");
        assert_eq!(display("/etc", HOME), "/etc");
    }
}
