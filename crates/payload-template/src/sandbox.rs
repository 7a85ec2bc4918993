//! File read policy and the file content cache.

use crate::error::TemplateError;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Whether `file:` placeholders may read from disk, and from where.
///
/// Reads are denied unless explicitly allowed. With a root configured, a
/// request must lie inside the root directory after both paths are made
/// absolute and `.`/`..` are collapsed. Containment is checked per path
/// component, so `/data-evil/x` is not inside `/data`. Symlinks are not
/// resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilePolicy {
    allow_reads: bool,
    root: Option<PathBuf>,
}

impl FilePolicy {
    pub fn new(allow_reads: bool, root: Option<PathBuf>) -> Self {
        Self {
            allow_reads,
            root: root.filter(|root| !root.as_os_str().is_empty()),
        }
    }

    pub fn allows_reads(&self) -> bool {
        self.allow_reads
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Check `path` against the policy and return its absolute form.
    pub fn check(&self, path: &Path) -> Result<PathBuf, TemplateError> {
        if !self.allow_reads {
            return Err(TemplateError::FileReadsDisabled);
        }

        let absolute = absolute_path(path)?;
        if let Some(root) = &self.root {
            let absolute_root = absolute_path(root)?;
            if !absolute.starts_with(&absolute_root) {
                return Err(TemplateError::OutsideRoot {
                    path: path.to_path_buf(),
                    root: root.clone(),
                });
            }
        }
        Ok(absolute)
    }
}

fn absolute_path(path: &Path) -> Result<PathBuf, TemplateError> {
    std::path::absolute(path)
        .map(|absolute| normalize_lexically(&absolute))
        .map_err(|source| TemplateError::InvalidPath {
            path: path.to_path_buf(),
            source,
        })
}

/// Collapse `.` and `..` components without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

#[derive(Debug, Default)]
struct CacheState {
    enabled: bool,
    entries: HashMap<PathBuf, Vec<u8>>,
}

/// In-memory cache of file contents keyed by absolute path.
///
/// Entries never expire while the cache is enabled, even when the file on
/// disk changes. Disabling the cache drops every entry.
#[derive(Debug, Default)]
pub struct FileCache {
    state: RwLock<CacheState>,
}

impl FileCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            state: RwLock::new(CacheState {
                enabled,
                entries: HashMap::new(),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .enabled
    }

    pub fn set_enabled(&self, enabled: bool) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.enabled = enabled;
        if !enabled {
            state.entries.clear();
        }
    }

    pub fn clear(&self) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .clear();
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if !state.enabled {
            return None;
        }
        state.entries.get(path).cloned()
    }

    /// Store `content` if the cache is enabled.
    pub fn put(&self, path: PathBuf, content: Vec<u8>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.enabled {
            state.entries.insert(path, content);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("/a/./b/../c")),
            PathBuf::from("/a/c")
        );
        assert_eq!(normalize_lexically(Path::new("/../x")), PathBuf::from("/x"));
    }

    #[test]
    fn test_policy_denies_by_default() {
        let policy = FilePolicy::default();
        assert!(matches!(
            policy.check(Path::new("/etc/hostname")),
            Err(TemplateError::FileReadsDisabled)
        ));
    }

    #[test]
    fn test_policy_root_containment() {
        let policy = FilePolicy::new(true, Some(PathBuf::from("/srv/data")));
        assert!(policy.check(Path::new("/srv/data/a.json")).is_ok());
        assert!(policy.check(Path::new("/srv/data")).is_ok());
        assert!(matches!(
            policy.check(Path::new("/srv/data/../secret")),
            Err(TemplateError::OutsideRoot { .. })
        ));
        assert!(matches!(
            policy.check(Path::new("/srv/data-evil/a.json")),
            Err(TemplateError::OutsideRoot { .. })
        ));
    }

    #[test]
    fn test_empty_root_means_unrestricted() {
        let policy = FilePolicy::new(true, Some(PathBuf::new()));
        assert_eq!(policy.root(), None);
        assert!(policy.check(Path::new("/anywhere")).is_ok());
    }

    #[test]
    fn test_cache_lifecycle() {
        let cache = FileCache::new(false);
        cache.put(PathBuf::from("/a"), b"1".to_vec());
        assert!(cache.is_empty());

        cache.set_enabled(true);
        cache.put(PathBuf::from("/a"), b"1".to_vec());
        assert_eq!(cache.get(Path::new("/a")), Some(b"1".to_vec()));

        cache.clear();
        assert_eq!(cache.get(Path::new("/a")), None);

        cache.put(PathBuf::from("/a"), b"2".to_vec());
        cache.set_enabled(false);
        assert!(cache.is_empty());
        assert!(!cache.is_enabled());
    }
}
