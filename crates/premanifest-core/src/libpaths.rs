use crate::layout::RUNTIME_MOUNT_POINT;
use indexmap::IndexMap;
use tracing::debug;

/// Host library directories and the guest mount points they appear under.
///
/// Keys are host directory URIs compared as exact strings; the first
/// registration of a directory fixes its mount point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryPathRegistry {
    entries: IndexMap<String, String>,
}

impl LibraryPathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if `host_dir` was already registered.
    pub fn register(&mut self, host_dir: &str, mount_point: &str) -> bool {
        if self.entries.contains_key(host_dir) {
            return false;
        }
        debug!("adding new libpath \"{host_dir}\" on \"{mount_point}\"");
        self.entries
            .insert(host_dir.to_owned(), mount_point.to_owned());
        true
    }

    pub fn mount_point(&self, host_dir: &str) -> Option<&str> {
        self.entries.get(host_dir).map(String::as_str)
    }

    /// `(host directory URI, mount point)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Guest library search order.
    ///
    /// When `runtime_dir` is registered, [`RUNTIME_MOUNT_POINT`] comes first
    /// so the runtime's linker and core libraries shadow any host copies;
    /// the remaining mount points follow in registration order.
    pub fn search_path(&self, runtime_dir: &str) -> Vec<String> {
        let mut paths = Vec::with_capacity(self.entries.len());
        if self.entries.contains_key(runtime_dir) {
            paths.push(RUNTIME_MOUNT_POINT.to_owned());
        }
        paths.extend(
            self.entries
                .iter()
                .filter(|(host, _)| host.as_str() != runtime_dir)
                .map(|(_, mount)| mount.clone()),
        );
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUNTIME: &str = "file:/usr/src/graphene/Runtime";

    #[test]
    fn first_registration_wins() {
        let mut reg = LibraryPathRegistry::new();
        assert!(reg.register("file:/lib", "/lib"));
        assert!(!reg.register("file:/lib", "/elsewhere"));
        assert_eq!(reg.mount_point("file:/lib"), Some("/lib"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn runtime_mount_point_goes_first() {
        let mut reg = LibraryPathRegistry::new();
        reg.register("file:/usr/lib", "/usr/lib");
        reg.register(RUNTIME, RUNTIME_MOUNT_POINT);
        reg.register("file:/opt/lib", "/opt/lib");
        assert_eq!(
            reg.search_path(RUNTIME),
            vec!["/graphene", "/usr/lib", "/opt/lib"]
        );
        // The runtime directory stays registered for its mount stanza.
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn search_path_without_runtime_keeps_registration_order() {
        let mut reg = LibraryPathRegistry::new();
        reg.register("file:/b", "/b");
        reg.register("file:/a", "/a");
        assert_eq!(reg.search_path(RUNTIME), vec!["/b", "/a"]);
    }

    #[test]
    fn lookups_are_exact() {
        let mut reg = LibraryPathRegistry::new();
        reg.register("file:/lib", "/lib");
        assert_eq!(reg.mount_point("file:/lib/"), None);
    }
}
