use indexmap::IndexMap;
use premanifest_tools::{ToolError, Toolchain};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Trusted libraries by logical name, in first-insertion order.
///
/// A name keeps the path it was first registered with; later registrations
/// of the same name are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustSet {
    libs: IndexMap<String, PathBuf>,
}

impl TrustSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if `name` was already present.
    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> bool {
        let name = name.into();
        if self.libs.contains_key(&name) {
            return false;
        }
        self.libs.insert(name, path.into());
        true
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.libs.get(name).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.libs.iter().map(|(k, v)| (k.as_str(), v.as_path()))
    }

    pub fn len(&self) -> usize {
        self.libs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libs.is_empty()
    }
}

/// Folds `ldd` output for a binary into a [`TrustSet`].
pub struct DependencyResolver<'a> {
    tools: &'a Toolchain,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(tools: &'a Toolchain) -> Self {
        Self { tools }
    }

    /// Add the dependencies of `path`; returns how many names were new.
    ///
    /// The lister already reports the transitive closure, so no recursion
    /// happens here.
    pub fn resolve(&self, path: &Path, trust: &mut TrustSet) -> Result<usize, ToolError> {
        let mut added = 0;
        for dep in self.tools.list_dependencies(path)? {
            if trust.insert(dep.name.clone(), dep.path) {
                added += 1;
            } else {
                debug!("{}: '{}' already trusted", path.display(), dep.name);
            }
        }
        debug!("{}: {added} new trusted libraries", path.display());
        Ok(added)
    }
}
