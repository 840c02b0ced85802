use crate::layout::RuntimeLayout;
use std::path::{Component, Path, PathBuf};

pub const DEFAULT_RUNTIME_ROOT: &str = "/usr/src/graphene";

/// Explicit settings for one compilation run.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    pub layout: RuntimeLayout,
    /// Base for relative descriptor paths.
    pub working_dir: PathBuf,
    /// Pass collaborator stderr through instead of capturing it.
    pub verbose: bool,
}

impl CompilerConfig {
    /// Config for `runtime_root`, resolved against the process working directory.
    pub fn new(runtime_root: impl AsRef<Path>) -> std::io::Result<Self> {
        let working_dir = std::env::current_dir()?;
        Ok(Self::with_working_dir(runtime_root, working_dir))
    }

    pub fn with_working_dir(runtime_root: impl AsRef<Path>, working_dir: PathBuf) -> Self {
        let root = absolutize(runtime_root.as_ref(), &working_dir);
        Self {
            layout: RuntimeLayout::new(root),
            working_dir,
            verbose: false,
        }
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn absolute(&self, path: &Path) -> PathBuf {
        absolutize(path, &self.working_dir)
    }
}

/// Join `path` onto `base` and normalize `.` and `..` lexically.
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
