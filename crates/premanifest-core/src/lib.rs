//! Manifest compiler and enclave build pipeline for premanifest.
//!
//! A descriptor is compiled in three stages: the [`DirectiveCompiler`]
//! dispatches each directive to its handler and collects the trust closure
//! of the executable and modules, the [`Postprocessor`] turns trusted
//! libraries, read-only roots and read-write roots into manifest entries and
//! library mounts, and [`Manifest`] sorts and writes the result. The
//! [`Builder`] sequences compilation with the external signer and launch
//! token tool.

pub mod assemble;
pub mod compiler;
pub mod config;
pub mod layout;
pub mod libpaths;
pub mod pipeline;
pub mod postprocess;
pub mod trust;

pub use assemble::{entry, Manifest};
pub use compiler::{compile_descriptor, compile_file, Compilation, DirectiveCompiler};
pub use config::{absolutize, CompilerConfig, DEFAULT_RUNTIME_ROOT};
pub use layout::{RuntimeLayout, CORE_RUNTIME_LIBS, RUNTIME_MOUNT_POINT};
pub use libpaths::LibraryPathRegistry;
pub use pipeline::{
    BuildInput, BuildObserver, BuildOptions, BuildResult, BuildStage, Builder, CompileResult,
    OutputLayout,
};
pub use postprocess::Postprocessor;
pub use trust::{DependencyResolver, TrustSet};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("descriptor error: {0}")]
    Parse(#[from] premanifest_schema::ParseError),
    #[error("descriptor error: {0}")]
    Descriptor(#[from] premanifest_schema::DescriptorError),
    #[error("tool error: {0}")]
    Tool(#[from] premanifest_tools::ToolError),
    #[error("failed to write manifest {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to walk trusted root {}: {source}", .root.display())]
    Walk {
        root: PathBuf,
        source: walkdir::Error,
    },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
