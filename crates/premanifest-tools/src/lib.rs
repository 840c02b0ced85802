//! External collaborators of the pre-manifest compiler.
//!
//! Every program the compiler depends on (`ldd`, `openssl`, `pal-sgx-sign`,
//! `pal-sgx-get-token`) is invoked through the narrow [`ToolRunner`] seam:
//! run a command, capture stdout, fail on non-zero exit. This crate provides
//! the process-backed [`SystemRunner`], a scripted [`MockRunner`] for tests,
//! parsers for the tools' textual output, tool configuration, and
//! prerequisite checks.

pub mod config;
pub mod ldd;
pub mod mock;
pub mod openssl;
pub mod prereq;
pub mod runner;
pub mod sgx;
pub mod toolchain;

pub use config::ToolConfig;
pub use ldd::Dependency;
pub use mock::MockRunner;
pub use openssl::{RsaPublicKey, RsaTextError};
pub use prereq::{check_compile_prereqs, check_signing_prereqs, format_missing, MissingPrereq};
pub use runner::{Invocation, SystemRunner, ToolRunner};
pub use sgx::{SignRequest, TokenRequest};
pub use toolchain::Toolchain;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
    #[error("cmd '{command}' returned {}: {stderr}", exit_code_text(.code))]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("unexpected output from '{command}': {reason}")]
    InvalidOutput { command: String, reason: String },
    #[error("tool config error: {0}")]
    Config(String),
    #[error("tool I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tool runner state poisoned")]
    Poisoned,
}

fn exit_code_text(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "no exit code (killed by signal)".to_owned(),
    }
}
