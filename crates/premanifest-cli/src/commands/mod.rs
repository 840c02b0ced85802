pub mod build;
pub mod check;
pub mod compile;
pub mod completions;
pub mod doctor;
pub mod man_pages;

use indicatif::{ProgressBar, ProgressStyle};
use premanifest_core::{Builder, CompilerConfig};
use premanifest_tools::{ToolConfig, Toolchain};
use std::path::PathBuf;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_DESCRIPTOR_ERROR: u8 = 2;
pub const EXIT_TOOL_ERROR: u8 = 3;

/// Settings shared by every subcommand, taken from the global flags.
#[derive(Debug, Clone)]
pub struct Context {
    pub graphene: PathBuf,
    pub tool_config: Option<PathBuf>,
    pub tool_dir: Option<PathBuf>,
    pub verbose: bool,
    pub json: bool,
}

impl Context {
    /// Tool configuration with `--tool-dir` applied on top.
    pub fn tools_config(&self) -> Result<ToolConfig, String> {
        let config = match &self.tool_config {
            Some(path) => ToolConfig::load(path),
            None => ToolConfig::load_default(),
        }
        .map_err(|e| format!("tool error: {e}"))?;
        Ok(match &self.tool_dir {
            Some(dir) => config.with_tool_dir(dir),
            None => config,
        })
    }

    pub fn compiler_config(&self) -> Result<CompilerConfig, String> {
        CompilerConfig::new(&self.graphene)
            .map(|c| c.verbose(self.verbose))
            .map_err(|e| format!("cannot determine working directory: {e}"))
    }

    pub fn builder(&self) -> Result<Builder, String> {
        let config = self.compiler_config()?;
        let tools = Toolchain::system(self.tools_config()?, config.verbose);
        Ok(Builder::new(config, tools))
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

/// Exit code for an error message, keyed on the error-kind prefix.
pub fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("descriptor error:") {
        EXIT_DESCRIPTOR_ERROR
    } else if msg.starts_with("tool error:") {
        EXIT_TOOL_ERROR
    } else {
        EXIT_FAILURE
    }
}
