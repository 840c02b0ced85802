use crate::ToolError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_LDD: &str = "ldd";
pub const DEFAULT_OPENSSL: &str = "openssl";
pub const DEFAULT_SIGNER: &str = "pal-sgx-sign";
pub const DEFAULT_TOKEN_TOOL: &str = "pal-sgx-get-token";

/// Program names (or paths) of the external collaborators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    #[serde(default = "default_ldd")]
    pub ldd: String,
    #[serde(default = "default_openssl")]
    pub openssl: String,
    #[serde(default = "default_signer")]
    pub signer: String,
    #[serde(default = "default_token_tool")]
    pub token_tool: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            ldd: default_ldd(),
            openssl: default_openssl(),
            signer: default_signer(),
            token_tool: default_token_tool(),
        }
    }
}

impl ToolConfig {
    /// Load `~/.config/premanifest/tools.toml`, or defaults if it does not exist.
    pub fn load_default() -> Result<Self, ToolError> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ToolError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            ToolError::Config(format!("invalid tool config {}: {e}", path.display()))
        })
    }

    /// Resolve the signer and token tool inside `dir` instead of `$PATH`.
    #[must_use]
    pub fn with_tool_dir(mut self, dir: &Path) -> Self {
        self.signer = dir.join(&self.signer).to_string_lossy().into_owned();
        self.token_tool = dir.join(&self.token_tool).to_string_lossy().into_owned();
        self
    }
}

fn default_ldd() -> String {
    DEFAULT_LDD.to_owned()
}

fn default_openssl() -> String {
    DEFAULT_OPENSSL.to_owned()
}

fn default_signer() -> String {
    DEFAULT_SIGNER.to_owned()
}

fn default_token_tool() -> String {
    DEFAULT_TOKEN_TOOL.to_owned()
}

fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".config/premanifest/tools.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.toml");
        std::fs::write(&path, "openssl = \"/opt/ssl/bin/openssl\"\n").unwrap();

        let config = ToolConfig::load(&path).unwrap();
        assert_eq!(config.openssl, "/opt/ssl/bin/openssl");
        assert_eq!(config.ldd, DEFAULT_LDD);
        assert_eq!(config.signer, DEFAULT_SIGNER);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.toml");
        std::fs::write(&path, "lld = \"ld.lld\"\n").unwrap();
        assert!(matches!(ToolConfig::load(&path), Err(ToolError::Config(_))));
    }

    #[test]
    fn tool_dir_applies_to_sgx_tools_only() {
        let config = ToolConfig::default().with_tool_dir(Path::new("/opt/graphene/tools"));
        assert_eq!(config.signer, "/opt/graphene/tools/pal-sgx-sign");
        assert_eq!(config.token_tool, "/opt/graphene/tools/pal-sgx-get-token");
        assert_eq!(config.ldd, DEFAULT_LDD);
        assert_eq!(config.openssl, DEFAULT_OPENSSL);
    }
}
