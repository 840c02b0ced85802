use crate::config::ToolConfig;
use crate::ldd::{self, Dependency};
use crate::openssl::{self, RsaPublicKey};
use crate::runner::{SystemRunner, ToolRunner};
use crate::sgx::{self, SignRequest, TokenRequest};
use crate::ToolError;
use std::path::Path;

/// The configured collaborators behind one runner.
pub struct Toolchain {
    config: ToolConfig,
    runner: Box<dyn ToolRunner>,
}

impl Toolchain {
    pub fn new(config: ToolConfig, runner: Box<dyn ToolRunner>) -> Self {
        Self { config, runner }
    }

    /// Process-backed toolchain.
    pub fn system(config: ToolConfig, passthrough_stderr: bool) -> Self {
        Self::new(config, Box::new(SystemRunner::new(passthrough_stderr)))
    }

    #[inline]
    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    pub fn list_dependencies(&self, path: &Path) -> Result<Vec<Dependency>, ToolError> {
        ldd::list_dependencies(self.runner.as_ref(), &self.config.ldd, path)
    }

    pub fn dump_rsa_public_key(&self, pem: &Path) -> Result<RsaPublicKey, ToolError> {
        openssl::dump_rsa_public_key(self.runner.as_ref(), &self.config.openssl, pem)
    }

    pub fn cert_pem_to_der(&self, pem: &Path) -> Result<Vec<u8>, ToolError> {
        openssl::cert_pem_to_der(self.runner.as_ref(), &self.config.openssl, pem)
    }

    pub fn sign_manifest(&self, request: &SignRequest) -> Result<(), ToolError> {
        sgx::sign_manifest(self.runner.as_ref(), &self.config.signer, request)
    }

    pub fn get_token(&self, request: &TokenRequest) -> Result<(), ToolError> {
        sgx::get_token(self.runner.as_ref(), &self.config.token_tool, request)
    }
}
