use crate::compiler::compile_file;
use crate::config::CompilerConfig;
use crate::CoreError;
use premanifest_tools::{SignRequest, TokenRequest, Toolchain};
use serde::Serialize;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The loader wants the signed manifest to be executable.
pub const SIGNED_MANIFEST_MODE: u32 = 0o775;

/// Where the build artifacts go: a directory, or the working directory
/// when none is given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputLayout {
    dir: Option<PathBuf>,
}

impl OutputLayout {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        match &self.dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }

    pub fn manifest(&self) -> PathBuf {
        self.path("manifest")
    }

    pub fn signed_manifest(&self) -> PathBuf {
        self.path("manifest.sgx")
    }

    pub fn signature(&self) -> PathBuf {
        self.path("manifest.sgx.sig")
    }

    pub fn token(&self) -> PathBuf {
        self.path("manifest.sgx.token")
    }

    /// Final name of the signed manifest. The loader looks for
    /// `<app>.manifest.sgx`, so an output directory names the app.
    pub fn final_manifest(&self) -> PathBuf {
        match self.dir.as_deref().and_then(Path::file_name) {
            Some(app) => self.path(&format!("{}.manifest.sgx", app.to_string_lossy())),
            None => self.signed_manifest(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildInput {
    /// A descriptor to compile first.
    PreManifest(PathBuf),
    /// A ready manifest to sign as-is.
    Manifest(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub input: BuildInput,
    pub key: PathBuf,
    pub outdir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompileResult {
    pub output: PathBuf,
    pub entries: usize,
    pub digest: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BuildResult {
    pub manifest: PathBuf,
    pub signed_manifest: PathBuf,
    pub signature: PathBuf,
    pub token: PathBuf,
    /// Present when the manifest was compiled in this run.
    pub digest: Option<String>,
}

/// Steps of a build, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    Compile,
    Sign,
    Token,
    Finalize,
}

/// Notified around each build stage, e.g. to drive progress output.
pub trait BuildObserver {
    fn started(&mut self, _stage: BuildStage) {}
    fn finished(&mut self, _stage: BuildStage, _ok: bool) {}
}

impl BuildObserver for () {}

fn observed<T>(
    observer: &mut dyn BuildObserver,
    stage: BuildStage,
    f: impl FnOnce() -> Result<T, CoreError>,
) -> Result<T, CoreError> {
    observer.started(stage);
    let result = f();
    observer.finished(stage, result.is_ok());
    result
}

/// Compiles descriptors and drives the signer and token tool.
pub struct Builder {
    config: CompilerConfig,
    tools: Toolchain,
}

impl Builder {
    pub fn new(config: CompilerConfig, tools: Toolchain) -> Self {
        Self { config, tools }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn tools(&self) -> &Toolchain {
        &self.tools
    }

    /// Compile `descriptor` and write the manifest to `output`.
    ///
    /// Nothing is written unless compilation succeeds.
    pub fn compile(&self, descriptor: &Path, output: &Path) -> Result<CompileResult, CoreError> {
        info!("compiling {}", descriptor.display());
        let manifest = compile_file(descriptor, &self.config, &self.tools)?;
        manifest.write_to_file(output)?;
        Ok(CompileResult {
            output: output.to_path_buf(),
            entries: manifest.entries().len(),
            digest: manifest.digest(),
        })
    }

    pub fn make_manifest(
        &self,
        descriptor: &Path,
        out: &OutputLayout,
    ) -> Result<CompileResult, CoreError> {
        self.compile(descriptor, &out.manifest())
    }

    /// Sign `manifest`, producing `manifest.sgx` and its detached signature.
    pub fn sign_manifest(
        &self,
        manifest: &Path,
        key: &Path,
        out: &OutputLayout,
    ) -> Result<(), CoreError> {
        if let Some(dir) = out.dir() {
            fs::create_dir_all(dir)?;
        }
        let signed = out.signed_manifest();
        self.tools.sign_manifest(&SignRequest {
            manifest: manifest.to_path_buf(),
            key: key.to_path_buf(),
            libpal: self.config.layout.enclave_pal(),
            output: signed.clone(),
        })?;
        fs::set_permissions(&signed, fs::Permissions::from_mode(SIGNED_MANIFEST_MODE))?;
        debug!("signed {} -> {}", manifest.display(), signed.display());
        Ok(())
    }

    pub fn get_token(&self, out: &OutputLayout) -> Result<(), CoreError> {
        self.tools.get_token(&TokenRequest {
            signature: out.signature(),
            output: out.token(),
        })?;
        Ok(())
    }

    /// Give the signed manifest its final name; returns that path.
    pub fn finalize(&self, out: &OutputLayout) -> Result<PathBuf, CoreError> {
        let from = out.signed_manifest();
        let to = out.final_manifest();
        if from != to {
            fs::rename(&from, &to)?;
            debug!("renamed {} -> {}", from.display(), to.display());
        }
        Ok(to)
    }

    /// Compile (unless given a manifest), sign, fetch the launch token and
    /// finalize.
    pub fn build(&self, options: &BuildOptions) -> Result<BuildResult, CoreError> {
        self.build_with(options, &mut ())
    }

    /// Same as [`Builder::build`], reporting each stage to `observer`.
    pub fn build_with(
        &self,
        options: &BuildOptions,
        observer: &mut dyn BuildObserver,
    ) -> Result<BuildResult, CoreError> {
        let out = OutputLayout::new(options.outdir.clone());
        let (manifest, digest) = match &options.input {
            BuildInput::PreManifest(descriptor) => {
                let compiled = observed(observer, BuildStage::Compile, || {
                    self.make_manifest(descriptor, &out)
                })?;
                (compiled.output, Some(compiled.digest))
            }
            BuildInput::Manifest(path) => (path.clone(), None),
        };
        observed(observer, BuildStage::Sign, || {
            self.sign_manifest(&manifest, &options.key, &out)
        })?;
        observed(observer, BuildStage::Token, || self.get_token(&out))?;
        let signed_manifest = observed(observer, BuildStage::Finalize, || self.finalize(&out))?;
        info!("built {}", signed_manifest.display());
        Ok(BuildResult {
            manifest,
            signed_manifest,
            signature: out.signature(),
            token: out.token(),
            digest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_layout_in_working_directory() {
        let out = OutputLayout::new(None);
        assert_eq!(out.manifest(), PathBuf::from("manifest"));
        assert_eq!(out.token(), PathBuf::from("manifest.sgx.token"));
        assert_eq!(out.final_manifest(), PathBuf::from("manifest.sgx"));
    }

    #[test]
    fn output_directory_names_the_final_manifest() {
        let out = OutputLayout::new(Some(PathBuf::from("/build/redis")));
        assert_eq!(out.signature(), PathBuf::from("/build/redis/manifest.sgx.sig"));
        assert_eq!(
            out.final_manifest(),
            PathBuf::from("/build/redis/redis.manifest.sgx")
        );
    }
}
