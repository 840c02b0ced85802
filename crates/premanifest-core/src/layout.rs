use premanifest_schema::Uri;
use std::path::{Path, PathBuf};

/// Guest mount point of the runtime's own library directory.
pub const RUNTIME_MOUNT_POINT: &str = "/graphene";

pub const DYNAMIC_LINKER: &str = "ld-linux-x86-64.so.2";

/// Loader execution mode named on the shebang line.
pub const LOADER_MODE: &str = "SGX";

/// Libraries that must always come from the runtime's own pinned copies,
/// whatever host path `ldd` resolved them to.
pub const CORE_RUNTIME_LIBS: [&str; 11] = [
    DYNAMIC_LINKER,
    "libc.so",
    "libc.so.6",
    "libdl.so.2",
    "libm.so.6",
    "libnss_dns.so.2",
    "libpthread.so.0",
    "libresolv.so.2",
    "librt.so.1",
    "libthread_db.so.1",
    "libutil.so.1",
];

/// Paths inside a Graphene installation.
///
/// Everything the compiler and the signing pipeline need from the runtime
/// lives under `<root>/Runtime`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeLayout {
    root: PathBuf,
}

impl RuntimeLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn runtime_dir(&self) -> PathBuf {
        self.root.join("Runtime")
    }

    #[inline]
    pub fn runtime_file(&self, name: &str) -> PathBuf {
        self.runtime_dir().join(name)
    }

    #[inline]
    pub fn loader(&self) -> PathBuf {
        self.runtime_file("pal_loader")
    }

    /// System-call shim preloaded into every enclave.
    #[inline]
    pub fn preload_shim(&self) -> PathBuf {
        self.runtime_file("libsysdb.so")
    }

    /// PAL library measured into the enclave by the signer.
    #[inline]
    pub fn enclave_pal(&self) -> PathBuf {
        self.runtime_file("libpal-Linux-SGX.so")
    }

    #[inline]
    pub fn dynamic_linker(&self) -> PathBuf {
        self.runtime_file(DYNAMIC_LINKER)
    }

    pub fn runtime_dir_uri(&self) -> Uri {
        Uri::from_path(&self.runtime_dir())
    }

    pub fn shebang(&self) -> String {
        format!("#!{} {LOADER_MODE}", self.loader().display())
    }

    pub fn is_core_runtime_lib(name: &str) -> bool {
        CORE_RUNTIME_LIBS.contains(&name)
    }

    /// Runtime files the pipeline relies on that are absent from disk.
    pub fn missing_files(&self) -> Vec<PathBuf> {
        [
            self.loader(),
            self.preload_shim(),
            self.enclave_pal(),
            self.dynamic_linker(),
        ]
        .into_iter()
        .filter(|p| !p.exists())
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let layout = RuntimeLayout::new("/usr/src/graphene");
        assert_eq!(layout.runtime_dir(), PathBuf::from("/usr/src/graphene/Runtime"));
        assert_eq!(
            layout.preload_shim(),
            PathBuf::from("/usr/src/graphene/Runtime/libsysdb.so")
        );
        assert_eq!(
            layout.runtime_dir_uri().as_str(),
            "file:/usr/src/graphene/Runtime"
        );
        assert_eq!(layout.shebang(), "#!/usr/src/graphene/Runtime/pal_loader SGX");
    }

    #[test]
    fn core_runtime_libs() {
        assert!(RuntimeLayout::is_core_runtime_lib("libc.so.6"));
        assert!(RuntimeLayout::is_core_runtime_lib("libpthread.so.0"));
        assert!(!RuntimeLayout::is_core_runtime_lib("libssl.so.3"));
    }

    #[test]
    fn missing_files_reports_absent_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let layout = RuntimeLayout::new(dir.path());
        assert_eq!(layout.missing_files().len(), 4);

        std::fs::create_dir_all(layout.runtime_dir()).unwrap();
        std::fs::write(layout.loader(), b"").unwrap();
        assert_eq!(layout.missing_files().len(), 3);
    }
}
