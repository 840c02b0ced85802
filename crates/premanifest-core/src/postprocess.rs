use crate::assemble::entry;
use crate::compiler::Compilation;
use crate::layout::{RuntimeLayout, RUNTIME_MOUNT_POINT};
use crate::libpaths::LibraryPathRegistry;
use crate::trust::TrustSet;
use crate::CoreError;
use premanifest_schema::{manifest_key, FsType, Uri};
use std::path::Path;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Global passes run once every directive has been handled.
pub struct Postprocessor<'a> {
    layout: &'a RuntimeLayout,
    registry: LibraryPathRegistry,
    out: Vec<String>,
}

impl<'a> Postprocessor<'a> {
    pub fn new(layout: &'a RuntimeLayout) -> Self {
        Self {
            layout,
            registry: LibraryPathRegistry::new(),
            out: Vec::new(),
        }
    }

    /// Run the passes in order and return every manifest line, directive
    /// output first.
    pub fn run(mut self, compilation: Compilation) -> Result<Vec<String>, CoreError> {
        let Compilation {
            out,
            trust,
            ro_roots,
            rw_roots,
        } = compilation;
        self.out = out;

        self.trusted_libraries(&trust);
        self.allowed_files(&rw_roots)?;
        self.trusted_roots(&ro_roots)?;
        self.library_mounts();
        Ok(self.out)
    }

    fn trusted_libraries(&mut self, trust: &TrustSet) {
        for (name, path) in trust.iter() {
            let (host, mount_point) = if RuntimeLayout::is_core_runtime_lib(name) {
                (
                    self.layout.runtime_file(name),
                    RUNTIME_MOUNT_POINT.to_owned(),
                )
            } else {
                (path.to_path_buf(), parent_of(path).display().to_string())
            };
            let host_dir = Uri::from_path(parent_of(&host));
            self.registry.register(host_dir.as_str(), &mount_point);
            self.out.push(entry(
                &format!("sgx.trusted_files.{}", manifest_key(name)),
                Uri::from_path(&host),
            ));
        }
        self.out.push(entry(
            "sgx.trusted_files.ld",
            Uri::from_path(&self.layout.dynamic_linker()),
        ));
    }

    fn allowed_files(&mut self, rw_roots: &[Uri]) -> Result<(), CoreError> {
        for uri in rw_roots {
            let path = uri.file_path().map_err(config_err)?;
            self.out.push(entry(
                &format!("sgx.allowed_files.{}", manifest_key(&path.to_string_lossy())),
                uri,
            ));
        }
        Ok(())
    }

    /// Every non-directory entry below a read-only root becomes a trusted
    /// file, symlinks included. Directory symlinks are not descended.
    fn trusted_roots(&mut self, ro_roots: &[Uri]) -> Result<(), CoreError> {
        for uri in ro_roots {
            let root = uri.file_path().map_err(config_err)?;
            let mut count = 0usize;
            for item in WalkDir::new(root).sort_by_file_name() {
                let item = item.map_err(|source| CoreError::Walk {
                    root: root.to_path_buf(),
                    source,
                })?;
                if is_directory(&item) {
                    continue;
                }
                let path = item.path();
                self.out.push(entry(
                    &format!("sgx.trusted_files.{}", manifest_key(&path.to_string_lossy())),
                    Uri::from_path(path),
                ));
                count += 1;
            }
            debug!("{uri}: {count} trusted files");
        }
        Ok(())
    }

    fn library_mounts(&mut self) {
        for (host_dir, mount_point) in self.registry.iter() {
            let name = manifest_key(mount_point);
            self.out
                .push(entry(&format!("fs.mount.{name}.type"), FsType::Chroot));
            self.out
                .push(entry(&format!("fs.mount.{name}.path"), mount_point));
            self.out
                .push(entry(&format!("fs.mount.{name}.uri"), host_dir));
        }

        let runtime_dir = self.layout.runtime_dir_uri();
        let search_path = self.registry.search_path(runtime_dir.as_str());
        self.out
            .push(entry("loader.env.LD_LIBRARY_PATH", search_path.join(":")));
        self.out.push(entry(
            "loader.preload",
            Uri::from_path(&self.layout.preload_shim()),
        ));
    }
}

fn is_directory(item: &DirEntry) -> bool {
    item.file_type().is_dir() || (item.path_is_symlink() && item.path().is_dir())
}

fn parent_of(path: &Path) -> &Path {
    path.parent().unwrap_or(Path::new(""))
}

fn config_err(e: premanifest_schema::UriError) -> CoreError {
    CoreError::Config(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn layout() -> RuntimeLayout {
        RuntimeLayout::new("/g")
    }

    fn run(compilation: Compilation) -> Vec<String> {
        Postprocessor::new(&layout()).run(compilation).unwrap()
    }

    fn has(out: &[String], line: &str) -> bool {
        out.iter().any(|l| l == line)
    }

    #[test]
    fn core_libraries_are_redirected_to_runtime() {
        let mut trust = TrustSet::new();
        trust.insert("libc.so.6", "/lib/x86_64-linux-gnu/libc.so.6");
        trust.insert("libz.so.1", "/usr/lib/libz.so.1");
        let out = run(Compilation {
            trust,
            ..Compilation::default()
        });

        assert!(has(&out, "sgx.trusted_files.libc_so_6 = file:/g/Runtime/libc.so.6"));
        assert!(has(&out, "sgx.trusted_files.libz_so_1 = file:/usr/lib/libz.so.1"));
        assert!(has(
            &out,
            "sgx.trusted_files.ld = file:/g/Runtime/ld-linux-x86-64.so.2"
        ));
        assert!(has(&out, "fs.mount._graphene.type = chroot"));
        assert!(has(&out, "fs.mount._graphene.path = /graphene"));
        assert!(has(&out, "fs.mount._graphene.uri = file:/g/Runtime"));
        assert!(has(&out, "fs.mount._usr_lib.uri = file:/usr/lib"));
        assert!(has(&out, "loader.env.LD_LIBRARY_PATH = /graphene:/usr/lib"));
        assert!(has(&out, "loader.preload = file:/g/Runtime/libsysdb.so"));
    }

    #[test]
    fn search_path_puts_runtime_first_even_when_registered_later() {
        let mut trust = TrustSet::new();
        trust.insert("libssl.so.3", "/opt/ssl/libssl.so.3");
        trust.insert("libcrypto.so.3", "/opt/ssl/libcrypto.so.3");
        trust.insert("libm.so.6", "/lib/libm.so.6");
        trust.insert("libz.so.1", "/usr/lib/libz.so.1");
        let out = run(Compilation {
            trust,
            ..Compilation::default()
        });
        assert!(has(
            &out,
            "loader.env.LD_LIBRARY_PATH = /graphene:/opt/ssl:/usr/lib"
        ));
        assert_eq!(
            out.iter().filter(|l| l.starts_with("fs.mount._opt_ssl.")).count(),
            3
        );
    }

    #[test]
    fn empty_compilation_still_emits_loader_entries() {
        let out = run(Compilation::default());
        assert_eq!(
            out,
            vec![
                "sgx.trusted_files.ld = file:/g/Runtime/ld-linux-x86-64.so.2",
                "loader.env.LD_LIBRARY_PATH = ",
                "loader.preload = file:/g/Runtime/libsysdb.so",
            ]
        );
    }

    #[test]
    fn rw_roots_are_allowed_without_expansion() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a"), b"a").unwrap();
        let uri = Uri::from_path(dir.path());
        let out = run(Compilation {
            rw_roots: vec![uri.clone()],
            ..Compilation::default()
        });
        let allowed: Vec<_> = out
            .iter()
            .filter(|l| l.starts_with("sgx.allowed_files."))
            .collect();
        assert_eq!(allowed.len(), 1);
        assert!(allowed[0].ends_with(&format!(" = {uri}")));
    }

    #[test]
    fn ro_roots_trust_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("etc");
        fs::create_dir_all(root.join("sub/deeper")).unwrap();
        fs::write(root.join("b.conf"), b"b").unwrap();
        fs::write(root.join("a.conf"), b"a").unwrap();
        fs::write(root.join("sub/deeper/c"), b"c").unwrap();

        let out = run(Compilation {
            ro_roots: vec![Uri::from_path(&root)],
            ..Compilation::default()
        });
        let trusted: Vec<_> = out
            .iter()
            .filter(|l| l.starts_with("sgx.trusted_files.") && !l.starts_with("sgx.trusted_files.ld "))
            .collect();
        assert_eq!(trusted.len(), 3);
        let a = root.join("a.conf");
        assert!(has(
            &out,
            &format!(
                "sgx.trusted_files.{} = file:{}",
                manifest_key(&a.to_string_lossy()),
                a.display()
            )
        ));
        // Directories themselves are not listed.
        assert!(!out.iter().any(|l| l.ends_with(&format!("file:{}", root.join("sub").display()))));
    }

    #[test]
    fn ro_roots_trust_symlinked_files_but_not_linked_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("lib");
        fs::create_dir_all(root.join("real")).unwrap();
        fs::write(root.join("libfoo.so.1"), b"elf").unwrap();
        fs::write(root.join("real/inner"), b"x").unwrap();
        std::os::unix::fs::symlink("libfoo.so.1", root.join("libfoo.so")).unwrap();
        std::os::unix::fs::symlink("missing.so.2", root.join("libgone.so")).unwrap();
        std::os::unix::fs::symlink("real", root.join("alias")).unwrap();

        let out = run(Compilation {
            ro_roots: vec![Uri::from_path(&root)],
            ..Compilation::default()
        });
        let trusted = |p: &Path| {
            let line = format!(
                "sgx.trusted_files.{} = file:{}",
                manifest_key(&p.to_string_lossy()),
                p.display()
            );
            out.iter().filter(|l| **l == line).count()
        };
        assert_eq!(trusted(&root.join("libfoo.so.1")), 1);
        assert_eq!(trusted(&root.join("libfoo.so")), 1);
        assert_eq!(trusted(&root.join("libgone.so")), 1);
        assert_eq!(trusted(&root.join("real/inner")), 1);
        assert_eq!(trusted(&root.join("alias")), 0);
        assert_eq!(trusted(&root.join("alias/inner")), 0);
    }

    #[test]
    fn ro_root_that_is_a_file_trusts_itself() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("single");
        fs::write(&file, b"x").unwrap();
        let out = run(Compilation {
            ro_roots: vec![Uri::from_path(&file)],
            ..Compilation::default()
        });
        assert!(has(
            &out,
            &format!(
                "sgx.trusted_files.{} = file:{}",
                manifest_key(&file.to_string_lossy()),
                file.display()
            )
        ));
    }

    #[test]
    fn missing_ro_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Postprocessor::new(&layout())
            .run(Compilation {
                ro_roots: vec![Uri::from_path(&dir.path().join("absent"))],
                ..Compilation::default()
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::Walk { .. }));
    }

    #[test]
    fn directive_output_is_kept() {
        let out = run(Compilation {
            out: vec!["sgx.thread_num = 4".to_owned()],
            ..Compilation::default()
        });
        assert_eq!(out[0], "sgx.thread_num = 4");
    }
}
