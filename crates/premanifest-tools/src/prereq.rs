use crate::config::ToolConfig;
use std::fmt;
use std::path::Path;
use std::process::Command;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: String,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn command_exists(name: &str) -> bool {
    if name.contains('/') {
        return is_executable(Path::new(name));
    }
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Check the tools needed to compile a manifest.
/// Returns a list of missing items. Empty list means all prerequisites are met.
pub fn check_compile_prereqs(config: &ToolConfig) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    if !command_exists(&config.ldd) {
        missing.push(MissingPrereq {
            name: config.ldd.clone(),
            purpose: "resolving shared library dependencies of EXEC/MODULE files",
            install_hint: "part of glibc (libc-bin on Debian/Ubuntu)",
        });
    }

    if !command_exists(&config.openssl) {
        missing.push(MissingPrereq {
            name: config.openssl.clone(),
            purpose: "reading TIMESERVER public keys and CAFILE certificates",
            install_hint: "zypper install openssl | apt install openssl | dnf install openssl | pacman -S openssl",
        });
    }

    missing
}

/// Check the tools needed to sign a manifest and fetch a launch token.
pub fn check_signing_prereqs(config: &ToolConfig) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    if !command_exists(&config.signer) {
        missing.push(MissingPrereq {
            name: config.signer.clone(),
            purpose: "signing the enclave image",
            install_hint: "build Graphene with SGX=1, or pass --tool-dir",
        });
    }

    if !command_exists(&config.token_tool) {
        missing.push(MissingPrereq {
            name: config.token_tool.clone(),
            purpose: "retrieving the enclave launch token",
            install_hint: "build Graphene with SGX=1, or pass --tool-dir",
        });
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\npremanifest invokes these tools while compiling and signing manifests.");
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_prereq_display() {
        let m = MissingPrereq {
            name: "openssl".to_owned(),
            purpose: "reading keys",
            install_hint: "apt install openssl",
        };
        let s = format!("{m}");
        assert!(s.contains("openssl"));
        assert!(s.contains("reading keys"));
        assert!(s.contains("apt install openssl"));
    }

    #[test]
    fn format_missing_produces_readable_output() {
        let items = vec![
            MissingPrereq {
                name: "ldd".to_owned(),
                purpose: "deps",
                install_hint: "libc-bin",
            },
            MissingPrereq {
                name: "pal-sgx-sign".to_owned(),
                purpose: "signing",
                install_hint: "graphene",
            },
        ];
        let output = format_missing(&items);
        assert!(output.contains("missing prerequisites:"));
        assert!(output.contains("ldd"));
        assert!(output.contains("pal-sgx-sign"));
    }

    #[test]
    fn nonexistent_tool_paths_are_reported() {
        let config = ToolConfig::default().with_tool_dir(Path::new("/nonexistent/tool/dir"));
        let missing = check_signing_prereqs(&config);
        assert_eq!(missing.len(), 2);
        assert!(missing[0].name.ends_with("pal-sgx-sign"));
    }
}
