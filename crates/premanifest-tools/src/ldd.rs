use crate::runner::{Invocation, ToolRunner};
use crate::ToolError;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::warn;

/// A shared library reported by `ldd`, with its resolved host path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub path: PathBuf,
}

fn resolved_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*(.+) => (.+) \(0x[a-f0-9]+\)\s*$").expect("valid ldd pattern")
    })
}

/// Extract `name => path (0xaddr)` entries, in output order.
///
/// Lines without a load address (the vDSO, the interpreter itself,
/// `=> not found`) are skipped.
pub fn parse_ldd_output(output: &str) -> Vec<Dependency> {
    resolved_line()
        .captures_iter(output)
        .map(|caps| Dependency {
            name: caps[1].to_owned(),
            path: PathBuf::from(&caps[2]),
        })
        .collect()
}

/// Names of libraries `ldd` could not locate.
pub fn unresolved_libraries(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.trim().strip_suffix("=> not found"))
        .map(|name| name.trim().to_owned())
        .collect()
}

pub fn list_dependencies(
    runner: &dyn ToolRunner,
    ldd: &str,
    path: &Path,
) -> Result<Vec<Dependency>, ToolError> {
    let stdout = runner.run(&Invocation::new(ldd).arg_path(path))?;
    let text = String::from_utf8_lossy(&stdout);
    for missing in unresolved_libraries(&text) {
        warn!("{}: dependency '{missing}' not found", path.display());
    }
    Ok(parse_ldd_output(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
\tlinux-vdso.so.1 (0x00007ffd6a5f2000)
\tlibssl.so.3 => /lib/x86_64-linux-gnu/libssl.so.3 (0x00007f1b2c400000)
\tlibc.so.6 => /lib/x86_64-linux-gnu/libc.so.6 (0x00007f1b2c000000)
\tlibmissing.so.9 => not found
\t/lib64/ld-linux-x86-64.so.2 (0x00007f1b2c7a0000)
";

    #[test]
    fn parses_resolved_entries_only() {
        let deps = parse_ldd_output(SAMPLE);
        assert_eq!(
            deps,
            vec![
                Dependency {
                    name: "libssl.so.3".to_owned(),
                    path: PathBuf::from("/lib/x86_64-linux-gnu/libssl.so.3"),
                },
                Dependency {
                    name: "libc.so.6".to_owned(),
                    path: PathBuf::from("/lib/x86_64-linux-gnu/libc.so.6"),
                },
            ]
        );
    }

    #[test]
    fn collects_not_found_entries() {
        assert_eq!(unresolved_libraries(SAMPLE), vec!["libmissing.so.9"]);
    }

    #[test]
    fn empty_output_yields_nothing() {
        assert!(parse_ldd_output("\tstatically linked\n").is_empty());
    }

    #[test]
    fn list_dependencies_runs_ldd_once() {
        let runner = crate::MockRunner::new().with_output("ldd /usr/bin/app", SAMPLE);
        let deps = list_dependencies(&runner, "ldd", Path::new("/usr/bin/app")).unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(runner.calls(), vec!["ldd /usr/bin/app"]);
    }
}
