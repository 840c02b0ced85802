use crate::CoreError;
use std::fmt::Display;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Format one `key = value` manifest entry.
pub fn entry(key: &str, value: impl Display) -> String {
    format!("{key} = {value}")
}

/// A finished manifest: the loader shebang plus lexicographically sorted entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    shebang: String,
    entries: Vec<String>,
}

impl Manifest {
    pub fn new(shebang: String, mut entries: Vec<String>) -> Self {
        entries.sort();
        for pair in entries.windows(2) {
            let (a, b) = (entry_key(&pair[0]), entry_key(&pair[1]));
            if a == b {
                warn!("duplicate manifest key '{a}'");
            }
        }
        Self { shebang, entries }
    }

    pub fn shebang(&self) -> &str {
        &self.shebang
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Value of the first entry with `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find_map(|e| {
            let (k, v) = e.split_once(" = ")?;
            (k == key).then_some(v)
        })
    }

    pub fn render(&self) -> String {
        let mut out = String::with_capacity(
            self.shebang.len() + 1 + self.entries.iter().map(|e| e.len() + 1).sum::<usize>(),
        );
        out.push_str(&self.shebang);
        out.push('\n');
        for e in &self.entries {
            out.push_str(e);
            out.push('\n');
        }
        out
    }

    /// blake3 digest of the rendered text.
    pub fn digest(&self) -> String {
        blake3::hash(self.render().as_bytes()).to_hex().to_string()
    }

    /// Write atomically: the destination is either the complete manifest or
    /// untouched.
    pub fn write_to_file(&self, path: &Path) -> Result<(), CoreError> {
        let output_err = |source| CoreError::Output {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(output_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(output_err)?;
        tmp.write_all(self.render().as_bytes())
            .map_err(output_err)?;
        tmp.as_file().sync_all().map_err(output_err)?;
        tmp.persist(path).map_err(|e| output_err(e.error))?;
        // Fsync parent directory to ensure rename durability on power loss.
        if let Ok(f) = fs::File::open(dir) {
            let _ = f.sync_all();
        }
        info!("wrote {} ({} entries)", path.display(), self.entries.len());
        Ok(())
    }
}

fn entry_key(line: &str) -> &str {
    line.split_once(" = ").map_or(line, |(k, _)| k)
}
