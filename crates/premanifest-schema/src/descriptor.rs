use crate::directive::DirectiveKind;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("failed to read descriptor {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// A descriptor error pinned to a source line.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{file}:{line} {message}")]
pub struct ParseError {
    pub file: String,
    pub line: usize,
    pub message: String,
}

/// Source position of a directive (1-based line number).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: usize,
}

impl Location {
    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            file: self.file.clone(),
            line: self.line,
            message: message.into(),
        }
    }
}

/// One recognized directive with its raw arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveLine {
    pub kind: DirectiveKind,
    pub args: Vec<String>,
    pub location: Location,
}

/// A parsed descriptor: directives in source order, arity-checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    pub file: String,
    pub directives: Vec<DirectiveLine>,
}

impl Descriptor {
    pub fn count(&self, kind: DirectiveKind) -> usize {
        self.directives.iter().filter(|d| d.kind == kind).count()
    }
}

/// Parse descriptor text. `file` is only used for error context.
pub fn parse_descriptor_str(file: &str, input: &str) -> Result<Descriptor, ParseError> {
    let mut directives = Vec::new();

    for (idx, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let location = Location {
            file: file.to_owned(),
            line: idx + 1,
        };
        let mut fields = line.split_whitespace();
        let Some(name) = fields.next() else {
            continue;
        };
        let kind = DirectiveKind::lookup(name)
            .ok_or_else(|| location.error(format!("unknown directive \"{name}\"")))?;
        let args: Vec<String> = fields.map(str::to_owned).collect();
        if let Some(msg) = kind.arity_mismatch(args.len()) {
            return Err(location.error(msg));
        }

        directives.push(DirectiveLine {
            kind,
            args,
            location,
        });
    }

    Ok(Descriptor {
        file: file.to_owned(),
        directives,
    })
}

pub fn parse_descriptor_file(path: impl AsRef<Path>) -> Result<Descriptor, DescriptorError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| DescriptorError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_descriptor_str(&path.display().to_string(), &content)?)
}
