use serde::Serialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UriError {
    #[error("invalid uri \"{0}\"")]
    Invalid(String),
    #[error("unrecognized uri scheme \"{scheme}\" (uri=\"{uri}\")")]
    UnknownScheme { scheme: String, uri: String },
    #[error("invalid uri \"{uri}\": expected type \"{expected}\"")]
    WrongScheme { uri: String, expected: UriScheme },
    #[error("invalid timeserver url \"{url}\": {reason}")]
    InvalidTimeServer { url: String, reason: &'static str },
}

/// URI schemes a descriptor may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UriScheme {
    File,
    Pipe,
    Tcp,
    Udp,
}

impl UriScheme {
    pub const ALL: [Self; 4] = [Self::File, Self::Pipe, Self::Tcp, Self::Udp];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Pipe => "pipe",
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }

    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }
}

impl fmt::Display for UriScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `scheme:rest` reference as written in a descriptor.
///
/// The raw text is kept verbatim so that it can be echoed into the manifest
/// exactly as the author wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Uri {
    scheme: UriScheme,
    raw: String,
}

impl Uri {
    pub fn parse(input: &str) -> Result<Self, UriError> {
        let Some((scheme, _)) = input.split_once(':') else {
            return Err(UriError::Invalid(input.to_owned()));
        };
        let scheme = UriScheme::lookup(scheme).ok_or_else(|| UriError::UnknownScheme {
            scheme: scheme.to_owned(),
            uri: input.to_owned(),
        })?;
        Ok(Self {
            scheme,
            raw: input.to_owned(),
        })
    }

    /// Parse a URI and require the `file` scheme.
    pub fn parse_file(input: &str) -> Result<Self, UriError> {
        let Some((scheme, _)) = input.split_once(':') else {
            return Err(UriError::Invalid(input.to_owned()));
        };
        if scheme != UriScheme::File.as_str() {
            return Err(UriError::WrongScheme {
                uri: input.to_owned(),
                expected: UriScheme::File,
            });
        }
        Self::parse(input)
    }

    /// Build a `file:` URI from a host path.
    pub fn from_path(path: &Path) -> Self {
        Self {
            scheme: UriScheme::File,
            raw: format!("file:{}", path.display()),
        }
    }

    #[inline]
    pub fn scheme(&self) -> UriScheme {
        self.scheme
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Everything after the first `:`.
    pub fn rest(&self) -> &str {
        self.raw
            .split_once(':')
            .map_or(self.raw.as_str(), |(_, rest)| rest)
    }

    /// Host path of a `file:` URI.
    pub fn file_path(&self) -> Result<&Path, UriError> {
        if self.scheme != UriScheme::File {
            return Err(UriError::WrongScheme {
                uri: self.raw.clone(),
                expected: UriScheme::File,
            });
        }
        Ok(Path::new(self.rest()))
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Validate a time-server URL of the form `udp://host[:port]`.
pub fn check_timeserver_url(url: &str) -> Result<(), UriError> {
    let invalid = |reason| UriError::InvalidTimeServer {
        url: url.to_owned(),
        reason,
    };

    let netloc = url
        .strip_prefix("udp://")
        .ok_or_else(|| invalid("scheme must be \"udp\""))?;
    if netloc.contains(['/', '?', '#', ';']) {
        return Err(invalid("found path/params/query/fragment"));
    }
    if netloc.is_empty() {
        return Err(invalid("missing host"));
    }
    if let Some((host, port)) = netloc.rsplit_once(':') {
        if host.is_empty() || port.parse::<u16>().is_err() {
            return Err(invalid("bad netloc"));
        }
    }
    Ok(())
}
