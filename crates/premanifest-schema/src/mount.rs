use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MountError {
    #[error("unrecognized fstype \"{0}\"")]
    UnknownFsType(String),
    #[error("chroot mount: missing ro/rw option")]
    MissingAccess,
    #[error("chroot mount: invalid option \"{0}\"")]
    InvalidAccess(String),
}

/// Filesystem types the loader understands for `fs.mount` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsType {
    Chroot,
    Nextfs,
    Mdish,
    Tnt,
}

impl FsType {
    pub const ALL: [Self; 4] = [Self::Chroot, Self::Nextfs, Self::Mdish, Self::Tnt];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chroot => "chroot",
            Self::Nextfs => "nextfs",
            Self::Mdish => "mdish",
            Self::Tnt => "tnt",
        }
    }

    pub fn parse(token: &str) -> Result<Self, MountError> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == token)
            .ok_or_else(|| MountError::UnknownFsType(token.to_owned()))
    }
}

impl fmt::Display for FsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access mode of a `chroot` mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MountAccess {
    ReadOnly,
    ReadWrite,
}

impl MountAccess {
    /// Resolve the trailing options of a `chroot` mount: exactly one of `ro`/`rw`.
    pub fn from_options(options: &[String]) -> Result<Self, MountError> {
        let [opt] = options else {
            return Err(MountError::MissingAccess);
        };
        match opt.as_str() {
            "ro" => Ok(Self::ReadOnly),
            "rw" => Ok(Self::ReadWrite),
            other => Err(MountError::InvalidAccess(other.to_owned())),
        }
    }
}

/// Sanitize a name into a manifest key segment.
///
/// Key tags (e.g. `fs.mount.<tag>.type`) may only contain `[A-Za-z0-9_]`;
/// every other character becomes `_`.
pub fn manifest_key(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    #[test]
    fn fstype_parse() {
        assert_eq!(FsType::parse("chroot"), Ok(FsType::Chroot));
        assert_eq!(FsType::parse("tnt"), Ok(FsType::Tnt));
        assert_eq!(
            FsType::parse("ext4"),
            Err(MountError::UnknownFsType("ext4".to_owned()))
        );
    }

    #[test]
    fn access_requires_exactly_one_option() {
        assert_eq!(MountAccess::from_options(&opts(&["ro"])), Ok(MountAccess::ReadOnly));
        assert_eq!(MountAccess::from_options(&opts(&["rw"])), Ok(MountAccess::ReadWrite));
        assert_eq!(MountAccess::from_options(&[]), Err(MountError::MissingAccess));
        assert_eq!(
            MountAccess::from_options(&opts(&["ro", "rw"])),
            Err(MountError::MissingAccess)
        );
        assert!(matches!(
            MountAccess::from_options(&opts(&["rx"])),
            Err(MountError::InvalidAccess(_))
        ));
    }

    #[test]
    fn manifest_key_replaces_invalid_chars() {
        assert_eq!(manifest_key("/usr/lib/x86_64"), "_usr_lib_x86_64");
        assert_eq!(manifest_key("127.0.0.1:8080"), "127_0_0_1_8080");
        assert_eq!(manifest_key("libc.so.6"), "libc_so_6");
        assert_eq!(manifest_key("plain_Name9"), "plain_Name9");
    }
}
