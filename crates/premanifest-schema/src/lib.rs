//! Descriptor grammar for the pre-manifest compiler.
//!
//! This crate defines the input side of compilation: the fixed directive
//! registry with its arity rules (`DirectiveKind`), the line-oriented
//! descriptor parser (`parse_descriptor_file`), URI and filesystem-type
//! classification (`Uri`, `FsType`, `MountAccess`), and manifest key
//! sanitization (`manifest_key`).

pub mod descriptor;
pub mod directive;
pub mod mount;
pub mod uri;

pub use descriptor::{
    parse_descriptor_file, parse_descriptor_str, Descriptor, DescriptorError, DirectiveLine,
    Location, ParseError,
};
pub use directive::{Arity, DirectiveKind};
pub use mount::{manifest_key, FsType, MountAccess, MountError};
pub use uri::{check_timeserver_url, Uri, UriError, UriScheme};
