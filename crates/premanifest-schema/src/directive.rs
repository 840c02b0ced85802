use serde::Serialize;
use std::fmt;

/// Directives recognized in a pre-manifest descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum DirectiveKind {
    #[serde(rename = "MOUNT")]
    Mount,
    #[serde(rename = "DEBUG")]
    Debug,
    #[serde(rename = "EXEC")]
    Exec,
    #[serde(rename = "MODULE")]
    Module,
    #[serde(rename = "BIND")]
    Bind,
    #[serde(rename = "ENCLAVE_SIZE")]
    EnclaveSize,
    #[serde(rename = "THREADS")]
    Threads,
    #[serde(rename = "TIMESERVER")]
    TimeServer,
    #[serde(rename = "CAFILE")]
    CaFile,
}

/// Argument count accepted by a directive.
///
/// `min` is exact unless `variadic` is set, in which case it is a lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub variadic: bool,
}

impl Arity {
    pub const fn exactly(n: usize) -> Self {
        Self {
            min: n,
            variadic: false,
        }
    }

    pub const fn at_least(n: usize) -> Self {
        Self {
            min: n,
            variadic: true,
        }
    }

    pub fn accepts(self, given: usize) -> bool {
        if self.variadic {
            given >= self.min
        } else {
            given == self.min
        }
    }
}

impl DirectiveKind {
    pub const ALL: [Self; 9] = [
        Self::Mount,
        Self::Debug,
        Self::Exec,
        Self::Module,
        Self::Bind,
        Self::EnclaveSize,
        Self::Threads,
        Self::TimeServer,
        Self::CaFile,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Mount => "MOUNT",
            Self::Debug => "DEBUG",
            Self::Exec => "EXEC",
            Self::Module => "MODULE",
            Self::Bind => "BIND",
            Self::EnclaveSize => "ENCLAVE_SIZE",
            Self::Threads => "THREADS",
            Self::TimeServer => "TIMESERVER",
            Self::CaFile => "CAFILE",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            Self::Mount => Arity::at_least(3),
            Self::Threads => Arity::at_least(1),
            Self::Bind => Arity::exactly(2),
            Self::TimeServer => Arity::exactly(3),
            Self::Debug | Self::Exec | Self::Module | Self::EnclaveSize | Self::CaFile => {
                Arity::exactly(1)
            }
        }
    }

    /// Case-insensitive lookup by keyword.
    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.keyword().eq_ignore_ascii_case(name))
    }

    /// Describe an argument count mismatch, or `None` if `given` is acceptable.
    pub fn arity_mismatch(self, given: usize) -> Option<String> {
        let arity = self.arity();
        if arity.accepts(given) {
            return None;
        }
        Some(if arity.variadic {
            format!(
                "directive \"{}\" needs at least {} args, but only {given} given",
                self.keyword(),
                arity.min
            )
        } else {
            format!(
                "directive \"{}\" takes {} args, but {given} given",
                self.keyword(),
                arity.min
            )
        })
    }
}

impl fmt::Display for DirectiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}
