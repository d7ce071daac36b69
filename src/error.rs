//! Error kinds returned by the certificate manager.
//!
//! Every operation fails fast: nothing is retried, and the first error is
//! returned to the caller unchanged. The only tolerated anomaly is a missing
//! file during deletion, which is handled inside [`crate::storage`].

use std::io;
use std::path::PathBuf;

use openssl::error::ErrorStack;

use crate::storage::FileKind;

/// Result alias used throughout the library.
pub type Result<T, E = PkiError> = std::result::Result<T, E>;

/// A request descriptor field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MissingField {
    #[error("certificate alias is required")]
    Alias,
    #[error("certificate subject is required")]
    Subject,
    #[error("parent certificate alias is required")]
    ParentAlias,
    #[error("invalid valid years: {actual}, should be at least {minimum}")]
    ValidYears { actual: u32, minimum: u32 },
}

#[derive(Debug, thiserror::Error)]
pub enum PkiError {
    #[error(transparent)]
    MissingField(#[from] MissingField),

    #[error("alias '{alias}' already exists in {}", dir.display())]
    AliasExists { alias: String, dir: PathBuf },

    #[error("{kind} for alias '{alias}' not found at {}", path.display())]
    NotFound {
        alias: String,
        kind: FileKind,
        path: PathBuf,
    },

    #[error("can't load {kind} from {}: {reason}", path.display())]
    Format {
        kind: FileKind,
        path: PathBuf,
        reason: String,
    },

    #[error("can't parse {kind} from {}: {source}", path.display())]
    Parse {
        kind: FileKind,
        path: PathBuf,
        #[source]
        source: ErrorStack,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to {step}: {source}")]
    Signing {
        step: &'static str,
        #[source]
        source: ErrorStack,
    },

    #[error("validity of {years} years is out of range")]
    InvalidValidity { years: u32 },

    #[error("can't inspect certificate: {0}")]
    Inspect(String),
}

impl PkiError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PkiError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Builds a `map_err` adapter that tags an OpenSSL failure with the step it
/// happened in.
pub(crate) fn signing(step: &'static str) -> impl FnOnce(ErrorStack) -> PkiError {
    move |source| PkiError::Signing { step, source }
}
