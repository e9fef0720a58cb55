//! Error types for bitsign core.

use thiserror::Error;

/// Errors raised while framing or verifying an authenticated bitstream.
///
/// The first violated contract aborts the operation; there is no partial
/// success and nothing here is retried.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("unknown family: {0}")]
    UnknownFamily(String),

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("unsupported content type: {0}")]
    UnsupportedType(String),

    #[error("{algorithm} mismatch: expected {expected}, found {found} in header")]
    IntegrityMismatch {
        algorithm: &'static str,
        expected: String,
        found: String,
    },

    #[error("signing chain in bitstream is not complete")]
    ChainIncomplete,

    #[error("signing chain with permission 0x{granted:08X} may not sign content type {content_type}")]
    PermissionDenied { granted: u32, content_type: String },

    #[error("byte at offset 0x{offset:03X} is reserved as 0, found 0x{value:02X}")]
    ReservedFieldViolation { offset: usize, value: u8 },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("signature region: {0}")]
    SignatureRegion(String),
}

/// Fieldless discriminant of [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnknownFamily,
    MalformedHeader,
    UnsupportedType,
    IntegrityMismatch,
    ChainIncomplete,
    PermissionDenied,
    ReservedFieldViolation,
    InvalidConfiguration,
    InvalidPayload,
    SignatureRegion,
}

impl AuthError {
    /// The taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::UnknownFamily(_) => ErrorKind::UnknownFamily,
            AuthError::MalformedHeader(_) => ErrorKind::MalformedHeader,
            AuthError::UnsupportedType(_) => ErrorKind::UnsupportedType,
            AuthError::IntegrityMismatch { .. } => ErrorKind::IntegrityMismatch,
            AuthError::ChainIncomplete => ErrorKind::ChainIncomplete,
            AuthError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            AuthError::ReservedFieldViolation { .. } => ErrorKind::ReservedFieldViolation,
            AuthError::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            AuthError::InvalidPayload(_) => ErrorKind::InvalidPayload,
            AuthError::SignatureRegion(_) => ErrorKind::SignatureRegion,
        }
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, AuthError>;
