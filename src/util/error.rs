//! Error types for transform stack reconciliation.

use thiserror::Error;

use crate::transform::Channel;

/// Main error type for xform stack operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Operation needs a bound prim but none is set
    #[error("No prim bound to the transform")]
    Unbound,

    /// Op attribute name could not be parsed
    #[error("Unknown xform op: {0}")]
    UnknownOp(String),

    /// Op not found by name
    #[error("Xform op not found: {0}")]
    OpNotFound(String),

    /// Value type does not match the op's authored type
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Scene layer refused to create an op
    #[error("Failed to create xform op: {0}")]
    OpCreationFailed(String),

    /// Scene layer refused a new op order
    #[error("Failed to set op order: {0}")]
    OpOrderRejected(String),

    /// Value write refused by the scene layer
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// Prim is not writable
    #[error("Prim is read-only")]
    ReadOnly,

    /// Host channel is locked against edits
    #[error("Channel {0:?} is locked")]
    Locked(Channel),

    /// Rotation order cannot change once a prim is bound
    #[error("Rotation order cannot be changed on a bound prim")]
    RotationOrderLocked,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialisation error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a type mismatch error.
    pub fn mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Result type alias for xform stack operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::Locked(Channel::Translate);
        assert!(e.to_string().contains("Translate"));

        let e = Error::mismatch("float3", "matrix4d");
        assert!(e.to_string().contains("float3"));
        assert!(e.to_string().contains("matrix4d"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
