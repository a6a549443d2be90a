//! Error types for the repository layer.
//!
//! Store-semantic failures (duplicate keys, write errors) are reclassified
//! into named variants; validation failures are raised before any store call;
//! driver communication and decode errors pass through unwrapped.

use std::time::Duration;

use thiserror::Error;

/// The primary error type for all repository operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// No document matched the selector or id.
    #[error("document not found")]
    NotFound,

    /// The supplied id could not be parsed, or the record carries no id.
    #[error("invalid document id")]
    InvalidId,

    /// The store reported a uniqueness violation.
    #[error("document is duplicate")]
    DuplicateDocument,

    /// A batch operation was invoked with no elements.
    #[error("slice is empty")]
    EmptySlice,

    /// A write was rejected by the store; native code and message preserved.
    #[error("write failed ({code}): {message}")]
    Write {
        /// Native server error code.
        code: i32,
        /// Native server error message.
        message: String,
    },

    /// The operation did not complete within its deadline.
    #[error("operation exceeded {0:?} deadline")]
    Timeout(Duration),

    /// Connection setup or liveness check failed.
    #[error("connection failed: {message}")]
    Connection {
        /// Underlying driver message.
        message: String,
    },

    /// Any other driver error (communication, cursor, decode).
    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),

    /// A record could not be serialized to BSON.
    #[error("bson encode: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),

    /// A document could not be decoded into the record type.
    #[error("bson decode: {0}")]
    Decode(#[from] mongodb::bson::de::Error),
}

/// Result type alias for repository operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MongoDB server code for a duplicate-key violation.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Reclassifies a driver error raised by a write operation.
///
/// A duplicate-key write error maps to [`Error::DuplicateDocument`]; any
/// other native write error is wrapped with its code and message preserved.
/// Errors that are not write exceptions (timeouts, connection loss, decode
/// failures) pass through untouched.
pub(crate) fn classify_write(err: mongodb::error::Error) -> Error {
    use mongodb::error::{ErrorKind, WriteFailure};

    let classified = match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) => {
            if write.code == DUPLICATE_KEY_CODE {
                Some(Error::DuplicateDocument)
            } else {
                Some(Error::Write {
                    code: write.code,
                    message: write.message.clone(),
                })
            }
        }
        ErrorKind::InsertMany(batch) => batch
            .write_errors
            .as_ref()
            .and_then(|errors| errors.first())
            .map(|write| {
                if write.code == DUPLICATE_KEY_CODE {
                    Error::DuplicateDocument
                } else {
                    Error::Write {
                        code: write.code,
                        message: write.message.clone(),
                    }
                }
            }),
        _ => None,
    };

    classified.unwrap_or(Error::Driver(err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_display() {
        assert_eq!(Error::NotFound.to_string(), "document not found");
        assert_eq!(Error::InvalidId.to_string(), "invalid document id");
        assert_eq!(Error::DuplicateDocument.to_string(), "document is duplicate");
        assert_eq!(Error::EmptySlice.to_string(), "slice is empty");
    }

    #[test]
    fn test_write_error_preserves_code_and_message() {
        let err = Error::Write {
            code: 112,
            message: "WriteConflict".to_string(),
        };
        assert_eq!(err.to_string(), "write failed (112): WriteConflict");
    }

    #[test]
    fn test_timeout_display_names_deadline() {
        let err = Error::Timeout(Duration::from_secs(2));
        assert!(err.to_string().contains("2s"));
    }

    #[test]
    fn test_connection_display() {
        let err = Error::Connection {
            message: "refused".to_string(),
        };
        assert_eq!(err.to_string(), "connection failed: refused");
    }
}
