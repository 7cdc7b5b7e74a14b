//! Error type for building and loading networks.
//!
//! The network itself is read-only once built; every failure here happens
//! while equipment is being added or a document is being parsed.

use thiserror::Error;

/// Errors raised while assembling a [`Network`](crate::Network).
#[derive(Error, Debug)]
pub enum GridError {
    /// An equipment id was registered twice
    #[error("duplicate equipment id '{0}'")]
    DuplicateId(String),

    /// Equipment points at a voltage level, substation or converter station
    /// that is not in the network
    #[error("'{owner}' references unknown {expected} '{target}'")]
    UnknownReference {
        owner: String,
        expected: &'static str,
        target: String,
    },

    /// Unknown enumerated name (equipment kind, energy source, ...)
    #[error("Parse error: {0}")]
    Parse(String),

    /// I/O errors while reading a network document
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results using GridError.
pub type GridResult<T> = Result<T, GridError>;

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        GridError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GridError::UnknownReference {
            owner: "GEN-1".into(),
            expected: "voltage level",
            target: "VL9".into(),
        };
        assert_eq!(
            err.to_string(),
            "'GEN-1' references unknown voltage level 'VL9'"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GridError = io_err.into();
        assert!(matches!(err, GridError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: GridError = json_err.into();
        assert!(matches!(err, GridError::Parse(_)));
    }
}
