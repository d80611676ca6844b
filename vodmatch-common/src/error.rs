//! Error types for vodmatch

use thiserror::Error;

/// Common error type used across all vodmatch crates
#[derive(Error, Debug)]
pub enum Error {
    /// IO errors (reading exports, writing reports)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input parsed but does not have the expected shape
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Input is readable but carries nothing to analyze
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using the common error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Config("cutoff out of range".to_string());
        assert_eq!(err.to_string(), "Configuration error: cutoff out of range");

        let err = Error::InsufficientData("no frames".to_string());
        assert_eq!(err.to_string(), "Insufficient data: no frames");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: Error = json.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
