/// Error Types
///
/// A single error enum shared by the transport loop and the tools. Tool
/// failures are reported back to the client in-band; I/O failures end the loop.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Reading stdin or writing stdout failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be serialized or deserialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Tool arguments did not match the tool's input schema.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The sum does not fit in a 64-bit signed integer.
    #[error("Integer overflow adding {a} and {b}")]
    Overflow { a: i64, b: i64 },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

impl Error {
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_message_names_operands() {
        let err = Error::Overflow { a: i64::MAX, b: 1 };
        assert_eq!(
            err.to_string(),
            format!("Integer overflow adding {} and 1", i64::MAX)
        );
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().starts_with("I/O error"));
    }
}
