//! Error types for confpack-format

/// Result type for confpack-format operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing or transforming conf content
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Input is not valid UTF-8: {message}")]
    Encoding { message: String },

    #[error("Syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("Unsupported input: {message}")]
    Structure { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }

    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }
}
