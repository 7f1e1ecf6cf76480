/// Error types for the nettally library
use std::fmt;

/// Result type alias for tree operations
pub type Result<T> = std::result::Result<T, TreeError>;

/// Main error type for tree operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Lookup or delete targeted a network absent from the tree
    NotFound(String),

    /// Address/CIDR input could not be parsed, or an operation precondition
    /// was violated (non-zero host bits, family mismatch, non-host insert)
    Malformed(String),

    /// Prefix limit configuration violates its constraints
    Misconfigured(String),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::NotFound(msg) => write!(f, "Not found: {}", msg),
            TreeError::Malformed(msg) => write!(f, "Malformed input: {}", msg),
            TreeError::Misconfigured(msg) => write!(f, "Invalid prefix limits: {}", msg),
        }
    }
}

impl std::error::Error for TreeError {}

impl From<std::net::AddrParseError> for TreeError {
    fn from(err: std::net::AddrParseError) -> Self {
        TreeError::Malformed(err.to_string())
    }
}
