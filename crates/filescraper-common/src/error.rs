//! Common error types used throughout filescraper.
//!
//! Scrapers accumulate most failures as data (message and error lists). The
//! variants here cover what crosses a module boundary: missing tools,
//! unparsable parameters and I/O failures that prevent a scrape from starting.

/// Common error type for filescraper.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required external tool is not installed or not executable.
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// An external tool ran but failed, or its output could not be used.
    #[error("tool execution failed: {tool}: {message}")]
    ToolFailed { tool: String, message: String },

    /// A parameter was present but had the wrong shape.
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new ToolNotFound error.
    pub fn tool_not_found<S: Into<String>>(tool: S) -> Self {
        Self::ToolNotFound(tool.into())
    }

    /// Create a new ToolFailed error.
    pub fn tool_failed<T: Into<String>, M: Into<String>>(tool: T, message: M) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a new InvalidParameter error.
    pub fn invalid_parameter<N: Into<String>, M: Into<String>>(name: N, message: M) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error must abort the whole scrape instead of being
    /// recorded on the scraper that raised it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ToolNotFound(_))
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
