// Error types for route compilation and argument binding

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Bootstrap-time failure, attributed to `Owner.method()`.
    #[error("{owner}.{method}() - {message}")]
    Compilation {
        owner: String,
        method: String,
        message: String,
    },

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Attribute a metadata error to the method it was raised for.
    pub(crate) fn compilation(owner: &str, method: &str, error: Error) -> Self {
        let message = match error {
            Error::InvalidMetadata(message) => message,
            Error::Compilation { message, .. } => message,
            other => other.to_string(),
        };

        Error::Compilation {
            owner: owner.to_string(),
            method: method.to_string(),
            message,
        }
    }

    /// HTTP status a dispatcher should answer with for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Binding(_) => 400,
            _ => 500,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

/// Request-time failure to produce an argument array.
///
/// Carries enough context to point at the offending method and parameter.
/// `Display` prints `Owner.method() - message`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{owner}.{method}() - {message}")]
pub struct BindingError {
    pub owner: String,
    pub method: String,
    /// One-based ordinal of the argument
    pub argument: usize,
    pub path: String,
    message: String,
}

impl BindingError {
    pub fn new(
        owner: impl Into<String>,
        method: impl Into<String>,
        argument: usize,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            method: method.into(),
            argument,
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type Result<T> = std::result::Result<T, Error>;
