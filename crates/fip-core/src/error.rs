//! Error types for floating IP lifecycle management
//!
//! Remote failures keep their original message. The provisioning and binding
//! paths wrap them with a fixed prefix so operators can grep for the step
//! that failed.

use thiserror::Error;

/// Result type alias for floating IP operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for floating IP lifecycle management
#[derive(Error, Debug)]
pub enum Error {
    /// Generic remote API failure
    #[error("Floating IP API error: {0}")]
    Api(String),

    /// HTTP transport errors (connection refused, timeouts, bad bodies)
    #[error("HTTP error: {0}")]
    Http(String),

    /// The remote refused the request for this caller (e.g. pinned address without admin role)
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Resource not found on the remote side
    #[error("Not found: {0}")]
    NotFound(String),

    /// The remote rejected the request because of a conflicting resource
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Floating IP creation failed
    #[error("error creating floating IP: {source}")]
    Create {
        /// Pinned address, empty when the remote was free to choose
        address: String,
        /// Underlying remote error
        #[source]
        source: Box<Error>,
    },

    /// Port association update failed
    #[error("error associating floating IP: {source}")]
    Associate {
        /// Floating IP identifier
        id: String,
        /// Port the caller asked for
        port_id: String,
        /// Underlying remote error
        #[source]
        source: Box<Error>,
    },

    /// Port disassociation update failed
    #[error("error disassociating floating IP: {source}")]
    Disassociate {
        /// Floating IP identifier
        id: String,
        /// Underlying remote error
        #[source]
        source: Box<Error>,
    },

    /// The remote never reported the target status within the retry budget
    #[error("timed out waiting for floating IP {id} to become {target} after {attempts} attempts")]
    ConvergenceTimeout {
        /// Floating IP identifier
        id: String,
        /// Status that was awaited
        target: String,
        /// Number of fetches performed
        attempts: u32,
    },

    /// The caller abandoned the convergence wait
    #[error("wait for floating IP {id} cancelled after {attempts} attempts")]
    Cancelled {
        /// Floating IP identifier
        id: String,
        /// Number of fetches performed before cancellation
        attempts: u32,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic API error
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a permission error
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Wrap a remote failure from the creation call
    pub fn create(address: impl Into<String>, source: Error) -> Self {
        Self::Create {
            address: address.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a remote failure from the association update
    pub fn associate(id: impl Into<String>, port_id: impl Into<String>, source: Error) -> Self {
        Self::Associate {
            id: id.into(),
            port_id: port_id.into(),
            source: Box::new(source),
        }
    }

    /// Wrap a remote failure from the disassociation update
    pub fn disassociate(id: impl Into<String>, source: Error) -> Self {
        Self::Disassociate {
            id: id.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error came from talking to the remote service
    ///
    /// Wrapped creation and association failures count as transport errors.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Api(_)
            | Self::Http(_)
            | Self::PermissionDenied(_)
            | Self::NotFound(_)
            | Self::Conflict(_)
            | Self::RateLimited(_)
            | Self::Json(_) => true,
            Self::Create { source, .. }
            | Self::Associate { source, .. }
            | Self::Disassociate { source, .. } => source.is_transport(),
            _ => false,
        }
    }

    /// Whether the remote refused the request, looking through wrappers
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::PermissionDenied(_) => true,
            Self::Create { source, .. }
            | Self::Associate { source, .. }
            | Self::Disassociate { source, .. } => source.is_permission_denied(),
            _ => false,
        }
    }

    /// Whether this is a remote "not found", looking through wrappers
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Create { source, .. }
            | Self::Associate { source, .. }
            | Self::Disassociate { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Whether a convergence wait ran out of attempts
    pub fn is_convergence_timeout(&self) -> bool {
        matches!(self, Self::ConvergenceTimeout { .. })
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
