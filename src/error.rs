use thiserror::Error;

/// Error value produced by a backend (RPC client, mock, ...). Passed through untouched.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = BindError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum BindError {
    /// The ABI text is not well formed or names an unknown type
    #[error("malformed ABI at {location}: {reason}")]
    MalformedAbi { location: String, reason: String },

    #[error("invalid hex encoding: {0}")]
    InvalidHexEncoding(String),

    /// An ABI type has no representation in generated code
    #[error("unsupported type `{ty}` at {location}")]
    UnsupportedType { location: String, ty: String },

    #[error("failed to resolve contract ABI: {0}")]
    AbiResolutionFailed(String),

    #[error("deployment failed: {0}")]
    DeploymentFailed(#[source] BackendError),

    #[error("call failed: {0}")]
    CallFailed(#[source] BackendError),

    #[error("failed to decode {context}: {reason}")]
    DecodeFailed { context: String, reason: String },

    #[error("transaction submission failed: {0}")]
    SubmissionFailed(#[source] BackendError),

    #[error("log does not match event {event}: {reason}")]
    EventMismatch { event: String, reason: String },

    /// A call returned nothing because no contract is deployed at the address
    #[error("no contract code at {0}")]
    NoCode(alloy::primitives::Address),

    #[error("subscription failed: {0}")]
    SubscriptionFailed(#[source] BackendError),

    #[error("method `{0}` not found in contract ABI")]
    UnknownMethod(String),

    #[error("event `{0}` not found in contract ABI")]
    UnknownEvent(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("registry error: {0}")]
    Registry(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BindError {
    pub(crate) fn malformed(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedAbi {
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn decode(context: impl Into<String>, reason: impl ToString) -> Self {
        Self::DecodeFailed {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unsupported(location: impl Into<String>, ty: impl Into<String>) -> Self {
        Self::UnsupportedType {
            location: location.into(),
            ty: ty.into(),
        }
    }

    pub(crate) fn mismatch(event: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EventMismatch {
            event: event.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error was detected while generating bindings rather than at runtime.
    pub fn is_generation_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedAbi { .. } | Self::InvalidHexEncoding(_) | Self::UnsupportedType { .. }
        )
    }
}
