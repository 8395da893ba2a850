//! Error types for the entity platform

use ha_core::EntityIdError;
use ha_service_registry::ServiceError;
use thiserror::Error;

/// Result type for platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Errors raised by entities and the platform that drives them
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Service data failed coercion
    #[error("invalid value for '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    /// A required service field was not supplied
    #[error("required field '{0}' is missing")]
    MissingField(String),

    #[error(transparent)]
    EntityId(#[from] EntityIdError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Error raised by the integration behind an entity
    #[error("{0}")]
    Integration(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl PlatformError {
    /// Wrap an integration error
    pub fn integration<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        PlatformError::Integration(Box::new(err))
    }
}

impl From<PlatformError> for ServiceError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::InvalidField { .. } | PlatformError::MissingField(_) => {
                ServiceError::InvalidData(err.to_string())
            }
            PlatformError::Service(inner) => inner,
            other => ServiceError::CallFailed(other.to_string()),
        }
    }
}
