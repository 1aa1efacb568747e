use thiserror::Error;

/// Errors reported by an [`InstanceRegistry`](crate::InstanceRegistry).
///
/// Factories return this type too, so a failure raised while building an
/// instance reaches the caller of `create` unchanged.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The factory rejected the constructor arguments it was given.
    #[error("invalid constructor arguments: {0}")]
    InvalidArguments(String),

    /// The factory failed for a reason of its own.
    #[error("instance factory failed: {0}")]
    Factory(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    /// A factory called back into a locking operation of the registry that is running it.
    #[error("re-entrant call into registry `{registry}` from its own factory")]
    Reentrant {
        /// Name of the registry that was re-entered.
        registry: &'static str,
    },
}

impl RegistryError {
    /// Shorthand for [`RegistryError::InvalidArguments`].
    pub fn invalid_arguments(reason: impl Into<String>) -> Self {
        RegistryError::InvalidArguments(reason.into())
    }

    /// Wraps any error raised by a factory.
    pub fn factory(err: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        RegistryError::Factory(err.into())
    }
}
