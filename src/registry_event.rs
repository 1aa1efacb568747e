/// Events emitted by a registry during operations.
///
/// These events are passed to the tracing callback set via `set_trace_callback`.
/// Keys are rendered with their `Debug` representation, so events stay
/// independent of the registry's key type.
///
/// # Examples
///
/// ```rust
/// use multiton_registry::RegistryEvent;
///
/// let event = RegistryEvent::Create {
///     registry: "pools",
///     key: "\"db\"".to_string(),
///     created: true,
/// };
/// assert_eq!(event.to_string(), "create { registry: pools, key: \"db\", created: true }");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// An instance was requested with `create` (or `get`).
    Create {
        /// Name of the registry
        registry: &'static str,
        /// The requested key
        key: String,
        /// Whether the factory ran for this call (false for a cache hit)
        created: bool,
    },

    /// An instance was removed with `destroy`.
    Destroy {
        registry: &'static str,
        key: String,
        /// Whether an instance was present for the key
        found: bool,
    },

    /// A key existence check was performed.
    Contains {
        registry: &'static str,
        key: String,
        found: bool,
    },

    /// A snapshot was taken for iteration.
    Snapshot {
        registry: &'static str,
        /// Number of entries captured
        len: usize,
    },

    /// The registry was cleared.
    Clear { registry: &'static str },
}

impl std::fmt::Display for RegistryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryEvent::Create {
                registry,
                key,
                created,
            } => write!(
                f,
                "create {{ registry: {registry}, key: {key}, created: {created} }}"
            ),
            RegistryEvent::Destroy {
                registry,
                key,
                found,
            } => write!(
                f,
                "destroy {{ registry: {registry}, key: {key}, found: {found} }}"
            ),
            RegistryEvent::Contains {
                registry,
                key,
                found,
            } => write!(
                f,
                "contains {{ registry: {registry}, key: {key}, found: {found} }}"
            ),
            RegistryEvent::Snapshot { registry, len } => {
                write!(f, "snapshot {{ registry: {registry}, len: {len} }}")
            }
            RegistryEvent::Clear { registry } => write!(f, "clear {{ registry: {registry} }}"),
        }
    }
}
