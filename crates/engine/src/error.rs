//! Error types for host service setup

/// Error type for host setup operations
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// The main executable module could not be located
    #[error("Main module not found: {0}")]
    ModuleNotFound(String),

    /// The module was found but has no executable section
    #[error("No executable section in module: {0}")]
    NoCodeSection(String),

    /// The module's headers could not be parsed
    #[error("Malformed module headers: {0}")]
    MalformedHeaders(String),

    /// Reading process information failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Host services already initialized
    #[error("Host already initialized")]
    AlreadyInitialized,

    /// Host services requested before plugin load
    #[error("Host not initialized")]
    NotInitialized,
}
