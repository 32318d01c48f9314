//! Error types for burrowdb containers.

use thiserror::Error;

/// Result type for container operations.
pub type ContainerResult<T> = Result<T, ContainerError>;

/// Errors that can occur in container operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContainerError {
    /// A cursor detected a structural modification of its container.
    ///
    /// Cursors capture the container's modification counter when they are
    /// created. Any insert or remove between then and the next cursor call
    /// makes that call fail with this error rather than return stale or
    /// corrupted data.
    #[error("container was structurally modified during cursor traversal")]
    ConcurrentModification,
}
