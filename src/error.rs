//! Error types for the component container.

use std::sync::Arc;

use thiserror::Error;

/// Error raised by a user constructor, boxed for transport through resolution.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Wiring errors
///
/// Registration errors are returned synchronously and are never partially
/// applied. Resolution errors propagate unchanged through every level of
/// recursive dependency resolution.
///
/// # Examples
///
/// ```rust
/// use ferrous_wire::{Container, Context, DiError, Key};
///
/// let container = Container::new();
/// match container.resolve(Key::of::<String>(), &Context::background()) {
///     Err(DiError::CandidateNotFound(name)) => assert_eq!(name, "alloc::string::String"),
///     other => panic!("unexpected: {:?}", other.map(|_| ())),
/// }
/// ```
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// The registered value or constructor has an unusable shape
    #[error("invalid provider: {0}")]
    InvalidProviderShape(String),

    /// Registering the component would close a dependency cycle
    #[error("'{component}' introduces a cycle: {}", .names.join(" -> "))]
    CycleDetected {
        component: &'static str,
        /// Graph order indices along the cycle, first node repeated at the end
        path: Vec<usize>,
        names: Vec<&'static str>,
    },

    /// Direct dependencies without any candidate, mock or ancestor
    #[error("'{component}' depends on missing dependencies: {}", .missing.join(", "))]
    MissingDependency {
        component: &'static str,
        missing: Vec<&'static str>,
    },

    #[error("no candidate found for type {0}")]
    CandidateNotFound(&'static str),

    #[error("multiple candidates for type {0}")]
    ManyCandidatesFound(&'static str),

    /// The component is already being created further up this resolution
    #[error("requested component is currently in creation: {0}")]
    CurrentlyInCreation(&'static str),

    #[error("container is locked")]
    ContainerLocked,

    #[error("no scope registered for name '{0}'")]
    NoScopeRegistered(String),

    #[error("invalid scope: {0}")]
    InvalidScope(String),

    /// A context-bound scope was used without an active session
    #[error("scope '{0}' requires an active session in the context")]
    ScopeNotActive(String),

    /// Type downcast failed
    #[error("type mismatch for {0}")]
    TypeMismatch(&'static str),

    #[error("constructor for '{component}' failed: {source}")]
    ConstructorFailed {
        component: &'static str,
        source: BoxError,
    },
}

impl DiError {
    pub(crate) fn constructor<E>(component: &'static str, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        DiError::ConstructorFailed {
            component,
            source: Arc::from(error.into()),
        }
    }
}

/// Result type for container operations
pub type DiResult<T> = Result<T, DiError>;
