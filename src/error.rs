//! Error types for dependency injection

use std::any::TypeId;
use thiserror::Error;

/// Errors that can occur during registration or resolution
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// No implementation is registered for the requested interface
    #[error("Service not found: {type_name}")]
    NotFound {
        type_name: &'static str,
        type_id: TypeId,
    },

    /// An interface was requested while it was already being resolved
    /// further up the same call chain
    #[error("Circular dependency detected while resolving {type_name}: {}", .chain.join(" -> "))]
    CircularDependency {
        type_name: &'static str,
        /// Interfaces on the resolution stack, ending with the repeated one
        chain: Vec<&'static str>,
    },

    /// The same implementation was registered twice for one interface
    #[error("Implementation {implementation} is already registered for {interface}")]
    AlreadyRegistered {
        interface: &'static str,
        implementation: &'static str,
    },

    /// A user factory failed to create the service
    #[error("Failed to create service {type_name}: {reason}")]
    CreationFailed {
        type_name: &'static str,
        reason: String,
    },

    /// A lifetime name could not be parsed
    #[error("Invalid lifetime: {0}")]
    InvalidLifetime(String),

    /// Internal error
    #[error("Internal DI error: {0}")]
    Internal(String),
}

impl DiError {
    /// Create a NotFound error for a type
    #[inline]
    pub fn not_found<T: ?Sized + 'static>() -> Self {
        Self::NotFound {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }

    /// Create a CreationFailed error
    #[inline]
    pub fn creation_failed<T: ?Sized + 'static>(reason: impl Into<String>) -> Self {
        Self::CreationFailed {
            type_name: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }

    /// Create an AlreadyRegistered error
    #[inline]
    pub fn already_registered<I: ?Sized + 'static, T: ?Sized + 'static>() -> Self {
        Self::AlreadyRegistered {
            interface: std::any::type_name::<I>(),
            implementation: std::any::type_name::<T>(),
        }
    }

    /// Create a CircularDependency error
    #[inline]
    pub fn circular<T: ?Sized + 'static>(chain: Vec<&'static str>) -> Self {
        Self::CircularDependency {
            type_name: std::any::type_name::<T>(),
            chain,
        }
    }

    /// Whether this error reports a dependency cycle
    #[inline]
    pub fn is_circular(&self) -> bool {
        matches!(self, Self::CircularDependency { .. })
    }
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    trait Repository {}

    #[test]
    fn test_circular_message_lists_chain() {
        let err = DiError::circular::<u32>(vec!["a::A", "b::B", "a::A"]);
        assert!(err.is_circular());
        assert_eq!(
            err.to_string(),
            "Circular dependency detected while resolving u32: a::A -> b::B -> a::A"
        );
    }

    #[test]
    fn test_already_registered_names_both_types() {
        let err = DiError::already_registered::<dyn Repository, String>();
        let message = err.to_string();
        assert!(message.contains("Repository"));
        assert!(message.contains("String"));
    }

    #[test]
    fn test_not_found_accepts_unsized() {
        match DiError::not_found::<dyn Repository>() {
            DiError::NotFound { type_id, .. } => {
                assert_eq!(type_id, TypeId::of::<dyn Repository>())
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
