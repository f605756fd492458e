//! Error types for dependency injection

use crate::types::{Name, Type};
use thiserror::Error;

/// Errors that can occur while registering or resolving services
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// No registration could satisfy the request and the type cannot be
    /// constructed implicitly (abstract type, unknown to the introspector, ...)
    #[error("Unresolved dependency: {type_name}{} ({reason})", named(.name))]
    UnresolvedDependency {
        type_name: &'static str,
        name: Option<Name>,
        reason: String,
    },

    /// Two or more public constructors share the highest parameter count
    #[error("Ambiguous constructor for {type_name}: multiple constructors with {arity} parameters")]
    AmbiguousConstructor { type_name: &'static str, arity: usize },

    /// The type has no eligible public constructor
    #[error("No public constructor is available for type {type_name}")]
    NoPublicConstructor { type_name: &'static str },

    /// Malformed registration request
    #[error("Invalid registration: {reason}")]
    InvalidRegistration { reason: String },

    /// The key is already being resolved further up the same call stack
    #[error("Circular dependency detected while resolving {type_name}{}: {}", named(.name), .chain.join(" -> "))]
    CircularDependency {
        type_name: &'static str,
        name: Option<Name>,
        chain: Vec<&'static str>,
    },

    /// A constructor, method, field setter or factory reported a failure
    #[error("Failed to create service {type_name}: {reason}")]
    CreationFailed {
        type_name: &'static str,
        reason: String,
    },

    /// A resolved value did not have the type its consumer expected
    #[error("Type mismatch: expected {expected}")]
    TypeMismatch { expected: &'static str },

    /// Parent container was dropped while a child still walks the chain
    #[error("Parent container has been dropped")]
    ParentDropped,

    /// The container was disposed and no longer resolves services
    #[error("Container has been disposed")]
    Disposed,
}

fn named(name: &Option<Name>) -> String {
    match name {
        Some(name) => format!(" (name: \"{name}\")"),
        None => String::new(),
    }
}

impl DiError {
    /// Create an UnresolvedDependency error for a type
    #[inline]
    pub fn not_found<T: ?Sized + 'static>() -> Self {
        Self::unresolved(Type::of::<T>(), None, "no registration found")
    }

    /// Create an UnresolvedDependency error for a runtime key
    #[inline]
    pub fn unresolved(ty: Type, name: Option<&str>, reason: impl Into<String>) -> Self {
        Self::UnresolvedDependency {
            type_name: ty.name(),
            name: name.map(Name::from),
            reason: reason.into(),
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

    /// Create a TypeMismatch error
    #[inline]
    pub fn type_mismatch<T: ?Sized + 'static>() -> Self {
        Self::TypeMismatch {
            expected: std::any::type_name::<T>(),
        }
    }

    /// Create an InvalidRegistration error
    #[inline]
    pub fn invalid_registration(reason: impl Into<String>) -> Self {
        Self::InvalidRegistration {
            reason: reason.into(),
        }
    }

    /// The type name (and optional registration name) the error is about.
    ///
    /// Errors raised deep inside a dependency chain propagate unchanged, so
    /// this names the key that actually failed rather than the top-level
    /// request.
    pub fn subject(&self) -> Option<(&'static str, Option<&str>)> {
        match self {
            Self::UnresolvedDependency { type_name, name, .. }
            | Self::CircularDependency { type_name, name, .. } => {
                Some((type_name, name.as_deref()))
            }
            Self::AmbiguousConstructor { type_name, .. }
            | Self::NoPublicConstructor { type_name }
            | Self::CreationFailed { type_name, .. } => Some((type_name, None)),
            Self::TypeMismatch { expected } => Some((expected, None)),
            Self::InvalidRegistration { .. } | Self::ParentDropped | Self::Disposed => None,
        }
    }

    /// Whether this is an UnresolvedDependency error
    #[inline]
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::UnresolvedDependency { .. })
    }
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    struct Database;

    #[test]
    fn test_not_found_names_type() {
        let err = DiError::not_found::<Database>();
        assert!(err.is_unresolved());
        assert!(err.to_string().contains("Database"));
        assert_eq!(err.subject().map(|(_, name)| name), Some(None));
    }

    #[test]
    fn test_unresolved_keeps_name() {
        let err = DiError::unresolved(Type::of::<Database>(), Some("primary"), "missing");
        assert_eq!(err.subject().and_then(|(_, name)| name), Some("primary"));
        assert!(err.to_string().contains("\"primary\""));
    }

    #[test]
    fn test_circular_chain_display() {
        let err = DiError::CircularDependency {
            type_name: "A",
            name: None,
            chain: vec!["A", "B", "A"],
        };
        assert!(err.to_string().contains("A -> B -> A"));
    }
}
