//! Error types for scope compilation.
//!
//! Every configuration problem is reported eagerly as a distinct, named
//! error kind. Nothing is silently defaulted or guessed.

use std::fmt;

use scopegen_support::rendering::render_chain;

use crate::key::DirectKey;
use crate::plan::BindingKind;

/// Main error type for all compilation operations.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// A required key has no binding and implicit values are disabled.
    #[error("{}", .0)]
    NotRegistered(NotRegisteredError),

    /// Eager dependency edges form a cycle.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// Two explicit bindings satisfy the same key.
    #[error("{}", .0)]
    DuplicateBinding(DuplicateBindingError),

    /// Alias target is not a structural subtype of the alias source.
    #[error("{dependency} is not assignable from {satisfied_by}")]
    UnassignableAlias {
        dependency: String,
        satisfied_by: String,
    },

    /// A second, different satisfier was declared for the same key.
    #[error(
        "Conflicting satisfiers for {dependency}: already satisfied by {existing}, cannot also use {requested}"
    )]
    ConflictingAlias {
        dependency: String,
        existing: String,
        requested: String,
    },

    /// Factory and injector interfaces must declare exactly one method.
    #[error("{interface} must declare exactly one method, found {method_count}")]
    NotSingleMethodInterface {
        interface: String,
        method_count: usize,
    },

    /// More than one public constructor and none is marked for injection.
    #[error(
        "Ambiguous constructor selection for {type_name}, mark one with inject or declare only one public constructor"
    )]
    AmbiguousConstructor { type_name: String },

    /// More than one public constructor is marked for injection.
    #[error("Cannot have more than one inject constructor for {type_name}")]
    MultipleInjectConstructors { type_name: String },

    /// The type cannot be constructed at all.
    #[error("{type_name} has no public constructor")]
    NoPublicConstructor { type_name: String },

    /// `Lazy<T>` combined with the auto-factory qualifier.
    #[error("Lazy types are not factories: {descriptor}")]
    LazyFactory { descriptor: String },

    /// `Lazy<Lazy<T>>` is not supported.
    #[error("Nested lazy types are not supported: {descriptor}")]
    NestedLazy { descriptor: String },

    /// `Lazy` must carry exactly one type argument.
    #[error("Lazy must have exactly one type argument: {descriptor}")]
    MalformedLazy { descriptor: String },

    /// A lazy key was used where only a direct key is permitted.
    #[error("Type {descriptor} resulted in a lazy key where only a direct key is permitted")]
    LazyNotPermitted { descriptor: String },

    /// Named qualifier payload outside `[a-zA-Z0-9-]`.
    #[error("Invalid named qualifier payload {payload:?} for @{tag}: only [a-zA-Z0-9-] is allowed")]
    InvalidQualifierPayload { tag: String, payload: String },

    /// The metadata source knows nothing about a type the binding needs.
    #[error("No metadata for type {type_name}")]
    MissingMetadata { type_name: String },

    /// Provider methods are called from generated code and must be public.
    #[error("Provider method {holder}::{method} must be public")]
    ProviderMethodNotPublic { holder: String, method: String },

    /// A provider method has nothing to provide.
    #[error("Provider method {holder}::{method} does not return a value")]
    ProviderWithoutProduct { holder: String, method: String },

    /// A factory interface method has nothing to construct.
    #[error("Factory method {interface}::{method} does not return a value")]
    FactoryWithoutProduct { interface: String, method: String },

    /// An interface parameter that no target parameter consumes.
    #[error("Parameter {parameter} of {interface}::{method} does not match any parameter of {target}")]
    UnmatchedFactoryParameter {
        interface: String,
        method: String,
        parameter: String,
        target: String,
    },

    /// Two different keys derive the same cache-slot identifier.
    #[error("Slot identifier {identifier} is derived by both {first} and {second}")]
    DuplicateIdentifier {
        identifier: String,
        first: String,
        second: String,
    },
}

/// Error when a required key was never bound.
///
/// Includes helpful hints about what went wrong.
#[derive(Debug)]
pub struct NotRegisteredError {
    /// The key that was required
    pub requested: DirectKey,
    /// What required this key (if known)
    pub required_by: Option<String>,
    /// Similar keys that ARE bound (for "did you mean?" suggestions)
    pub suggestions: Vec<String>,
}

impl fmt::Display for NotRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dependency not bound: {}", self.requested)?;

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: Declare it with .instance(..) or disable require_explicit_values"
        )
    }
}

/// Error when eager dependency edges form a cycle.
///
/// Shows the full chain of slot identifiers so you can see WHERE the cycle is.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// Example: ["a", "b", "c", "a"]
    pub chain: Vec<String>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Circular dependency detected:\n  {}", render_chain(&self.chain))?;
        write!(
            f,
            "\n  Hint: Depend on Lazy<T> for one edge of the cycle, or restructure your bindings"
        )
    }
}

/// Error when two explicit bindings satisfy the same key.
#[derive(Debug)]
pub struct DuplicateBindingError {
    pub key: DirectKey,
    pub first: BindingKind,
    pub second: BindingKind,
}

impl fmt::Display for DuplicateBindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Dependency bound twice: {} (as {} and as {})",
            self.key, self.first, self.second,
        )?;
        write!(
            f,
            "\n  Hint: Keep one binding, or use qualifiers to tell the two apart"
        )
    }
}

/// Convenient Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::QualifiedType;

    fn direct(name: &str) -> DirectKey {
        DirectKey::from_type(&QualifiedType::from(name)).unwrap()
    }

    #[test]
    fn not_registered_error_display() {
        let err = CompileError::NotRegistered(NotRegisteredError {
            requested: direct("Database"),
            required_by: Some("UserRepo".to_string()),
            suggestions: vec!["DatabasePool".to_string()],
        });

        let msg = format!("{err}");
        assert!(msg.contains("not bound"));
        assert!(msg.contains("Database"));
        assert!(msg.contains("Required by: UserRepo"));
        assert!(msg.contains("- DatabasePool"));
    }

    #[test]
    fn circular_dependency_error_display() {
        let err = CompileError::CircularDependency(CircularDependencyError {
            chain: vec!["a".to_string(), "b".to_string(), "a".to_string()],
        });

        let msg = format!("{err}");
        assert!(msg.contains("Circular"));
        assert!(msg.contains("a → b → a"));
    }

    #[test]
    fn duplicate_binding_error_display() {
        let err = CompileError::DuplicateBinding(DuplicateBindingError {
            key: direct("Config"),
            first: BindingKind::Value,
            second: BindingKind::Constructor,
        });

        let msg = format!("{err}");
        assert!(msg.contains("bound twice"));
        assert!(msg.contains("value"));
        assert!(msg.contains("constructor"));
    }

    #[test]
    fn invalid_payload_display() {
        let err = CompileError::InvalidQualifierPayload {
            tag: "Config".to_string(),
            payload: "db url".to_string(),
        };
        assert!(format!("{err}").contains("@Config"));
    }
}
