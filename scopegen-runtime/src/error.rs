//! Error types for running scopes.
//!
//! Runtime errors are local to the slot that failed. They are `Clone` so a
//! failed slot can hand the identical error to every later accessor.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Boxed error returned by recipes and closers.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Main error type for slot access.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    /// A slot was accessed while it was being created on the same thread.
    #[error("Circular dependency or failed initialization for {slot}")]
    CircularDependency { slot: String },

    /// The recipe returned an error; the original cause is kept.
    #[error("Failed to create {slot}: {source}")]
    CreationFailed {
        slot: String,
        source: Arc<dyn Error + Send + Sync>,
    },

    /// The recipe panicked; the slot stays failed.
    #[error("Recipe for {slot} panicked")]
    CreationPanicked { slot: String },

    /// Creation was attempted after the scope began closing.
    #[error("Scope is closed, cannot create {slot}")]
    ScopeClosed { slot: String },

    /// The recipe produced no value.
    #[error("Recipe for {slot} returned no value")]
    NullValue { slot: String },

    /// A construction parameter was not supplied.
    #[error("{}", .0)]
    MissingValue(MissingValueError),

    /// A value was supplied that the scope does not take.
    #[error("Value {identifier} is not a construction parameter of this scope")]
    UnknownValue { identifier: String },

    /// The recipe table lacks a callable the plan refers to.
    #[error("No recipe registered for {recipe}")]
    MissingRecipe { recipe: String },

    /// No slot with this identifier exists.
    #[error("No slot named {slot}")]
    UnknownSlot { slot: String },

    /// The slot holds a value of another type.
    #[error("Slot {slot} holds {actual}, not {expected}")]
    TypeMismatch {
        slot: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Wrong number of arguments for a factory or injector call.
    #[error("{slot} expects {expected} argument(s), got {actual}")]
    ArityMismatch {
        slot: String,
        expected: usize,
        actual: usize,
    },

    /// The plan failed validation when the scope was opened.
    #[error("Invalid plan for {scope}: {reason}")]
    InvalidPlan { scope: String, reason: String },

    /// The slot is marked for teardown but the instance cannot be closed.
    #[error("Slot {slot} must be closed on teardown but its instance has no closer")]
    MissingCloser { slot: String },
}

impl RuntimeError {
    /// Wraps a recipe error, passing a `RuntimeError` through unchanged.
    pub fn from_recipe(slot: &str, error: BoxError) -> Self {
        match error.downcast::<RuntimeError>() {
            Ok(runtime) => *runtime,
            Err(other) => Self::CreationFailed {
                slot: slot.to_string(),
                source: Arc::from(other),
            },
        }
    }

    /// Returns `true` for the re-entrancy error.
    pub fn is_circular(&self) -> bool {
        matches!(self, Self::CircularDependency { .. })
    }
}

/// Error when a construction parameter was not supplied.
#[derive(Debug, Clone)]
pub struct MissingValueError {
    pub identifier: String,
    pub descriptor: String,
    /// Supplied identifiers with similar names
    pub suggestions: Vec<String>,
}

impl fmt::Display for MissingValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Missing scope value: {} ({})",
            self.identifier, self.descriptor
        )?;

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: Supply it with ValueBindings::value(..) or ValueBindings::bind(..)"
        )
    }
}

/// One resource that failed to close.
#[derive(Debug)]
pub struct CloseFailure {
    pub slot: String,
    pub error: BoxError,
}

/// Every close failure of one `close()` call.
#[derive(Debug)]
pub struct CloseError {
    pub failures: Vec<CloseFailure>,
}

impl CloseError {
    /// Slots whose resources failed to close, in close order.
    pub fn failed_slots(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.slot.as_str()).collect()
    }
}

impl fmt::Display for CloseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Failed to close {} resource(s):", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  - {}: {}", failure.slot, failure.error)?;
        }
        Ok(())
    }
}

impl Error for CloseError {}

/// Convenient Result type for slot access.
pub type Result<T> = std::result::Result<T, RuntimeError>;
