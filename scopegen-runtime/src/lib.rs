//! Lazy scope runtime for scopegen.
//!
//! Runs a [`CompiledScope`](scopegen_compiler::CompiledScope) without
//! generating source: a [`RecipeTable`] supplies the constructors and
//! methods the plan names, a [`ValueBindings`] supplies its construction
//! values, and [`ScopeInstance`] creates every cached slot at most once, on
//! first access.
//!
//! The building blocks are usable on their own: [`Lazy`] is the memoizing
//! cell, [`ScopeCore`] the teardown registry.

pub mod error;
pub mod instance;
pub mod lazy;
pub mod lifecycle;
pub mod recipe;
pub mod scope;

pub use error::{BoxError, CloseError, CloseFailure, MissingValueError, Result, RuntimeError};
pub use instance::{Arg, Arguments, Instance};
pub use lazy::{Lazy, LazyState};
pub use lifecycle::{Closeable, ScopeCore};
pub use recipe::{ConstructorFn, MethodFn, RecipeTable, ValueBindings};
pub use scope::{CurriedFactory, LazyHandle, MethodInjector, ScopeInstance};
