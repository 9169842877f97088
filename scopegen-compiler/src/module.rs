//! Binding modules: reusable groups of declarations.
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use scopegen_compiler::{BindingModule, Result, ScopeBuilder, TypeCatalog};
//!
//! struct StorageModule;
//!
//! impl BindingModule for StorageModule {
//!     fn declare(&self, builder: ScopeBuilder) -> Result<ScopeBuilder> {
//!         Ok(builder.instance("StoragePath"))
//!     }
//! }
//!
//! let builder = ScopeBuilder::create(Arc::new(TypeCatalog::new()), "app", "AppScope")
//!     .install(&StorageModule)?;
//! # Ok::<(), scopegen_compiler::CompileError>(())
//! ```

use crate::builder::ScopeBuilder;
use crate::error::Result;

/// A set of related declarations installed into a builder in one call.
///
/// Split scopes by concern instead of one long declaration chain.
pub trait BindingModule: Send + Sync {
    /// Adds this module's declarations.
    fn declare(&self, builder: ScopeBuilder) -> Result<ScopeBuilder>;

    /// Optional: human-readable name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
