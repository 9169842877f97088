//! Scope compiler for scopegen.
//!
//! Declarations go into a [`ScopeBuilder`]; [`ScopeBuilder::compile`]
//! resolves them into a [`CompiledScope`] emission plan.

pub mod builder;
pub mod descriptor;
pub mod error;
pub mod graph;
pub mod key;
pub mod metadata;
pub mod module;
pub mod plan;
pub mod qualifier;
pub mod resolver;

pub use builder::{SatisfyWith, ScopeBuilder};
pub use descriptor::TypeDescriptor;
pub use error::{CompileError, Result};
pub use key::{DependencyKey, DirectKey, QualifiedType};
pub use metadata::{ConstructorMeta, MetadataSource, MethodMeta, TypeCatalog, TypeMetadata};
pub use module::BindingModule;
pub use plan::{
    AliasSlot, Argument, BindingKind, CachedSlot, CompiledScope, FactorySlot, InjectorSlot, Recipe,
    SlotRef, ValueOrigin, ValueSlot,
};
pub use qualifier::{QualifierSet, QualifierTag};
