//! # scopegen: compile-time dependency injection
//!
//! Declare bindings on a [`ScopeBuilder`](compiler::ScopeBuilder), compile
//! them into a validated [`CompiledScope`](compiler::CompiledScope), then
//! run the plan with a [`ScopeInstance`](runtime::ScopeInstance) whose
//! cached slots are created lazily, at most once, and closed with the scope.
//!
//! ```text
//! ScopeBuilder ──compile()──> CompiledScope ──ScopeInstance::new()──> ScopeInstance
//!                                 │
//!                          (serde, e.g. JSON)
//! ```

pub use scopegen_compiler as compiler;
pub use scopegen_runtime as runtime;
pub use scopegen_support as support;

/// Either stage can fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] compiler::CompileError),

    #[error(transparent)]
    Runtime(#[from] runtime::RuntimeError),

    #[error(transparent)]
    Close(#[from] runtime::CloseError),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    pub use crate::compiler::{
        BindingModule, CompiledScope, ConstructorMeta, MetadataSource, MethodMeta, QualifiedType,
        QualifierSet, QualifierTag, ScopeBuilder, TypeCatalog, TypeDescriptor, TypeMetadata,
    };
    pub use crate::runtime::{
        Arguments, BoxError, Closeable, CurriedFactory, Instance, LazyHandle, MethodInjector,
        RecipeTable, ScopeInstance, ValueBindings,
    };
    pub use crate::{Error, Result};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::sync::Arc;

    #[test]
    fn errors_from_both_stages_convert() {
        fn compile() -> Result<CompiledScope> {
            Ok(ScopeBuilder::create(Arc::new(TypeCatalog::new()), "app", "Empty")
                .constructor("Ghost")
                .compile()?)
        }

        match compile() {
            Err(Error::Compile(err)) => assert!(err.to_string().contains("Ghost")),
            other => panic!("Expected Compile error, got: {other:?}"),
        }
    }

    #[test]
    fn empty_scope_runs() -> Result<()> {
        let plan = ScopeBuilder::create(Arc::new(TypeCatalog::new()), "", "Empty").compile()?;
        let scope = ScopeInstance::new(&plan, RecipeTable::new(), ValueBindings::new())?;
        assert_eq!(scope.name(), "Empty");
        scope.close()?;
        Ok(())
    }
}
