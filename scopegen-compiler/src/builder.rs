//! Binding registry: fluent accumulation of scope declarations.
//!
//! Nothing is resolved here. Declarations are collected in any order and
//! handed to the resolver by [`ScopeBuilder::compile`]. Only alias
//! declarations are checked eagerly.
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use scopegen_compiler::{ConstructorMeta, ScopeBuilder, TypeCatalog, TypeMetadata};
//!
//! let catalog = TypeCatalog::new()
//!     .with_type(TypeMetadata::new("Config"))
//!     .with_type(TypeMetadata::new("ServiceInterface"))
//!     .with_type(
//!         TypeMetadata::new("Service")
//!             .supertype("ServiceInterface")
//!             .constructor(ConstructorMeta::new(["Config"])),
//!     );
//!
//! let scope = ScopeBuilder::create(Arc::new(catalog), "app", "AppScope")
//!     .instance("Config")
//!     .satisfy("ServiceInterface")
//!     .with_constructor("Service")?
//!     .compile()?;
//!
//! assert_eq!(scope.required_values().len(), 1);
//! assert_eq!(scope.cached.len(), 1);
//! assert_eq!(scope.aliases[0].target, "service");
//! # Ok::<(), scopegen_compiler::CompileError>(())
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::descriptor::TypeDescriptor;
use crate::error::{CompileError, Result};
use crate::key::{DirectKey, QualifiedType};
use crate::metadata::MetadataSource;
use crate::module::BindingModule;
use crate::plan::CompiledScope;
use crate::resolver::ScopeCompiler;

/// `satisfy(K).with(S)`: requests for `dependency` read `satisfied_by`.
#[derive(Debug, Clone)]
pub(crate) struct AliasDecl {
    pub dependency: DirectKey,
    pub satisfied_by: DirectKey,
}

/// Everything declared so far, in declaration order.
#[derive(Debug, Clone, Default)]
pub(crate) struct Declarations {
    pub values: Vec<QualifiedType>,
    pub constructors: Vec<TypeDescriptor>,
    pub aliases: Vec<AliasDecl>,
    pub providers: Vec<TypeDescriptor>,
    pub factories: Vec<QualifiedType>,
    pub injected: Vec<QualifiedType>,
}

/// Collects bindings for one scope.
///
/// All methods take and return the builder by value. The few that can
/// fail at declaration time return `Result<ScopeBuilder>`.
pub struct ScopeBuilder {
    pub(crate) catalog: Arc<dyn MetadataSource>,
    pub(crate) package: String,
    pub(crate) scope_name: String,
    pub(crate) require_explicit_values: bool,
    pub(crate) declarations: Declarations,
}

impl ScopeBuilder {
    /// Starts a builder for `package.scope_name`.
    pub fn create(
        catalog: Arc<dyn MetadataSource>,
        package: impl Into<String>,
        scope_name: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            package: package.into(),
            scope_name: scope_name.into(),
            require_explicit_values: false,
            declarations: Declarations::default(),
        }
    }

    /// Fail on unbound keys instead of surfacing them as implicit values.
    pub fn require_explicit_values(mut self, require: bool) -> Self {
        self.require_explicit_values = require;
        self
    }

    // ── Values ──

    /// The scope receives this value at construction.
    pub fn instance(mut self, ty: impl Into<QualifiedType>) -> Self {
        let ty = ty.into();
        debug!(ty = %ty, "Declared value");
        self.declarations.values.push(ty);
        self
    }

    /// Same as [`instance`](Self::instance) for each type.
    pub fn instances<I, T>(self, types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<QualifiedType>,
    {
        types.into_iter().fold(self, |builder, ty| builder.instance(ty))
    }

    // ── Constructors ──

    /// The scope builds this type lazily from its selected constructor.
    pub fn constructor(mut self, ty: impl Into<TypeDescriptor>) -> Self {
        let ty = ty.into();
        debug!(ty = %ty, "Declared constructor binding");
        self.declarations.constructors.push(ty);
        self
    }

    /// Same as [`constructor`](Self::constructor) for each type.
    pub fn constructors<I, T>(self, types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TypeDescriptor>,
    {
        types.into_iter().fold(self, |builder, ty| builder.constructor(ty))
    }

    // ── Aliases ──

    /// Starts an alias declaration for `dependency`.
    pub fn satisfy(self, dependency: impl Into<QualifiedType>) -> SatisfyWith {
        SatisfyWith {
            builder: self,
            dependency: dependency.into(),
        }
    }

    fn alias(mut self, dependency: &QualifiedType, satisfied_by: &QualifiedType) -> Result<Self> {
        let dependency_key = DirectKey::from_type(dependency)?;
        let satisfied_key = DirectKey::from_type(satisfied_by)?;

        if !self.catalog.is_assignable(&dependency.ty, &satisfied_by.ty) {
            return Err(CompileError::UnassignableAlias {
                dependency: dependency_key.descriptor().to_string(),
                satisfied_by: satisfied_key.descriptor().to_string(),
            });
        }

        if let Some(existing) = self
            .declarations
            .aliases
            .iter()
            .find(|alias| alias.dependency == dependency_key)
        {
            if existing.satisfied_by == satisfied_key {
                debug!(key = %dependency_key, "Alias already declared");
                return Ok(self);
            }
            return Err(CompileError::ConflictingAlias {
                dependency: dependency_key.descriptor().to_string(),
                existing: existing.satisfied_by.descriptor().to_string(),
                requested: satisfied_key.descriptor().to_string(),
            });
        }

        debug!(from = %dependency_key, to = %satisfied_key, "Declared alias");
        self.declarations.aliases.push(AliasDecl {
            dependency: dependency_key,
            satisfied_by: satisfied_key,
        });
        Ok(self)
    }

    // ── Providers, factories, injectors ──

    /// Every `provides` method of this holder type becomes a cached slot.
    pub fn provider(mut self, holder: impl Into<TypeDescriptor>) -> Self {
        let holder = holder.into();
        debug!(holder = %holder, "Declared provider holder");
        self.declarations.providers.push(holder);
        self
    }

    /// Same as [`provider`](Self::provider) for each holder type.
    pub fn providers<I, T>(self, holders: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TypeDescriptor>,
    {
        holders.into_iter().fold(self, |builder, holder| builder.provider(holder))
    }

    /// Generates an implementation of a single-method factory interface.
    pub fn factory(mut self, interface: impl Into<QualifiedType>) -> Self {
        let interface = interface.into();
        debug!(interface = %interface, "Declared factory");
        self.declarations.factories.push(interface);
        self
    }

    /// Generates injectors for the marked methods of a receiver type.
    ///
    /// The receiver instance itself must be available in the scope, or it
    /// surfaces as a required value.
    pub fn inject_methods(mut self, receiver: impl Into<QualifiedType>) -> Self {
        let receiver = receiver.into();
        debug!(receiver = %receiver, "Declared method injection");
        self.declarations.injected.push(receiver);
        self
    }

    /// [`constructor`](Self::constructor) plus
    /// [`inject_methods`](Self::inject_methods) on the same type.
    pub fn constructor_and_inject_methods(self, ty: impl Into<TypeDescriptor>) -> Self {
        let ty = ty.into();
        self.constructor(ty.clone()).inject_methods(ty)
    }

    // ── Modules ──

    /// Applies a [`BindingModule`].
    pub fn install(self, module: &dyn BindingModule) -> Result<Self> {
        debug!(module = module.name(), "Installing binding module");
        module.declare(self)
    }

    // ── Compile ──

    /// Resolves every declaration into a [`CompiledScope`].
    ///
    /// # Errors
    /// Any configuration error; no partial scope is produced.
    pub fn compile(self) -> Result<CompiledScope> {
        ScopeCompiler::new(self).compile()
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn scope_name(&self) -> &str {
        &self.scope_name
    }
}

impl fmt::Debug for ScopeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeBuilder")
            .field("package", &self.package)
            .field("scope_name", &self.scope_name)
            .field("require_explicit_values", &self.require_explicit_values)
            .field("declarations", &self.declarations)
            .finish()
    }
}

/// The `with` clauses of [`ScopeBuilder::satisfy`].
#[must_use = "an alias is only declared once a with clause is called"]
pub struct SatisfyWith {
    builder: ScopeBuilder,
    dependency: QualifiedType,
}

impl SatisfyWith {
    /// Requests for the dependency read the slot of `satisfied_by`, which
    /// must be bound elsewhere.
    ///
    /// # Errors
    /// - [`CompileError::LazyNotPermitted`] for a lazy type on either side
    /// - [`CompileError::UnassignableAlias`]
    /// - [`CompileError::ConflictingAlias`]
    pub fn with(self, satisfied_by: impl Into<QualifiedType>) -> Result<ScopeBuilder> {
        let satisfied_by = satisfied_by.into();
        self.builder.alias(&self.dependency, &satisfied_by)
    }

    /// [`with`](Self::with) plus [`ScopeBuilder::instance`].
    pub fn with_instance(self, satisfied_by: impl Into<QualifiedType>) -> Result<ScopeBuilder> {
        let satisfied_by = satisfied_by.into();
        let builder = self.builder.alias(&self.dependency, &satisfied_by)?;
        Ok(builder.instance(satisfied_by))
    }

    /// [`with`](Self::with) plus [`ScopeBuilder::constructor`].
    pub fn with_constructor(self, ty: impl Into<TypeDescriptor>) -> Result<ScopeBuilder> {
        let ty = ty.into();
        let builder = self
            .builder
            .alias(&self.dependency, &QualifiedType::plain(ty.clone()))?;
        Ok(builder.constructor(ty))
    }
}
