//! A running scope: one [`CompiledScope`] interpreted against a
//! [`RecipeTable`].
//!
//! # Slots
//! ```text
//! value     supplied at construction, returned as is
//! alias     forwards to its target slot
//! cached    created on first access, then shared
//! factory   a CurriedFactory; builds a fresh product per call
//! injector  a MethodInjector; forwards to a method on its receiver
//! ```
//!
//! Factories, injectors and lazy handles hold a weak reference to the
//! scope, so they never keep it alive.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use scopegen_compiler::graph::GraphValidator;
use scopegen_compiler::{Argument, CachedSlot, CompiledScope, FactorySlot, InjectorSlot, Recipe};
use scopegen_support::rendering::suggest_similar;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{CloseError, MissingValueError, Result, RuntimeError};
use crate::instance::{Arg, Arguments, Instance};
use crate::lazy::{Lazy, LazyState};
use crate::lifecycle::ScopeCore;
use crate::recipe::{RecipeTable, ValueBindings};

enum Slot {
    Value(Instance),
    Alias { target: String },
    Cached { plan: CachedSlot, cell: Lazy<Instance> },
    Factory(Instance),
    Injector(Instance),
}

struct ScopeInner {
    core: ScopeCore,
    this: Weak<ScopeInner>,
    slots: HashMap<String, Slot>,
    recipes: RecipeTable,
}

impl ScopeInner {
    fn get(&self, identifier: &str) -> Result<Instance> {
        match self.slots.get(identifier) {
            Some(Slot::Value(instance) | Slot::Factory(instance) | Slot::Injector(instance)) => {
                Ok(instance.clone())
            }
            Some(Slot::Alias { target }) => {
                trace!(alias = %identifier, target = %target, "Following alias");
                self.get(target)
            }
            Some(Slot::Cached { plan, cell }) => cell.get_or_create(|| self.create(plan).map(Some)),
            None => Err(RuntimeError::UnknownSlot {
                slot: identifier.to_string(),
            }),
        }
    }

    fn create(&self, plan: &CachedSlot) -> Result<Instance> {
        let slot = plan.identifier.as_str();
        self.core.check_open(slot)?;
        let arguments = self.arguments(slot, &plan.arguments, &[])?;

        let instance = match &plan.recipe {
            Recipe::Constructor { ty } => {
                let recipe = self.recipes.find_constructor(ty)?;
                recipe(&arguments).map_err(|err| RuntimeError::from_recipe(slot, err))?
            }
            Recipe::Provider {
                holder,
                holder_type,
                method,
            } => {
                let receiver = self.get(holder)?;
                let recipe = self.recipes.find_method(holder_type, method)?;
                recipe(&receiver, &arguments)
                    .map_err(|err| RuntimeError::from_recipe(slot, err))?
                    .ok_or_else(|| RuntimeError::NullValue {
                        slot: slot.to_string(),
                    })?
            }
        };

        if plan.close_on_teardown {
            let closer = instance.closer().ok_or_else(|| RuntimeError::MissingCloser {
                slot: slot.to_string(),
            })?;
            self.core.register_closeable(slot, closer)?;
        }

        Ok(instance)
    }

    /// Resolves plan arguments; `curried` fills `Argument::Curried` positions.
    fn arguments(&self, slot: &str, plan: &[Argument], curried: &[Instance]) -> Result<Arguments> {
        let values = plan
            .iter()
            .map(|argument| match argument {
                Argument::Slot { identifier } => self.get(identifier).map(Arg::Instance),
                Argument::Lazy { identifier } => Ok(Arg::Lazy(LazyHandle {
                    scope: Weak::clone(&self.this),
                    identifier: identifier.clone(),
                })),
                Argument::Curried { index } => curried
                    .get(*index)
                    .cloned()
                    .map(Arg::Instance)
                    .ok_or_else(|| RuntimeError::ArityMismatch {
                        slot: slot.to_string(),
                        expected: index + 1,
                        actual: curried.len(),
                    }),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Arguments::new(slot, values))
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        if !self.core.is_closed() {
            debug!(scope = %self.core.name(), "Closing dropped scope");
            if let Err(err) = self.core.close() {
                warn!(scope = %self.core.name(), error = %err, "Teardown of dropped scope failed");
            }
        }
    }
}

fn upgrade(scope: &Weak<ScopeInner>, slot: &str) -> Result<Arc<ScopeInner>> {
    scope.upgrade().ok_or_else(|| RuntimeError::ScopeClosed {
        slot: slot.to_string(),
    })
}

fn check_arity(slot: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(RuntimeError::ArityMismatch {
            slot: slot.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Deferred access to a slot; the slot is created on the first [`get`](Self::get).
#[derive(Clone)]
pub struct LazyHandle {
    scope: Weak<ScopeInner>,
    identifier: String,
}

impl LazyHandle {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn get(&self) -> Result<Instance> {
        upgrade(&self.scope, &self.identifier)?.get(&self.identifier)
    }

    pub fn resolve<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        downcast(&self.identifier, self.get()?)
    }
}

impl fmt::Debug for LazyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LazyHandle").field(&self.identifier).finish()
    }
}

/// A factory slot. Each call builds a new product from the caller's
/// arguments plus scope-held dependencies.
pub struct CurriedFactory {
    scope: Weak<ScopeInner>,
    plan: FactorySlot,
}

impl CurriedFactory {
    /// Parameter descriptors of the factory method.
    pub fn parameters(&self) -> &[String] {
        &self.plan.parameters
    }

    pub fn call(&self, args: Vec<Instance>) -> Result<Instance> {
        let slot = self.plan.identifier.as_str();
        check_arity(slot, self.plan.parameters.len(), args.len())?;
        let scope = upgrade(&self.scope, slot)?;
        scope.core.check_open(slot)?;

        trace!(factory = %slot, product = %self.plan.product, "Building product");
        let arguments = scope.arguments(slot, &self.plan.arguments, &args)?;
        let recipe = scope.recipes.find_constructor(&self.plan.product)?;
        recipe(&arguments).map_err(|err| RuntimeError::from_recipe(slot, err))
    }

    /// [`call`](Self::call), downcast to the product type.
    pub fn make<T: Any + Send + Sync>(&self, args: Vec<Instance>) -> Result<Arc<T>> {
        downcast(&self.plan.identifier, self.call(args)?)
    }
}

impl fmt::Debug for CurriedFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurriedFactory")
            .field("identifier", &self.plan.identifier)
            .field("product", &self.plan.product.to_string())
            .finish()
    }
}

/// An injector slot, forwarding to a method on its receiver slot.
pub struct MethodInjector {
    scope: Weak<ScopeInner>,
    plan: InjectorSlot,
}

impl MethodInjector {
    pub fn parameters(&self) -> &[String] {
        &self.plan.parameters
    }

    /// Calls the target method. `Ok(None)` only when it returns nothing.
    pub fn call(&self, args: Vec<Instance>) -> Result<Option<Instance>> {
        let slot = self.plan.identifier.as_str();
        check_arity(slot, self.plan.parameters.len(), args.len())?;
        let scope = upgrade(&self.scope, slot)?;
        scope.core.check_open(slot)?;

        let receiver = scope.get(&self.plan.receiver)?;
        let arguments = scope.arguments(slot, &self.plan.arguments, &args)?;
        let recipe = scope
            .recipes
            .find_method(&self.plan.receiver_type, &self.plan.target_method)?;

        trace!(injector = %slot, "Forwarding call");
        match recipe(&receiver, &arguments).map_err(|err| RuntimeError::from_recipe(slot, err))? {
            Some(instance) => Ok(Some(instance)),
            None if self.plan.returns_unit => Ok(None),
            None => Err(RuntimeError::NullValue {
                slot: slot.to_string(),
            }),
        }
    }
}

impl fmt::Debug for MethodInjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInjector")
            .field("identifier", &self.plan.identifier)
            .field("interface", &self.plan.interface.to_string())
            .finish()
    }
}

fn downcast<T: Any + Send + Sync>(slot: &str, instance: Instance) -> Result<Arc<T>> {
    instance
        .downcast::<T>()
        .ok_or_else(|| RuntimeError::TypeMismatch {
            slot: slot.to_string(),
            expected: type_name::<T>(),
            actual: instance.type_name(),
        })
}

/// A scope instance built from a compiled plan.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use scopegen_compiler::{ConstructorMeta, ScopeBuilder, TypeCatalog, TypeMetadata};
/// use scopegen_runtime::{Instance, RecipeTable, ScopeInstance, ValueBindings};
///
/// struct Greeter(String);
///
/// let catalog = TypeCatalog::new()
///     .with_type(TypeMetadata::new("Greeter").constructor(ConstructorMeta::new(["String"])));
/// let plan = ScopeBuilder::create(Arc::new(catalog), "app", "GreetScope")
///     .instance("String")
///     .constructor("Greeter")
///     .compile()
///     .unwrap();
///
/// let recipes = RecipeTable::new().constructor("Greeter", |args| {
///     let name = args.get::<String>(0)?;
///     Ok(Instance::new(Greeter(format!("hello {name}"))))
/// });
/// let values = ValueBindings::new().value("string", String::from("world"));
///
/// let scope = ScopeInstance::new(&plan, recipes, values).unwrap();
/// assert_eq!(scope.resolve::<Greeter>("greeter").unwrap().0, "hello world");
/// ```
#[derive(Clone)]
pub struct ScopeInstance {
    inner: Arc<ScopeInner>,
}

impl ScopeInstance {
    /// Binds `values` and `recipes` to `plan`.
    ///
    /// Nothing is created yet; cached slots are built on first access.
    ///
    /// # Errors
    /// [`RuntimeError::MissingValue`] or [`RuntimeError::UnknownValue`] when
    /// `values` does not match the plan's construction parameters, and
    /// [`RuntimeError::MissingRecipe`] when a callable is not registered.
    /// [`RuntimeError::InvalidPlan`] when the plan has an eager cycle.
    #[instrument(skip_all, name = "scope_open", fields(scope = %plan.qualified_name()))]
    pub fn new(plan: &CompiledScope, recipes: RecipeTable, values: ValueBindings) -> Result<Self> {
        check_graph(plan)?;
        check_values(plan, &values)?;
        check_recipes(plan, &recipes)?;

        let name = plan.qualified_name();
        let mut supplied = values.into_inner();

        let inner = Arc::new_cyclic(|this: &Weak<ScopeInner>| {
            let mut slots = HashMap::with_capacity(plan.slot_count());
            for value in &plan.values {
                if let Some(instance) = supplied.remove(&value.identifier) {
                    slots.insert(value.identifier.clone(), Slot::Value(instance));
                }
            }
            for alias in &plan.aliases {
                slots.insert(
                    alias.identifier.clone(),
                    Slot::Alias {
                        target: alias.target.clone(),
                    },
                );
            }
            for cached in &plan.cached {
                slots.insert(
                    cached.identifier.clone(),
                    Slot::Cached {
                        plan: cached.clone(),
                        cell: Lazy::new(cached.identifier.clone()),
                    },
                );
            }
            for factory in &plan.factories {
                let generated = CurriedFactory {
                    scope: Weak::clone(this),
                    plan: factory.clone(),
                };
                slots.insert(factory.identifier.clone(), Slot::Factory(Instance::new(generated)));
            }
            for injector in &plan.injectors {
                let generated = MethodInjector {
                    scope: Weak::clone(this),
                    plan: injector.clone(),
                };
                slots.insert(injector.identifier.clone(), Slot::Injector(Instance::new(generated)));
            }

            ScopeInner {
                core: ScopeCore::new(name),
                this: Weak::clone(this),
                slots,
                recipes,
            }
        });

        info!(slots = inner.slots.len(), "Scope opened");
        Ok(Self { inner })
    }

    pub fn name(&self) -> &str {
        self.inner.core.name()
    }

    /// The instance in `identifier`, creating it if needed.
    ///
    /// An alias returns the very instance of its target.
    pub fn get(&self, identifier: &str) -> Result<Instance> {
        self.inner.get(identifier)
    }

    /// [`get`](Self::get), downcast to `T`.
    pub fn resolve<T: Any + Send + Sync>(&self, identifier: &str) -> Result<Arc<T>> {
        downcast(identifier, self.get(identifier)?)
    }

    /// A handle that creates `identifier` only when first read.
    pub fn lazy(&self, identifier: &str) -> Result<LazyHandle> {
        if !self.inner.slots.contains_key(identifier) {
            return Err(RuntimeError::UnknownSlot {
                slot: identifier.to_string(),
            });
        }
        Ok(LazyHandle {
            scope: Arc::downgrade(&self.inner),
            identifier: identifier.to_string(),
        })
    }

    pub fn factory(&self, identifier: &str) -> Result<Arc<CurriedFactory>> {
        self.resolve::<CurriedFactory>(identifier)
    }

    pub fn injector(&self, identifier: &str) -> Result<Arc<MethodInjector>> {
        self.resolve::<MethodInjector>(identifier)
    }

    /// State of a cached slot; `None` for other slot kinds.
    pub fn state(&self, identifier: &str) -> Option<LazyState> {
        match self.inner.slots.get(identifier) {
            Some(Slot::Cached { cell, .. }) => Some(cell.state()),
            _ => None,
        }
    }

    /// Number of created resources awaiting teardown.
    pub fn owned_resources(&self) -> usize {
        self.inner.core.owned_count()
    }

    /// Closes every created resource. Later calls do nothing, and no slot
    /// can be created afterwards.
    pub fn close(&self) -> std::result::Result<(), CloseError> {
        self.inner.core.close()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.core.is_closed()
    }
}

impl fmt::Debug for ScopeInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeInstance")
            .field("core", &self.inner.core)
            .field("slots", &self.inner.slots.len())
            .finish()
    }
}

/// Deserialized and hand-built plans never passed compile-time validation.
fn check_graph(plan: &CompiledScope) -> Result<()> {
    GraphValidator::new(plan).validate().map_err(|err| {
        warn!(error = %err, "Rejected plan");
        RuntimeError::InvalidPlan {
            scope: plan.qualified_name(),
            reason: err.to_string(),
        }
    })
}

fn check_values(plan: &CompiledScope, values: &ValueBindings) -> Result<()> {
    let supplied = values.identifiers();

    for value in plan.required_values() {
        if !supplied.contains(&value.identifier.as_str()) {
            return Err(RuntimeError::MissingValue(MissingValueError {
                identifier: value.identifier.clone(),
                descriptor: value.descriptor.clone(),
                suggestions: suggest_similar(&value.identifier, supplied.as_slice(), 3),
            }));
        }
    }

    if let Some(extra) = supplied
        .iter()
        .find(|id| !plan.values.iter().any(|value| value.identifier == **id))
    {
        return Err(RuntimeError::UnknownValue {
            identifier: extra.to_string(),
        });
    }

    debug!(values = supplied.len(), "Construction values bound");
    Ok(())
}

fn check_recipes(plan: &CompiledScope, recipes: &RecipeTable) -> Result<()> {
    for cached in &plan.cached {
        match &cached.recipe {
            Recipe::Constructor { ty } => {
                recipes.find_constructor(ty)?;
            }
            Recipe::Provider {
                holder_type,
                method,
                ..
            } => {
                recipes.find_method(holder_type, method)?;
            }
        }
    }
    for factory in &plan.factories {
        recipes.find_constructor(&factory.product)?;
    }
    for injector in &plan.injectors {
        recipes.find_method(&injector.receiver_type, &injector.target_method)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scopegen_compiler::{AliasSlot, ValueOrigin, ValueSlot};

    fn cached(identifier: &str, ty: &str, arguments: Vec<Argument>) -> CachedSlot {
        CachedSlot {
            ordinal: 0,
            identifier: identifier.to_string(),
            declared: ty.to_string(),
            descriptor: ty.to_string(),
            recipe: Recipe::Constructor { ty: ty.into() },
            arguments,
            close_on_teardown: false,
        }
    }

    fn plan() -> CompiledScope {
        CompiledScope {
            package: String::new(),
            scope_name: "TestScope".to_string(),
            values: vec![ValueSlot {
                identifier: "port".to_string(),
                declared: "Port".to_string(),
                descriptor: "Port".to_string(),
                origin: ValueOrigin::Declared,
            }],
            aliases: vec![AliasSlot {
                identifier: "listener".to_string(),
                declared: "Listener".to_string(),
                descriptor: "Listener".to_string(),
                target: "server".to_string(),
            }],
            cached: vec![cached(
                "server",
                "Server",
                vec![Argument::Slot {
                    identifier: "port".to_string(),
                }],
            )],
            factories: Vec::new(),
            injectors: Vec::new(),
        }
    }

    struct Server(u16);

    fn recipes() -> RecipeTable {
        RecipeTable::new().constructor("Server", |args| {
            Ok(Instance::new(Server(*args.get::<u16>(0)?)))
        })
    }

    #[test]
    fn alias_shares_target_instance() {
        let scope =
            ScopeInstance::new(&plan(), recipes(), ValueBindings::new().value("port", 8080u16))
                .unwrap();
        let server = scope.get("server").unwrap();
        let listener = scope.get("listener").unwrap();
        assert!(server.ptr_eq(&listener));
        assert_eq!(scope.resolve::<Server>("listener").unwrap().0, 8080);
        assert_eq!(scope.state("server"), Some(LazyState::Cached));
        assert_eq!(scope.state("port"), None);
    }

    fn alias(identifier: &str, target: &str) -> AliasSlot {
        AliasSlot {
            identifier: identifier.to_string(),
            declared: "Listener".to_string(),
            descriptor: "Listener".to_string(),
            target: target.to_string(),
        }
    }

    #[test]
    fn alias_cycle_rejected_on_open() {
        let mut plan = plan();
        plan.aliases = vec![alias("listener", "socket"), alias("socket", "listener")];

        let values = ValueBindings::new().value("port", 1u16);
        match ScopeInstance::new(&plan, recipes(), values) {
            Err(RuntimeError::InvalidPlan { scope, reason }) => {
                assert_eq!(scope, "TestScope");
                assert!(reason.contains("listener → socket → listener"), "{reason}");
            }
            other => panic!("Expected InvalidPlan, got: {other:?}"),
        }
    }

    #[test]
    fn self_alias_rejected_on_open() {
        let mut plan = plan();
        plan.aliases = vec![alias("listener", "listener")];

        let values = ValueBindings::new().value("port", 1u16);
        match ScopeInstance::new(&plan, recipes(), values) {
            Err(RuntimeError::InvalidPlan { reason, .. }) => {
                assert!(reason.contains("listener → listener"), "{reason}");
            }
            other => panic!("Expected InvalidPlan, got: {other:?}"),
        }
    }

    #[test]
    fn missing_value_suggests_close_names() {
        let values = ValueBindings::new().value("ports", 1u16);
        match ScopeInstance::new(&plan(), recipes(), values) {
            Err(RuntimeError::MissingValue(err)) => {
                assert_eq!(err.identifier, "port");
                assert_eq!(err.suggestions, vec!["ports"]);
            }
            other => panic!("Expected MissingValue, got: {other:?}"),
        }
    }

    #[test]
    fn unknown_value_rejected() {
        let values = ValueBindings::new().value("port", 1u16).value("host", "x");
        match ScopeInstance::new(&plan(), recipes(), values) {
            Err(RuntimeError::UnknownValue { identifier }) => assert_eq!(identifier, "host"),
            other => panic!("Expected UnknownValue, got: {other:?}"),
        }
    }

    #[test]
    fn missing_recipe_rejected_up_front() {
        let values = ValueBindings::new().value("port", 1u16);
        match ScopeInstance::new(&plan(), RecipeTable::new(), values) {
            Err(RuntimeError::MissingRecipe { recipe }) => assert_eq!(recipe, "Server"),
            other => panic!("Expected MissingRecipe, got: {other:?}"),
        }
    }

    #[test]
    fn wrong_type_reports_both_names() {
        let scope =
            ScopeInstance::new(&plan(), recipes(), ValueBindings::new().value("port", 1u16))
                .unwrap();
        match scope.resolve::<String>("port") {
            Err(RuntimeError::TypeMismatch { slot, actual, .. }) => {
                assert_eq!(slot, "port");
                assert_eq!(actual, "u16");
            }
            other => panic!("Expected TypeMismatch, got: {other:?}"),
        }
        assert!(matches!(
            scope.get("nowhere"),
            Err(RuntimeError::UnknownSlot { .. })
        ));
    }

    #[test]
    fn closed_scope_refuses_creation() {
        let scope =
            ScopeInstance::new(&plan(), recipes(), ValueBindings::new().value("port", 1u16))
                .unwrap();
        scope.close().unwrap();
        assert!(scope.is_closed());
        match scope.get("server") {
            Err(RuntimeError::ScopeClosed { slot }) => assert_eq!(slot, "server"),
            other => panic!("Expected ScopeClosed, got: {other:?}"),
        }
    }

    #[test]
    fn lazy_handle_outlived_by_nothing() {
        let scope =
            ScopeInstance::new(&plan(), recipes(), ValueBindings::new().value("port", 1u16))
                .unwrap();
        let handle = scope.lazy("server").unwrap();
        assert_eq!(scope.state("server"), Some(LazyState::Empty));
        assert_eq!(handle.resolve::<Server>().unwrap().0, 1);

        drop(scope);
        assert!(matches!(handle.get(), Err(RuntimeError::ScopeClosed { .. })));
    }
}
