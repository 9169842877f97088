//! Graph resolver: turns a [`ScopeBuilder`]'s declarations into a plan.
//!
//! One [`ScopeCompiler`] runs one compile. It owns all session state: the
//! slot-ordinal counter, the satisfied and required key sets and the FIFO
//! queue of pending factories.
//!
//! # Phases
//! ```text
//! seed values + alias sources
//!   → constructor bindings → provider holders → method injectors
//!   → alias slots → drain factory queue → implicit values
//!   → identifier check → cycle validation
//! ```
//!
//! Building the key of any parameter registers it as required. An
//! auto-factory key that is not yet satisfied is appended to the factory
//! queue, which is drained to exhaustion: building one factory may
//! discover further ones.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tracing::{debug, info, instrument, trace};

use scopegen_support::rendering::suggest_similar;

use crate::builder::{Declarations, ScopeBuilder};
use crate::descriptor::TypeDescriptor;
use crate::error::{CompileError, DuplicateBindingError, NotRegisteredError, Result};
use crate::graph::GraphValidator;
use crate::key::{DependencyKey, DirectKey, QualifiedType};
use crate::metadata::{MetadataSource, MethodMeta};
use crate::plan::{
    AliasSlot, Argument, BindingKind, CachedSlot, CompiledScope, FactorySlot, InjectorSlot, Recipe,
    ValueOrigin, ValueSlot,
};

/// How many "did you mean" suggestions to attach to an unbound key.
const MAX_SUGGESTIONS: usize = 3;

/// A single compile session.
pub struct ScopeCompiler {
    catalog: Arc<dyn MetadataSource>,
    package: String,
    scope_name: String,
    require_explicit_values: bool,
    declarations: Declarations,

    next_ordinal: usize,
    satisfied: HashMap<DirectKey, BindingKind>,
    /// Keys needed by some binding, in discovery order
    required: Vec<DirectKey>,
    required_seen: HashSet<DirectKey>,
    /// First binding that needed each key (for error messages)
    required_by: HashMap<DirectKey, String>,
    pending_factories: VecDeque<QualifiedType>,

    values: Vec<ValueSlot>,
    aliases: Vec<AliasSlot>,
    cached: Vec<CachedSlot>,
    factories: Vec<FactorySlot>,
    injectors: Vec<InjectorSlot>,
}

impl ScopeCompiler {
    pub fn new(builder: ScopeBuilder) -> Self {
        let pending_factories = builder.declarations.factories.iter().cloned().collect();
        Self {
            catalog: builder.catalog,
            package: builder.package,
            scope_name: builder.scope_name,
            require_explicit_values: builder.require_explicit_values,
            declarations: builder.declarations,
            next_ordinal: 0,
            satisfied: HashMap::new(),
            required: Vec::new(),
            required_seen: HashSet::new(),
            required_by: HashMap::new(),
            pending_factories,
            values: Vec::new(),
            aliases: Vec::new(),
            cached: Vec::new(),
            factories: Vec::new(),
            injectors: Vec::new(),
        }
    }

    /// Runs every phase and returns the finished plan.
    ///
    /// # Errors
    /// The first configuration error found. No partial plan is returned.
    #[instrument(skip(self), name = "scope_compile", fields(scope = %self.scope_name))]
    pub fn compile(mut self) -> Result<CompiledScope> {
        info!(
            values = self.declarations.values.len(),
            constructors = self.declarations.constructors.len(),
            aliases = self.declarations.aliases.len(),
            providers = self.declarations.providers.len(),
            factories = self.declarations.factories.len(),
            injected = self.declarations.injected.len(),
            "Compiling scope"
        );

        self.seed()?;
        self.constructor_bindings()?;
        self.provider_bindings()?;
        self.method_injectors()?;
        self.alias_slots()?;
        self.drain_factories()?;
        self.implicit_values()?;

        let plan = CompiledScope {
            package: self.package,
            scope_name: self.scope_name,
            values: self.values,
            aliases: self.aliases,
            cached: self.cached,
            factories: self.factories,
            injectors: self.injectors,
        };

        plan.check_identifiers()?;
        GraphValidator::new(&plan).validate()?;

        info!(
            required_values = plan.values.len(),
            aliases = plan.aliases.len(),
            cached = plan.cached.len(),
            factories = plan.factories.len(),
            injectors = plan.injectors.len(),
            "Scope compiled"
        );
        Ok(plan)
    }

    // ── Phases ──

    /// Declared values and alias sources are satisfied before anything else.
    fn seed(&mut self) -> Result<()> {
        let values = std::mem::take(&mut self.declarations.values);
        for ty in &values {
            let key = DirectKey::from_type(ty)?;
            self.mark_satisfied(&key, BindingKind::Value)?;
            self.values.push(ValueSlot {
                identifier: key.identifier().to_string(),
                declared: key.ty().simple_name(),
                descriptor: key.descriptor().to_string(),
                origin: ValueOrigin::Declared,
            });
        }

        let sources: Vec<DirectKey> = self
            .declarations
            .aliases
            .iter()
            .map(|alias| alias.dependency.clone())
            .collect();
        for key in &sources {
            self.mark_satisfied(key, BindingKind::Alias)?;
        }

        debug!(values = values.len(), aliases = sources.len(), "Seeded satisfied keys");
        Ok(())
    }

    fn constructor_bindings(&mut self) -> Result<()> {
        let catalog = Arc::clone(&self.catalog);
        let constructors = std::mem::take(&mut self.declarations.constructors);

        for ty in constructors {
            let meta = catalog.require(ty.raw_name())?;
            let constructor = meta.select_constructor()?;
            let key = DirectKey::from_type(&QualifiedType::plain(ty.clone()))?;
            self.mark_satisfied(&key, BindingKind::Constructor)?;

            let arguments = self.arguments(&constructor.params, key.descriptor())?;
            let close_on_teardown = catalog.is_closeable(&ty);
            self.push_cached(key, Recipe::Constructor { ty }, arguments, close_on_teardown);
        }

        debug!(cached = self.cached.len(), "Resolved constructor bindings");
        Ok(())
    }

    fn provider_bindings(&mut self) -> Result<()> {
        let catalog = Arc::clone(&self.catalog);
        let holders = std::mem::take(&mut self.declarations.providers);

        for holder_type in holders {
            let holder_label = format!("providers of {holder_type}");
            let holder = self.require(&QualifiedType::plain(holder_type.clone()), &holder_label)?;
            let meta = catalog.require(holder_type.raw_name())?;

            for method in meta.sorted_methods() {
                if !method.provides {
                    continue;
                }
                if !method.public {
                    return Err(CompileError::ProviderMethodNotPublic {
                        holder: holder_type.simple_name(),
                        method: method.name.clone(),
                    });
                }
                let Some(returns) = &method.returns else {
                    return Err(CompileError::ProviderWithoutProduct {
                        holder: holder_type.simple_name(),
                        method: method.name.clone(),
                    });
                };

                let provided = QualifiedType::new(returns.clone(), method.qualifiers.clone());
                let key = DirectKey::from_type(&provided)?;
                self.mark_satisfied(&key, BindingKind::Provider)?;

                let arguments = self.arguments(&method.params, key.descriptor())?;
                let recipe = Recipe::Provider {
                    holder: holder.identifier().to_string(),
                    holder_type: holder_type.clone(),
                    method: method.name.clone(),
                };
                self.push_cached(key, recipe, arguments, catalog.is_closeable(returns));
            }
        }

        debug!(cached = self.cached.len(), "Resolved provider bindings");
        Ok(())
    }

    fn method_injectors(&mut self) -> Result<()> {
        let catalog = Arc::clone(&self.catalog);
        let receivers = std::mem::take(&mut self.declarations.injected);

        for receiver_type in receivers {
            let label = format!("injectors of {receiver_type}");
            let receiver = self.require(&receiver_type, &label)?;
            let meta = catalog.require(receiver_type.ty.raw_name())?;

            for method in meta.sorted_methods() {
                let interface = match (&method.inject_as, method.inject) {
                    (Some(interface), _) => interface.clone(),
                    (None, true) => TypeDescriptor::returner(
                        method.returns.clone().unwrap_or_else(TypeDescriptor::unit),
                    ),
                    (None, false) => continue,
                };

                let implemented = catalog.single_method(&interface)?;
                let identifier = format!("{}_{}", receiver_type.ty.raw_name(), method.name);
                let target = format!("{}#{}", receiver_type.ty, method.name);
                let arguments =
                    self.curried_arguments(&interface, &implemented, &method.params, &target)?;

                trace!(injector = %identifier, interface = %interface, "Generated method injector");
                self.injectors.push(InjectorSlot {
                    identifier,
                    interface,
                    method: implemented.name.clone(),
                    parameters: descriptors(&implemented.params),
                    receiver: receiver.identifier().to_string(),
                    receiver_type: receiver_type.ty.clone(),
                    target_method: method.name.clone(),
                    arguments,
                    returns_unit: method.returns.is_none(),
                });
            }
        }

        debug!(injectors = self.injectors.len(), "Resolved method injectors");
        Ok(())
    }

    /// Each alias reads its target's slot; the target becomes required.
    ///
    /// The target key is rebuilt from its type so an `@AutoFactory` target
    /// is queued like any other discovered factory.
    fn alias_slots(&mut self) -> Result<()> {
        let aliases = std::mem::take(&mut self.declarations.aliases);

        for alias in aliases {
            let target = DependencyKey::for_type(alias.satisfied_by.qualified())?;
            self.register_required(&target, alias.dependency.descriptor());
            self.aliases.push(AliasSlot {
                identifier: alias.dependency.identifier().to_string(),
                declared: alias.dependency.ty().simple_name(),
                descriptor: alias.dependency.descriptor().to_string(),
                target: alias.satisfied_by.identifier().to_string(),
            });
        }

        debug!(aliases = self.aliases.len(), "Resolved alias slots");
        Ok(())
    }

    /// FIFO drain; factories discovered while building others are appended.
    fn drain_factories(&mut self) -> Result<()> {
        let catalog = Arc::clone(&self.catalog);

        while let Some(interface) = self.pending_factories.pop_front() {
            let key = DependencyKey::for_type(&interface)?;
            let direct = key.into_direct()?;
            if self.satisfied.contains_key(&direct) {
                trace!(key = %direct, "Factory already satisfied");
                continue;
            }
            self.mark_satisfied(&direct, BindingKind::Factory)?;

            let implemented = catalog.single_method(&interface.ty)?;
            let Some(product) = implemented.returns.clone() else {
                return Err(CompileError::FactoryWithoutProduct {
                    interface: interface.ty.simple_name(),
                    method: implemented.name.clone(),
                });
            };
            let constructor = catalog.require(product.raw_name())?.select_constructor()?;
            let target = format!("{product} constructor");
            let arguments =
                self.curried_arguments(&interface.ty, &implemented, &constructor.params, &target)?;

            trace!(factory = %direct, product = %product, "Generated curried factory");
            self.factories.push(FactorySlot {
                identifier: direct.identifier().to_string(),
                declared: direct.ty().simple_name(),
                descriptor: direct.descriptor().to_string(),
                method: implemented.name.clone(),
                parameters: descriptors(&implemented.params),
                product,
                arguments,
            });
        }

        debug!(factories = self.factories.len(), "Drained factory queue");
        Ok(())
    }

    /// Required keys nobody satisfied become construction parameters.
    fn implicit_values(&mut self) -> Result<()> {
        let required = std::mem::take(&mut self.required);

        for key in required {
            if self.satisfied.contains_key(&key) {
                continue;
            }

            if self.require_explicit_values {
                let available: Vec<&str> = self.satisfied.keys().map(DirectKey::descriptor).collect();
                let suggestions = suggest_similar(key.descriptor(), &available, MAX_SUGGESTIONS);
                return Err(CompileError::NotRegistered(NotRegisteredError {
                    required_by: self.required_by.get(&key).cloned(),
                    requested: key,
                    suggestions,
                }));
            }

            debug!(key = %key, slot = %key.identifier(), "Surfacing implicit value");
            self.values.push(ValueSlot {
                identifier: key.identifier().to_string(),
                declared: key.ty().simple_name(),
                descriptor: key.descriptor().to_string(),
                origin: ValueOrigin::Implicit,
            });
        }

        Ok(())
    }

    // ── Helpers ──

    fn mark_satisfied(&mut self, key: &DirectKey, kind: BindingKind) -> Result<()> {
        if let Some(&first) = self.satisfied.get(key) {
            return Err(CompileError::DuplicateBinding(DuplicateBindingError {
                key: key.clone(),
                first,
                second: kind,
            }));
        }
        debug!(key = %key, kind = %kind, "Key satisfied");
        self.satisfied.insert(key.clone(), kind);
        Ok(())
    }

    /// Notes that `requirer` needs `key`; enqueues unsatisfied auto-factories.
    fn register_required(&mut self, key: &DependencyKey, requirer: &str) {
        let direct = key.direct();
        if self.required_seen.insert(direct.clone()) {
            trace!(key = %direct, requirer = %requirer, "Key required");
            self.required.push(direct.clone());
            self.required_by.insert(direct.clone(), requirer.to_string());
        }

        if key.is_auto_factory() && !self.satisfied.contains_key(direct) {
            trace!(key = %direct, "Enqueued auto-factory");
            self.pending_factories.push_back(direct.qualified().clone());
        }
    }

    /// Builds and registers a key that must be direct.
    fn require(&mut self, ty: &QualifiedType, requirer: &str) -> Result<DirectKey> {
        let key = DependencyKey::for_type(ty)?;
        self.register_required(&key, requirer);
        key.into_direct()
    }

    /// Every parameter is read from the scope.
    fn arguments(&mut self, params: &[QualifiedType], requirer: &str) -> Result<Vec<Argument>> {
        let requirer = requirer.to_string();
        params
            .iter()
            .map(|param| {
                let key = DependencyKey::for_type(param)?;
                self.register_required(&key, &requirer);
                Ok(scope_argument(&key))
            })
            .collect()
    }

    /// Target parameters equal to an unused interface parameter are passed
    /// through; the rest are read from the scope.
    ///
    /// # Errors
    /// [`CompileError::UnmatchedFactoryParameter`] if an interface parameter
    /// is left over.
    fn curried_arguments(
        &mut self,
        interface: &TypeDescriptor,
        implemented: &MethodMeta,
        target_params: &[QualifiedType],
        target: &str,
    ) -> Result<Vec<Argument>> {
        let implemented_keys = implemented
            .params
            .iter()
            .map(DependencyKey::for_type)
            .collect::<Result<Vec<_>>>()?;
        let mut used = vec![false; implemented_keys.len()];
        let mut arguments = Vec::with_capacity(target_params.len());

        for param in target_params {
            let key = DependencyKey::for_type(param)?;
            let matched = implemented_keys
                .iter()
                .enumerate()
                .position(|(index, candidate)| !used[index] && *candidate == key);

            match matched {
                Some(index) => {
                    used[index] = true;
                    arguments.push(Argument::Curried { index });
                }
                None => {
                    self.register_required(&key, target);
                    arguments.push(scope_argument(&key));
                }
            }
        }

        if let Some(index) = used.iter().position(|u| !u) {
            return Err(CompileError::UnmatchedFactoryParameter {
                interface: interface.simple_name(),
                method: implemented.name.clone(),
                parameter: implemented_keys[index].descriptor().into_owned(),
                target: target.to_string(),
            });
        }

        Ok(arguments)
    }

    fn push_cached(
        &mut self,
        key: DirectKey,
        recipe: Recipe,
        arguments: Vec<Argument>,
        close_on_teardown: bool,
    ) {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;

        trace!(slot = %key.identifier(), ordinal, "Cached slot planned");
        self.cached.push(CachedSlot {
            ordinal,
            identifier: key.identifier().to_string(),
            declared: key.ty().simple_name(),
            descriptor: key.descriptor().to_string(),
            recipe,
            arguments,
            close_on_teardown,
        });
    }
}

fn scope_argument(key: &DependencyKey) -> Argument {
    let identifier = key.identifier().to_string();
    if key.is_lazy() {
        Argument::Lazy { identifier }
    } else {
        Argument::Slot { identifier }
    }
}

fn descriptors(params: &[QualifiedType]) -> Vec<String> {
    params.iter().map(QualifiedType::descriptor).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeDescriptor;
    use crate::metadata::{ConstructorMeta, TypeCatalog, TypeMetadata};
    use crate::qualifier::{QualifierSet, QualifierTag};

    fn auto_factory(name: &str) -> QualifiedType {
        QualifiedType::new(
            name,
            QualifierSet::new([QualifierTag::auto_factory()]).unwrap(),
        )
    }

    fn builder(catalog: TypeCatalog) -> ScopeBuilder {
        ScopeBuilder::create(Arc::new(catalog), "app", "TestScope")
    }

    #[test]
    fn unbound_parameter_surfaces_as_value() {
        let catalog = TypeCatalog::new().with_type(
            TypeMetadata::new("Service").constructor(ConstructorMeta::new(["Config", "Clock"])),
        );
        let plan = builder(catalog).constructor("Service").compile().unwrap();

        let names: Vec<&str> = plan.values.iter().map(|v| v.identifier.as_str()).collect();
        assert_eq!(names, vec!["config", "clock"]);
        assert!(plan.values.iter().all(|v| v.origin == ValueOrigin::Implicit));
    }

    #[test]
    fn declared_values_come_first() {
        let catalog = TypeCatalog::new().with_type(
            TypeMetadata::new("Service").constructor(ConstructorMeta::new(["Clock", "Config"])),
        );
        let plan = builder(catalog)
            .constructor("Service")
            .instance("Config")
            .compile()
            .unwrap();

        let names: Vec<&str> = plan.values.iter().map(|v| v.identifier.as_str()).collect();
        assert_eq!(names, vec!["config", "clock"]);
        assert_eq!(plan.values[0].origin, ValueOrigin::Declared);
        assert_eq!(plan.values[1].origin, ValueOrigin::Implicit);
    }

    #[test]
    fn require_explicit_values_reports_missing() {
        let catalog = TypeCatalog::new().with_type(
            TypeMetadata::new("Service").constructor(ConstructorMeta::new(["Configs"])),
        );
        let result = builder(catalog)
            .require_explicit_values(true)
            .instance("Config")
            .constructor("Service")
            .compile();

        match result {
            Err(CompileError::NotRegistered(e)) => {
                assert_eq!(e.requested.descriptor(), "Configs");
                assert_eq!(e.required_by.as_deref(), Some("Service"));
                assert_eq!(e.suggestions, vec!["Config"]);
            }
            other => panic!("Expected NotRegistered, got: {other:?}"),
        }
    }

    #[test]
    fn lazy_parameter_reads_same_slot() {
        let catalog = TypeCatalog::new()
            .with_type(
                TypeMetadata::new("Service")
                    .constructor(ConstructorMeta::new([TypeDescriptor::lazy("Clock".into())])),
            )
            .with_type(TypeMetadata::new("Clock").constructor(ConstructorMeta::new(
                Vec::<QualifiedType>::new(),
            )));
        let plan = builder(catalog)
            .constructors(["Service", "Clock"])
            .compile()
            .unwrap();

        assert!(plan.values.is_empty());
        assert_eq!(
            plan.cached[0].arguments,
            vec![Argument::Lazy {
                identifier: "clock".to_string()
            }]
        );
    }

    #[test]
    fn provider_holder_becomes_required() {
        let catalog = TypeCatalog::new().with_type(
            TypeMetadata::new("StoreModule")
                .method(MethodMeta::new("disk").returns("DiskStore").param("Path").provides())
                .method(MethodMeta::new("helper").returns("Path")),
        );
        let plan = builder(catalog).provider("StoreModule").compile().unwrap();

        let names: Vec<&str> = plan.values.iter().map(|v| v.identifier.as_str()).collect();
        assert_eq!(names, vec!["storeModule", "path"]);
        assert_eq!(plan.cached.len(), 1);
        assert_eq!(
            plan.cached[0].recipe,
            Recipe::Provider {
                holder: "storeModule".to_string(),
                holder_type: "StoreModule".into(),
                method: "disk".to_string(),
            }
        );
    }

    #[test]
    fn provider_methods_sorted_and_qualified() {
        let catalog = TypeCatalog::new().with_type(
            TypeMetadata::new("Settings")
                .method(
                    MethodMeta::new("port")
                        .returns("Int")
                        .qualifiers(QualifierSet::from_markers(["Port"]))
                        .provides(),
                )
                .method(
                    MethodMeta::new("host")
                        .returns("String")
                        .qualifiers(QualifierSet::new([QualifierTag::named("Config", "host").unwrap()]).unwrap())
                        .provides(),
                ),
        );
        let plan = builder(catalog).instance("Settings").provider("Settings").compile().unwrap();

        let slots: Vec<(&str, usize)> = plan
            .cached
            .iter()
            .map(|c| (c.identifier.as_str(), c.ordinal))
            .collect();
        assert_eq!(slots, vec![("string_0Config_host", 0), ("int_0Port", 1)]);
    }

    #[test]
    fn private_provider_method_rejected() {
        let catalog = TypeCatalog::new().with_type(
            TypeMetadata::new("Holder").method(MethodMeta::new("secret").returns("Key").provides().private()),
        );
        match builder(catalog).provider("Holder").compile() {
            Err(CompileError::ProviderMethodNotPublic { method, .. }) => assert_eq!(method, "secret"),
            other => panic!("Expected ProviderMethodNotPublic, got: {other:?}"),
        }
    }

    #[test]
    fn provider_without_return_rejected() {
        let catalog = TypeCatalog::new()
            .with_type(TypeMetadata::new("Holder").method(MethodMeta::new("setup").provides()));
        match builder(catalog).provider("Holder").compile() {
            Err(CompileError::ProviderWithoutProduct { .. }) => {}
            other => panic!("Expected ProviderWithoutProduct, got: {other:?}"),
        }
    }

    #[test]
    fn duplicate_binding_rejected() {
        let catalog = TypeCatalog::new().with_type(
            TypeMetadata::new("Config").constructor(ConstructorMeta::new(Vec::<QualifiedType>::new())),
        );
        match builder(catalog).instance("Config").constructor("Config").compile() {
            Err(CompileError::DuplicateBinding(e)) => {
                assert_eq!(e.first, BindingKind::Value);
                assert_eq!(e.second, BindingKind::Constructor);
            }
            other => panic!("Expected DuplicateBinding, got: {other:?}"),
        }
    }

    #[test]
    fn nested_auto_factories_discovered() {
        let catalog = TypeCatalog::new()
            .with_type(TypeMetadata::new("Service").constructor(ConstructorMeta::new([
                auto_factory("WidgetFactory"),
            ])))
            .with_type(
                TypeMetadata::new("WidgetFactory")
                    .method(MethodMeta::new("make").param("Color").returns("Widget")),
            )
            .with_type(TypeMetadata::new("Widget").constructor(ConstructorMeta::new([
                QualifiedType::from("Color"),
                auto_factory("GearFactory"),
            ])))
            .with_type(
                TypeMetadata::new("GearFactory").method(MethodMeta::new("make").returns("Gear")),
            )
            .with_type(
                TypeMetadata::new("Gear").constructor(ConstructorMeta::new(["Metal"])),
            );

        let plan = builder(catalog).constructor("Service").compile().unwrap();

        let factories: Vec<&str> = plan.factories.iter().map(|f| f.identifier.as_str()).collect();
        assert_eq!(
            factories,
            vec!["widgetFactory_0AutoFactory", "gearFactory_0AutoFactory"]
        );
        assert_eq!(
            plan.factories[0].arguments,
            vec![
                Argument::Curried { index: 0 },
                Argument::Slot {
                    identifier: "gearFactory_0AutoFactory".to_string()
                },
            ]
        );
        let values: Vec<&str> = plan.values.iter().map(|v| v.identifier.as_str()).collect();
        assert_eq!(values, vec!["metal"]);
    }

    #[test]
    fn unmatched_factory_parameter_rejected() {
        let catalog = TypeCatalog::new()
            .with_type(
                TypeMetadata::new("WidgetFactory")
                    .method(MethodMeta::new("make").param("Size").returns("Widget")),
            )
            .with_type(TypeMetadata::new("Widget").constructor(ConstructorMeta::new(["Color"])));

        match builder(catalog).factory("WidgetFactory").compile() {
            Err(CompileError::UnmatchedFactoryParameter { parameter, .. }) => {
                assert_eq!(parameter, "Size");
            }
            other => panic!("Expected UnmatchedFactoryParameter, got: {other:?}"),
        }
    }

    #[test]
    fn method_injectors_generated() {
        let catalog = TypeCatalog::new().with_type(
            TypeMetadata::new("Handler")
                .constructor(ConstructorMeta::new(Vec::<QualifiedType>::new()))
                .method(MethodMeta::new("refresh").param("Clock").inject())
                .method(MethodMeta::new("render").param("Page").param("Theme").returns("Html").inject_as("Renderer"))
                .method(MethodMeta::new("ignored")),
        )
        .with_type(
            TypeMetadata::new("Renderer")
                .method(MethodMeta::new("apply").param("Page").returns("Html")),
        );

        let plan = builder(catalog)
            .constructor_and_inject_methods("Handler")
            .compile()
            .unwrap();

        let ids: Vec<&str> = plan.injectors.iter().map(|i| i.identifier.as_str()).collect();
        assert_eq!(ids, vec!["Handler_refresh", "Handler_render"]);

        let refresh = &plan.injectors[0];
        assert_eq!(refresh.interface.to_string(), "Returner<Unit>");
        assert_eq!(refresh.method, "get");
        assert!(refresh.returns_unit);
        assert_eq!(refresh.receiver, "handler");

        let render = &plan.injectors[1];
        assert!(!render.returns_unit);
        assert_eq!(
            render.arguments,
            vec![
                Argument::Curried { index: 0 },
                Argument::Slot {
                    identifier: "theme".to_string()
                },
            ]
        );

        let values: Vec<&str> = plan.values.iter().map(|v| v.identifier.as_str()).collect();
        assert_eq!(values, vec!["clock", "theme"]);
    }

    #[test]
    fn compile_time_cycle_rejected() {
        let catalog = TypeCatalog::new()
            .with_type(TypeMetadata::new("A").constructor(ConstructorMeta::new(["B"])))
            .with_type(TypeMetadata::new("B").constructor(ConstructorMeta::new(["A"])));
        match builder(catalog).constructors(["A", "B"]).compile() {
            Err(CompileError::CircularDependency(e)) => {
                assert_eq!(e.chain, vec!["a", "b", "a"]);
            }
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }
    }

    #[test]
    fn duplicate_identifier_rejected() {
        // `ListFoo` and `List<Foo>` both derive `listFoo`.
        let catalog = TypeCatalog::new().with_type(
            TypeMetadata::new("Service").constructor(ConstructorMeta::new([
                QualifiedType::from("ListFoo"),
                QualifiedType::plain(TypeDescriptor::generic("List", vec!["Foo".into()])),
            ])),
        );
        match builder(catalog).constructor("Service").compile() {
            Err(CompileError::DuplicateIdentifier { identifier, .. }) => {
                assert_eq!(identifier, "listFoo");
            }
            other => panic!("Expected DuplicateIdentifier, got: {other:?}"),
        }
    }

    #[test]
    fn auto_factory_alias_target_generates_factory() {
        let catalog = TypeCatalog::new()
            .with_type(
                TypeMetadata::new("WidgetFactory")
                    .method(MethodMeta::new("make").param("Size").returns("Widget")),
            )
            .with_type(TypeMetadata::new("Widget").constructor(ConstructorMeta::new(["Size"])));

        let plan = builder(catalog)
            .satisfy("WidgetFactory")
            .with(auto_factory("WidgetFactory"))
            .unwrap()
            .compile()
            .unwrap();

        assert!(plan.values.is_empty());
        assert_eq!(plan.factories.len(), 1);
        assert_eq!(plan.factories[0].identifier, "widgetFactory_0AutoFactory");
        assert_eq!(plan.factories[0].arguments, vec![Argument::Curried { index: 0 }]);
        assert_eq!(plan.aliases[0].identifier, "widgetFactory");
        assert_eq!(plan.aliases[0].target, "widgetFactory_0AutoFactory");
    }
}
