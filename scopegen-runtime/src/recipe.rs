//! Callables and construction values a plan is run with.
//!
//! A [`CompiledScope`](scopegen_compiler::CompiledScope) names constructors
//! and methods by type; a [`RecipeTable`] maps those names to Rust closures.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use scopegen_compiler::TypeDescriptor;
use tracing::trace;

use crate::error::{BoxError, Result, RuntimeError};
use crate::instance::{Arguments, Instance};

/// Builds an instance of one type from its constructor arguments.
pub type ConstructorFn =
    Arc<dyn Fn(&Arguments) -> std::result::Result<Instance, BoxError> + Send + Sync>;

/// Calls a method on a receiver. `Ok(None)` means the method returned nothing.
pub type MethodFn = Arc<
    dyn Fn(&Instance, &Arguments) -> std::result::Result<Option<Instance>, BoxError> + Send + Sync,
>;

/// Constructors keyed by raw type name, methods by `(type, method)`.
#[derive(Default, Clone)]
pub struct RecipeTable {
    constructors: HashMap<String, ConstructorFn>,
    methods: HashMap<(String, String), MethodFn>,
}

impl RecipeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the constructor of `ty`.
    pub fn constructor(
        mut self,
        ty: impl Into<String>,
        recipe: impl Fn(&Arguments) -> std::result::Result<Instance, BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.constructors.insert(ty.into(), Arc::new(recipe));
        self
    }

    /// Registers `ty#method`, used by provider slots and method injectors.
    pub fn method(
        mut self,
        ty: impl Into<String>,
        method: impl Into<String>,
        recipe: impl Fn(&Instance, &Arguments) -> std::result::Result<Option<Instance>, BoxError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.methods
            .insert((ty.into(), method.into()), Arc::new(recipe));
        self
    }

    pub(crate) fn find_constructor(&self, ty: &TypeDescriptor) -> Result<&ConstructorFn> {
        trace!(ty = %ty, "Looking up constructor");
        self.constructors
            .get(ty.raw_name())
            .ok_or_else(|| RuntimeError::MissingRecipe {
                recipe: ty.to_string(),
            })
    }

    pub(crate) fn find_method(&self, ty: &TypeDescriptor, method: &str) -> Result<&MethodFn> {
        trace!(ty = %ty, method = %method, "Looking up method");
        self.methods
            .get(&(ty.raw_name().to_string(), method.to_string()))
            .ok_or_else(|| RuntimeError::MissingRecipe {
                recipe: format!("{ty}#{method}"),
            })
    }
}

impl fmt::Debug for RecipeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut constructors: Vec<&String> = self.constructors.keys().collect();
        constructors.sort();
        let mut methods: Vec<String> = self
            .methods
            .keys()
            .map(|(ty, method)| format!("{ty}#{method}"))
            .collect();
        methods.sort();
        f.debug_struct("RecipeTable")
            .field("constructors", &constructors)
            .field("methods", &methods)
            .finish()
    }
}

/// Values supplied for a scope's construction parameters, by identifier.
#[derive(Debug, Default, Clone)]
pub struct ValueBindings {
    values: BTreeMap<String, Instance>,
}

impl ValueBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, identifier: impl Into<String>, instance: Instance) -> Self {
        self.values.insert(identifier.into(), instance);
        self
    }

    /// Shorthand for `bind(identifier, Instance::new(value))`.
    pub fn value<T: Any + Send + Sync>(self, identifier: impl Into<String>, value: T) -> Self {
        self.bind(identifier, Instance::new(value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn identifiers(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }

    pub(crate) fn into_inner(self) -> BTreeMap<String, Instance> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_keyed_by_raw_name() {
        let table = RecipeTable::new().constructor("Registry", |_| Ok(Instance::new(0u8)));
        let generic = TypeDescriptor::generic("Registry", vec!["Handler".into()]);
        assert!(table.find_constructor(&generic).is_ok());

        match table.find_constructor(&"Missing".into()) {
            Err(RuntimeError::MissingRecipe { recipe }) => assert_eq!(recipe, "Missing"),
            Err(other) => panic!("Expected MissingRecipe, got: {other:?}"),
            Ok(_) => panic!("Expected MissingRecipe"),
        }
    }

    #[test]
    fn missing_method_names_type_and_method() {
        let table = RecipeTable::new().method("Store", "open", |_, _| Ok(None));
        assert!(table.find_method(&"Store".into(), "open").is_ok());
        match table.find_method(&"Store".into(), "close") {
            Err(RuntimeError::MissingRecipe { recipe }) => assert_eq!(recipe, "Store#close"),
            Err(other) => panic!("Expected MissingRecipe, got: {other:?}"),
            Ok(_) => panic!("Expected MissingRecipe"),
        }
    }

    #[test]
    fn bindings_sorted_by_identifier() {
        let values = ValueBindings::new().value("port", 80u16).value("host", "localhost");
        assert_eq!(values.identifiers(), vec!["host", "port"]);
        assert_eq!(values.len(), 2);
    }
}
