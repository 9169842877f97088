//! The emission plan produced by a successful compile.
//!
//! A [`CompiledScope`] lists every slot of the generated scope in emission
//! order together with its recipe. It is plain data: a code emitter renders
//! it to source text, and `scopegen-runtime` can interpret it directly.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::descriptor::TypeDescriptor;
use crate::error::{CompileError, Result};

/// How a key is satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    Value,
    Constructor,
    Provider,
    Alias,
    Factory,
    Injector,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value => write!(f, "value"),
            Self::Constructor => write!(f, "constructor"),
            Self::Provider => write!(f, "provider"),
            Self::Alias => write!(f, "alias"),
            Self::Factory => write!(f, "factory"),
            Self::Injector => write!(f, "injector"),
        }
    }
}

/// Where a value slot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueOrigin {
    /// Declared with `instance(..)`.
    Declared,
    /// Required by some binding but never bound.
    Implicit,
}

/// An externally supplied value; one scope-construction parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSlot {
    pub identifier: String,
    /// Declared public type, e.g. `List<Handler>`.
    pub declared: String,
    pub descriptor: String,
    pub origin: ValueOrigin,
}

/// A key redirected to another slot's cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasSlot {
    pub identifier: String,
    pub declared: String,
    pub descriptor: String,
    /// Identifier of the slot that actually holds the instance.
    pub target: String,
}

/// How a cached slot produces its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recipe {
    /// Call the selected constructor of `ty`.
    Constructor { ty: TypeDescriptor },
    /// Call `method` on the instance in slot `holder`.
    Provider {
        holder: String,
        holder_type: TypeDescriptor,
        method: String,
    },
}

/// One positional argument of a recipe call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Argument {
    /// The instance in the named slot.
    Slot { identifier: String },
    /// A lazy handle to the named slot.
    Lazy { identifier: String },
    /// The caller's argument at this position of the interface method.
    Curried { index: usize },
}

impl Argument {
    /// The slot this argument reads, if any.
    pub fn slot(&self) -> Option<&str> {
        match self {
            Self::Slot { identifier } | Self::Lazy { identifier } => Some(identifier.as_str()),
            Self::Curried { .. } => None,
        }
    }
}

/// A memoized slot created on first access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSlot {
    /// Discovery order within the compile session.
    pub ordinal: usize,
    pub identifier: String,
    pub declared: String,
    pub descriptor: String,
    pub recipe: Recipe,
    pub arguments: Vec<Argument>,
    /// Register the created value with the scope for teardown.
    pub close_on_teardown: bool,
}

/// A generated curried factory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorySlot {
    pub identifier: String,
    pub declared: String,
    pub descriptor: String,
    /// The interface method being implemented.
    pub method: String,
    /// Descriptors of the interface method parameters.
    pub parameters: Vec<String>,
    /// The type whose constructor the factory calls.
    pub product: TypeDescriptor,
    /// Constructor arguments.
    pub arguments: Vec<Argument>,
}

/// A generated forwarder to a method on a scope-held receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectorSlot {
    /// `{Receiver}_{method}`.
    pub identifier: String,
    pub interface: TypeDescriptor,
    /// The interface method being implemented.
    pub method: String,
    pub parameters: Vec<String>,
    /// Identifier of the receiver slot.
    pub receiver: String,
    pub receiver_type: TypeDescriptor,
    /// Method called on the receiver.
    pub target_method: String,
    pub arguments: Vec<Argument>,
    /// The target method returns nothing; the injector yields `Unit`.
    pub returns_unit: bool,
}

/// Borrowed view of any slot in a [`CompiledScope`].
#[derive(Debug, Clone, Copy)]
pub enum SlotRef<'a> {
    Value(&'a ValueSlot),
    Alias(&'a AliasSlot),
    Cached(&'a CachedSlot),
    Factory(&'a FactorySlot),
    Injector(&'a InjectorSlot),
}

impl<'a> SlotRef<'a> {
    pub fn identifier(&self) -> &'a str {
        match *self {
            Self::Value(slot) => &slot.identifier,
            Self::Alias(slot) => &slot.identifier,
            Self::Cached(slot) => &slot.identifier,
            Self::Factory(slot) => &slot.identifier,
            Self::Injector(slot) => &slot.identifier,
        }
    }

    /// Human-readable description, used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Self::Value(slot) => slot.descriptor.clone(),
            Self::Alias(slot) => slot.descriptor.clone(),
            Self::Cached(slot) => slot.descriptor.clone(),
            Self::Factory(slot) => slot.descriptor.clone(),
            Self::Injector(slot) => format!("{}#{}", slot.receiver_type, slot.target_method),
        }
    }

    pub fn kind(&self) -> BindingKind {
        match self {
            Self::Value(_) => BindingKind::Value,
            Self::Alias(_) => BindingKind::Alias,
            Self::Cached(slot) => match slot.recipe {
                Recipe::Constructor { .. } => BindingKind::Constructor,
                Recipe::Provider { .. } => BindingKind::Provider,
            },
            Self::Factory(_) => BindingKind::Factory,
            Self::Injector(_) => BindingKind::Injector,
        }
    }

    /// Slots that must exist before this one can be created.
    ///
    /// Lazy arguments and everything a factory or injector touches are only
    /// read when called, so they are not eager edges.
    pub fn eager_dependencies(&self) -> Vec<&'a str> {
        match *self {
            Self::Alias(slot) => vec![slot.target.as_str()],
            Self::Cached(slot) => {
                let mut deps = Vec::new();
                if let Recipe::Provider { ref holder, .. } = slot.recipe {
                    deps.push(holder.as_str());
                }
                deps.extend(slot.arguments.iter().filter_map(|arg| match arg {
                    Argument::Slot { identifier } => Some(identifier.as_str()),
                    _ => None,
                }));
                deps
            }
            Self::Value(_) | Self::Factory(_) | Self::Injector(_) => Vec::new(),
        }
    }
}

/// The compiled scope description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledScope {
    pub package: String,
    pub scope_name: String,
    /// Declared values first, then implicit ones, each in order.
    pub values: Vec<ValueSlot>,
    pub aliases: Vec<AliasSlot>,
    pub cached: Vec<CachedSlot>,
    pub factories: Vec<FactorySlot>,
    pub injectors: Vec<InjectorSlot>,
}

impl CompiledScope {
    /// The scope's construction parameters, in order.
    pub fn required_values(&self) -> &[ValueSlot] {
        &self.values
    }

    /// Every slot: values, aliases, cached slots, factories, injectors.
    pub fn emission_order(&self) -> Vec<SlotRef<'_>> {
        let mut slots = Vec::with_capacity(self.slot_count());
        slots.extend(self.values.iter().map(SlotRef::Value));
        slots.extend(self.aliases.iter().map(SlotRef::Alias));
        slots.extend(self.cached.iter().map(SlotRef::Cached));
        slots.extend(self.factories.iter().map(SlotRef::Factory));
        slots.extend(self.injectors.iter().map(SlotRef::Injector));
        slots
    }

    /// Looks up a slot by identifier.
    pub fn slot(&self, identifier: &str) -> Option<SlotRef<'_>> {
        trace!(slot = %identifier, "Looking up slot");
        self.emission_order()
            .into_iter()
            .find(|slot| slot.identifier() == identifier)
    }

    pub fn slot_count(&self) -> usize {
        self.values.len()
            + self.aliases.len()
            + self.cached.len()
            + self.factories.len()
            + self.injectors.len()
    }

    /// `{package}.{scope_name}`, or just the scope name without a package.
    pub fn qualified_name(&self) -> String {
        if self.package.is_empty() {
            self.scope_name.clone()
        } else {
            format!("{}.{}", self.package, self.scope_name)
        }
    }

    /// Fails if two slots share one identifier.
    pub(crate) fn check_identifiers(&self) -> Result<()> {
        let mut seen: HashMap<&str, SlotRef<'_>> = HashMap::new();
        for slot in self.emission_order() {
            if let Some(first) = seen.insert(slot.identifier(), slot) {
                return Err(CompileError::DuplicateIdentifier {
                    identifier: slot.identifier().to_string(),
                    first: first.describe(),
                    second: slot.describe(),
                });
            }
        }
        Ok(())
    }
}
