//! Type metadata fed in by the binding metadata provider.
//!
//! The compiler never introspects live types. Everything it needs to know
//! about constructors, methods, supertypes and closeability arrives through
//! a [`MetadataSource`], usually a [`TypeCatalog`] deserialized from the
//! provider's output.

use std::collections::{BTreeMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::descriptor::{RETURNER_TYPE, TypeDescriptor};
use crate::error::{CompileError, Result};
use crate::key::QualifiedType;
use crate::qualifier::QualifierSet;

/// Name of the single method of the built-in `Returner<R>` interface.
pub const RETURNER_METHOD: &str = "get";

fn yes() -> bool {
    true
}

/// One constructor of a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorMeta {
    #[serde(default)]
    pub params: Vec<QualifiedType>,
    #[serde(default = "yes")]
    pub public: bool,
    /// Explicit marker that breaks ties between public constructors.
    #[serde(default)]
    pub inject: bool,
}

impl ConstructorMeta {
    pub fn new<I, P>(params: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<QualifiedType>,
    {
        Self {
            params: params.into_iter().map(Into::into).collect(),
            public: true,
            inject: false,
        }
    }

    pub fn inject(mut self) -> Self {
        self.inject = true;
        self
    }

    pub fn private(mut self) -> Self {
        self.public = false;
        self
    }
}

/// One method of a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodMeta {
    pub name: String,
    #[serde(default)]
    pub params: Vec<QualifiedType>,
    /// `None` for methods that return nothing.
    #[serde(default)]
    pub returns: Option<TypeDescriptor>,
    /// Qualifiers on the method itself, applied to what it provides.
    #[serde(default, skip_serializing_if = "QualifierSet::is_empty")]
    pub qualifiers: QualifierSet,
    #[serde(default = "yes")]
    pub public: bool,
    #[serde(default)]
    pub provides: bool,
    #[serde(default)]
    pub inject: bool,
    /// Interface an injector for this method should implement.
    #[serde(default)]
    pub inject_as: Option<TypeDescriptor>,
}

impl MethodMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: None,
            qualifiers: QualifierSet::empty(),
            public: true,
            provides: false,
            inject: false,
            inject_as: None,
        }
    }

    pub fn param(mut self, param: impl Into<QualifiedType>) -> Self {
        self.params.push(param.into());
        self
    }

    pub fn returns(mut self, ty: impl Into<TypeDescriptor>) -> Self {
        self.returns = Some(ty.into());
        self
    }

    pub fn qualifiers(mut self, qualifiers: QualifierSet) -> Self {
        self.qualifiers = qualifiers;
        self
    }

    pub fn provides(mut self) -> Self {
        self.provides = true;
        self
    }

    pub fn inject(mut self) -> Self {
        self.inject = true;
        self
    }

    pub fn inject_as(mut self, interface: impl Into<TypeDescriptor>) -> Self {
        self.inject_as = Some(interface.into());
        self
    }

    pub fn private(mut self) -> Self {
        self.public = false;
        self
    }

    /// Sort key: name, then parameter descriptors.
    fn signature(&self) -> (String, Vec<String>) {
        (
            self.name.clone(),
            self.params.iter().map(QualifiedType::descriptor).collect(),
        )
    }
}

/// Everything the compiler knows about one nominal type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMetadata {
    pub name: String,
    /// Raw names of direct supertypes.
    #[serde(default)]
    pub supertypes: Vec<String>,
    /// Instances own a resource that the scope must close.
    #[serde(default)]
    pub closeable: bool,
    #[serde(default)]
    pub constructors: Vec<ConstructorMeta>,
    #[serde(default)]
    pub methods: Vec<MethodMeta>,
}

impl TypeMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supertypes: Vec::new(),
            closeable: false,
            constructors: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn supertype(mut self, name: impl Into<String>) -> Self {
        self.supertypes.push(name.into());
        self
    }

    pub fn closeable(mut self) -> Self {
        self.closeable = true;
        self
    }

    pub fn constructor(mut self, constructor: ConstructorMeta) -> Self {
        self.constructors.push(constructor);
        self
    }

    pub fn method(mut self, method: MethodMeta) -> Self {
        self.methods.push(method);
        self
    }

    /// Picks the constructor to inject.
    ///
    /// A single public constructor wins unconditionally. Otherwise exactly
    /// one public constructor must carry the `inject` marker.
    ///
    /// # Errors
    /// - [`CompileError::NoPublicConstructor`]
    /// - [`CompileError::MultipleInjectConstructors`]
    /// - [`CompileError::AmbiguousConstructor`]
    pub fn select_constructor(&self) -> Result<&ConstructorMeta> {
        let public: Vec<&ConstructorMeta> = self.constructors.iter().filter(|c| c.public).collect();

        match public.as_slice() {
            [] => Err(CompileError::NoPublicConstructor {
                type_name: self.name.clone(),
            }),
            [only] => Ok(*only),
            _ => {
                let mut marked = public.iter().filter(|c| c.inject);
                match (marked.next(), marked.next()) {
                    (Some(found), None) => Ok(*found),
                    (Some(_), Some(_)) => Err(CompileError::MultipleInjectConstructors {
                        type_name: self.name.clone(),
                    }),
                    (None, _) => Err(CompileError::AmbiguousConstructor {
                        type_name: self.name.clone(),
                    }),
                }
            }
        }
    }

    /// Methods in deterministic order.
    pub fn sorted_methods(&self) -> Vec<&MethodMeta> {
        let mut methods: Vec<&MethodMeta> = self.methods.iter().collect();
        methods.sort_by_cached_key(|m| m.signature());
        methods
    }
}

/// Read access to type metadata.
///
/// Implement this to feed the compiler from something other than a
/// [`TypeCatalog`]. Only [`lookup`](MetadataSource::lookup) is required.
pub trait MetadataSource: Send + Sync {
    fn lookup(&self, type_name: &str) -> Option<&TypeMetadata>;

    /// Like `lookup`, but a missing type is an error.
    fn require(&self, type_name: &str) -> Result<&TypeMetadata> {
        self.lookup(type_name)
            .ok_or_else(|| CompileError::MissingMetadata {
                type_name: type_name.to_string(),
            })
    }

    /// Returns `true` if a `source` instance may stand in for a `target`.
    ///
    /// Same descriptor, or the target's raw name appears among the
    /// transitively declared supertypes of the source.
    fn is_assignable(&self, target: &TypeDescriptor, source: &TypeDescriptor) -> bool {
        if target == source {
            return true;
        }

        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([source.raw_name()]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            let Some(meta) = self.lookup(current) else {
                continue;
            };
            for supertype in &meta.supertypes {
                if supertype == target.raw_name() {
                    trace!(wanted = %target, offered = %source, "Assignable via supertype");
                    return true;
                }
                queue.push_back(supertype.as_str());
            }
        }
        false
    }

    /// True when the type or any of its supertypes is closeable.
    ///
    /// Unknown types are treated as not closeable.
    fn is_closeable(&self, ty: &TypeDescriptor) -> bool {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([ty.raw_name()]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            let Some(meta) = self.lookup(current) else {
                continue;
            };
            if meta.closeable {
                trace!(ty = %ty, via = %current, "Closeable");
                return true;
            }
            queue.extend(meta.supertypes.iter().map(String::as_str));
        }
        false
    }

    /// The one method of a factory or injector interface.
    ///
    /// `Returner<R>` is built in: a zero-argument `get` returning `R`.
    ///
    /// # Errors
    /// [`CompileError::NotSingleMethodInterface`] for zero or several
    /// methods, [`CompileError::MissingMetadata`] for an unknown interface.
    fn single_method(&self, interface: &TypeDescriptor) -> Result<MethodMeta> {
        if interface.raw_name() == RETURNER_TYPE {
            if let [returns] = interface.args() {
                return Ok(MethodMeta::new(RETURNER_METHOD).returns(returns.clone()));
            }
        }

        match self.require(interface.raw_name())?.methods.as_slice() {
            [method] => Ok(method.clone()),
            methods => Err(CompileError::NotSingleMethodInterface {
                interface: interface.simple_name(),
                method_count: methods.len(),
            }),
        }
    }
}

/// In-memory catalog keyed by raw type name.
///
/// Serializes as a plain list of [`TypeMetadata`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<TypeMetadata>", into = "Vec<TypeMetadata>")]
pub struct TypeCatalog {
    types: BTreeMap<String, TypeMetadata>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a type, replacing any earlier entry with the same name.
    pub fn with_type(mut self, meta: TypeMetadata) -> Self {
        self.insert(meta);
        self
    }

    pub fn insert(&mut self, meta: TypeMetadata) {
        trace!(type_name = %meta.name, "Catalogued type");
        self.types.insert(meta.name.clone(), meta);
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeMetadata> {
        self.types.values()
    }
}

impl MetadataSource for TypeCatalog {
    fn lookup(&self, type_name: &str) -> Option<&TypeMetadata> {
        self.types.get(type_name)
    }
}

impl From<Vec<TypeMetadata>> for TypeCatalog {
    fn from(types: Vec<TypeMetadata>) -> Self {
        let mut catalog = Self::new();
        for meta in types {
            catalog.insert(meta);
        }
        catalog
    }
}

impl From<TypeCatalog> for Vec<TypeMetadata> {
    fn from(catalog: TypeCatalog) -> Self {
        catalog.types.into_values().collect()
    }
}
