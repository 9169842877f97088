//! Dependency identification keys.
//!
//! [`DependencyKey`] identifies *what* is wanted: a type descriptor plus a
//! qualifier set. Keys are pure values; two keys are equal iff their
//! canonical descriptor strings are equal.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use scopegen_support::idents::first_to_lower;

use crate::descriptor::{LAZY_TYPE, TypeDescriptor};
use crate::error::{CompileError, Result};
use crate::qualifier::{AUTO_FACTORY, QualifierSet};

/// A type occurrence together with its qualifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedType {
    pub ty: TypeDescriptor,
    #[serde(default, skip_serializing_if = "QualifierSet::is_empty")]
    pub qualifiers: QualifierSet,
}

impl QualifiedType {
    pub fn new(ty: impl Into<TypeDescriptor>, qualifiers: QualifierSet) -> Self {
        Self {
            ty: ty.into(),
            qualifiers,
        }
    }

    /// An unqualified type.
    pub fn plain(ty: impl Into<TypeDescriptor>) -> Self {
        Self::new(ty, QualifierSet::empty())
    }

    /// `"{declarations} {simple name}"`, or just the simple name.
    pub fn descriptor(&self) -> String {
        if self.qualifiers.is_empty() {
            self.ty.simple_name()
        } else {
            format!("{} {}", self.qualifiers, self.ty.simple_name())
        }
    }
}

impl From<TypeDescriptor> for QualifiedType {
    fn from(ty: TypeDescriptor) -> Self {
        Self::plain(ty)
    }
}

impl From<&str> for QualifiedType {
    fn from(name: &str) -> Self {
        Self::plain(name)
    }
}

impl fmt::Display for QualifiedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descriptor())
    }
}

/// Key for an instance of a type (never a `Lazy<T>`).
///
/// Carries the derived cache-slot identifier: the lower-camel concatenation
/// of every type name in the descriptor, plus `_0`-separated qualifier
/// identifiers.
///
/// # Examples
/// ```
/// use scopegen_compiler::key::{DirectKey, QualifiedType};
/// use scopegen_compiler::qualifier::{QualifierSet, QualifierTag};
///
/// let qualifiers = QualifierSet::new([QualifierTag::named("Config", "db-url")?])?;
/// let key = DirectKey::from_type(&QualifiedType::new("String", qualifiers))?;
/// assert_eq!(key.descriptor(), "@Config(\"db-url\") String");
/// assert_eq!(key.identifier(), "string_0Config_db_url");
/// # Ok::<(), scopegen_compiler::CompileError>(())
/// ```
#[derive(Clone)]
pub struct DirectKey {
    qualified: QualifiedType,
    descriptor: String,
    identifier: String,
}

impl DirectKey {
    fn new(qualified: QualifiedType) -> Self {
        let descriptor = qualified.descriptor();
        let mut identifier = first_to_lower(&qualified.ty.all_type_names().concat());
        if !qualified.qualifiers.is_empty() {
            // 0 kinda looks like @
            identifier.push_str("_0");
            identifier.push_str(&qualified.qualifiers.identifiers().join("_0"));
        }
        Self {
            qualified,
            descriptor,
            identifier,
        }
    }

    /// Builds the key for a type that must not be lazy.
    ///
    /// # Errors
    /// [`CompileError::LazyNotPermitted`] for `Lazy<T>`, plus every error of
    /// [`DependencyKey::for_type`].
    pub fn from_type(qualified: &QualifiedType) -> Result<Self> {
        DependencyKey::for_type(qualified)?.into_direct()
    }

    /// The canonical string used for equality and ordering.
    #[inline]
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// The cache-slot name.
    #[inline]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    #[inline]
    pub fn qualified(&self) -> &QualifiedType {
        &self.qualified
    }

    #[inline]
    pub fn ty(&self) -> &TypeDescriptor {
        &self.qualified.ty
    }

    #[inline]
    pub fn qualifiers(&self) -> &QualifierSet {
        &self.qualified.qualifiers
    }
}

impl PartialEq for DirectKey {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor == other.descriptor
    }
}

impl Eq for DirectKey {}

impl Hash for DirectKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.descriptor.hash(state);
    }
}

impl PartialOrd for DirectKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DirectKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.descriptor.cmp(&other.descriptor)
    }
}

impl fmt::Debug for DirectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DirectKey({})", self.descriptor)
    }
}

impl fmt::Display for DirectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descriptor)
    }
}

/// Identifies a requested dependency.
///
/// - [`DependencyKey::Direct`]: wants an instance of `T`.
/// - [`DependencyKey::Lazy`]: wants a deferred handle to the *same* cache
///   slot as the wrapped direct key.
/// - [`DependencyKey::AutoFactory`]: wants a generated curried factory;
///   marked by the `@AutoFactory` qualifier.
///
/// # Examples
/// ```
/// use scopegen_compiler::descriptor::TypeDescriptor;
/// use scopegen_compiler::key::{DependencyKey, QualifiedType};
///
/// let lazy = DependencyKey::for_type(&TypeDescriptor::lazy("Service".into()).into())?;
/// let direct = DependencyKey::for_type(&QualifiedType::from("Service"))?;
/// assert!(lazy.is_lazy());
/// assert_eq!(lazy.identifier(), direct.identifier());
/// assert_ne!(lazy, direct);
/// # Ok::<(), scopegen_compiler::CompileError>(())
/// ```
#[derive(Clone)]
pub enum DependencyKey {
    Direct(DirectKey),
    Lazy(DirectKey),
    AutoFactory(DirectKey),
}

impl DependencyKey {
    /// Classifies a qualified type into a key.
    ///
    /// A `Lazy<T>` is unwrapped exactly one level.
    ///
    /// # Errors
    /// - [`CompileError::LazyFactory`]: `Lazy<T>` with `@AutoFactory`
    /// - [`CompileError::NestedLazy`]: `Lazy<Lazy<T>>`
    /// - [`CompileError::MalformedLazy`]: `Lazy` without exactly one argument
    pub fn for_type(qualified: &QualifiedType) -> Result<Self> {
        let is_auto_factory = qualified.qualifiers.contains_tag(AUTO_FACTORY);

        if qualified.ty.is_lazy() {
            if is_auto_factory {
                return Err(CompileError::LazyFactory {
                    descriptor: qualified.descriptor(),
                });
            }
            let [inner] = qualified.ty.args() else {
                return Err(CompileError::MalformedLazy {
                    descriptor: qualified.descriptor(),
                });
            };
            if inner.is_lazy() {
                return Err(CompileError::NestedLazy {
                    descriptor: qualified.descriptor(),
                });
            }
            return Ok(Self::Lazy(DirectKey::new(QualifiedType::new(
                inner.clone(),
                qualified.qualifiers.clone(),
            ))));
        }

        if is_auto_factory {
            return Ok(Self::AutoFactory(DirectKey::new(qualified.clone())));
        }

        Ok(Self::Direct(DirectKey::new(qualified.clone())))
    }

    /// The associated direct key: self, or the wrapped key of a lazy key.
    #[inline]
    pub fn direct(&self) -> &DirectKey {
        match self {
            Self::Direct(key) | Self::Lazy(key) | Self::AutoFactory(key) => key,
        }
    }

    /// Unwraps a key that must not be lazy.
    pub fn into_direct(self) -> Result<DirectKey> {
        match self {
            Self::Direct(key) | Self::AutoFactory(key) => Ok(key),
            Self::Lazy(key) => Err(CompileError::LazyNotPermitted {
                descriptor: format!("{LAZY_TYPE}<{}>", key.descriptor()),
            }),
        }
    }

    /// The canonical string used for equality and ordering.
    pub fn descriptor(&self) -> Cow<'_, str> {
        match self {
            Self::Direct(key) | Self::AutoFactory(key) => Cow::Borrowed(key.descriptor()),
            Self::Lazy(key) => Cow::Owned(format!("{LAZY_TYPE}<{}>", key.descriptor())),
        }
    }

    /// The cache-slot name (shared by a lazy key and its direct key).
    #[inline]
    pub fn identifier(&self) -> &str {
        self.direct().identifier()
    }

    #[inline]
    pub fn is_lazy(&self) -> bool {
        matches!(self, Self::Lazy(_))
    }

    #[inline]
    pub fn is_auto_factory(&self) -> bool {
        matches!(self, Self::AutoFactory(_))
    }
}

impl PartialEq for DependencyKey {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor() == other.descriptor()
    }
}

impl Eq for DependencyKey {}

impl Hash for DependencyKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.descriptor().hash(state);
    }
}

impl PartialOrd for DependencyKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DependencyKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.descriptor().cmp(&other.descriptor())
    }
}

impl fmt::Debug for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DependencyKey({})", self.descriptor())
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descriptor())
    }
}
