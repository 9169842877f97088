//! Structural type descriptors.
//!
//! A [`TypeDescriptor`] is a nominal type name plus type arguments, as fed in
//! by the metadata provider. Nothing here introspects live Rust types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Raw name of the lazy handle type.
pub const LAZY_TYPE: &str = "Lazy";

/// Raw name of the built-in zero-argument injector interface.
pub const RETURNER_TYPE: &str = "Returner";

/// Raw name of the "no value" type returned by void injected methods.
pub const UNIT_TYPE: &str = "Unit";

/// A nominal type, possibly parameterized.
///
/// # Examples
/// ```
/// use scopegen_compiler::descriptor::TypeDescriptor;
///
/// let ty = TypeDescriptor::generic("Map", vec!["String".into(), "Handler".into()]);
/// assert_eq!(ty.simple_name(), "Map<String, Handler>");
/// assert_eq!(ty.all_type_names(), vec!["Map", "String", "Handler"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeDescriptor {
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    args: Vec<TypeDescriptor>,
}

impl TypeDescriptor {
    /// A non-parameterized type.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// A parameterized type.
    pub fn generic(name: impl Into<String>, args: Vec<TypeDescriptor>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// `Lazy<inner>`.
    pub fn lazy(inner: TypeDescriptor) -> Self {
        Self::generic(LAZY_TYPE, vec![inner])
    }

    /// `Returner<returns>`.
    pub fn returner(returns: TypeDescriptor) -> Self {
        Self::generic(RETURNER_TYPE, vec![returns])
    }

    /// `Unit`.
    pub fn unit() -> Self {
        Self::named(UNIT_TYPE)
    }

    /// The nominal name without type arguments.
    #[inline]
    pub fn raw_name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn args(&self) -> &[TypeDescriptor] {
        &self.args
    }

    #[inline]
    pub fn is_lazy(&self) -> bool {
        self.name == LAZY_TYPE
    }

    /// Renders `Name<Arg1, Arg2>`, recursively.
    pub fn simple_name(&self) -> String {
        if self.args.is_empty() {
            return self.name.clone();
        }
        let args: Vec<String> = self.args.iter().map(TypeDescriptor::simple_name).collect();
        format!("{}<{}>", self.name, args.join(", "))
    }

    /// Every nominal name in the descriptor, depth-first.
    pub fn all_type_names(&self) -> Vec<&str> {
        let mut names = vec![self.name.as_str()];
        for arg in &self.args {
            names.extend(arg.all_type_names());
        }
        names
    }
}

impl From<&str> for TypeDescriptor {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for TypeDescriptor {
    fn from(name: String) -> Self {
        Self::named(name)
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.simple_name())
    }
}
