//! Type-erased values held by scope slots, and recipe arguments.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, RuntimeError};
use crate::lifecycle::Closeable;
use crate::scope::LazyHandle;

/// A shared, type-erased slot value.
///
/// Cloning shares the underlying value; two clones are [`ptr_eq`](Self::ptr_eq).
#[derive(Clone)]
pub struct Instance {
    value: Arc<dyn Any + Send + Sync>,
    closer: Option<Arc<dyn Closeable>>,
    type_name: &'static str,
}

impl Instance {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            value,
            closer: None,
            type_name: type_name::<T>(),
        }
    }

    /// An instance the scope can close on teardown.
    pub fn closeable<T: Closeable + Any>(value: T) -> Self {
        let value = Arc::new(value);
        Self {
            value: Arc::clone(&value) as Arc<dyn Any + Send + Sync>,
            closer: Some(value as Arc<dyn Closeable>),
            type_name: type_name::<T>(),
        }
    }

    /// The value as `T`, or `None` if it holds another type.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn closer(&self) -> Option<Arc<dyn Closeable>> {
        self.closer.clone()
    }

    /// Both handles share one value.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.type_name)
            .field("closeable", &self.closer.is_some())
            .finish()
    }
}

/// One argument handed to a recipe.
#[derive(Debug, Clone)]
pub enum Arg {
    Instance(Instance),
    Lazy(LazyHandle),
}

/// Positional arguments of one recipe call.
#[derive(Debug, Clone)]
pub struct Arguments {
    slot: String,
    values: Vec<Arg>,
}

impl Arguments {
    pub(crate) fn new(slot: impl Into<String>, values: Vec<Arg>) -> Self {
        Self {
            slot: slot.into(),
            values,
        }
    }

    /// Slot the arguments are being resolved for.
    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn arg(&self, index: usize) -> Result<&Arg> {
        self.values
            .get(index)
            .ok_or_else(|| RuntimeError::ArityMismatch {
                slot: self.slot.clone(),
                expected: index + 1,
                actual: self.values.len(),
            })
    }

    pub fn instance(&self, index: usize) -> Result<Instance> {
        match self.arg(index)? {
            Arg::Instance(instance) => Ok(instance.clone()),
            Arg::Lazy(_) => Err(RuntimeError::TypeMismatch {
                slot: self.slot.clone(),
                expected: "instance",
                actual: "lazy handle",
            }),
        }
    }

    /// The argument at `index` as `T`.
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>> {
        let instance = self.instance(index)?;
        instance
            .downcast::<T>()
            .ok_or_else(|| RuntimeError::TypeMismatch {
                slot: self.slot.clone(),
                expected: type_name::<T>(),
                actual: instance.type_name(),
            })
    }

    pub fn lazy(&self, index: usize) -> Result<LazyHandle> {
        match self.arg(index)? {
            Arg::Lazy(handle) => Ok(handle.clone()),
            Arg::Instance(instance) => Err(RuntimeError::TypeMismatch {
                slot: self.slot.clone(),
                expected: "lazy handle",
                actual: instance.type_name(),
            }),
        }
    }
}
