//! Single-assignment memoizing cell behind every cached slot.
//!
//! # States
//! ```text
//! Empty ──first access──> Creating ──ok──> Cached
//!                             └────err───> Failed
//! ```
//! `Cached` and `Failed` are terminal and published through a
//! [`OnceCell`], so reads after publication take no lock.
//!
//! While one thread is `Creating`, other threads block on this cell's own
//! condvar and then replay the published outcome. The recipe runs at most
//! once. Re-entry from the creating thread itself is a cycle and fails
//! immediately with [`RuntimeError::CircularDependency`].

use std::fmt;
use std::thread::{self, ThreadId};

use once_cell::sync::OnceCell;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

use crate::error::{Result, RuntimeError};

/// Observable state of a [`Lazy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LazyState {
    Empty,
    Creating,
    Cached,
    Failed,
}

/// A lazily created, thread-safe value.
///
/// # Examples
/// ```
/// use scopegen_runtime::Lazy;
///
/// let lazy: Lazy<u32> = Lazy::new("answer");
/// assert_eq!(lazy.get_or_create(|| Ok(Some(42))).unwrap(), 42);
/// // The recipe never runs again.
/// assert_eq!(lazy.get_or_create(|| unreachable!()).unwrap(), 42);
/// ```
pub struct Lazy<T> {
    name: String,
    outcome: OnceCell<Result<T>>,
    /// Thread currently running the recipe
    creator: Mutex<Option<ThreadId>>,
    published: Condvar,
}

impl<T: Clone> Lazy<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: OnceCell::new(),
            creator: Mutex::new(None),
            published: Condvar::new(),
        }
    }

    /// A cell that is `Cached` from the start.
    pub fn eager(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            outcome: OnceCell::with_value(Ok(value)),
            creator: Mutex::new(None),
            published: Condvar::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the value, running `create` if this is the first access.
    ///
    /// `Ok(None)` from the recipe is a failure ([`RuntimeError::NullValue`]).
    ///
    /// # Errors
    /// The published failure, or [`RuntimeError::CircularDependency`] when
    /// called from inside this cell's own recipe.
    pub fn get_or_create<F>(&self, create: F) -> Result<T>
    where
        F: FnOnce() -> Result<Option<T>>,
    {
        if let Some(outcome) = self.outcome.get() {
            return outcome.clone();
        }

        let me = thread::current().id();
        {
            let mut creator = self.creator.lock();
            loop {
                if let Some(outcome) = self.outcome.get() {
                    return outcome.clone();
                }
                match *creator {
                    Some(owner) if owner == me => {
                        warn!(slot = %self.name, "Re-entrant access while creating");
                        return Err(RuntimeError::CircularDependency {
                            slot: self.name.clone(),
                        });
                    }
                    Some(_) => {
                        trace!(slot = %self.name, "Waiting for concurrent creation");
                        self.published.wait(&mut creator);
                    }
                    None => {
                        *creator = Some(me);
                        break;
                    }
                }
            }
        }

        trace!(slot = %self.name, "Creating");
        let mut guard = CreationGuard {
            lazy: self,
            finished: false,
        };
        let outcome = match create() {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(RuntimeError::NullValue {
                slot: self.name.clone(),
            }),
            Err(err) => Err(err),
        };
        guard.finish(outcome.clone());
        outcome
    }

    pub fn state(&self) -> LazyState {
        match self.outcome.get() {
            Some(Ok(_)) => LazyState::Cached,
            Some(Err(_)) => LazyState::Failed,
            None if self.creator.lock().is_some() => LazyState::Creating,
            None => LazyState::Empty,
        }
    }

    /// The published outcome, without creating.
    pub fn peek(&self) -> Option<&Result<T>> {
        self.outcome.get()
    }

    fn publish(&self, outcome: Result<T>) {
        let mut creator = self.creator.lock();
        if self.outcome.set(outcome).is_err() {
            // Only the creator publishes, so this cannot happen.
            warn!(slot = %self.name, "Outcome already published");
        }
        *creator = None;
        self.published.notify_all();
    }
}

impl<T> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.outcome.get() {
            Some(Ok(_)) => "cached",
            Some(Err(_)) => "failed",
            None => "pending",
        };
        f.debug_struct("Lazy")
            .field("name", &self.name)
            .field("state", &state)
            .finish()
    }
}

/// Publishes a `Failed` outcome if the recipe unwinds.
struct CreationGuard<'a, T: Clone> {
    lazy: &'a Lazy<T>,
    finished: bool,
}

impl<T: Clone> CreationGuard<'_, T> {
    fn finish(&mut self, outcome: Result<T>) {
        match &outcome {
            Ok(_) => debug!(slot = %self.lazy.name, "Created"),
            Err(err) => debug!(slot = %self.lazy.name, error = %err, "Creation failed"),
        }
        self.finished = true;
        self.lazy.publish(outcome);
    }
}

impl<T: Clone> Drop for CreationGuard<'_, T> {
    fn drop(&mut self) {
        if !self.finished {
            warn!(slot = %self.lazy.name, "Recipe panicked");
            self.lazy.publish(Err(RuntimeError::CreationPanicked {
                slot: self.lazy.name.clone(),
            }));
        }
    }
}
