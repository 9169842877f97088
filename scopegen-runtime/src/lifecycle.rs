//! Teardown of resources owned by a scope.
//!
//! Cached slots marked `close_on_teardown` register their instance here
//! after creation. [`ScopeCore::close`] closes every registered resource
//! once, in registration order, and keeps going past failures.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::{BoxError, CloseError, CloseFailure, Result, RuntimeError};

/// A resource released when its scope closes.
pub trait Closeable: Send + Sync {
    fn close(&self) -> std::result::Result<(), BoxError>;
}

/// Open/closed state and the owned-resource list of one scope.
pub struct ScopeCore {
    name: String,
    closing: AtomicBool,
    owned: Mutex<Vec<(String, Arc<dyn Closeable>)>>,
}

impl ScopeCore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            closing: AtomicBool::new(false),
            owned: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_closed(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Fails with [`RuntimeError::ScopeClosed`] once closing has begun.
    pub fn check_open(&self, slot: &str) -> Result<()> {
        if self.is_closed() {
            return Err(RuntimeError::ScopeClosed {
                slot: slot.to_string(),
            });
        }
        Ok(())
    }

    /// Number of resources waiting to be closed.
    pub fn owned_count(&self) -> usize {
        self.owned.lock().len()
    }

    /// Takes ownership of `resource` for teardown.
    ///
    /// If the scope closed while the resource was being created, the
    /// resource is closed right away and the slot fails.
    pub fn register_closeable(&self, slot: &str, resource: Arc<dyn Closeable>) -> Result<()> {
        {
            let mut owned = self.owned.lock();
            if !self.closing.load(Ordering::Acquire) {
                debug!(scope = %self.name, slot = %slot, "Registered for teardown");
                owned.push((slot.to_string(), resource));
                return Ok(());
            }
        }

        warn!(scope = %self.name, slot = %slot, "Created after close, closing immediately");
        if let Err(err) = resource.close() {
            warn!(scope = %self.name, slot = %slot, error = %err, "Close failed");
        }
        Err(RuntimeError::ScopeClosed {
            slot: slot.to_string(),
        })
    }

    /// Closes every owned resource. Later calls do nothing.
    ///
    /// # Errors
    /// A [`CloseError`] listing each resource that failed, after all of them
    /// were attempted.
    #[instrument(skip(self), name = "scope_close", fields(scope = %self.name))]
    pub fn close(&self) -> std::result::Result<(), CloseError> {
        let owned = {
            let mut owned = self.owned.lock();
            if self.closing.swap(true, Ordering::AcqRel) {
                debug!("Already closed");
                return Ok(());
            }
            std::mem::take(&mut *owned)
        };

        info!(resources = owned.len(), "Closing scope");

        let mut failures = Vec::new();
        for (slot, resource) in owned {
            match resource.close() {
                Ok(()) => debug!(slot = %slot, "Closed"),
                Err(error) => {
                    warn!(slot = %slot, error = %error, "Close failed");
                    failures.push(CloseFailure { slot, error });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CloseError { failures })
        }
    }
}

impl fmt::Debug for ScopeCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeCore")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .field("owned", &self.owned_count())
            .finish()
    }
}
