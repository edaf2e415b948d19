//! Registry of every audio unit created during a session.
//!
//! Units are registered before they are queued, so teardown can release them
//! whether or not they were ever played. Once drained, the registry is closed
//! and rejects late registrations; the caller releases those units itself.

use crate::pipeline::messages::AudioUnit;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct RegistryInner {
    units: Vec<AudioUnit>,
    created: usize,
    closed: bool,
}

/// Session-scoped set of created units.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track `unit`. Returns `false` if the registry was already drained.
    pub fn register(&self, unit: &AudioUnit) -> bool {
        let mut inner = self.lock();
        if inner.closed {
            return false;
        }
        inner.units.push(unit.clone());
        inner.created += 1;
        true
    }

    /// Release every tracked unit, empty the registry and close it.
    ///
    /// Returns how many units this call released.
    pub fn release_all(&self) -> usize {
        let units = {
            let mut inner = self.lock();
            inner.closed = true;
            std::mem::take(&mut inner.units)
        };
        units.iter().filter(|unit| unit.release()).count()
    }

    /// Units currently tracked.
    pub fn len(&self) -> usize {
        self.lock().units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Units registered over the registry's lifetime.
    pub fn created(&self) -> usize {
        self.lock().created
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}
