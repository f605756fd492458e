//! Lifetime managers
//!
//! A lifetime manager decides whether a resolution builds a fresh instance or
//! reuses a stored one:
//!
//! - [`TransientLifetimeManager`]: never stores anything
//! - [`ContainerControlledLifetimeManager`]: one instance per registration,
//!   released when the owning container is disposed
//! - [`PerResolveLifetimeManager`]: one instance per top-level resolve call,
//!   kept in the resolve scope rather than in the manager

use crate::types::Instance;
use crate::Result;
use parking_lot::Mutex;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Standard lifetimes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// New instance on every resolution
    #[default]
    Transient,
    /// One instance per registration
    Singleton,
    /// One instance per top-level resolve call
    PerResolve,
}

impl Lifetime {
    /// Fresh manager implementing this lifetime
    pub fn manager(self) -> Arc<dyn LifetimeManager> {
        match self {
            Lifetime::Transient => Arc::new(TransientLifetimeManager),
            Lifetime::Singleton => Arc::new(ContainerControlledLifetimeManager::new()),
            Lifetime::PerResolve => Arc::new(PerResolveLifetimeManager),
        }
    }
}

impl std::fmt::Display for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Lifetime::Transient => "transient",
            Lifetime::Singleton => "singleton",
            Lifetime::PerResolve => "per-resolve",
        })
    }
}

/// Instance caching policy attached to a registration.
pub trait LifetimeManager: Send + Sync {
    fn lifetime(&self) -> Lifetime;

    /// New, empty manager of the same kind, used when a registration is
    /// synthesized from a template
    fn create_policy(&self) -> Arc<dyn LifetimeManager>;

    /// Stored instance, if any
    fn get(&self) -> Option<Instance>;

    fn set(&self, instance: Instance);

    /// Stored instance, or the result of `build` which is then stored.
    fn get_or_build(&self, build: &mut dyn FnMut() -> Result<Instance>) -> Result<Instance> {
        if let Some(instance) = self.get() {
            return Ok(instance);
        }
        let instance = build()?;
        self.set(instance.clone());
        Ok(instance)
    }

    /// Release whatever the manager holds
    fn dispose(&self) {}
}

// =============================================================================
// Transient
// =============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct TransientLifetimeManager;

impl LifetimeManager for TransientLifetimeManager {
    #[inline]
    fn lifetime(&self) -> Lifetime {
        Lifetime::Transient
    }

    fn create_policy(&self) -> Arc<dyn LifetimeManager> {
        Arc::new(TransientLifetimeManager)
    }

    #[inline]
    fn get(&self) -> Option<Instance> {
        None
    }

    #[inline]
    fn set(&self, _instance: Instance) {}

    #[inline]
    fn get_or_build(&self, build: &mut dyn FnMut() -> Result<Instance>) -> Result<Instance> {
        build()
    }
}

// =============================================================================
// Container controlled (singleton)
// =============================================================================

/// Stores a single instance. Concurrent first resolutions block on the
/// manager's lock; only one of them runs the build.
#[derive(Default)]
pub struct ContainerControlledLifetimeManager {
    instance: Mutex<Option<Instance>>,
}

impl ContainerControlledLifetimeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager that already holds `instance`
    pub fn with_instance(instance: Instance) -> Self {
        Self {
            instance: Mutex::new(Some(instance)),
        }
    }
}

impl LifetimeManager for ContainerControlledLifetimeManager {
    #[inline]
    fn lifetime(&self) -> Lifetime {
        Lifetime::Singleton
    }

    fn create_policy(&self) -> Arc<dyn LifetimeManager> {
        Arc::new(Self::new())
    }

    #[inline]
    fn get(&self) -> Option<Instance> {
        self.instance.lock().clone()
    }

    fn set(&self, instance: Instance) {
        *self.instance.lock() = Some(instance);
    }

    fn get_or_build(&self, build: &mut dyn FnMut() -> Result<Instance>) -> Result<Instance> {
        let mut slot = self.instance.lock();
        if let Some(instance) = slot.as_ref() {
            #[cfg(feature = "logging")]
            trace!(target: "wiring", "Singleton already built, returning stored instance");

            return Ok(instance.clone());
        }

        #[cfg(feature = "logging")]
        debug!(target: "wiring", "Singleton building on first resolution");

        let instance = build()?;
        *slot = Some(instance.clone());
        Ok(instance)
    }

    fn dispose(&self) {
        self.instance.lock().take();
    }
}

impl std::fmt::Debug for ContainerControlledLifetimeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerControlledLifetimeManager")
            .field("built", &self.instance.lock().is_some())
            .finish()
    }
}

// =============================================================================
// Per resolve
// =============================================================================

/// Marker manager: instances live in the resolve scope of one top-level
/// call, recorded right after construction.
#[derive(Debug, Default, Clone, Copy)]
pub struct PerResolveLifetimeManager;

impl LifetimeManager for PerResolveLifetimeManager {
    #[inline]
    fn lifetime(&self) -> Lifetime {
        Lifetime::PerResolve
    }

    fn create_policy(&self) -> Arc<dyn LifetimeManager> {
        Arc::new(PerResolveLifetimeManager)
    }

    #[inline]
    fn get(&self) -> Option<Instance> {
        None
    }

    #[inline]
    fn set(&self, _instance: Instance) {}
}

// =============================================================================
// Lifetime container
// =============================================================================

/// Managers owned by one container, disposed newest first.
#[derive(Default)]
pub struct LifetimeContainer {
    managers: Mutex<Vec<Arc<dyn LifetimeManager>>>,
}

impl LifetimeContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, manager: Arc<dyn LifetimeManager>) {
        self.managers.lock().push(manager);
    }

    pub fn len(&self) -> usize {
        self.managers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.lock().is_empty()
    }

    /// Dispose every manager in reverse order of addition
    pub fn dispose(&self) {
        let managers = std::mem::take(&mut *self.managers.lock());

        #[cfg(feature = "logging")]
        debug!(target: "wiring", count = managers.len(), "Disposing lifetime managers");

        for manager in managers.into_iter().rev() {
            manager.dispose();
        }
    }
}

impl std::fmt::Debug for LifetimeContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifetimeContainer")
            .field("managers", &self.len())
            .finish()
    }
}
