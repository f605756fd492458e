//! Resolution context
//!
//! Every top-level resolve call opens a [`ResolveScope`]: the per-resolve
//! instance cache plus the stack of keys currently being built, used to
//! detect cycles. Resolves issued by factories during that call join it.
//! Each key resolved inside that call gets its own [`BuilderContext`]
//! carrying the registration, the type being built and the instance built
//! so far.

use crate::introspect::Caster;
use crate::registration::Registration;
use crate::types::{Instance, Name, Type, TypeKey};
use crate::{Container, DiError, Result};
use ahash::RandomState;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "logging")]
use tracing::trace;

/// Identifier of one top-level resolve call, for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolveId(u64);

impl ResolveId {
    /// Generate a new unique id.
    #[inline]
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl Default for ResolveId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ResolveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "resolve-{}", self.0)
    }
}

/// A type key tagged with the identity of the container or registration
/// it belongs to.
type ScopedKey = (usize, TypeKey);

/// State shared by every nested resolution of one top-level call.
///
/// Factories receive a plain `&Container`, so the scope of the call running
/// on the current thread is also published in a thread local. A resolve
/// issued from inside a factory joins that scope instead of opening a new
/// one, which keeps cycles through factories visible.
#[derive(Clone)]
pub(crate) struct ResolveScope {
    state: Rc<ScopeState>,
}

struct ScopeState {
    id: ResolveId,
    per_resolve: RefCell<HashMap<ScopedKey, Instance, RandomState>>,
    stack: RefCell<Vec<ScopedKey>>,
}

thread_local! {
    static ACTIVE: RefCell<Option<ResolveScope>> = const { RefCell::new(None) };
}

impl ResolveScope {
    pub(crate) fn new() -> Self {
        Self {
            state: Rc::new(ScopeState {
                id: ResolveId::new(),
                per_resolve: RefCell::new(HashMap::default()),
                stack: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Join the call already running on this thread, or open a new one.
    /// The guard is `Some` for the call that opened the scope and clears the
    /// thread local when dropped.
    pub(crate) fn join_or_open() -> (Self, Option<ActiveScope>) {
        let current = ACTIVE.with(|active| active.borrow().clone());
        match current {
            Some(scope) => (scope, None),
            None => {
                let scope = Self::new();
                ACTIVE.with(|active| *active.borrow_mut() = Some(scope.clone()));
                (scope, Some(ActiveScope { _private: () }))
            }
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> ResolveId {
        self.state.id
    }

    #[inline]
    pub(crate) fn depth(&self) -> usize {
        self.state.stack.borrow().len()
    }

    pub(crate) fn cached(&self, owner: usize, key: &TypeKey) -> Option<Instance> {
        self.state
            .per_resolve
            .borrow()
            .get(&(owner, key.clone()))
            .cloned()
    }

    pub(crate) fn record(&self, owner: usize, key: TypeKey, instance: Instance) {
        self.state
            .per_resolve
            .borrow_mut()
            .insert((owner, key), instance);
    }

    /// Push `key` on the resolution stack. `build` identifies the
    /// registration being built, so the same key resolved through two
    /// different registrations is not a cycle. Fails when that build is
    /// already running further up.
    pub(crate) fn enter(&self, build: usize, key: &TypeKey) -> Result<StackGuard<'_>> {
        let mut stack = self.state.stack.borrow_mut();
        let entry = (build, key.clone());
        if stack.contains(&entry) {
            let mut chain: Vec<&'static str> = stack
                .iter()
                .skip_while(|candidate| **candidate != entry)
                .map(|(_, key)| key.type_name())
                .collect();
            chain.push(key.type_name());
            return Err(DiError::CircularDependency {
                type_name: key.type_name(),
                name: key.name_arc().cloned(),
                chain,
            });
        }
        stack.push(entry);
        Ok(StackGuard { scope: self })
    }
}

/// Marks the thread's resolve call as finished on drop
pub(crate) struct ActiveScope {
    _private: (),
}

impl Drop for ActiveScope {
    fn drop(&mut self) {
        ACTIVE.with(|active| active.borrow_mut().take());
    }
}

/// Pops the resolution stack on drop
pub(crate) struct StackGuard<'a> {
    scope: &'a ResolveScope,
}

impl Drop for StackGuard<'_> {
    fn drop(&mut self) {
        self.scope.state.stack.borrow_mut().pop();
    }
}

/// Context for building one key.
pub struct BuilderContext<'a> {
    container: &'a Container,
    scope: &'a ResolveScope,
    key: TypeKey,
    registration: Arc<Registration>,
    build_type: Type,
    existing: Option<Instance>,
    redirect: Option<TypeKey>,
    cast: Option<Caster>,
    complete: bool,
}

impl<'a> BuilderContext<'a> {
    pub(crate) fn new(
        container: &'a Container,
        scope: &'a ResolveScope,
        key: TypeKey,
        build_type: Type,
        registration: Arc<Registration>,
    ) -> Self {
        Self {
            container,
            scope,
            key,
            registration,
            build_type,
            existing: None,
            redirect: None,
            cast: None,
            complete: false,
        }
    }

    /// Container the resolution was requested from
    #[inline]
    pub fn container(&self) -> &'a Container {
        self.container
    }

    /// Key being resolved
    #[inline]
    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    #[inline]
    pub fn registration(&self) -> &Arc<Registration> {
        &self.registration
    }

    /// Concrete type being built
    #[inline]
    pub fn build_type(&self) -> Type {
        self.build_type
    }

    #[inline]
    pub fn existing(&self) -> Option<&Instance> {
        self.existing.as_ref()
    }

    #[inline]
    pub fn resolve_id(&self) -> ResolveId {
        self.scope.id()
    }

    /// Whether a strategy finished the build early
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    #[inline]
    pub(crate) fn set_build_type(&mut self, ty: Type) {
        self.build_type = ty;
    }

    #[inline]
    pub(crate) fn set_existing(&mut self, instance: Instance) {
        self.existing = Some(instance);
    }

    #[inline]
    pub(crate) fn complete(&mut self) {
        self.complete = true;
    }

    /// Build by resolving another key instead of running a plan
    #[inline]
    pub(crate) fn redirect_to(&mut self, key: TypeKey) {
        self.redirect = Some(key);
    }

    #[inline]
    pub(crate) fn take_redirect(&mut self) -> Option<TypeKey> {
        self.redirect.take()
    }

    /// Resolve a dependency within the same top-level call
    pub(crate) fn resolve_dependency(&mut self, ty: Type, name: Option<Name>) -> Result<Instance> {
        self.container.resolve_in(self.scope, ty, name)
    }

    /// Conversion from the build type back to the requested type
    #[inline]
    pub(crate) fn set_cast(&mut self, cast: Caster) {
        self.cast = Some(cast);
    }

    /// Share `instance` with the rest of the top-level call. Instances of a
    /// mapped build type are stored in the requested representation.
    pub(crate) fn record_per_resolve(&self, instance: Instance) {
        let instance = match &self.cast {
            Some(cast) => match cast(instance) {
                Ok(instance) => instance,
                Err(_err) => {
                    #[cfg(feature = "logging")]
                    trace!(
                        target: "wiring",
                        service = self.key.type_name(),
                        error = %_err,
                        "Skipping per-resolve record, cast failed"
                    );
                    return;
                }
            },
            None => instance,
        };
        self.scope
            .record(self.container.scope_owner(), self.key.clone(), instance);
    }
}

impl std::fmt::Debug for BuilderContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuilderContext")
            .field("key", &self.key)
            .field("build_type", &self.build_type)
            .field("existing", &self.existing.is_some())
            .field("complete", &self.complete)
            .finish()
    }
}
