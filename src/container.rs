//! Container hierarchy
//!
//! The `Container` owns one registry level. Resolution walks from the
//! requesting container up to the root and falls back to open generic
//! definitions along the way; a concrete type nobody registered gets an
//! implicit registration in the root.

use crate::config::ContainerConfig;
use crate::context::{BuilderContext, ResolveScope};
use crate::injection::InjectionMember;
use crate::introspect::{TypeCatalog, TypeIntrospector};
use crate::lifetime::{Lifetime, LifetimeContainer, LifetimeManager};
use crate::registration::{
    Mapping, Registration, RegistrationBuilder, RegistrationKind, RegistrationRequest,
};
use crate::registry::Registry;
use crate::selection::{DefaultMemberSelector, MemberSelector};
use crate::strategy;
use crate::types::{Injectable, Instance, Name, Type, TypeKey};
use crate::{DiError, Result};
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Counters shared by a root container and all of its children
#[derive(Debug, Default)]
struct Counters {
    synthesized: AtomicUsize,
    compiled: AtomicUsize,
}

/// Snapshot of container instrumentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerStats {
    /// Registrations stored in this container level, implicit ones included
    pub registrations: usize,
    /// Closed registrations synthesized from open generic ones, hierarchy wide
    pub synthesized_generics: usize,
    /// Build plans compiled, hierarchy wide
    pub compiled_plans: usize,
}

struct ContainerInner {
    registry: Registry<Registration>,
    parent: Option<Weak<ContainerInner>>,
    depth: u32,
    config: ContainerConfig,
    introspector: Arc<dyn TypeIntrospector>,
    selector: Arc<dyn MemberSelector>,
    lifetimes: LifetimeContainer,
    counters: Arc<Counters>,
    disposed: AtomicBool,
}

impl ContainerInner {
    fn parent(&self) -> Option<Arc<ContainerInner>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        #[cfg(feature = "logging")]
        debug!(
            target: "wiring",
            depth = self.depth,
            registrations = self.registry.len(),
            "Disposing container"
        );

        self.lifetimes.dispose();
    }
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Dependency injection container.
///
/// Cloning is cheap and yields a handle to the same container. A child
/// created with [`child`](Container::child) sees every registration of its
/// ancestors and shadows them with its own. It holds only a weak link to
/// its parent, so the parent must outlive it.
///
/// # Examples
///
/// ```rust
/// use wiring::{Arguments, Constructor, Container, Parameter, TypeCatalog};
/// use std::sync::Arc;
///
/// struct Database {
///     url: String,
/// }
///
/// struct UserService {
///     db: Arc<Database>,
/// }
///
/// let catalog = TypeCatalog::new();
/// catalog.describe::<UserService>(|ty| {
///     ty.constructor(
///         Constructor::new(|args: &Arguments| Ok(UserService { db: args.get(0)? }))
///             .param(Parameter::of::<Database>("db")),
///     );
/// });
///
/// let container = Container::with_introspector(catalog);
/// container.singleton(Database { url: "postgres://localhost".into() });
///
/// let users = container.resolve::<UserService>().unwrap();
/// assert_eq!(users.db.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    /// Create a root container with an empty [`TypeCatalog`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use wiring::Container;
    /// let container = Container::new();
    /// assert_eq!(container.depth(), 0);
    /// ```
    #[inline]
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::new())
    }

    /// Create a root container with the given tunables
    pub fn with_config(config: ContainerConfig) -> Self {
        Self::root(
            config,
            Arc::new(TypeCatalog::new()),
            Arc::new(DefaultMemberSelector),
        )
    }

    /// Create a root container with room for about `capacity` types
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(ContainerConfig::new().initial_capacity(capacity))
    }

    /// Create a root container reading type metadata from `introspector`.
    ///
    /// Pass an `Arc<TypeCatalog>` to keep describing types after the
    /// container is created.
    pub fn with_introspector(introspector: impl TypeIntrospector + 'static) -> Self {
        Self::root(
            ContainerConfig::new(),
            Arc::new(introspector),
            Arc::new(DefaultMemberSelector),
        )
    }

    /// Create a root container with a custom member selection algorithm
    pub fn with_selector(
        introspector: impl TypeIntrospector + 'static,
        selector: impl MemberSelector + 'static,
    ) -> Self {
        Self::root(
            ContainerConfig::new(),
            Arc::new(introspector),
            Arc::new(selector),
        )
    }

    fn root(
        config: ContainerConfig,
        introspector: Arc<dyn TypeIntrospector>,
        selector: Arc<dyn MemberSelector>,
    ) -> Self {
        #[cfg(feature = "logging")]
        debug!(
            target: "wiring",
            depth = 0,
            capacity = config.capacity(),
            "Creating new root DI container"
        );

        Self {
            inner: Arc::new(ContainerInner {
                registry: Registry::new(&config),
                parent: None,
                depth: 0,
                config,
                introspector,
                selector,
                lifetimes: LifetimeContainer::new(),
                counters: Arc::new(Counters::default()),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Create a child container.
    ///
    /// The child inherits the configuration and introspector, resolves
    /// everything its ancestors can, and keeps its own singletons.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use wiring::Container;
    ///
    /// struct AppConfig {
    ///     debug: bool,
    /// }
    ///
    /// let root = Container::new();
    /// root.singleton(AppConfig { debug: true });
    ///
    /// let request = root.child();
    /// assert!(request.resolve::<AppConfig>().unwrap().debug);
    /// assert_eq!(request.depth(), 1);
    /// ```
    pub fn child(&self) -> Self {
        let child_depth = self.inner.depth + 1;

        #[cfg(feature = "logging")]
        debug!(
            target: "wiring",
            parent_depth = self.inner.depth,
            child_depth = child_depth,
            parent_registrations = self.inner.registry.len(),
            "Creating child container"
        );

        Self {
            inner: Arc::new(ContainerInner {
                registry: Registry::new(&self.inner.config),
                parent: Some(Arc::downgrade(&self.inner)),
                depth: child_depth,
                config: self.inner.config,
                introspector: Arc::clone(&self.inner.introspector),
                selector: Arc::clone(&self.inner.selector),
                lifetimes: LifetimeContainer::new(),
                counters: Arc::clone(&self.inner.counters),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Distance from the root container
    #[inline]
    pub fn depth(&self) -> u32 {
        self.inner.depth
    }

    #[inline]
    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    #[inline]
    pub fn introspector(&self) -> &dyn TypeIntrospector {
        self.inner.introspector.as_ref()
    }

    #[inline]
    pub fn selector(&self) -> &dyn MemberSelector {
        self.inner.selector.as_ref()
    }

    /// This container followed by every live ancestor
    fn levels(&self) -> impl Iterator<Item = Arc<ContainerInner>> {
        std::iter::successors(Some(Arc::clone(&self.inner)), |level| level.parent())
    }

    // =========================================================================
    // Registration Methods
    // =========================================================================

    /// Start registering `T`, which may be a trait object.
    ///
    /// See [`RegistrationBuilder`] for the available options.
    #[inline]
    pub fn register<T: ?Sized + Send + Sync + 'static>(&self) -> RegistrationBuilder<'_, T> {
        RegistrationBuilder::new(self)
    }

    /// Register an existing instance.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use wiring::Container;
    ///
    /// struct Database {
    ///     url: String,
    /// }
    ///
    /// let container = Container::new();
    /// container.singleton(Database { url: "postgres://localhost".into() });
    ///
    /// let a = container.resolve::<Database>().unwrap();
    /// let b = container.resolve::<Database>().unwrap();
    /// assert!(std::sync::Arc::ptr_eq(&a, &b));
    /// ```
    pub fn singleton<T: Injectable>(&self, instance: T) -> Arc<Registration> {
        self.register::<T>().instance(Arc::new(instance)).done()
    }

    /// Register an existing instance under a name
    pub fn singleton_named<T: Injectable>(&self, name: &str, instance: T) -> Arc<Registration> {
        self.register::<T>()
            .named(name)
            .instance(Arc::new(instance))
            .done()
    }

    /// Register `T` to be built from its metadata on every resolution
    pub fn transient<T: Injectable>(&self) -> Arc<Registration> {
        self.register::<T>().lifetime(Lifetime::Transient).done()
    }

    /// Register a factory that runs on first resolution only.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use wiring::Container;
    ///
    /// struct Pool {
    ///     size: usize,
    /// }
    ///
    /// let container = Container::new();
    /// container.lazy(|_| Ok(Pool { size: 4 }));
    ///
    /// assert_eq!(container.resolve::<Pool>().unwrap().size, 4);
    /// ```
    pub fn lazy<T, F>(&self, factory: F) -> Arc<Registration>
    where
        T: Injectable,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        self.register::<T>()
            .lifetime(Lifetime::Singleton)
            .factory(move |container| factory(container).map(Arc::new))
            .done()
    }

    /// Register an implementation under any number of runtime interface
    /// types.
    ///
    /// All interfaces share one lifetime manager, so a singleton request
    /// yields the same instance whichever interface is resolved. Returns
    /// the registrations that were replaced.
    pub fn register_request(&self, request: RegistrationRequest) -> Result<Vec<Arc<Registration>>> {
        let RegistrationRequest {
            mut interfaces,
            implementation,
            name,
            lifetime,
            members,
        } = request;

        if interfaces.is_empty() {
            match implementation {
                Some(implementation) => interfaces.push(implementation),
                None => {
                    return Err(DiError::invalid_registration(
                        "a registration needs an interface or an implementation type",
                    ));
                }
            }
        }

        let factory = members.iter().any(InjectionMember::is_factory);
        let manager = lifetime.manager();
        if lifetime == Lifetime::Singleton {
            self.inner.lifetimes.add(Arc::clone(&manager));
        }
        let members: Arc<[InjectionMember]> = Arc::from(members);

        let mut replaced = Vec::new();
        for interface in interfaces {
            let map = implementation
                .filter(|implementation| !factory && *implementation != interface)
                .map(Mapping::to);
            let key = TypeKey::from_parts(Some(interface), name.clone());
            let (_, previous) =
                self.store(key, map, Arc::clone(&manager), Arc::clone(&members), false);
            replaced.extend(previous);
        }
        Ok(replaced)
    }

    pub(crate) fn add_registration(
        &self,
        key: TypeKey,
        map: Option<Mapping>,
        lifetime: Arc<dyn LifetimeManager>,
        members: Arc<[InjectionMember]>,
    ) -> Arc<Registration> {
        self.store(key, map, lifetime, members, true).0
    }

    fn store(
        &self,
        key: TypeKey,
        map: Option<Mapping>,
        lifetime: Arc<dyn LifetimeManager>,
        members: Arc<[InjectionMember]>,
        track: bool,
    ) -> (Arc<Registration>, Option<Arc<Registration>>) {
        if track && lifetime.lifetime() == Lifetime::Singleton {
            self.inner.lifetimes.add(Arc::clone(&lifetime));
        }

        let registration = Arc::new(Registration::new(
            key.clone(),
            RegistrationKind::Explicit,
            map,
            lifetime,
            members,
        ));

        #[cfg(feature = "logging")]
        debug!(
            target: "wiring",
            service = key.type_name(),
            name = key.name(),
            mapped_to = registration.mapped_to().map(|ty| ty.name()),
            lifetime = %registration.lifetime(),
            depth = self.inner.depth,
            registration_count = self.inner.registry.len() + 1,
            "Registering service"
        );

        let previous = self.inner.registry.set(
            key.ty().as_ref(),
            key.name_arc().cloned(),
            Arc::clone(&registration),
        );
        (registration, previous)
    }

    // =========================================================================
    // Registration Lookup
    // =========================================================================

    /// Registration used to build `(ty, name)`.
    ///
    /// Looks at each container from this one up to the root: the exact key
    /// first, then the open generic definition of `ty` under the same name
    /// and under the default name. A generic hit stores a closed
    /// registration in the container holding the definition. When nothing
    /// matches, a constructible type gets an implicit registration in the
    /// root container.
    pub fn registration(&self, ty: &Type, name: Option<&str>) -> Result<Arc<Registration>> {
        let definition = self.inner.introspector.generic_definition(ty);
        let mut level = Arc::clone(&self.inner);

        loop {
            if let Some(registration) = level.registry.find(Some(ty), name) {
                return Ok(registration);
            }

            if let Some(definition) = definition {
                let template = level.registry.find(Some(&definition), name).or_else(|| {
                    name.and_then(|_| level.registry.find(Some(&definition), None))
                });
                if let Some(template) = template {
                    return self.synthesize(&level, &template, *ty, name);
                }
            }

            level = match &level.parent {
                None => break,
                Some(parent) => parent.upgrade().ok_or(DiError::ParentDropped)?,
            };
        }

        if !ty.is_enumerable() && !self.inner.introspector.is_constructible(ty) {
            return Err(DiError::unresolved(
                *ty,
                name,
                "no registration and the type cannot be built on its own",
            ));
        }

        Ok(level.registry.get_or_add(Some(ty), name, || {
            #[cfg(feature = "logging")]
            debug!(
                target: "wiring",
                service = ty.name(),
                name = name,
                "Adding implicit registration"
            );

            Registration::implicit(TypeKey::new(*ty, name))
        }))
    }

    /// Closed registration for `ty` cloned from an open generic `template`
    fn synthesize(
        &self,
        level: &ContainerInner,
        template: &Registration,
        ty: Type,
        name: Option<&str>,
    ) -> Result<Arc<Registration>> {
        let introspector = self.inner.introspector.as_ref();
        let map = match template.mapping() {
            None => None,
            Some(open) => {
                let arguments = introspector.generic_arguments(&ty);
                let closed = introspector
                    .make_generic(&open.target(), &arguments)
                    .ok_or_else(|| {
                        DiError::unresolved(
                            ty,
                            name,
                            format!("cannot close {} over the requested arguments", open.target()),
                        )
                    })?;
                Some(Mapping::to(closed))
            }
        };

        Ok(level.registry.get_or_add(Some(&ty), name, || {
            self.inner.counters.synthesized.fetch_add(1, Ordering::Relaxed);

            #[cfg(feature = "logging")]
            debug!(
                target: "wiring",
                service = ty.name(),
                name = name,
                definition = template.key().type_name(),
                depth = level.depth,
                "Synthesizing closed generic registration"
            );

            let registration = template.synthesize(TypeKey::new(ty, name), map);
            if registration.lifetime() == Lifetime::Singleton {
                level
                    .lifetimes
                    .add(Arc::clone(registration.lifetime_manager()));
            }
            registration
        }))
    }

    /// First explicit registration of `(ty, name)` from this container up
    fn explicit(&self, ty: &Type, name: Option<&str>) -> Option<Arc<Registration>> {
        self.levels()
            .find_map(|level| level.registry.find(Some(ty), name))
            .filter(|registration| registration.is_explicit())
    }

    /// Whether `(ty, name)` was registered through the API at any level
    pub fn is_explicitly_registered(&self, ty: &Type, name: Option<&str>) -> bool {
        self.explicit(ty, name).is_some()
    }

    /// Whether `T` can be resolved without relying on implicit
    /// registration.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use wiring::Container;
    ///
    /// struct Cache;
    ///
    /// let container = Container::new();
    /// assert!(!container.is_registered::<Cache>());
    /// container.singleton(Cache);
    /// assert!(container.is_registered::<Cache>());
    /// ```
    #[inline]
    pub fn is_registered<T: ?Sized + 'static>(&self) -> bool {
        self.is_registered_type(&Type::of::<T>(), None)
    }

    /// Whether `(ty, name)` or its open generic definition is registered
    /// at any level
    pub fn is_registered_type(&self, ty: &Type, name: Option<&str>) -> bool {
        let definition = self.inner.introspector.generic_definition(ty);
        self.levels().any(|level| {
            let exact = level
                .registry
                .find(Some(ty), name)
                .is_some_and(|registration| registration.kind() != RegistrationKind::Implicit);
            exact
                || definition.is_some_and(|definition| {
                    level.registry.find(Some(&definition), name).is_some()
                        || level.registry.find(Some(&definition), None).is_some()
                })
        })
    }

    /// Type built for the default registration of `ty`, following explicit
    /// mappings to the end of the chain
    pub fn final_type(&self, ty: Type) -> Type {
        let mut current = ty;
        let mut seen = vec![ty];
        while let Some(target) = self
            .explicit(&current, None)
            .and_then(|registration| registration.mapping().map(Mapping::target))
        {
            if seen.contains(&target) {
                break;
            }
            seen.push(target);
            current = target;
        }
        current
    }

    /// Names of every registration an enumerable of `ty` should contain,
    /// closest container first, each name once
    pub(crate) fn enumerable_names(&self, ty: &Type) -> Vec<Option<Name>> {
        let definition = self.inner.introspector.generic_definition(ty);
        let mut names: Vec<Option<Name>> = Vec::new();
        for level in self.levels() {
            let exact = level.registry.entries_for(ty);
            let open = definition
                .map(|definition| level.registry.entries_for(&definition))
                .unwrap_or_default();
            for entry in exact.into_iter().chain(open) {
                if entry.value.kind() == RegistrationKind::Implicit {
                    continue;
                }
                if !names.contains(&entry.name) {
                    names.push(entry.name);
                }
            }
        }
        names
    }

    /// Explicit registrations of every level, this container first
    pub fn registrations(&self) -> Vec<Arc<Registration>> {
        self.levels()
            .flat_map(|level| level.registry.entries())
            .filter(|entry| entry.ty.is_some())
            .map(|entry| entry.value)
            .filter(|registration| registration.is_explicit())
            .collect()
    }

    /// Registrations of exactly `ty` at every level, this container first
    pub fn registrations_of(&self, ty: &Type) -> Vec<Arc<Registration>> {
        self.levels()
            .flat_map(|level| level.registry.entries_for(ty))
            .map(|entry| entry.value)
            .filter(|registration| registration.kind() != RegistrationKind::Implicit)
            .collect()
    }

    /// Named registrations of exactly `ty` at every level
    pub fn named_registrations(&self, ty: &Type) -> Vec<Arc<Registration>> {
        self.registrations_of(ty)
            .into_iter()
            .filter(|registration| registration.name().is_some())
            .collect()
    }

    // =========================================================================
    // Default Policies
    // =========================================================================

    /// Set a container-wide policy, used for registrations that carry no
    /// policy of type `P` themselves.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use wiring::{Container, Type};
    ///
    /// #[derive(Debug, PartialEq)]
    /// struct Timeout(u64);
    ///
    /// let root = Container::new();
    /// root.set_default_policy(Timeout(30));
    /// root.singleton(1u8);
    ///
    /// let child = root.child();
    /// let registration = child.registration(&Type::of::<u8>(), None).unwrap();
    /// assert_eq!(child.policy_for::<Timeout>(&registration).as_deref(), Some(&Timeout(30)));
    /// ```
    pub fn set_default_policy<P: Any + Send + Sync>(&self, policy: P) {
        let defaults = self.inner.registry.get_or_add(None, None, || {
            Registration::implicit(TypeKey::defaults())
        });
        defaults.set_policy(policy);
    }

    /// Container-wide policy of type `P`, closest container first
    pub fn default_policy<P: Any + Send + Sync>(&self) -> Option<Arc<P>> {
        self.levels()
            .filter_map(|level| level.registry.find(None, None))
            .find_map(|defaults| defaults.policy::<P>())
    }

    /// Policy of type `P` for `registration`, falling back to the
    /// container-wide default
    pub fn policy_for<P: Any + Send + Sync>(&self, registration: &Registration) -> Option<Arc<P>> {
        registration
            .policy::<P>()
            .or_else(|| self.default_policy::<P>())
    }

    // =========================================================================
    // Resolution Methods
    // =========================================================================

    /// Resolve `T`, which may be a trait object.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use wiring::{Container, DiError};
    ///
    /// trait Clock: Send + Sync + std::fmt::Debug {}
    ///
    /// let container = Container::new();
    /// let err = container.resolve::<dyn Clock>().unwrap_err();
    /// assert!(matches!(err, DiError::UnresolvedDependency { .. }));
    /// ```
    #[inline]
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.resolve_as::<T>(None)
    }

    /// Resolve the registration of `T` under `name`
    #[inline]
    pub fn resolve_named<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        self.resolve_as::<T>(Some(name))
    }

    /// Resolve `T`, returning `None` on any failure
    #[inline]
    pub fn try_resolve<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.resolve::<T>().ok()
    }

    /// One instance per registration of `T` visible from this container.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use wiring::Container;
    ///
    /// struct Route(&'static str);
    ///
    /// let container = Container::new();
    /// container.singleton_named("home", Route("/"));
    /// container.singleton_named("about", Route("/about"));
    ///
    /// let routes = container.resolve_all::<Route>().unwrap();
    /// assert_eq!(routes.len(), 2);
    /// ```
    pub fn resolve_all<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<T>>> {
        let all = self.resolve_type(&Type::enumerable::<T>(), None)?;
        let items = all
            .downcast::<Vec<Arc<T>>>()
            .ok_or_else(DiError::type_mismatch::<Vec<Arc<T>>>)?;
        Ok(items.as_ref().clone())
    }

    /// Resolve a runtime type
    ///
    /// Called from inside a factory while another resolve is running on the
    /// same thread, this joins that call: its per-resolve instances are
    /// shared and a cycle back to a key still being built is reported as
    /// [`DiError::CircularDependency`].
    pub fn resolve_type(&self, ty: &Type, name: Option<&str>) -> Result<Instance> {
        let (scope, _active) = ResolveScope::join_or_open();

        #[cfg(feature = "logging")]
        trace!(
            target: "wiring",
            service = ty.name(),
            name = name,
            resolve = scope.id().id(),
            depth = self.inner.depth,
            "Resolving service"
        );

        self.resolve_in(&scope, *ty, name.map(Name::from))
    }

    fn resolve_as<T: ?Sized + Send + Sync + 'static>(&self, name: Option<&str>) -> Result<Arc<T>> {
        self.resolve_type(&Type::of::<T>(), name)?
            .downcast::<T>()
            .ok_or_else(DiError::type_mismatch::<T>)
    }

    /// Resolve `(ty, name)` as part of the top-level call owning `scope`
    pub(crate) fn resolve_in(
        &self,
        scope: &ResolveScope,
        ty: Type,
        name: Option<Name>,
    ) -> Result<Instance> {
        if self.inner.disposed.load(Ordering::Acquire) {
            return Err(DiError::Disposed);
        }

        let key = TypeKey::from_parts(Some(ty), name);
        let owner = self.scope_owner();
        if let Some(instance) = scope.cached(owner, &key) {
            return Ok(instance);
        }

        let registration = self.registration(&ty, key.name())?;
        let _guard = scope.enter(Arc::as_ptr(&registration) as usize, &key)?;

        #[cfg(feature = "logging")]
        trace!(
            target: "wiring",
            service = ty.name(),
            name = key.name(),
            kind = ?registration.kind(),
            resolve = scope.id().id(),
            stack = scope.depth(),
            "Building service"
        );

        let mut ctx = BuilderContext::new(self, scope, key, ty, registration);
        strategy::build(&mut ctx)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Identity of this container within a resolve scope
    #[inline]
    pub(crate) fn scope_owner(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    pub(crate) fn record_compiled_plan(&self) {
        self.inner.counters.compiled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> ContainerStats {
        ContainerStats {
            registrations: self.inner.registry.len(),
            synthesized_generics: self.inner.counters.synthesized.load(Ordering::Relaxed),
            compiled_plans: self.inner.counters.compiled.load(Ordering::Relaxed),
        }
    }

    /// Release the singletons owned by this container, newest first.
    /// Later resolutions fail with [`DiError::Disposed`]. Dropping the last
    /// handle does the same.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("registrations", &self.inner.registry.len())
            .field("capacity", &self.inner.registry.capacity())
            .field("depth", &self.inner.depth)
            .field("has_parent", &self.inner.parent.is_some())
            .field("lifetimes", &self.inner.lifetimes)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::injection::Directive;
    use crate::introspect::{Arguments, Constructor, Method, Parameter};
    use std::marker::PhantomData;
    use std::sync::atomic::AtomicU32;
    use std::sync::{Barrier, mpsc};
    use std::thread;
    use std::time::Duration;

    trait Greeter: Send + Sync {
        fn greet(&self) -> &'static str;
    }

    impl std::fmt::Debug for dyn Greeter {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("dyn Greeter")
        }
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> &'static str {
            "hello"
        }
    }

    struct French;

    impl Greeter for French {
        fn greet(&self) -> &'static str {
            "bonjour"
        }
    }

    #[derive(Default)]
    struct Service {
        level: AtomicU32,
    }

    fn catalog() -> Arc<TypeCatalog> {
        let catalog = Arc::new(TypeCatalog::new());
        catalog
            .describe::<English>(|ty| {
                ty.constructor(Constructor::new(|_| Ok(English)))
                    .implements::<dyn Greeter, _>(|e| e as Arc<dyn Greeter>);
            })
            .describe::<French>(|ty| {
                ty.constructor(Constructor::new(|_| Ok(French)))
                    .implements::<dyn Greeter, _>(|f| f as Arc<dyn Greeter>);
            })
            .describe::<Service>(|ty| {
                ty.constructor(Constructor::new(|_| Ok(Service::default())))
                    .method(
                        Method::new("configure", |s: &Service, args: &Arguments| {
                            s.level.store(*args.get::<u32>(0)?, Ordering::SeqCst);
                            Ok(())
                        })
                        .param(Parameter::of::<u32>("level")),
                    );
            });
        catalog
    }

    fn container() -> Container {
        Container::with_introspector(catalog())
    }

    #[test]
    fn test_singleton_identity() {
        let container = container();
        container
            .register::<Service>()
            .lifetime(Lifetime::Singleton)
            .done();

        let a = container.resolve::<Service>().unwrap();
        let b = container.resolve::<Service>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_transient_distinct_instances() {
        let container = container();
        container.transient::<Service>();

        let a = container.resolve::<Service>().unwrap();
        let b = container.resolve::<Service>().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));

        let registration = container.registration(&Type::of::<Service>(), None).unwrap();
        assert!(registration.is_compiled());
        assert_eq!(container.stats().compiled_plans, 1);
    }

    #[test]
    fn test_constructor_arity_selection() {
        struct Wide(usize);

        let catalog = catalog();
        let ctor = |params: &[&'static str]| {
            params.iter().fold(
                Constructor::new(|args: &Arguments| Ok(Wide(args.len()))),
                |ctor, param| ctor.param(Parameter::of::<u8>(*param)),
            )
        };
        catalog.describe::<Wide>(|ty| {
            ty.constructor(ctor(&["a", "b", "c"]))
                .constructor(ctor(&["a", "b", "c"]));
        });
        let container = Container::with_introspector(Arc::clone(&catalog));
        container.singleton(1u8);
        match container.resolve::<Wide>() {
            Err(DiError::AmbiguousConstructor { arity, .. }) => assert_eq!(arity, 3),
            other => panic!("expected ambiguity, got {:?}", other.map(|w| w.0)),
        }

        catalog.describe::<Wide>(|ty| {
            ty.constructor(ctor(&["a", "b"]))
                .constructor(ctor(&["a", "b", "c"]));
        });
        let container = Container::with_introspector(catalog);
        container.singleton(1u8);
        assert_eq!(container.resolve::<Wide>().unwrap().0, 3);
    }

    #[test]
    fn test_named_registration_does_not_fall_back() {
        let container = container();
        container
            .register::<dyn Greeter>()
            .named("en")
            .to::<English>()
            .done();

        let greeter = container.resolve_named::<dyn Greeter>("en").unwrap();
        assert_eq!(greeter.greet(), "hello");

        let err = container.resolve::<dyn Greeter>().unwrap_err();
        assert!(err.is_unresolved());
        assert_eq!(err.subject(), Some((Type::of::<dyn Greeter>().name(), None)));
    }

    #[test]
    fn test_child_overrides_parent() {
        struct Settings(&'static str);

        let parent = container();
        parent.singleton(Settings("parent"));
        parent.register::<dyn Greeter>().to::<English>().done();

        let child = parent.child();
        assert_eq!(child.resolve::<Settings>().unwrap().0, "parent");

        child.singleton(Settings("child"));
        child.register::<dyn Greeter>().to::<French>().done();

        assert_eq!(child.resolve::<Settings>().unwrap().0, "child");
        assert_eq!(parent.resolve::<Settings>().unwrap().0, "parent");
        assert_eq!(child.resolve::<dyn Greeter>().unwrap().greet(), "bonjour");
        assert_eq!(parent.resolve::<dyn Greeter>().unwrap().greet(), "hello");
    }

    #[test]
    fn test_child_after_parent_dropped() {
        let child = container().child();
        assert!(matches!(
            child.resolve::<Service>(),
            Err(DiError::ParentDropped)
        ));
    }

    struct RepoDef;

    struct Repo<T>(PhantomData<fn() -> T>);

    struct User;

    #[test]
    fn test_open_generic_synthesis() {
        let catalog = catalog();
        catalog.describe::<Repo<User>>(|ty| {
            ty.constructor(Constructor::new(|_| Ok(Repo::<User>(PhantomData))))
                .closes(Type::of::<RepoDef>(), vec![Type::of::<User>()]);
        });
        let container = Container::with_introspector(catalog);
        container
            .register_request(
                RegistrationRequest::new()
                    .interface(Type::of::<RepoDef>())
                    .lifetime(Lifetime::Singleton),
            )
            .unwrap();

        assert!(container.is_registered::<Repo<User>>());
        assert_eq!(container.stats().synthesized_generics, 0);

        let a = container.resolve::<Repo<User>>().unwrap();
        assert_eq!(container.stats().synthesized_generics, 1);

        let b = container.resolve::<Repo<User>>().unwrap();
        assert_eq!(container.stats().synthesized_generics, 1);
        assert!(Arc::ptr_eq(&a, &b));

        let closed = container.registration(&Type::of::<Repo<User>>(), None).unwrap();
        assert_eq!(closed.kind(), RegistrationKind::Synthesized);
    }

    trait Store<T>: Send + Sync {
        fn kind(&self) -> &'static str;
    }

    struct StoreDef;

    struct MemoryStoreDef;

    struct MemoryStore<T>(PhantomData<fn() -> T>);

    impl<T> Store<T> for MemoryStore<T> {
        fn kind(&self) -> &'static str {
            "memory"
        }
    }

    #[test]
    fn test_open_generic_mapping() {
        let catalog = catalog();
        catalog
            .close(
                Type::of::<dyn Store<User>>(),
                Type::of::<StoreDef>(),
                vec![Type::of::<User>()],
            )
            .describe::<MemoryStore<User>>(|ty| {
                ty.constructor(Constructor::new(|_| Ok(MemoryStore::<User>(PhantomData))))
                    .closes(Type::of::<MemoryStoreDef>(), vec![Type::of::<User>()])
                    .implements::<dyn Store<User>, _>(|s| s as Arc<dyn Store<User>>);
            });
        let container = Container::with_introspector(catalog);
        container
            .register_request(
                RegistrationRequest::new()
                    .interface(Type::of::<StoreDef>())
                    .implementation(Type::of::<MemoryStoreDef>()),
            )
            .unwrap();

        let store = container.resolve::<dyn Store<User>>().unwrap();
        assert_eq!(store.kind(), "memory");
    }

    #[test]
    fn test_per_resolve_shared_within_one_call() {
        struct Leaf;
        struct Pair {
            a: Arc<Leaf>,
            b: Arc<Leaf>,
        }

        let catalog = catalog();
        catalog
            .describe::<Leaf>(|ty| {
                ty.constructor(Constructor::new(|_| Ok(Leaf)));
            })
            .describe::<Pair>(|ty| {
                ty.constructor(
                    Constructor::new(|args: &Arguments| {
                        Ok(Pair {
                            a: args.get(0)?,
                            b: args.get(1)?,
                        })
                    })
                    .param(Parameter::of::<Leaf>("a"))
                    .param(Parameter::of::<Leaf>("b")),
                );
            });
        let container = Container::with_introspector(catalog);
        container
            .register::<Leaf>()
            .lifetime(Lifetime::PerResolve)
            .done();

        let first = container.resolve::<Pair>().unwrap();
        let second = container.resolve::<Pair>().unwrap();
        assert!(Arc::ptr_eq(&first.a, &first.b));
        assert!(!Arc::ptr_eq(&first.a, &second.a));
    }

    #[test]
    fn test_per_resolve_mapped_interface() {
        struct Both {
            a: Arc<dyn Greeter>,
            b: Arc<dyn Greeter>,
        }

        let catalog = catalog();
        catalog.describe::<Both>(|ty| {
            ty.constructor(
                Constructor::new(|args: &Arguments| {
                    Ok(Both {
                        a: args.get(0)?,
                        b: args.get(1)?,
                    })
                })
                .param(Parameter::of::<dyn Greeter>("a"))
                .param(Parameter::of::<dyn Greeter>("b")),
            );
        });
        let container = Container::with_introspector(catalog);
        container
            .register::<dyn Greeter>()
            .to::<English>()
            .lifetime(Lifetime::PerResolve)
            .done();

        let both = container.resolve::<Both>().unwrap();
        assert_eq!(both.b.greet(), "hello");
        assert!(Arc::ptr_eq(&both.a, &both.b));
    }

    #[test]
    fn test_cycle_is_reported() {
        struct Ping;
        struct Pong;

        let catalog = catalog();
        catalog
            .describe::<Ping>(|ty| {
                ty.constructor(Constructor::new(|_| Ok(Ping)).param(Parameter::of::<Pong>("pong")));
            })
            .describe::<Pong>(|ty| {
                ty.constructor(Constructor::new(|_| Ok(Pong)).param(Parameter::of::<Ping>("ping")));
            });
        let container = Container::with_introspector(catalog);

        match container.resolve::<Ping>() {
            Err(DiError::CircularDependency { chain, .. }) => {
                assert_eq!(chain.len(), 3);
                assert_eq!(chain.first(), chain.last());
            }
            other => panic!("expected a cycle, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_failure_does_not_poison_caches() {
        #[derive(Debug)]
        struct Greeting(&'static str);

        let catalog = catalog();
        catalog.describe::<Greeting>(|ty| {
            ty.constructor(
                Constructor::new(|args: &Arguments| Ok(Greeting(args.get::<dyn Greeter>(0)?.greet())))
                    .param(Parameter::of::<dyn Greeter>("greeter")),
            );
        });
        let container = Container::with_introspector(catalog);

        let err = container.resolve::<Greeting>().unwrap_err();
        assert!(err.is_unresolved());

        container.register::<dyn Greeter>().to::<French>().done();
        assert_eq!(container.resolve::<Greeting>().unwrap().0, "bonjour");
    }

    #[test]
    fn test_cast_described_later_is_picked_up() {
        struct Late;

        impl Greeter for Late {
            fn greet(&self) -> &'static str {
                "late"
            }
        }

        let catalog = catalog();
        catalog.describe::<Late>(|ty| {
            ty.constructor(Constructor::new(|_| Ok(Late)));
        });
        let container = Container::with_introspector(Arc::clone(&catalog));
        container.register::<dyn Greeter>().to::<Late>().done();

        let err = container.resolve::<dyn Greeter>().unwrap_err();
        assert!(matches!(err, DiError::TypeMismatch { .. }));

        catalog.describe::<Late>(|ty| {
            ty.constructor(Constructor::new(|_| Ok(Late)))
                .implements::<dyn Greeter, _>(|l| l as Arc<dyn Greeter>);
        });
        assert_eq!(container.resolve::<dyn Greeter>().unwrap().greet(), "late");
    }

    #[test]
    fn test_singleton_factory_cycle_is_reported() {
        struct Looping;

        let container = container();
        container.lazy(|c: &Container| {
            c.resolve::<Looping>()?;
            Ok(Looping)
        });

        let (tx, rx) = mpsc::channel();
        let worker = container.clone();
        thread::spawn(move || {
            let _ = tx.send(worker.resolve::<Looping>().map(|_| ()));
        });
        let result = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("singleton factory resolving itself did not finish");
        match result {
            Err(DiError::CircularDependency { chain, .. }) => {
                assert_eq!(chain.first(), chain.last());
            }
            other => panic!("expected a cycle, got {other:?}"),
        }

        // The failed build stored nothing and left the mutex free
        assert!(matches!(
            container.resolve::<Looping>(),
            Err(DiError::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_transient_factory_cycle_is_reported() {
        #[derive(Debug)]
        struct Looping;

        let container = container();
        container
            .register::<Looping>()
            .factory(|c: &Container| {
                c.resolve::<Looping>()?;
                Ok(Arc::new(Looping))
            })
            .done();

        let err = container.resolve::<Looping>().unwrap_err();
        assert!(matches!(err, DiError::CircularDependency { .. }));
    }

    #[test]
    fn test_factory_may_delegate_to_parent_registration() {
        let parent = container();
        parent.singleton_named("base", 1u32);
        parent.lazy(|c: &Container| Ok(*c.resolve_named::<u32>("base")? + 1));

        let child = parent.child();
        let upstream = parent.clone();
        child
            .register::<u32>()
            .factory(move |_| Ok(Arc::new(*upstream.resolve::<u32>()? * 10)))
            .done();

        assert_eq!(*child.resolve::<u32>().unwrap(), 20);
        assert_eq!(*parent.resolve::<u32>().unwrap(), 2);
    }

    #[test]
    fn test_factory_resolves_share_per_resolve_instances() {
        struct Pair(Arc<Service>, Arc<Service>);

        let container = container();
        container
            .register::<Service>()
            .lifetime(Lifetime::PerResolve)
            .done();
        container
            .register::<Pair>()
            .factory(|c: &Container| Ok(Arc::new(Pair(c.resolve()?, c.resolve()?))))
            .done();

        let pair = container.resolve::<Pair>().unwrap();
        assert!(Arc::ptr_eq(&pair.0, &pair.1));

        let other = container.resolve::<Pair>().unwrap();
        assert!(!Arc::ptr_eq(&pair.0, &other.0));
    }

    #[test]
    fn test_reregistration_replaces_plan_and_singleton() {
        let container = container();
        container
            .register::<Service>()
            .lifetime(Lifetime::Singleton)
            .done();
        let first = container.resolve::<Service>().unwrap();
        assert_eq!(first.level.load(Ordering::SeqCst), 0);
        assert!(Arc::ptr_eq(&first, &container.resolve::<Service>().unwrap()));
        assert_eq!(container.stats().compiled_plans, 1);

        container
            .register::<Service>()
            .factory(|_| Ok(Arc::new(Service { level: AtomicU32::new(7) })))
            .done();
        let second = container.resolve::<Service>().unwrap();
        let third = container.resolve::<Service>().unwrap();
        assert_eq!(second.level.load(Ordering::SeqCst), 7);
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&second, &third));
        assert_eq!(container.stats().compiled_plans, 2);

        container
            .register::<Service>()
            .lifetime(Lifetime::Singleton)
            .member(InjectionMember::method(
                "configure",
                vec![Directive::value(3u32)],
            ))
            .done();
        let fourth = container.resolve::<Service>().unwrap();
        assert_eq!(fourth.level.load(Ordering::SeqCst), 3);
        assert!(Arc::ptr_eq(&fourth, &container.resolve::<Service>().unwrap()));
        assert_eq!(container.stats().compiled_plans, 3);
    }

    #[test]
    fn test_supplied_instance_bypasses_ambiguous_constructor() {
        struct Tied(u8);

        let catalog = catalog();
        catalog.describe::<Tied>(|ty| {
            ty.constructor(
                Constructor::new(|args: &Arguments| Ok(Tied(*args.get::<u8>(0)?)))
                    .param(Parameter::of::<u8>("a")),
            )
            .constructor(
                Constructor::new(|args: &Arguments| Ok(Tied(*args.get::<u8>(0)? + 1)))
                    .param(Parameter::of::<u8>("b")),
            );
        });
        let container = Container::with_introspector(catalog);
        container.singleton(1u8);
        assert!(matches!(
            container.resolve::<Tied>(),
            Err(DiError::AmbiguousConstructor { arity: 1, .. })
        ));

        container.register::<Tied>().instance(Arc::new(Tied(9))).done();
        assert_eq!(container.resolve::<Tied>().unwrap().0, 9);

        container
            .register::<Tied>()
            .factory(|_| Ok(Arc::new(Tied(5))))
            .done();
        assert_eq!(container.resolve::<Tied>().unwrap().0, 5);
    }

    #[test]
    fn test_concurrent_implicit_registration() {
        let container = container();
        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let container = container.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    container.resolve::<English>().unwrap();
                    container.registration(&Type::of::<English>(), None).unwrap()
                })
            })
            .collect();

        let registrations: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(registrations.iter().all(|r| Arc::ptr_eq(r, &registrations[0])));
        assert_eq!(registrations[0].kind(), RegistrationKind::Implicit);
        assert_eq!(container.stats().registrations, 1);
    }

    #[test]
    fn test_growth_keeps_every_registration() {
        let container = Container::with_config(
            ContainerConfig::new()
                .initial_capacity(2)
                .list_to_hash_cutover(2)
                .max_bucket_collisions(2),
        );
        for i in 0..40u32 {
            container.singleton_named(&format!("n{i}"), i);
        }
        container.singleton(1u8);
        container.singleton(2u16);
        container.singleton(3u64);
        container.singleton(4i8);
        container.singleton(5i16);
        container.singleton(6i32);
        container.singleton(7i64);
        container.singleton(String::from("s"));
        container.singleton(true);

        assert!(container.inner.registry.capacity() > 2);
        for i in 0..40u32 {
            assert_eq!(*container.resolve_named::<u32>(&format!("n{i}")).unwrap(), i);
        }
        assert_eq!(*container.resolve::<u8>().unwrap(), 1);
        assert_eq!(*container.resolve::<i64>().unwrap(), 7);
        assert!(*container.resolve::<bool>().unwrap());
        assert_eq!(container.named_registrations(&Type::of::<u32>()).len(), 40);
    }

    #[test]
    fn test_factory_with_method_injection() {
        let container = container();
        container
            .register::<Service>()
            .factory(|_| Ok(Arc::new(Service::default())))
            .method("configure", vec![Directive::value(7u32)])
            .done();

        let service = container.resolve::<Service>().unwrap();
        assert_eq!(service.level.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_optional_dependency() {
        struct Maybe(Option<Arc<dyn Greeter>>);

        let catalog = catalog();
        catalog.describe::<Maybe>(|ty| {
            ty.constructor(
                Constructor::new(|args: &Arguments| Ok(Maybe(args.optional::<dyn Greeter>(0))))
                    .param(Parameter::of::<dyn Greeter>("greeter").optional()),
            );
        });
        let container = Container::with_introspector(catalog);
        assert!(container.resolve::<Maybe>().unwrap().0.is_none());

        container.register::<dyn Greeter>().to::<English>().done();
        assert!(container.resolve::<Maybe>().unwrap().0.is_some());
    }

    #[test]
    fn test_enumerable_child_first_deduplicated() {
        let parent = container();
        parent.register::<dyn Greeter>().named("a").to::<English>().done();
        parent.register::<dyn Greeter>().named("b").to::<English>().done();

        let child = parent.child();
        child.register::<dyn Greeter>().named("a").to::<French>().done();
        child.register::<dyn Greeter>().named("c").to::<French>().done();

        let greetings: Vec<_> = child
            .resolve_all::<dyn Greeter>()
            .unwrap()
            .iter()
            .map(|g| g.greet())
            .collect();
        assert_eq!(greetings, vec!["bonjour", "bonjour", "hello"]);
        assert_eq!(parent.resolve_all::<dyn Greeter>().unwrap().len(), 2);
        assert_eq!(child.registrations_of(&Type::of::<dyn Greeter>()).len(), 4);
    }

    #[test]
    fn test_enumerable_follows_final_type() {
        let container = container();
        container.register::<dyn Greeter>().to::<English>().done();
        container.singleton_named("one", English);
        container.singleton_named("two", English);

        assert_eq!(container.final_type(Type::of::<dyn Greeter>()), Type::of::<English>());
        let all = container.resolve_all::<dyn Greeter>().unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|g| g.greet() == "hello"));
    }

    #[test]
    fn test_enumerable_of_nothing_is_empty() {
        let container = container();
        assert!(container.resolve_all::<dyn Greeter>().unwrap().is_empty());
    }

    #[test]
    fn test_register_request_shares_lifetime() {
        trait Named: Send + Sync {}
        impl Named for English {}

        let catalog = catalog();
        catalog.describe::<English>(|ty| {
            ty.constructor(Constructor::new(|_| Ok(English)))
                .implements::<dyn Greeter, _>(|e| e as Arc<dyn Greeter>)
                .implements::<dyn Named, _>(|e| e as Arc<dyn Named>);
        });
        let container = Container::with_introspector(catalog);
        let replaced = container
            .register_request(
                RegistrationRequest::new()
                    .interface(Type::of::<dyn Greeter>())
                    .interface(Type::of::<dyn Named>())
                    .implementation(Type::of::<English>())
                    .lifetime(Lifetime::Singleton),
            )
            .unwrap();
        assert!(replaced.is_empty());

        let greeter = container.resolve::<dyn Greeter>().unwrap();
        let named = container.resolve::<dyn Named>().unwrap();
        assert_eq!(
            Arc::as_ptr(&greeter) as *const u8,
            Arc::as_ptr(&named) as *const u8
        );

        let replaced = container
            .register_request(RegistrationRequest::new().interface(Type::of::<dyn Greeter>()))
            .unwrap();
        assert_eq!(replaced.len(), 1);

        let err = container
            .register_request(RegistrationRequest::new().lifetime(Lifetime::Singleton))
            .unwrap_err();
        assert!(matches!(err, DiError::InvalidRegistration { .. }));
    }

    #[test]
    fn test_registrations_child_first() {
        let parent = container();
        parent.singleton(1u8);
        let child = parent.child();
        child.singleton(2u8);
        child.resolve::<English>().unwrap();

        let all = child.registrations();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|r| r.is_explicit()));
        assert_eq!(*child.resolve::<u8>().unwrap(), 2);
    }

    #[test]
    fn test_default_policies() {
        #[derive(Debug, PartialEq)]
        struct Retries(u8);

        let parent = container();
        parent.set_default_policy(Retries(3));
        let registration = parent.singleton(1u8);

        let child = parent.child();
        assert_eq!(child.default_policy::<Retries>().as_deref(), Some(&Retries(3)));
        child.set_default_policy(Retries(5));
        assert_eq!(child.policy_for::<Retries>(&registration).as_deref(), Some(&Retries(5)));
        assert_eq!(parent.policy_for::<Retries>(&registration).as_deref(), Some(&Retries(3)));

        registration.set_policy(Retries(9));
        assert_eq!(child.policy_for::<Retries>(&registration).as_deref(), Some(&Retries(9)));

        assert_eq!(parent.registrations().len(), 1);
        assert!(!parent.is_registered::<u16>());
    }

    #[test]
    fn test_dispose_releases_singletons() {
        struct Tracked(Arc<AtomicBool>);

        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let dropped = Arc::new(AtomicBool::new(false));
        let container = Container::new();
        container.singleton(Tracked(Arc::clone(&dropped)));
        drop(container.resolve::<Tracked>().unwrap());
        assert!(!dropped.load(Ordering::SeqCst));

        container.dispose();
        assert!(dropped.load(Ordering::SeqCst));
        assert!(container.is_disposed());
        assert!(matches!(container.resolve::<Tracked>(), Err(DiError::Disposed)));
    }
}
