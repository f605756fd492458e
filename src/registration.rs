//! Registrations and the registration façade
//!
//! A [`Registration`] is the recipe stored for one `(type, name)` key. Its
//! build plan is compiled on first use and cached for the life of the
//! registration; replacing the registration is the only way to drop it.

use crate::introspect::Caster;
use crate::injection::{Directive, InjectionMember};
use crate::lifetime::{ContainerControlledLifetimeManager, Lifetime, LifetimeManager};
use crate::plan::BuildPlan;
use crate::strategy::{self, BuildChain, EnumerableDispatch};
use crate::types::{Injectable, Instance, Name, Type, TypeKey};
use crate::{Container, DiError, Result};
use ahash::RandomState;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;

/// How a registration came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationKind {
    /// Registered through the container API
    Explicit,
    /// Created on first resolution of a concrete, unregistered type
    Implicit,
    /// Closed from an open generic registration
    Synthesized,
}

/// Target of an interface to implementation registration.
#[derive(Clone)]
pub struct Mapping {
    target: Type,
    cast: Option<Caster>,
}

impl Mapping {
    /// Map to `target`; the cast is looked up from the introspector
    pub fn to(target: Type) -> Self {
        Self { target, cast: None }
    }

    /// Map to `target`, converting built instances with `cast`
    pub fn with_cast(target: Type, cast: Caster) -> Self {
        Self {
            target,
            cast: Some(cast),
        }
    }

    pub fn target(&self) -> Type {
        self.target
    }

    pub(crate) fn cast(&self) -> Option<&Caster> {
        self.cast.as_ref()
    }
}

impl std::fmt::Debug for Mapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapping")
            .field("target", &self.target)
            .field("cast", &self.cast.is_some())
            .finish()
    }
}

/// The policy set stored against one `(type, name)` key.
pub struct Registration {
    key: TypeKey,
    kind: RegistrationKind,
    map: Option<Mapping>,
    lifetime: Arc<dyn LifetimeManager>,
    members: Arc<[InjectionMember]>,
    chain: BuildChain,
    plan: OnceCell<Arc<BuildPlan>>,
    enumerable: OnceCell<EnumerableDispatch>,
    policies: DashMap<TypeId, Arc<dyn Any + Send + Sync>, RandomState>,
}

impl Registration {
    pub(crate) fn new(
        key: TypeKey,
        kind: RegistrationKind,
        map: Option<Mapping>,
        lifetime: Arc<dyn LifetimeManager>,
        members: Arc<[InjectionMember]>,
    ) -> Self {
        let chain = strategy::chain_for(&key, kind, map.as_ref(), &members);
        Self {
            key,
            kind,
            map,
            lifetime,
            members,
            chain,
            plan: OnceCell::new(),
            enumerable: OnceCell::new(),
            policies: DashMap::default(),
        }
    }

    /// Registration without members, mapping or caching
    pub(crate) fn implicit(key: TypeKey) -> Self {
        Self::new(
            key,
            RegistrationKind::Implicit,
            None,
            Lifetime::Transient.manager(),
            Arc::from(Vec::new()),
        )
    }

    /// Closed registration built from this open generic template. Members
    /// are shared, the lifetime manager is fresh.
    pub(crate) fn synthesize(&self, key: TypeKey, map: Option<Mapping>) -> Self {
        Self::new(
            key,
            RegistrationKind::Synthesized,
            map,
            self.lifetime.create_policy(),
            Arc::clone(&self.members),
        )
    }

    #[inline]
    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    #[inline]
    pub fn ty(&self) -> Option<Type> {
        self.key.ty()
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.key.name()
    }

    #[inline]
    pub fn kind(&self) -> RegistrationKind {
        self.kind
    }

    #[inline]
    pub fn is_explicit(&self) -> bool {
        self.kind == RegistrationKind::Explicit
    }

    pub fn mapping(&self) -> Option<&Mapping> {
        self.map.as_ref()
    }

    /// Type this registration builds
    pub fn mapped_to(&self) -> Option<Type> {
        self.map.as_ref().map(Mapping::target).or(self.key.ty())
    }

    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime.lifetime()
    }

    #[inline]
    pub fn lifetime_manager(&self) -> &Arc<dyn LifetimeManager> {
        &self.lifetime
    }

    #[inline]
    pub fn members(&self) -> &[InjectionMember] {
        &self.members
    }

    pub fn has_factory(&self) -> bool {
        self.members.iter().any(InjectionMember::is_factory)
    }

    /// Whether the build plan has been compiled
    pub fn is_compiled(&self) -> bool {
        self.plan.get().is_some()
    }

    /// Attach an extra policy, replacing one of the same type
    pub fn set_policy<P: Any + Send + Sync>(&self, policy: P) {
        self.policies.insert(TypeId::of::<P>(), Arc::new(policy));
    }

    pub fn policy<P: Any + Send + Sync>(&self) -> Option<Arc<P>> {
        self.policies
            .get(&TypeId::of::<P>())
            .and_then(|entry| Arc::clone(entry.value()).downcast::<P>().ok())
    }

    #[inline]
    pub(crate) fn chain(&self) -> &BuildChain {
        &self.chain
    }

    /// Cached plan, compiled by `compile` on first use. A failed compile
    /// leaves the cache empty.
    pub(crate) fn plan_or_compile(
        &self,
        compile: impl FnOnce() -> Result<BuildPlan>,
    ) -> Result<Arc<BuildPlan>> {
        self.plan
            .get_or_try_init(|| compile().map(Arc::new))
            .map(Arc::clone)
    }

    #[inline]
    pub(crate) fn enumerable(&self) -> &OnceCell<EnumerableDispatch> {
        &self.enumerable
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("map", &self.map)
            .field("lifetime", &self.lifetime())
            .field("members", &self.members.len())
            .field("compiled", &self.is_compiled())
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Fluent registration of `T`, returned by [`Container::register`].
///
/// # Examples
///
/// ```rust
/// use wiring::{Container, Lifetime, TypeCatalog};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
///
/// impl Greeter for English {
///     fn greet(&self) -> String {
///         "hello".into()
///     }
/// }
///
/// let catalog = TypeCatalog::new();
/// catalog.describe::<English>(|ty| {
///     ty.constructor(wiring::Constructor::new(|_| Ok(English)));
/// });
///
/// let container = Container::with_introspector(catalog);
/// container
///     .register::<dyn Greeter>()
///     .to_with::<English, _>(|e| e as Arc<dyn Greeter>)
///     .lifetime(Lifetime::Singleton)
///     .done();
///
/// let greeter = container.resolve::<dyn Greeter>().unwrap();
/// assert_eq!(greeter.greet(), "hello");
/// ```
#[must_use = "registrations take effect on `done()`"]
pub struct RegistrationBuilder<'a, T: ?Sized> {
    container: &'a Container,
    ty: Type,
    name: Option<Name>,
    map: Option<Mapping>,
    lifetime: Arc<dyn LifetimeManager>,
    members: Vec<InjectionMember>,
    _marker: PhantomData<fn(&T)>,
}

impl<'a, T: ?Sized + Send + Sync + 'static> RegistrationBuilder<'a, T> {
    pub(crate) fn new(container: &'a Container) -> Self {
        Self {
            container,
            ty: Type::of::<T>(),
            name: None,
            map: None,
            lifetime: Lifetime::Transient.manager(),
            members: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Register under a name
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(Name::from(name));
        self
    }

    /// Build `U` for requests of `T`; the conversion comes from the
    /// introspector
    pub fn to<U: Injectable>(mut self) -> Self {
        self.map = Some(Mapping::to(Type::of::<U>()));
        self
    }

    /// Build `U` for requests of `T`, converting with `cast`
    pub fn to_with<U, F>(mut self, cast: F) -> Self
    where
        U: Injectable,
        F: Fn(Arc<U>) -> Arc<T> + Send + Sync + 'static,
    {
        let caster: Caster = Arc::new(move |instance: Instance| {
            let concrete = instance
                .downcast::<U>()
                .ok_or_else(DiError::type_mismatch::<U>)?;
            Ok(Instance::from_arc(cast(concrete)))
        });
        self.map = Some(Mapping::with_cast(Type::of::<U>(), caster));
        self
    }

    /// Map to a runtime type, e.g. an open generic definition
    pub fn to_type(mut self, target: Type) -> Self {
        self.map = Some(Mapping::to(target));
        self
    }

    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime.manager();
        self
    }

    pub fn lifetime_manager(mut self, manager: Arc<dyn LifetimeManager>) -> Self {
        self.lifetime = manager;
        self
    }

    pub fn member(mut self, member: InjectionMember) -> Self {
        self.members.push(member);
        self
    }

    /// Use the constructor matching these arguments
    pub fn constructor(self, args: Vec<Directive>) -> Self {
        self.member(InjectionMember::constructor(args))
    }

    /// Invoke a method after construction
    pub fn method(self, name: &'static str, args: Vec<Directive>) -> Self {
        self.member(InjectionMember::method(name, args))
    }

    /// Assign a field after construction
    pub fn field(self, name: &'static str) -> Self {
        self.member(InjectionMember::field(name))
    }

    /// Build instances with `factory`. A factory supplies the final
    /// instance, so it takes precedence over any mapping.
    pub fn factory<F>(self, factory: F) -> Self
    where
        F: Fn(&Container) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        self.member(InjectionMember::factory(factory))
    }

    /// Always resolve to `instance`
    pub fn instance(mut self, instance: Arc<T>) -> Self {
        self.lifetime = Arc::new(ContainerControlledLifetimeManager::with_instance(
            Instance::from_arc(instance),
        ));
        self
    }

    /// Store the registration, replacing any previous one for the same key
    pub fn done(self) -> Arc<Registration> {
        let key = TypeKey::from_parts(Some(self.ty), self.name);
        let map = if self.members.iter().any(InjectionMember::is_factory) {
            None
        } else {
            self.map.filter(|map| map.target != self.ty)
        };
        self.container.add_registration(
            key,
            map,
            self.lifetime,
            Arc::from(self.members),
        )
    }
}

// =============================================================================
// Dynamic requests
// =============================================================================

/// Registration request over runtime types, for one or more interfaces.
///
/// # Examples
///
/// ```rust
/// use wiring::{Container, DiError, RegistrationRequest};
///
/// let container = Container::new();
/// let err = container.register_request(RegistrationRequest::new()).unwrap_err();
/// assert!(matches!(err, DiError::InvalidRegistration { .. }));
/// ```
#[derive(Clone, Default)]
pub struct RegistrationRequest {
    pub(crate) interfaces: Vec<Type>,
    pub(crate) implementation: Option<Type>,
    pub(crate) name: Option<Name>,
    pub(crate) lifetime: Lifetime,
    pub(crate) members: Vec<InjectionMember>,
}

impl RegistrationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an interface the implementation is registered under
    pub fn interface(mut self, ty: Type) -> Self {
        self.interfaces.push(ty);
        self
    }

    pub fn implementation(mut self, ty: Type) -> Self {
        self.implementation = Some(ty);
        self
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(Name::from(name));
        self
    }

    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn member(mut self, member: InjectionMember) -> Self {
        self.members.push(member);
        self
    }
}

impl std::fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("interfaces", &self.interfaces)
            .field("implementation", &self.implementation)
            .field("name", &self.name)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}
