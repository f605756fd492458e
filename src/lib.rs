//! # Wiring - Dependency Injection with Compiled Build Plans
//!
//! A thread-safe dependency injection container that builds whole object
//! graphs from type metadata, caches a compiled build plan per
//! registration, and supports hierarchical containers.
//!
//! ## Features
//!
//! - **Lock-free lookups** - Registrations live in an entry table that readers never lock
//! - **Compiled build plans** - Constructor, method and field selection happens once per registration
//! - **Lifetimes** - Transient, container-controlled singleton and per-resolve instances
//! - **Open generics** - Closed registrations are synthesized from open generic definitions
//! - **Child containers** - Children inherit registrations and may override them
//! - **Enumerables** - Resolve every registration of a type as one `Vec`
//! - **Observable** - Optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use wiring::{Arguments, Constructor, Container, Parameter, TypeCatalog};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let catalog = TypeCatalog::new();
//! catalog.describe::<UserService>(|ty| {
//!     ty.constructor(
//!         Constructor::new(|args: &Arguments| Ok(UserService { db: args.get(0)? }))
//!             .param(Parameter::of::<Database>("db")),
//!     );
//! });
//!
//! let container = Container::with_introspector(catalog);
//! container.singleton(Database { url: "postgres://localhost".into() });
//!
//! // UserService was never registered: it is built from its description
//! let users = container.resolve::<UserService>().unwrap();
//! assert_eq!(users.db.url, "postgres://localhost");
//! ```
//!
//! ## Interfaces and Lifetimes
//!
//! ```rust
//! use wiring::{Constructor, Container, Lifetime, TypeCatalog};
//! use std::sync::Arc;
//!
//! trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! struct FixedClock;
//!
//! impl Clock for FixedClock {
//!     fn now(&self) -> u64 {
//!         42
//!     }
//! }
//!
//! let catalog = TypeCatalog::new();
//! catalog.describe::<FixedClock>(|ty| {
//!     ty.constructor(Constructor::new(|_| Ok(FixedClock)))
//!         .implements::<dyn Clock, _>(|c| c as Arc<dyn Clock>);
//! });
//!
//! let container = Container::with_introspector(catalog);
//! container
//!     .register::<dyn Clock>()
//!     .to::<FixedClock>()
//!     .lifetime(Lifetime::Singleton)
//!     .done();
//!
//! let a = container.resolve::<dyn Clock>().unwrap();
//! let b = container.resolve::<dyn Clock>().unwrap();
//! assert_eq!(a.now(), 42);
//! assert!(Arc::ptr_eq(&a, &b));
//! ```
//!
//! ## Child Containers
//!
//! ```rust
//! use wiring::Container;
//!
//! struct AppConfig {
//!     name: String,
//! }
//!
//! struct RequestContext {
//!     id: String,
//! }
//!
//! let root = Container::new();
//! root.singleton(AppConfig { name: "MyApp".into() });
//!
//! let request = root.child();
//! request.singleton(RequestContext { id: "req-123".into() });
//!
//! assert!(request.is_registered::<AppConfig>());
//! assert!(request.is_registered::<RequestContext>());
//! assert!(!root.is_registered::<RequestContext>());
//! ```

mod config;
mod container;
mod context;
mod error;
mod injection;
mod introspect;
mod lifetime;
#[cfg(feature = "logging")]
pub mod logging;
mod plan;
mod registration;
mod registry;
mod selection;
mod strategy;
mod types;

pub use config::*;
pub use container::*;
pub use context::{BuilderContext, ResolveId};
pub use error::*;
pub use injection::*;
pub use introspect::*;
pub use lifetime::*;
pub use plan::BuildPlan;
pub use registration::*;
pub use selection::*;
pub use strategy::{
    BuildChain, BuildPlanStrategy, BuildStrategy, EnumerableStrategy, LifetimeStrategy,
    MappingStrategy, Next,
};
pub use types::*;

#[cfg(feature = "derive")]
pub use wiring_derive::Describe;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Arguments, Constructor, Container, Describe, DiError, Directive, Field, Injectable,
        InjectionMember, Lifetime, Method, Parameter, RegistrationRequest, Result, Type,
        TypeBuilder, TypeCatalog,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct Database {
        url: String,
    }

    struct UserService {
        db: Arc<Database>,
    }

    impl Describe for UserService {
        fn describe(ty: &mut TypeBuilder<Self>) {
            ty.constructor(
                Constructor::new(|args: &Arguments| Ok(UserService { db: args.get(0)? }))
                    .param(Parameter::of::<Database>("db")),
            );
        }
    }

    #[test]
    fn test_singleton_registration() {
        let container = Container::new();
        container.singleton(Database { url: "test".into() });

        let db = container.resolve::<Database>().unwrap();
        assert_eq!(db.url, "test");
    }

    #[test]
    fn test_implicit_resolution_from_description() {
        let catalog = TypeCatalog::new();
        catalog.add::<UserService>();

        let container = Container::with_introspector(catalog);
        container.singleton(Database { url: "db".into() });

        let users = container.resolve::<UserService>().unwrap();
        assert_eq!(users.db.url, "db");
        assert!(!container.is_registered::<UserService>());
    }

    #[test]
    fn test_lazy_singleton() {
        static CREATED: AtomicU32 = AtomicU32::new(0);

        struct LazyService;

        let container = Container::new();
        container.lazy(|_| {
            CREATED.fetch_add(1, Ordering::SeqCst);
            Ok(LazyService)
        });

        assert_eq!(CREATED.load(Ordering::SeqCst), 0);

        let _ = container.resolve::<LazyService>().unwrap();
        assert_eq!(CREATED.load(Ordering::SeqCst), 1);

        let _ = container.resolve::<LazyService>().unwrap();
        assert_eq!(CREATED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transient_factory() {
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        struct Counter(u32);

        let container = Container::new();
        container
            .register::<Counter>()
            .factory(|_| Ok(Arc::new(Counter(COUNTER.fetch_add(1, Ordering::SeqCst)))))
            .done();

        let c1 = container.resolve::<Counter>().unwrap();
        let c2 = container.resolve::<Counter>().unwrap();
        assert_ne!(c1.0, c2.0);
    }

    #[test]
    fn test_not_found_error() {
        let container = Container::new();
        let err = container.resolve::<Database>().unwrap_err();
        assert!(err.is_unresolved());
        assert!(container.try_resolve::<Database>().is_none());
    }

    #[test]
    fn test_override_in_child() {
        let root = Container::new();
        root.singleton(Database {
            url: "production".into(),
        });

        let test_scope = root.child();
        test_scope.singleton(Database { url: "test".into() });

        assert_eq!(root.resolve::<Database>().unwrap().url, "production");
        assert_eq!(test_scope.resolve::<Database>().unwrap().url, "test");
    }
}
