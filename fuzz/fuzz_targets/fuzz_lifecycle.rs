#![no_main]

//! Fuzz target for service lifecycle operations
//!
//! Tests lazy singletons, transient and per-resolve creation, replacement
//! and disposal.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use wiring::{Container, Lifetime};

static LAZY_COUNTER: AtomicU64 = AtomicU64::new(0);
static TRANSIENT_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug)]
struct LazyService {
    created_at: u64,
}

#[derive(Debug)]
struct TransientService {
    instance_id: u64,
}

#[derive(Clone, Debug, Arbitrary)]
struct SimpleService {
    value: u32,
}

#[derive(Debug, Arbitrary)]
enum LifecycleOp {
    RegisterSingleton(SimpleService),
    RegisterLazy,
    RegisterTransient,

    ResolveSingleton,
    ResolveLazy,
    ResolveTransient,
    ResolveTransientMultiple(u8),

    IsRegistered,
    Stats,

    CreateChildAndRegister,
    ResolveFromChild,
    DisposeChild,

    Dispose,
}

fuzz_target!(|ops: Vec<LifecycleOp>| {
    LAZY_COUNTER.store(0, Ordering::SeqCst);
    TRANSIENT_COUNTER.store(0, Ordering::SeqCst);

    let container = Container::new();
    let mut disposed = false;
    let mut singleton: Option<u32> = None;
    let mut has_lazy = false;
    let mut has_transient = false;
    let mut child: Option<Container> = None;

    for op in ops.into_iter().take(100) {
        match op {
            LifecycleOp::RegisterSingleton(svc) => {
                if !disposed {
                    singleton = Some(svc.value);
                    container.singleton(svc);
                }
            }
            LifecycleOp::RegisterLazy => {
                if !disposed {
                    container.lazy(|_| {
                        Ok(LazyService {
                            created_at: LAZY_COUNTER.fetch_add(1, Ordering::SeqCst),
                        })
                    });
                    has_lazy = true;
                }
            }
            LifecycleOp::RegisterTransient => {
                if !disposed {
                    container
                        .register::<TransientService>()
                        .lifetime(Lifetime::Transient)
                        .factory(|_| {
                            Ok(Arc::new(TransientService {
                                instance_id: TRANSIENT_COUNTER.fetch_add(1, Ordering::SeqCst),
                            }))
                        })
                        .done();
                    has_transient = true;
                }
            }
            LifecycleOp::ResolveSingleton => {
                let result = container.resolve::<SimpleService>();
                match (disposed, singleton) {
                    (false, Some(value)) => assert_eq!(result.unwrap().value, value),
                    _ => assert!(result.is_err()),
                }
            }
            LifecycleOp::ResolveLazy => {
                let result = container.resolve::<LazyService>();
                if disposed || !has_lazy {
                    assert!(result.is_err());
                } else {
                    let first = result.unwrap();
                    let second = container.resolve::<LazyService>().unwrap();
                    assert_eq!(first.created_at, second.created_at);
                }
            }
            LifecycleOp::ResolveTransient => {
                let result = container.resolve::<TransientService>();
                assert_eq!(result.is_ok(), has_transient && !disposed);
            }
            LifecycleOp::ResolveTransientMultiple(count) => {
                if has_transient && !disposed {
                    let mut last = None;
                    for _ in 0..(count % 10) {
                        let svc = container.resolve::<TransientService>().unwrap();
                        if let Some(prev) = last {
                            assert!(svc.instance_id > prev);
                        }
                        last = Some(svc.instance_id);
                    }
                }
            }
            LifecycleOp::IsRegistered => {
                let _ = container.is_registered::<SimpleService>();
                let _ = container.is_registered::<LazyService>();
            }
            LifecycleOp::Stats => {
                let _ = container.stats();
            }
            LifecycleOp::CreateChildAndRegister => {
                if !disposed {
                    let scope = container.child();
                    scope.singleton(SimpleService { value: 999 });
                    child = Some(scope);
                }
            }
            LifecycleOp::ResolveFromChild => {
                if let Some(scope) = &child {
                    let result = scope.resolve::<SimpleService>();
                    if !scope.is_disposed() {
                        assert_eq!(result.unwrap().value, 999);
                    }
                }
            }
            LifecycleOp::DisposeChild => {
                if let Some(scope) = &child {
                    scope.dispose();
                    assert!(scope.is_disposed());
                    assert!(scope.resolve::<SimpleService>().is_err());
                }
            }
            LifecycleOp::Dispose => {
                container.dispose();
                disposed = true;
                assert!(container.is_disposed());
            }
        }
    }
});
