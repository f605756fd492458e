#![no_main]

//! Fuzz target for concurrent container operations
//!
//! Tests thread-safety of registration, implicit registration and
//! singleton creation under concurrent access.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use wiring::{Container, ContainerConfig, Lifetime};

#[derive(Clone, Debug, Arbitrary)]
struct ConcurrentService {
    id: u64,
    data: Vec<u8>,
}

#[derive(Clone, Debug, Arbitrary)]
struct SharedConfig {
    value: u32,
}

struct Expensive {
    serial: u64,
}

#[derive(Debug, Clone, Arbitrary)]
enum ThreadOp {
    Resolve,
    TryResolve,
    IsRegistered,
    ResolveExpensive,
    ResolveNamed(u8),
    Register(ConcurrentService),
    RegisterNamed(u8, ConcurrentService),
    ResolveFromChild,
}

#[derive(Debug, Arbitrary)]
struct ConcurrentScenario {
    initial_services: Vec<ConcurrentService>,
    thread_count: u8,
    ops_per_thread: Vec<ThreadOp>,
}

fuzz_target!(|scenario: ConcurrentScenario| {
    // Tiny table so concurrent writers race through growth
    let container = Container::with_config(ContainerConfig::new().initial_capacity(2));
    let created = Arc::new(AtomicU64::new(0));

    for svc in scenario.initial_services.into_iter().take(10) {
        container.singleton(svc);
    }

    container.singleton(SharedConfig { value: 42 });

    let counter = Arc::clone(&created);
    container
        .register::<Expensive>()
        .lifetime(Lifetime::Singleton)
        .factory(move |_| {
            Ok(Arc::new(Expensive {
                serial: counter.fetch_add(1, Ordering::SeqCst),
            }))
        })
        .done();

    let thread_count = (scenario.thread_count % 8).max(1) as usize;
    let ops = scenario.ops_per_thread;

    let mut handles = Vec::new();

    for _ in 0..thread_count {
        let container = container.clone();
        let ops = ops.clone();

        handles.push(thread::spawn(move || {
            for op in ops.into_iter().take(50) {
                match op {
                    ThreadOp::Resolve => {
                        let config = container.resolve::<SharedConfig>().unwrap();
                        assert_eq!(config.value, 42);
                    }
                    ThreadOp::TryResolve => {
                        let _ = container.try_resolve::<ConcurrentService>();
                    }
                    ThreadOp::IsRegistered => {
                        assert!(container.is_registered::<SharedConfig>());
                        let _ = container.is_registered::<ConcurrentService>();
                    }
                    ThreadOp::ResolveExpensive => {
                        let expensive = container.resolve::<Expensive>().unwrap();
                        assert_eq!(expensive.serial, 0);
                    }
                    ThreadOp::ResolveNamed(n) => {
                        let _ = container.resolve_named::<ConcurrentService>(&format!("svc-{n}"));
                    }
                    ThreadOp::Register(svc) => {
                        container.singleton(svc);
                    }
                    ThreadOp::RegisterNamed(n, svc) => {
                        container.singleton_named(&format!("svc-{n}"), svc);
                    }
                    ThreadOp::ResolveFromChild => {
                        let child = container.child();
                        assert!(child.resolve::<SharedConfig>().is_ok());
                    }
                }
            }
        }));
    }

    for handle in handles {
        let _ = handle.join();
    }

    // Singleton factory ran at most once
    assert!(created.load(Ordering::SeqCst) <= 1);
    let _ = container.try_resolve::<SharedConfig>();
    let _ = container.registrations().len();
});
