#![no_main]

//! Fuzz target for basic container operations
//!
//! Tests registration, named lookups and resolution with various data patterns.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;
use wiring::{Container, ContainerConfig, Lifetime, Type};

#[derive(Clone, Debug, Arbitrary)]
struct SmallService {
    id: u32,
    name: String,
}

#[derive(Clone, Debug, Arbitrary)]
struct MediumService {
    id: u64,
    data: Vec<u8>,
    enabled: bool,
}

trait Tagged: Send + Sync {
    fn tag(&self) -> u32;
}

impl Tagged for SmallService {
    fn tag(&self) -> u32 {
        self.id
    }
}

/// Operations to perform on the container
#[derive(Debug, Arbitrary)]
enum ContainerOp {
    RegisterSmall(SmallService),
    RegisterSmallNamed(u8, SmallService),
    RegisterMedium(MediumService),
    RegisterLazySmall,
    RegisterPerResolveMedium,
    RegisterTagged(u8, SmallService),
    ResolveSmall,
    ResolveSmallNamed(u8),
    ResolveMedium,
    TryResolveMedium,
    ResolveAllTagged,
    IsRegisteredSmall,
    Registrations,
    Stats,
}

fuzz_target!(|input: (u8, Vec<ContainerOp>)| {
    let (capacity, ops) = input;
    // Small capacities force table growth
    let container =
        Container::with_config(ContainerConfig::new().initial_capacity(capacity as usize % 16));

    let mut has_small = false;
    let mut small_names = Vec::new();
    let mut tagged_names = Vec::new();

    for op in ops.into_iter().take(200) {
        match op {
            ContainerOp::RegisterSmall(svc) => {
                container.singleton(svc);
                has_small = true;
            }
            ContainerOp::RegisterSmallNamed(n, svc) => {
                let name = format!("small-{n}");
                container.singleton_named(&name, svc);
                small_names.push(name);
            }
            ContainerOp::RegisterMedium(svc) => {
                container.singleton(svc);
            }
            ContainerOp::RegisterLazySmall => {
                container.lazy(|_| {
                    Ok(SmallService {
                        id: 42,
                        name: "lazy".into(),
                    })
                });
                has_small = true;
            }
            ContainerOp::RegisterPerResolveMedium => {
                container
                    .register::<MediumService>()
                    .lifetime(Lifetime::PerResolve)
                    .factory(|_| {
                        Ok(Arc::new(MediumService {
                            id: 0,
                            data: Vec::new(),
                            enabled: false,
                        }))
                    })
                    .done();
            }
            ContainerOp::RegisterTagged(n, svc) => {
                let name = format!("tag-{n}");
                container
                    .register::<dyn Tagged>()
                    .named(&name)
                    .instance(Arc::new(svc))
                    .done();
                if !tagged_names.contains(&name) {
                    tagged_names.push(name);
                }
            }
            ContainerOp::ResolveSmall => {
                let result = container.resolve::<SmallService>();
                if has_small {
                    assert!(result.is_ok());
                } else {
                    assert!(result.is_err());
                }
            }
            ContainerOp::ResolveSmallNamed(n) => {
                let name = format!("small-{n}");
                let result = container.resolve_named::<SmallService>(&name);
                assert_eq!(result.is_ok(), small_names.contains(&name));
            }
            ContainerOp::ResolveMedium => {
                let _ = container.resolve::<MediumService>();
            }
            ContainerOp::TryResolveMedium => {
                let _ = container.try_resolve::<MediumService>();
            }
            ContainerOp::ResolveAllTagged => {
                let all = container.resolve_all::<dyn Tagged>().unwrap();
                assert_eq!(all.len(), tagged_names.len());
            }
            ContainerOp::IsRegisteredSmall => {
                assert_eq!(container.is_registered::<SmallService>(), has_small);
            }
            ContainerOp::Registrations => {
                let _ = container.registrations_of(&Type::of::<SmallService>());
                let _ = container.registrations().len();
            }
            ContainerOp::Stats => {
                let _ = container.stats();
            }
        }
    }
});
