#![no_main]

//! Fuzz target for child container operations
//!
//! Tests hierarchical container relationships and parent chain resolution.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use wiring::Container;

#[derive(Clone, Debug, Arbitrary)]
struct RootService {
    id: u32,
}

#[derive(Clone, Debug, Arbitrary)]
struct ScopedService {
    scope_id: u32,
    data: Vec<u8>,
}

#[derive(Clone, Debug, Arbitrary)]
struct OverrideService {
    value: String,
}

/// Operations for child containers
#[derive(Debug, Arbitrary)]
enum ScopedOp {
    RegisterRootService(RootService),
    RegisterOverrideInRoot(OverrideService),
    ResolveFromRoot,

    CreateChild,
    CreateNestedChild,

    RegisterInChild(ScopedService),
    RegisterOverrideInChild(OverrideService),
    ResolveFromChild,
    ResolveOverrideFromChild,
    ResolveRootFromChild,
    IsRegisteredInChild,

    DropChild,
}

fuzz_target!(|ops: Vec<ScopedOp>| {
    let root = Container::new();
    let mut children: Vec<Container> = Vec::new();
    let mut root_has_service = false;
    let mut root_override: Option<String> = None;

    for op in ops.into_iter().take(100) {
        match op {
            ScopedOp::RegisterRootService(svc) => {
                root.singleton(svc);
                root_has_service = true;
            }
            ScopedOp::RegisterOverrideInRoot(svc) => {
                root_override = Some(svc.value.clone());
                root.singleton(svc);
            }
            ScopedOp::ResolveFromRoot => {
                assert_eq!(root.resolve::<RootService>().is_ok(), root_has_service);
            }
            ScopedOp::CreateChild => {
                if children.len() < 10 {
                    children.push(root.child());
                }
            }
            ScopedOp::CreateNestedChild => {
                if children.len() < 10 {
                    let child = children.last().map_or_else(|| root.child(), |c| c.child());
                    assert!(child.depth() >= 1);
                    children.push(child);
                }
            }
            ScopedOp::RegisterInChild(svc) => {
                if let Some(child) = children.last() {
                    child.singleton(svc);
                }
            }
            ScopedOp::RegisterOverrideInChild(svc) => {
                if let Some(child) = children.last() {
                    let value = svc.value.clone();
                    child.singleton(svc);
                    let resolved = child.resolve::<OverrideService>().unwrap();
                    assert_eq!(resolved.value, value);
                }
            }
            ScopedOp::ResolveFromChild => {
                if let Some(child) = children.last() {
                    let _ = child.resolve::<ScopedService>();
                }
            }
            ScopedOp::ResolveOverrideFromChild => {
                if let Some(child) = children.first() {
                    let result = child.resolve::<OverrideService>();
                    if root_override.is_some() {
                        assert!(result.is_ok());
                    }
                }
            }
            ScopedOp::ResolveRootFromChild => {
                // Every child keeps the root alive through `root` itself
                for child in &children {
                    assert_eq!(child.resolve::<RootService>().is_ok(), root_has_service);
                }
            }
            ScopedOp::IsRegisteredInChild => {
                if let Some(child) = children.last() {
                    if root_has_service {
                        assert!(child.is_registered::<RootService>());
                    }
                }
            }
            ScopedOp::DropChild => {
                children.pop();
            }
        }
    }

    // Root must not see registrations made in children
    assert!(!root.is_registered::<ScopedService>());
});
