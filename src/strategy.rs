//! Build chain
//!
//! Every registration carries an ordered chain of [`BuildStrategy`]s chosen
//! when the registration is created. A strategy may finish the build itself
//! or hand the context to the rest of the chain through [`Next`]:
//!
//! 1. [`MappingStrategy`] (mapped registrations only) retargets the build to
//!    the implementation type and converts the result back
//! 2. [`LifetimeStrategy`] returns a stored instance or stores the new one
//! 3. [`EnumerableStrategy`] (collection requests only) resolves every
//!    registration of the element type
//! 4. [`BuildPlanStrategy`] compiles and runs the build plan

use crate::context::BuilderContext;
use crate::injection::InjectionMember;
use crate::introspect::Caster;
use crate::lifetime::Lifetime;
use crate::plan;
use crate::registration::{Mapping, RegistrationKind};
use crate::types::{Instance, Type, TypeKey};
use crate::{DiError, Result};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Ordered strategies of one registration
pub type BuildChain = Arc<[Arc<dyn BuildStrategy>]>;

/// One stage of the build chain.
pub trait BuildStrategy: Send + Sync {
    fn build_up(&self, ctx: &mut BuilderContext<'_>, next: Next<'_>) -> Result<Instance>;
}

/// The remainder of a build chain.
#[derive(Clone, Copy)]
pub struct Next<'c> {
    rest: &'c [Arc<dyn BuildStrategy>],
}

impl<'c> Next<'c> {
    pub(crate) fn new(chain: &'c [Arc<dyn BuildStrategy>]) -> Self {
        Self { rest: chain }
    }

    /// Run the remaining strategies. An exhausted chain yields the existing
    /// instance.
    pub fn run(self, ctx: &mut BuilderContext<'_>) -> Result<Instance> {
        match self.rest.split_first() {
            Some((strategy, rest)) => strategy.build_up(ctx, Next { rest }),
            None => ctx.existing().cloned().ok_or_else(|| {
                DiError::unresolved(
                    ctx.build_type(),
                    ctx.key().name(),
                    "build chain produced no instance",
                )
            }),
        }
    }
}

/// Chain for a new registration
pub(crate) fn chain_for(
    key: &TypeKey,
    kind: RegistrationKind,
    map: Option<&Mapping>,
    members: &[InjectionMember],
) -> BuildChain {
    let factory = members.iter().any(InjectionMember::is_factory);
    let mut chain: Vec<Arc<dyn BuildStrategy>> = Vec::with_capacity(4);

    if map.is_some() && !factory {
        chain.push(Arc::new(MappingStrategy));
    }
    chain.push(Arc::new(LifetimeStrategy));

    let enumerable = key.ty().is_some_and(|ty| ty.is_enumerable());
    let user_collection = kind == RegistrationKind::Explicit && (map.is_some() || factory);
    if enumerable && !user_collection {
        chain.push(Arc::new(EnumerableStrategy));
    }

    chain.push(Arc::new(BuildPlanStrategy));
    chain.into()
}

/// Run the chain of the context's registration
pub(crate) fn build(ctx: &mut BuilderContext<'_>) -> Result<Instance> {
    let registration = Arc::clone(ctx.registration());
    let instance = Next::new(registration.chain()).run(ctx)?;
    ctx.complete();
    Ok(instance)
}

/// Caster found for a mapped registration. Misses are not stored, so a
/// cast described later is still picked up.
struct ResolvedCast(Caster);

// =============================================================================
// Mapping
// =============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct MappingStrategy;

impl MappingStrategy {
    fn caster(ctx: &BuilderContext<'_>, map: &Mapping, requested: Type) -> Option<Caster> {
        if let Some(cast) = map.cast() {
            return Some(Arc::clone(cast));
        }
        let registration = ctx.registration();
        if let Some(resolved) = registration.policy::<ResolvedCast>() {
            return Some(Arc::clone(&resolved.0));
        }
        let cast = ctx.container().introspector().cast(&map.target(), &requested)?;
        registration.set_policy(ResolvedCast(Arc::clone(&cast)));
        Some(cast)
    }
}

impl BuildStrategy for MappingStrategy {
    fn build_up(&self, ctx: &mut BuilderContext<'_>, next: Next<'_>) -> Result<Instance> {
        let registration = Arc::clone(ctx.registration());
        let (Some(map), Some(requested)) = (registration.mapping(), registration.ty()) else {
            return next.run(ctx);
        };
        let target = map.target();

        #[cfg(feature = "logging")]
        trace!(
            target: "wiring",
            service = requested.name(),
            mapped_to = target.name(),
            "Mapping build type"
        );

        ctx.set_build_type(target);
        let name = ctx.key().name_arc().cloned();
        if registration.members().is_empty()
            && ctx.container().is_explicitly_registered(&target, name.as_deref())
        {
            ctx.redirect_to(TypeKey::from_parts(Some(target), name));
        }

        let cast = Self::caster(ctx, map, requested).ok_or(DiError::TypeMismatch {
            expected: requested.name(),
        })?;
        ctx.set_cast(Arc::clone(&cast));

        let built = next.run(ctx)?;
        cast(built)
    }
}

// =============================================================================
// Lifetime
// =============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct LifetimeStrategy;

impl BuildStrategy for LifetimeStrategy {
    fn build_up(&self, ctx: &mut BuilderContext<'_>, next: Next<'_>) -> Result<Instance> {
        let registration = Arc::clone(ctx.registration());
        let manager = registration.lifetime_manager();

        match manager.lifetime() {
            Lifetime::PerResolve => {
                #[cfg(feature = "logging")]
                trace!(
                    target: "wiring",
                    service = ctx.build_type().name(),
                    resolve = ctx.resolve_id().id(),
                    "Building per-resolve instance"
                );

                let instance = next.run(ctx)?;
                ctx.record_per_resolve(instance.clone());
                Ok(instance)
            }
            _ => manager.get_or_build(&mut || next.run(ctx)),
        }
    }
}

// =============================================================================
// Enumerable
// =============================================================================

/// Resolution routine for one collection request, bound to its element
/// type and to the type registrations are looked up under.
#[derive(Clone)]
pub(crate) struct EnumerableDispatch {
    element: Type,
    source: Type,
    cast: Option<Caster>,
}

impl EnumerableDispatch {
    fn new(ctx: &BuilderContext<'_>, element: Type) -> Self {
        let container = ctx.container();
        let source = container.final_type(element);
        let cast = if source == element {
            None
        } else {
            container.introspector().cast(&source, &element)
        };

        #[cfg(feature = "logging")]
        debug!(
            target: "wiring",
            element = element.name(),
            source = source.name(),
            "Binding enumerable resolver"
        );

        Self {
            element,
            source,
            cast,
        }
    }

    fn resolve(&self, ctx: &mut BuilderContext<'_>, collection: Type) -> Result<Instance> {
        let names = ctx.container().enumerable_names(&self.source);
        let mut items = Vec::with_capacity(names.len());
        for name in names {
            let item = ctx.resolve_dependency(self.source, name)?;
            let item = match (&self.cast, self.source == self.element) {
                (_, true) => item,
                (Some(cast), false) => cast(item)?,
                (None, false) => {
                    return Err(DiError::TypeMismatch {
                        expected: self.element.name(),
                    });
                }
            };
            items.push(item);
        }
        collection.collect(items).unwrap_or_else(|| {
            Err(DiError::unresolved(collection, None, "not a collection type"))
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EnumerableStrategy;

impl BuildStrategy for EnumerableStrategy {
    fn build_up(&self, ctx: &mut BuilderContext<'_>, next: Next<'_>) -> Result<Instance> {
        let registration = Arc::clone(ctx.registration());
        let Some(collection) = registration.ty().filter(Type::is_enumerable) else {
            return next.run(ctx);
        };
        let Some(element) = collection.element_type() else {
            return next.run(ctx);
        };

        let dispatch = registration
            .enumerable()
            .get_or_init(|| EnumerableDispatch::new(ctx, element))
            .clone();
        let instance = dispatch.resolve(ctx, collection)?;
        ctx.set_existing(instance.clone());
        ctx.complete();
        Ok(instance)
    }
}

// =============================================================================
// Build plan
// =============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct BuildPlanStrategy;

impl BuildStrategy for BuildPlanStrategy {
    fn build_up(&self, ctx: &mut BuilderContext<'_>, _next: Next<'_>) -> Result<Instance> {
        if let Some(key) = ctx.take_redirect() {
            let ty = key.ty().unwrap_or(ctx.build_type());
            let instance = ctx.resolve_dependency(ty, key.name_arc().cloned())?;
            ctx.set_existing(instance.clone());
            return Ok(instance);
        }

        let registration = Arc::clone(ctx.registration());
        let container = ctx.container();
        let plan = registration.plan_or_compile(|| {
            container.record_compiled_plan();
            Ok(plan::compile(
                ctx.build_type(),
                ctx.key().name(),
                registration.members(),
                registration.lifetime(),
                container.introspector(),
                container.selector(),
            ))
        })?;
        plan.execute(ctx)
    }
}
