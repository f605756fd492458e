//! Build plans
//!
//! A [`BuildPlan`] is compiled once per registration from the member
//! selections and then executed for every build. It is a list of guarded
//! blocks of steps; the guard looks at whether an instance already exists so
//! that a factory-supplied instance skips construction (and any construction
//! error) while still receiving method and field injection.

use crate::context::BuilderContext;
use crate::injection::{Directive, FactoryFn, InjectionMember};
use crate::introspect::{Arguments, Constructor, Field, Method, Parameter, TypeIntrospector};
use crate::lifetime::Lifetime;
use crate::selection::{MemberSelector, Selection};
use crate::types::{Instance, Type};
use crate::{DiError, Result};

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// When a block runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Guard {
    /// Only while no instance exists
    Unbuilt,
    /// Only once an instance exists
    Built,
}

#[derive(Clone)]
pub(crate) enum Step {
    /// Resolve a value into a slot
    Resolve {
        slot: usize,
        directive: Directive,
        default: Option<Instance>,
    },
    /// Invoke a constructor with slot values; the result becomes the
    /// existing instance
    Construct {
        constructor: Constructor,
        args: Vec<usize>,
    },
    /// Call a method on the existing instance
    Invoke { method: Method, args: Vec<usize> },
    /// Set a field of the existing instance; skipped when the slot is empty
    Assign { field: Field, slot: usize },
    /// Take the existing instance from a factory
    Seed(FactoryFn),
    /// Fail with a selection error
    Throw(DiError),
    /// Store the existing instance in the per-resolve scope
    RecordPerResolve,
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Resolve { slot, directive, .. } => f
                .debug_struct("Resolve")
                .field("slot", slot)
                .field("directive", directive)
                .finish(),
            Step::Construct { args, .. } => f.debug_struct("Construct").field("args", args).finish(),
            Step::Invoke { method, args } => f
                .debug_struct("Invoke")
                .field("method", &method.name())
                .field("args", args)
                .finish(),
            Step::Assign { field, slot } => f
                .debug_struct("Assign")
                .field("field", &field.name())
                .field("slot", slot)
                .finish(),
            Step::Seed(_) => f.write_str("Seed"),
            Step::Throw(err) => f.debug_tuple("Throw").field(err).finish(),
            Step::RecordPerResolve => f.write_str("RecordPerResolve"),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Block {
    guard: Guard,
    steps: Vec<Step>,
}

/// Compiled construction recipe for one registration.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    ty: Option<Type>,
    blocks: Vec<Block>,
    slots: usize,
}

impl BuildPlan {
    /// Plan that does nothing
    #[cfg(test)]
    pub(crate) fn empty() -> Self {
        Self {
            ty: None,
            blocks: Vec::new(),
            slots: 0,
        }
    }

    /// Type the plan builds
    pub fn ty(&self) -> Option<Type> {
        self.ty
    }

    /// Number of resolution slots
    pub fn slot_count(&self) -> usize {
        self.slots
    }

    /// Total number of steps
    pub fn len(&self) -> usize {
        self.blocks.iter().map(|block| block.steps.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(crate) fn steps(&self) -> impl Iterator<Item = &Step> {
        self.blocks.iter().flat_map(|block| block.steps.iter())
    }

    /// Run the plan against `ctx`, returning the built instance.
    pub(crate) fn execute(&self, ctx: &mut BuilderContext<'_>) -> Result<Instance> {
        let mut slots: Vec<Option<Instance>> = vec![None; self.slots];

        for block in &self.blocks {
            let run = match block.guard {
                Guard::Unbuilt => ctx.existing().is_none(),
                Guard::Built => ctx.existing().is_some(),
            };
            if !run {
                continue;
            }
            for step in &block.steps {
                execute_step(step, &mut slots, ctx)?;
            }
        }

        ctx.existing().cloned().ok_or_else(|| {
            DiError::unresolved(ctx.build_type(), ctx.key().name(), "build plan produced no instance")
        })
    }
}

fn arguments(slots: &[Option<Instance>], args: &[usize]) -> Arguments {
    Arguments::new(args.iter().map(|&i| slots.get(i).cloned().flatten()).collect())
}

fn execute_step(
    step: &Step,
    slots: &mut [Option<Instance>],
    ctx: &mut BuilderContext<'_>,
) -> Result<()> {
    match step {
        Step::Resolve {
            slot,
            directive,
            default,
        } => {
            let value = directive.resolve(ctx)?.or_else(|| default.clone());
            slots[*slot] = value;
        }
        Step::Construct { constructor, args } => {
            #[cfg(feature = "logging")]
            trace!(
                target: "wiring",
                service = ctx.build_type().name(),
                arity = constructor.arity(),
                "Invoking constructor"
            );

            let instance = constructor.invoke(&arguments(slots, args))?;
            ctx.set_existing(instance);
        }
        Step::Invoke { method, args } => {
            if let Some(existing) = ctx.existing().cloned() {
                method.invoke(&existing, &arguments(slots, args))?;
            }
        }
        Step::Assign { field, slot } => {
            if let (Some(existing), Some(value)) = (ctx.existing().cloned(), slots[*slot].clone()) {
                field.assign(&existing, value)?;
            }
        }
        Step::Seed(factory) => {
            let instance = factory(ctx.container())?;
            ctx.set_existing(instance);
        }
        Step::Throw(err) => return Err(err.clone()),
        Step::RecordPerResolve => {
            if let Some(existing) = ctx.existing().cloned() {
                ctx.record_per_resolve(existing);
            }
        }
    }
    Ok(())
}

// =============================================================================
// Compiler
// =============================================================================

struct Compiler {
    blocks: Vec<Block>,
    slots: usize,
}

impl Compiler {
    fn block(&mut self, guard: Guard, steps: Vec<Step>) {
        if !steps.is_empty() {
            self.blocks.push(Block { guard, steps });
        }
    }

    fn slot(&mut self) -> usize {
        self.slots += 1;
        self.slots - 1
    }

    /// Resolve steps for `parameters`, returning the slots they fill
    fn resolve_parameters(
        &mut self,
        parameters: &[Parameter],
        directives: Option<&[Directive]>,
        steps: &mut Vec<Step>,
    ) -> Vec<usize> {
        parameters
            .iter()
            .enumerate()
            .map(|(i, parameter)| {
                let slot = self.slot();
                let directive = directives
                    .and_then(|directives| directives.get(i).cloned())
                    .unwrap_or_else(|| Directive::for_parameter(parameter));
                steps.push(Step::Resolve {
                    slot,
                    directive,
                    default: parameter.default_value().cloned(),
                });
                slot
            })
            .collect()
    }

    fn constructor(&mut self, ty: Type, name: Option<&str>, selection: Selection<Constructor>) {
        let mut steps = Vec::new();
        match selection {
            Selection::Member(constructor) => {
                let args = self.resolve_parameters(constructor.parameters(), None, &mut steps);
                steps.push(Step::Construct { constructor, args });
            }
            Selection::Injected {
                member: constructor,
                directives,
            } => {
                let args =
                    self.resolve_parameters(constructor.parameters(), Some(directives.as_slice()), &mut steps);
                steps.push(Step::Construct { constructor, args });
            }
            Selection::Deferred(err) => steps.push(Step::Throw(err)),
            Selection::NotFound => steps.push(Step::Throw(DiError::unresolved(
                ty,
                name,
                "type is not constructible and no registration maps it to one",
            ))),
        }
        self.block(Guard::Unbuilt, steps);
    }

    fn fields(&mut self, selections: Vec<Selection<Field>>) {
        let mut steps = Vec::new();
        for selection in selections {
            let (field, directive) = match selection {
                Selection::Member(field) => {
                    let directive = Directive::for_parameter(field.value());
                    (field, directive)
                }
                Selection::Injected {
                    member,
                    mut directives,
                } => match directives.pop() {
                    Some(directive) => (member, directive),
                    None => continue,
                },
                Selection::Deferred(err) => {
                    steps.push(Step::Throw(err));
                    continue;
                }
                Selection::NotFound => continue,
            };
            let slot = self.slot();
            steps.push(Step::Resolve {
                slot,
                directive,
                default: field.value().default_value().cloned(),
            });
            steps.push(Step::Assign { field, slot });
        }
        self.block(Guard::Built, steps);
    }

    fn methods(&mut self, selections: Vec<Selection<Method>>) {
        let mut steps = Vec::new();
        for selection in selections {
            let (method, directives) = match selection {
                Selection::Member(method) => (method, None),
                Selection::Injected { member, directives } => (member, Some(directives)),
                Selection::Deferred(err) => {
                    steps.push(Step::Throw(err));
                    continue;
                }
                Selection::NotFound => continue,
            };
            let args =
                self.resolve_parameters(method.parameters(), directives.as_deref(), &mut steps);
            steps.push(Step::Invoke { method, args });
        }
        self.block(Guard::Built, steps);
    }
}

/// Compile the plan building `ty` for a registration with the given members
/// and lifetime.
pub(crate) fn compile(
    ty: Type,
    name: Option<&str>,
    members: &[InjectionMember],
    lifetime: Lifetime,
    introspector: &dyn TypeIntrospector,
    selector: &dyn MemberSelector,
) -> BuildPlan {
    let mut compiler = Compiler {
        blocks: Vec::new(),
        slots: 0,
    };

    let factory = members.iter().find_map(|member| match member {
        InjectionMember::Factory(factory) => Some(factory.clone()),
        _ => None,
    });
    match factory {
        Some(factory) => compiler.block(Guard::Unbuilt, vec![Step::Seed(factory)]),
        None => {
            let selection = selector.select_constructor(&ty, members, introspector);
            compiler.constructor(ty, name, selection);
        }
    }

    if lifetime == Lifetime::PerResolve {
        compiler.block(Guard::Built, vec![Step::RecordPerResolve]);
    }

    compiler.fields(selector.select_fields(&ty, members, introspector));
    compiler.methods(selector.select_methods(&ty, members, introspector));

    let plan = BuildPlan {
        ty: Some(ty),
        blocks: compiler.blocks,
        slots: compiler.slots,
    };

    #[cfg(feature = "logging")]
    debug!(
        target: "wiring",
        service = ty.name(),
        steps = plan.len(),
        slots = plan.slots,
        "Compiled build plan"
    );

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::TypeCatalog;
    use crate::selection::DefaultMemberSelector;
    use std::sync::Arc;

    struct Engine;

    struct Car {
        _engine: Arc<Engine>,
    }

    fn catalog() -> TypeCatalog {
        let catalog = TypeCatalog::new();
        catalog.describe::<Car>(|ty| {
            ty.constructor(
                Constructor::new(|args: &Arguments| Ok(Car { _engine: args.get(0)? }))
                    .param(Parameter::of::<Engine>("engine")),
            )
            .method(
                Method::new("start", |_: &Car, _: &Arguments| Ok(()))
                    .param(Parameter::of::<u8>("gear"))
                    .marked(),
            );
        });
        catalog
    }

    fn compile_car(members: &[InjectionMember], lifetime: Lifetime) -> BuildPlan {
        compile(
            Type::of::<Car>(),
            None,
            members,
            lifetime,
            &catalog(),
            &DefaultMemberSelector,
        )
    }

    #[test]
    fn test_constructor_then_method() {
        let plan = compile_car(&[], Lifetime::Transient);
        let kinds: Vec<_> = plan.steps().map(|s| format!("{s:?}")).collect();
        assert!(kinds[0].starts_with("Resolve"));
        assert!(kinds[1].starts_with("Construct"));
        assert!(kinds[2].starts_with("Resolve"));
        assert!(kinds[3].starts_with("Invoke"));
        assert_eq!(plan.slot_count(), 2);
        assert_eq!(plan.blocks[0].guard, Guard::Unbuilt);
        assert_eq!(plan.blocks[1].guard, Guard::Built);
    }

    #[test]
    fn test_per_resolve_records_right_after_construction() {
        let plan = compile_car(&[], Lifetime::PerResolve);
        let steps: Vec<_> = plan.steps().collect();
        assert!(matches!(steps[1], Step::Construct { .. }));
        assert!(matches!(steps[2], Step::RecordPerResolve));
    }

    #[test]
    fn test_factory_replaces_constructor() {
        let members = [InjectionMember::factory(|_| {
            Ok(Arc::new(Car {
                _engine: Arc::new(Engine),
            }))
        })];
        let plan = compile_car(&members, Lifetime::Transient);
        assert!(matches!(plan.steps().next(), Some(Step::Seed(_))));
        assert!(!plan.steps().any(|s| matches!(s, Step::Construct { .. })));
    }

    #[test]
    fn test_selection_errors_are_deferred() {
        let catalog = TypeCatalog::new();
        catalog.describe::<Engine>(|ty| {
            ty.constructor(Constructor::new(|_| Ok(Engine)).param(Parameter::of::<u8>("a")))
                .constructor(Constructor::new(|_| Ok(Engine)).param(Parameter::of::<u16>("b")));
        });
        let plan = compile(
            Type::of::<Engine>(),
            None,
            &[],
            Lifetime::Transient,
            &catalog,
            &DefaultMemberSelector,
        );
        assert_eq!(plan.blocks[0].guard, Guard::Unbuilt);
        assert!(matches!(
            plan.blocks[0].steps[0],
            Step::Throw(DiError::AmbiguousConstructor { .. })
        ));
    }
}
