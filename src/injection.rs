//! Explicit injection directives attached to a registration
//!
//! An [`InjectionMember`] pins the constructor, method or field the container
//! must use, and a [`Directive`] says where each argument comes from. Both
//! override whatever the introspector would have selected on its own.

use crate::context::BuilderContext;
use crate::introspect::Parameter;
use crate::types::{Injectable, Instance, Name, Type};
use crate::{Container, Result};
use std::sync::Arc;

/// Produces a value from the container the resolution runs in
pub type FactoryFn = Arc<dyn Fn(&Container) -> Result<Instance> + Send + Sync>;

/// Where a single argument or field value comes from.
#[derive(Clone)]
pub enum Directive {
    /// A literal value
    Value { ty: Type, value: Instance },
    /// A registration looked up by type and name
    Dependency {
        ty: Type,
        name: Option<Name>,
        optional: bool,
    },
    /// A nested factory
    Factory { ty: Type, factory: FactoryFn },
}

impl Directive {
    /// Literal value
    pub fn value<T: Injectable>(value: T) -> Self {
        Self::Value {
            ty: Type::of::<T>(),
            value: Instance::new(value),
        }
    }

    /// Literal value held behind an `Arc`, possibly a trait object
    pub fn instance<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self::Value {
            ty: Type::of::<T>(),
            value: Instance::from_arc(value),
        }
    }

    /// Default registration of `T`
    pub fn dependency<T: ?Sized + 'static>() -> Self {
        Self::Dependency {
            ty: Type::of::<T>(),
            name: None,
            optional: false,
        }
    }

    /// Named registration of `T`
    pub fn named<T: ?Sized + 'static>(name: &str) -> Self {
        Self::Dependency {
            ty: Type::of::<T>(),
            name: Some(Name::from(name)),
            optional: false,
        }
    }

    /// Default registration of `T`, or nothing when it cannot be resolved
    pub fn optional<T: ?Sized + 'static>() -> Self {
        Self::Dependency {
            ty: Type::of::<T>(),
            name: None,
            optional: true,
        }
    }

    /// Every registration of `T`, collected into a `Vec<Arc<T>>`
    pub fn all<T: ?Sized + Send + Sync + 'static>() -> Self {
        Self::Dependency {
            ty: Type::enumerable::<T>(),
            name: None,
            optional: false,
        }
    }

    /// Value produced by a factory at resolution time
    pub fn factory<T, F>(factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Container) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        Self::Factory {
            ty: Type::of::<T>(),
            factory: Arc::new(move |container| factory(container).map(Instance::from_arc)),
        }
    }

    /// Type of the value this directive yields
    pub fn ty(&self) -> Type {
        match self {
            Self::Value { ty, .. } | Self::Dependency { ty, .. } | Self::Factory { ty, .. } => *ty,
        }
    }

    /// Whether the directive can feed `parameter`
    pub(crate) fn fits(&self, parameter: &Parameter) -> bool {
        self.ty() == parameter.ty()
    }

    /// Implicit directive for a declared parameter
    pub(crate) fn for_parameter(parameter: &Parameter) -> Self {
        Self::Dependency {
            ty: parameter.ty(),
            name: parameter.dependency().map(Name::from),
            optional: parameter.is_optional() || parameter.default_value().is_some(),
        }
    }

    /// Produce the value. `Ok(None)` only for optional dependencies that
    /// could not be resolved.
    pub(crate) fn resolve(&self, ctx: &mut BuilderContext<'_>) -> Result<Option<Instance>> {
        match self {
            Self::Value { value, .. } => Ok(Some(value.clone())),
            Self::Dependency { ty, name, optional } => {
                match ctx.resolve_dependency(*ty, name.clone()) {
                    Ok(instance) => Ok(Some(instance)),
                    Err(err) if *optional && err.is_unresolved() => Ok(None),
                    Err(err) => Err(err),
                }
            }
            Self::Factory { factory, .. } => factory(ctx.container()).map(Some),
        }
    }
}

impl std::fmt::Debug for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value { ty, .. } => f.debug_struct("Value").field("ty", ty).finish(),
            Self::Dependency { ty, name, optional } => f
                .debug_struct("Dependency")
                .field("ty", ty)
                .field("name", name)
                .field("optional", optional)
                .finish(),
            Self::Factory { ty, .. } => f.debug_struct("Factory").field("ty", ty).finish(),
        }
    }
}

/// An explicitly declared injection member.
#[derive(Clone)]
pub enum InjectionMember {
    /// Use the declared constructor whose parameters match these directives
    Constructor(Vec<Directive>),
    /// Invoke the named method with these directives
    Method {
        name: &'static str,
        args: Vec<Directive>,
    },
    /// Assign the named field, optionally overriding the value source
    Field {
        name: &'static str,
        value: Option<Directive>,
    },
    /// Supply the instance from a factory instead of a constructor
    Factory(FactoryFn),
}

impl InjectionMember {
    /// Constructor with the given arguments
    pub fn constructor(args: Vec<Directive>) -> Self {
        Self::Constructor(args)
    }

    /// Method call with the given arguments
    pub fn method(name: &'static str, args: Vec<Directive>) -> Self {
        Self::Method { name, args }
    }

    /// Field assignment using the field's declared dependency
    pub fn field(name: &'static str) -> Self {
        Self::Field { name, value: None }
    }

    /// Field assignment with an explicit value source
    pub fn field_with(name: &'static str, value: Directive) -> Self {
        Self::Field {
            name,
            value: Some(value),
        }
    }

    /// Instance factory
    pub fn factory<T, F>(factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&Container) -> Result<Arc<T>> + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(move |container| {
            factory(container).map(Instance::from_arc)
        }))
    }

    pub fn is_factory(&self) -> bool {
        matches!(self, Self::Factory(_))
    }
}

impl std::fmt::Debug for InjectionMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constructor(args) => f.debug_tuple("Constructor").field(args).finish(),
            Self::Method { name, args } => f
                .debug_struct("Method")
                .field("name", name)
                .field("args", args)
                .finish(),
            Self::Field { name, value } => f
                .debug_struct("Field")
                .field("name", name)
                .field("value", value)
                .finish(),
            Self::Factory(_) => f.write_str("Factory"),
        }
    }
}
