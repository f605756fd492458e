//! Type metadata for the build-plan compiler
//!
//! Rust has no runtime reflection, so the container asks a
//! [`TypeIntrospector`] which constructors, methods and fields a type offers
//! and which of them are marked for injection. [`TypeCatalog`] is the bundled
//! implementation; types describe themselves through [`Describe`] (derivable
//! with the `derive` feature) or the closure-based [`TypeCatalog::describe`].

use crate::types::{Injectable, Instance, Name, Type};
use crate::{DiError, Result};
use ahash::RandomState;
use dashmap::DashMap;
use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// Converts an instance of one type into the representation of another,
/// e.g. `Arc<Impl>` into `Arc<dyn Trait>`.
pub type Caster = Arc<dyn Fn(Instance) -> Result<Instance> + Send + Sync>;

type ConstructFn = Arc<dyn Fn(&Arguments) -> Result<Instance> + Send + Sync>;
type InvokeFn = Arc<dyn Fn(&Instance, &Arguments) -> Result<()> + Send + Sync>;
type AssignFn = Arc<dyn Fn(&Instance, Instance) -> Result<()> + Send + Sync>;

/// Member accessibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    /// Visible to the type and its "family" only
    Protected,
    Private,
}

// =============================================================================
// Parameters and arguments
// =============================================================================

/// A constructor or method parameter, or the value slot of a field.
#[derive(Clone)]
pub struct Parameter {
    name: &'static str,
    ty: Type,
    dependency: Option<Name>,
    optional: bool,
    default: Option<Instance>,
}

impl Parameter {
    /// Parameter resolved as the default registration of `T`
    pub fn of<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self::typed(name, Type::of::<T>())
    }

    /// Parameter receiving every registered `T` as a `Vec<Arc<T>>`
    pub fn all<T: ?Sized + Send + Sync + 'static>(name: &'static str) -> Self {
        Self::typed(name, Type::enumerable::<T>())
    }

    /// Parameter of an arbitrary runtime type
    pub fn typed(name: &'static str, ty: Type) -> Self {
        Self {
            name,
            ty,
            dependency: None,
            optional: false,
            default: None,
        }
    }

    /// Resolve the named registration instead of the default one
    pub fn named(mut self, dependency: &str) -> Self {
        self.dependency = Some(Name::from(dependency));
        self
    }

    /// Pass nothing instead of failing when the dependency is unresolved
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Value used when the dependency is unresolved
    pub fn with_default<T: Injectable>(mut self, value: T) -> Self {
        self.default = Some(Instance::new(value));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ty(&self) -> Type {
        self.ty
    }

    /// Name of the registration the parameter depends on
    pub fn dependency(&self) -> Option<&str> {
        self.dependency.as_deref()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub(crate) fn default_value(&self) -> Option<&Instance> {
        self.default.as_ref()
    }
}

impl std::fmt::Debug for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("dependency", &self.dependency)
            .field("optional", &self.optional)
            .finish()
    }
}

/// Resolved argument values handed to constructors and methods.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<Option<Instance>>,
}

impl Arguments {
    pub fn new(values: Vec<Option<Instance>>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Required argument at `index`
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>> {
        match self.instance(index) {
            Some(instance) => instance.downcast::<T>().ok_or_else(DiError::type_mismatch::<T>),
            None => Err(DiError::creation_failed::<T>(format!(
                "argument {index} was not resolved"
            ))),
        }
    }

    /// Optional argument at `index`; `None` when it was not resolved
    pub fn optional<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> Option<Arc<T>> {
        self.instance(index).and_then(Instance::downcast::<T>)
    }

    /// Raw argument at `index`
    pub fn instance(&self, index: usize) -> Option<&Instance> {
        self.values.get(index).and_then(Option::as_ref)
    }
}

// =============================================================================
// Members
// =============================================================================

/// A constructor of a concrete type.
#[derive(Clone)]
pub struct Constructor {
    parameters: Vec<Parameter>,
    visibility: Visibility,
    marked: bool,
    invoke: ConstructFn,
}

impl Constructor {
    /// Constructor producing `T` from its resolved arguments
    pub fn new<T, F>(invoke: F) -> Self
    where
        T: Injectable,
        F: Fn(&Arguments) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            parameters: Vec::new(),
            visibility: Visibility::Public,
            marked: false,
            invoke: Arc::new(move |args| invoke(args).map(Instance::new)),
        }
    }

    /// Append a parameter
    pub fn param(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Mark for injection
    pub fn marked(mut self) -> Self {
        self.marked = true;
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    pub fn is_marked(&self) -> bool {
        self.marked
    }

    pub(crate) fn invoke(&self, args: &Arguments) -> Result<Instance> {
        (self.invoke)(args)
    }
}

impl std::fmt::Debug for Constructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constructor")
            .field("parameters", &self.parameters)
            .field("visibility", &self.visibility)
            .field("marked", &self.marked)
            .finish()
    }
}

/// A method invoked on an already constructed instance.
#[derive(Clone)]
pub struct Method {
    name: &'static str,
    parameters: Vec<Parameter>,
    visibility: Visibility,
    is_static: bool,
    marked: bool,
    invoke: InvokeFn,
}

impl Method {
    /// Method on `T`. Methods take `&T`; state they set must use interior
    /// mutability.
    pub fn new<T, F>(name: &'static str, invoke: F) -> Self
    where
        T: Injectable,
        F: Fn(&T, &Arguments) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name,
            parameters: Vec::new(),
            visibility: Visibility::Public,
            is_static: false,
            marked: false,
            invoke: Arc::new(move |existing, args| {
                let target = existing
                    .downcast::<T>()
                    .ok_or_else(DiError::type_mismatch::<T>)?;
                invoke(&target, args)
            }),
        }
    }

    pub fn param(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn marked(mut self) -> Self {
        self.marked = true;
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Declare the method as associated (no receiver)
    pub fn associated(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn is_marked(&self) -> bool {
        self.marked
    }

    /// Public instance method
    pub fn is_eligible(&self) -> bool {
        self.visibility == Visibility::Public && !self.is_static
    }

    pub(crate) fn invoke(&self, existing: &Instance, args: &Arguments) -> Result<()> {
        (self.invoke)(existing, args)
    }
}

impl std::fmt::Debug for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("visibility", &self.visibility)
            .field("is_static", &self.is_static)
            .field("marked", &self.marked)
            .finish()
    }
}

/// A field assigned on an already constructed instance.
#[derive(Clone)]
pub struct Field {
    name: &'static str,
    value: Parameter,
    visibility: Visibility,
    is_static: bool,
    marked: bool,
    assign: AssignFn,
}

impl Field {
    /// Field of type `Arc<V>` on `T`, set through `assign`
    pub fn new<T, V, F>(name: &'static str, assign: F) -> Self
    where
        T: Injectable,
        V: ?Sized + Send + Sync + 'static,
        F: Fn(&T, Arc<V>) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name,
            value: Parameter::of::<V>(name),
            visibility: Visibility::Public,
            is_static: false,
            marked: false,
            assign: Arc::new(move |existing, value| {
                let target = existing
                    .downcast::<T>()
                    .ok_or_else(DiError::type_mismatch::<T>)?;
                let value = value.downcast::<V>().ok_or_else(DiError::type_mismatch::<V>)?;
                assign(&target, value)
            }),
        }
    }

    /// Resolve the named registration of the field type
    pub fn named(mut self, dependency: &str) -> Self {
        self.value = self.value.named(dependency);
        self
    }

    /// Leave the field untouched when its dependency is unresolved
    pub fn optional(mut self) -> Self {
        self.value = self.value.optional();
        self
    }

    pub fn marked(mut self) -> Self {
        self.marked = true;
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn associated(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The value slot, described as a parameter
    pub fn value(&self) -> &Parameter {
        &self.value
    }

    pub fn is_marked(&self) -> bool {
        self.marked
    }

    pub fn is_eligible(&self) -> bool {
        self.visibility == Visibility::Public && !self.is_static
    }

    pub(crate) fn assign(&self, existing: &Instance, value: Instance) -> Result<()> {
        (self.assign)(existing, value)
    }
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("visibility", &self.visibility)
            .field("marked", &self.marked)
            .finish()
    }
}

/// Borrowed view of any member, for marker checks
#[derive(Debug, Clone, Copy)]
pub enum Member<'a> {
    Constructor(&'a Constructor),
    Method(&'a Method),
    Field(&'a Field),
}

impl Member<'_> {
    pub fn is_marked(&self) -> bool {
        match self {
            Member::Constructor(c) => c.is_marked(),
            Member::Method(m) => m.is_marked(),
            Member::Field(f) => f.is_marked(),
        }
    }
}

// =============================================================================
// Introspector
// =============================================================================

/// Capability the build-plan compiler uses to inspect types.
pub trait TypeIntrospector: Send + Sync {
    /// Whether the type is concrete and described well enough to be built
    /// without an explicit registration
    fn is_constructible(&self, ty: &Type) -> bool;

    fn declared_constructors(&self, ty: &Type) -> Vec<Constructor>;

    fn declared_methods(&self, ty: &Type) -> Vec<Method>;

    fn declared_fields(&self, ty: &Type) -> Vec<Field>;

    fn is_marked_for_injection(&self, member: Member<'_>) -> bool {
        member.is_marked()
    }

    /// Open generic definition a closed generic type was made from
    fn generic_definition(&self, _ty: &Type) -> Option<Type> {
        None
    }

    fn generic_arguments(&self, _ty: &Type) -> Vec<Type> {
        Vec::new()
    }

    /// Close `definition` over `arguments`
    fn make_generic(&self, _definition: &Type, _arguments: &[Type]) -> Option<Type> {
        None
    }

    /// Conversion from an instance of `from` to the representation of `to`
    fn cast(&self, _from: &Type, _to: &Type) -> Option<Caster> {
        None
    }
}

impl<I: TypeIntrospector + ?Sized> TypeIntrospector for Arc<I> {
    fn is_constructible(&self, ty: &Type) -> bool {
        (**self).is_constructible(ty)
    }

    fn declared_constructors(&self, ty: &Type) -> Vec<Constructor> {
        (**self).declared_constructors(ty)
    }

    fn declared_methods(&self, ty: &Type) -> Vec<Method> {
        (**self).declared_methods(ty)
    }

    fn declared_fields(&self, ty: &Type) -> Vec<Field> {
        (**self).declared_fields(ty)
    }

    fn is_marked_for_injection(&self, member: Member<'_>) -> bool {
        (**self).is_marked_for_injection(member)
    }

    fn generic_definition(&self, ty: &Type) -> Option<Type> {
        (**self).generic_definition(ty)
    }

    fn generic_arguments(&self, ty: &Type) -> Vec<Type> {
        (**self).generic_arguments(ty)
    }

    fn make_generic(&self, definition: &Type, arguments: &[Type]) -> Option<Type> {
        (**self).make_generic(definition, arguments)
    }

    fn cast(&self, from: &Type, to: &Type) -> Option<Caster> {
        (**self).cast(from, to)
    }
}

/// Everything the catalog knows about one concrete type
#[derive(Debug, Clone)]
pub struct TypeDescription {
    ty: Type,
    constructors: Vec<Constructor>,
    methods: Vec<Method>,
    fields: Vec<Field>,
    generic: Option<(Type, Vec<Type>)>,
}

impl TypeDescription {
    pub fn ty(&self) -> Type {
        self.ty
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

/// Implemented by types that describe their injectable members.
///
/// # Examples
///
/// ```rust
/// use wiring::{Arguments, Constructor, Describe, Parameter, TypeBuilder};
/// use std::sync::Arc;
///
/// struct Config;
///
/// struct Server {
///     config: Arc<Config>,
/// }
///
/// impl Describe for Server {
///     fn describe(ty: &mut TypeBuilder<Self>) {
///         ty.constructor(
///             Constructor::new(|args: &Arguments| Ok(Server { config: args.get(0)? }))
///                 .param(Parameter::of::<Config>("config")),
///         );
///     }
/// }
/// ```
pub trait Describe: Injectable + Sized {
    fn describe(ty: &mut TypeBuilder<Self>);
}

/// Collects the description of `T`
pub struct TypeBuilder<T> {
    description: TypeDescription,
    casts: Vec<(Type, Caster)>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> TypeBuilder<T> {
    fn new() -> Self {
        Self {
            description: TypeDescription {
                ty: Type::of::<T>(),
                constructors: Vec::new(),
                methods: Vec::new(),
                fields: Vec::new(),
                generic: None,
            },
            casts: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn constructor(&mut self, constructor: Constructor) -> &mut Self {
        self.description.constructors.push(constructor);
        self
    }

    pub fn method(&mut self, method: Method) -> &mut Self {
        self.description.methods.push(method);
        self
    }

    pub fn field(&mut self, field: Field) -> &mut Self {
        self.description.fields.push(field);
        self
    }

    /// Declare `T` as `definition` closed over `arguments`
    pub fn closes(&mut self, definition: Type, arguments: Vec<Type>) -> &mut Self {
        self.description.generic = Some((definition, arguments));
        self
    }

    /// Declare that `T` can stand in for `I`
    pub fn implements<I, F>(&mut self, cast: F) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        let caster: Caster = Arc::new(move |instance: Instance| {
            let concrete = instance
                .downcast::<T>()
                .ok_or_else(DiError::type_mismatch::<T>)?;
            Ok(Instance::from_arc(cast(concrete)))
        });
        self.casts.push((Type::of::<I>(), caster));
        self
    }
}

/// Concurrent in-memory [`TypeIntrospector`].
///
/// # Examples
///
/// ```rust
/// use wiring::{Constructor, Type, TypeCatalog, TypeIntrospector};
///
/// struct Clock;
///
/// let catalog = TypeCatalog::new();
/// catalog.describe::<Clock>(|ty| {
///     ty.constructor(Constructor::new(|_| Ok(Clock)));
/// });
///
/// assert!(catalog.is_constructible(&Type::of::<Clock>()));
/// ```
#[derive(Default)]
pub struct TypeCatalog {
    types: DashMap<TypeId, Arc<TypeDescription>, RandomState>,
    generics: DashMap<(TypeId, Vec<TypeId>), Type, RandomState>,
    closed: DashMap<TypeId, (Type, Vec<Type>), RandomState>,
    casts: DashMap<(TypeId, TypeId), Caster, RandomState>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a self-describing type
    pub fn add<T: Describe>(&self) -> &Self {
        self.describe::<T>(T::describe)
    }

    /// Describe `T` with a closure. A second description replaces the first.
    pub fn describe<T: Injectable>(&self, f: impl FnOnce(&mut TypeBuilder<T>)) -> &Self {
        let mut builder = TypeBuilder::<T>::new();
        f(&mut builder);

        let TypeBuilder {
            description, casts, ..
        } = builder;
        let ty = description.ty;

        #[cfg(feature = "logging")]
        debug!(
            target: "wiring",
            service = ty.name(),
            constructors = description.constructors.len(),
            methods = description.methods.len(),
            fields = description.fields.len(),
            "Describing type"
        );

        if let Some((definition, arguments)) = &description.generic {
            let key = (definition.id(), arguments.iter().map(Type::id).collect());
            self.generics.insert(key, ty);
        }
        for (target, caster) in casts {
            self.casts.insert((ty.id(), target.id()), caster);
        }
        self.types.insert(ty.id(), Arc::new(description));
        self
    }

    /// Declare `closed` as `definition` closed over `arguments` without
    /// describing it, e.g. for a generic trait object such as
    /// `dyn Repository<User>`.
    pub fn close(&self, closed: Type, definition: Type, arguments: Vec<Type>) -> &Self {
        let key = (definition.id(), arguments.iter().map(Type::id).collect());
        self.generics.insert(key, closed);
        self.closed.insert(closed.id(), (definition, arguments));
        self
    }

    /// Generic shape of `ty`, from its description or from [`close`](Self::close)
    fn generic_of(&self, ty: &Type) -> Option<(Type, Vec<Type>)> {
        if let Some(generic) = self.get(ty).and_then(|d| d.generic.clone()) {
            return Some(generic);
        }
        self.closed.get(&ty.id()).map(|entry| entry.value().clone())
    }

    /// Description of a type, if known
    pub fn get(&self, ty: &Type) -> Option<Arc<TypeDescription>> {
        self.types.get(&ty.id()).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, ty: &Type) -> bool {
        self.types.contains_key(&ty.id())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeIntrospector for TypeCatalog {
    fn is_constructible(&self, ty: &Type) -> bool {
        self.contains(ty)
    }

    fn declared_constructors(&self, ty: &Type) -> Vec<Constructor> {
        self.get(ty)
            .map(|d| d.constructors.clone())
            .unwrap_or_default()
    }

    fn declared_methods(&self, ty: &Type) -> Vec<Method> {
        self.get(ty).map(|d| d.methods.clone()).unwrap_or_default()
    }

    fn declared_fields(&self, ty: &Type) -> Vec<Field> {
        self.get(ty).map(|d| d.fields.clone()).unwrap_or_default()
    }

    fn generic_definition(&self, ty: &Type) -> Option<Type> {
        self.generic_of(ty).map(|(definition, _)| definition)
    }

    fn generic_arguments(&self, ty: &Type) -> Vec<Type> {
        self.generic_of(ty)
            .map(|(_, arguments)| arguments)
            .unwrap_or_default()
    }

    fn make_generic(&self, definition: &Type, arguments: &[Type]) -> Option<Type> {
        let key = (definition.id(), arguments.iter().map(Type::id).collect());
        self.generics.get(&key).map(|entry| *entry.value())
    }

    fn cast(&self, from: &Type, to: &Type) -> Option<Caster> {
        self.casts
            .get(&(from.id(), to.id()))
            .map(|entry| Arc::clone(entry.value()))
    }
}

impl std::fmt::Debug for TypeCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeCatalog")
            .field("types", &self.types.len())
            .field("generics", &self.generics.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    trait Store: Send + Sync {
        fn id(&self) -> u32;
    }

    struct Memory;

    impl Store for Memory {
        fn id(&self) -> u32 {
            7
        }
    }

    struct Service {
        store: Arc<dyn Store>,
        tag: Mutex<Option<Arc<String>>>,
    }

    struct ListDef;

    struct List<T>(PhantomData<T>);

    fn describe_service(ty: &mut TypeBuilder<Service>) {
        ty.constructor(
            Constructor::new(|args: &Arguments| {
                Ok(Service {
                    store: args.get::<dyn Store>(0)?,
                    tag: Mutex::new(None),
                })
            })
            .param(Parameter::of::<dyn Store>("store"))
            .marked(),
        )
        .method(
            Method::new("tag", |svc: &Service, args: &Arguments| {
                *svc.tag.lock().unwrap() = args.optional::<String>(0);
                Ok(())
            })
            .param(Parameter::of::<String>("tag").optional()),
        )
        .field(Field::new("secret", |_: &Service, _: Arc<String>| Ok(())).visibility(Visibility::Private));
    }

    #[test]
    fn test_describe_and_query() {
        let catalog = TypeCatalog::new();
        catalog.describe::<Service>(describe_service);

        let ty = Type::of::<Service>();
        assert!(catalog.is_constructible(&ty));
        assert!(!catalog.is_constructible(&Type::of::<dyn Store>()));

        let ctors = catalog.declared_constructors(&ty);
        assert_eq!(ctors.len(), 1);
        assert_eq!(ctors[0].arity(), 1);
        assert!(catalog.is_marked_for_injection(Member::Constructor(&ctors[0])));

        let methods = catalog.declared_methods(&ty);
        assert_eq!(methods[0].name(), "tag");
        assert!(methods[0].is_eligible());
        assert!(!catalog.declared_fields(&ty)[0].is_eligible());
    }

    #[test]
    fn test_constructor_and_method_invoke() {
        let catalog = TypeCatalog::new();
        catalog.describe::<Service>(describe_service);
        let ty = Type::of::<Service>();

        let store = Instance::from_arc(Arc::new(Memory) as Arc<dyn Store>);
        let built = catalog.declared_constructors(&ty)[0]
            .invoke(&Arguments::new(vec![Some(store)]))
            .unwrap();

        let tag = Instance::new(String::from("primary"));
        catalog.declared_methods(&ty)[0]
            .invoke(&built, &Arguments::new(vec![Some(tag)]))
            .unwrap();

        let service = built.downcast::<Service>().unwrap();
        assert_eq!(service.store.id(), 7);
        assert_eq!(service.tag.lock().unwrap().as_deref().map(String::as_str), Some("primary"));
    }

    #[test]
    fn test_method_rejects_wrong_target() {
        let method = Method::new("noop", |_: &Service, _: &Arguments| Ok(()));
        let result = method.invoke(&Instance::new(5u32), &Arguments::default());
        assert!(matches!(result, Err(DiError::TypeMismatch { .. })));
    }

    #[test]
    fn test_generic_closing() {
        let catalog = TypeCatalog::new();
        let definition = Type::of::<ListDef>();
        catalog.describe::<List<u32>>(|ty| {
            ty.closes(definition, vec![Type::of::<u32>()]);
        });

        let closed = Type::of::<List<u32>>();
        assert_eq!(catalog.generic_definition(&closed), Some(definition));
        assert_eq!(catalog.generic_arguments(&closed), vec![Type::of::<u32>()]);
        assert_eq!(catalog.make_generic(&definition, &[Type::of::<u32>()]), Some(closed));
        assert_eq!(catalog.make_generic(&definition, &[Type::of::<u8>()]), None);
    }

    #[test]
    fn test_close_trait_object() {
        let catalog = TypeCatalog::new();
        let definition = Type::of::<ListDef>();
        let closed = Type::of::<dyn Store>();
        catalog.close(closed, definition, vec![Type::of::<u8>()]);

        assert!(!catalog.is_constructible(&closed));
        assert_eq!(catalog.generic_definition(&closed), Some(definition));
        assert_eq!(catalog.make_generic(&definition, &[Type::of::<u8>()]), Some(closed));
    }

    #[test]
    fn test_cast() {
        let catalog = TypeCatalog::new();
        catalog.describe::<Memory>(|ty| {
            ty.constructor(Constructor::new(|_| Ok(Memory)))
                .implements::<dyn Store, _>(|m| m as Arc<dyn Store>);
        });

        let caster = catalog
            .cast(&Type::of::<Memory>(), &Type::of::<dyn Store>())
            .unwrap();
        let cast = caster(Instance::new(Memory)).unwrap();
        assert_eq!(cast.downcast::<dyn Store>().unwrap().id(), 7);
    }

    #[test]
    fn test_arguments_errors() {
        let args = Arguments::new(vec![None, Some(Instance::new(1u8))]);
        assert!(args.get::<u8>(0).is_err());
        assert!(args.optional::<u8>(0).is_none());
        assert!(matches!(args.get::<u16>(1), Err(DiError::TypeMismatch { .. })));
        assert_eq!(*args.get::<u8>(1).unwrap(), 1);
    }
}
