//! Runtime type handles and type-erased instances
//!
//! The container works on [`Type`] values rather than generic parameters so a
//! registration can be looked up, mapped and synthesized at runtime. Identity
//! is the [`TypeId`]; the type name only serves diagnostics.

use crate::{DiError, Result};
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Registration name. Names compare ordinally.
pub type Name = Arc<str>;

/// Marker trait for types that can be stored in the container.
///
/// This is automatically implemented for all types that are `Send + Sync + 'static`.
pub trait Injectable: Send + Sync + 'static {
    /// Runtime handle for this type
    #[inline]
    fn type_of() -> Type
    where
        Self: Sized,
    {
        Type::of::<Self>()
    }
}

impl<T: Send + Sync + 'static> Injectable for T {}

type CollectFn = fn(Vec<Instance>) -> Result<Instance>;

/// Shape of an enumerable-of-T type: the element type and the collect
/// routine monomorphized for that element.
#[derive(Clone, Copy)]
struct CollectionShape {
    element: fn() -> Type,
    collect: CollectFn,
}

/// Runtime handle of a type.
///
/// Cheap to copy. Two handles are equal when their [`TypeId`]s are equal.
#[derive(Clone, Copy)]
pub struct Type {
    id: TypeId,
    name: &'static str,
    collection: Option<CollectionShape>,
}

impl Type {
    /// Handle for `T`. Works for trait objects as well (`Type::of::<dyn Logger>()`).
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            collection: None,
        }
    }

    /// Handle for "all registered instances of `T`".
    ///
    /// Resolves to a `Vec<Arc<T>>` holding one instance per registration of
    /// `T` visible from the resolving container.
    #[inline]
    pub fn enumerable<T: ?Sized + Send + Sync + 'static>() -> Self {
        Self {
            id: TypeId::of::<Vec<Arc<T>>>(),
            name: std::any::type_name::<Vec<Arc<T>>>(),
            collection: Some(CollectionShape {
                element: Type::of::<T>,
                collect: collect::<T>,
            }),
        }
    }

    /// The underlying [`TypeId`]
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The type name, for diagnostics
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this handle was created with [`Type::enumerable`]
    #[inline]
    pub fn is_enumerable(&self) -> bool {
        self.collection.is_some()
    }

    /// Element type of an enumerable handle
    #[inline]
    pub fn element_type(&self) -> Option<Type> {
        self.collection.map(|shape| (shape.element)())
    }

    /// Materialize a collection from resolved elements.
    ///
    /// Returns `None` when this is not an enumerable handle.
    pub(crate) fn collect(&self, items: Vec<Instance>) -> Option<Result<Instance>> {
        self.collection.map(|shape| (shape.collect)(items))
    }
}

fn collect<T: ?Sized + Send + Sync + 'static>(items: Vec<Instance>) -> Result<Instance> {
    let items = items
        .into_iter()
        .map(|item| item.downcast::<T>().ok_or_else(DiError::type_mismatch::<T>))
        .collect::<Result<Vec<Arc<T>>>>()?;
    Ok(Instance::new(items))
}

impl PartialEq for Type {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Type {}

impl Hash for Type {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Registration key: a type plus an optional name.
///
/// The absent type addresses the container-wide default policy slot.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TypeKey {
    ty: Option<Type>,
    name: Option<Name>,
}

impl TypeKey {
    /// Create a key from a type and optional name
    #[inline]
    pub fn new(ty: Type, name: Option<&str>) -> Self {
        Self {
            ty: Some(ty),
            name: name.map(Name::from),
        }
    }

    /// Key of the default policy slot
    #[inline]
    pub(crate) fn defaults() -> Self {
        Self { ty: None, name: None }
    }

    #[inline]
    pub(crate) fn from_parts(ty: Option<Type>, name: Option<Name>) -> Self {
        Self { ty, name }
    }

    /// The registered type
    #[inline]
    pub fn ty(&self) -> Option<Type> {
        self.ty
    }

    /// The registration name
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub(crate) fn name_arc(&self) -> Option<&Name> {
        self.name.as_ref()
    }

    #[inline]
    pub(crate) fn type_name(&self) -> &'static str {
        self.ty.map_or("<defaults>", |ty| ty.name())
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}[{}]", self.type_name(), name),
            None => f.write_str(self.type_name()),
        }
    }
}

/// A type-erased service instance.
///
/// The payload is always an `Arc<T>`, which lets sized types and trait
/// objects share one representation.
#[derive(Clone)]
pub struct Instance(Arc<dyn Any + Send + Sync>);

impl Instance {
    /// Wrap a value
    #[inline]
    pub fn new<T: Injectable>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap an existing `Arc<T>`; `T` may be a trait object
    #[inline]
    pub fn from_arc<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self(Arc::new(value))
    }

    /// Recover the `Arc<T>` this instance was created from
    #[inline]
    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.0.downcast_ref::<Arc<T>>().cloned()
    }

    /// Whether this instance holds a `T`
    #[inline]
    pub fn is<T: ?Sized + Send + Sync + 'static>(&self) -> bool {
        self.0.is::<Arc<T>>()
    }

    /// Identity comparison
    #[inline]
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Instance(..)")
    }
}
