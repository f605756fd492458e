//! Entry table keyed by `(type, name)`
//!
//! Entries live in a flat array of write-once cells; buckets hold the index
//! of the newest entry in their chain and every entry links to the previous
//! head. Readers walk a snapshot without locking. Writers (serialized by the
//! owning [`Registry`](super::Registry)) append entries in place and replace
//! the whole snapshot when the table grows. Entry indices survive growth, so
//! the registry index can address entries by position.

use super::names::NameMap;
use crate::config::table_capacity;
use crate::types::{Name, Type};
use ahash::RandomState;
use arc_swap::ArcSwap;
use once_cell::sync::OnceCell;
use std::hash::BuildHasher;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "logging")]
use tracing::debug;

const EMPTY: usize = usize::MAX;

/// All registrations of one type at one container level.
pub(crate) struct Slot<V> {
    hash: u64,
    ty: Option<Type>,
    names: ArcSwap<NameMap<V>>,
}

impl<V> Slot<V> {
    #[inline]
    pub(crate) fn ty(&self) -> Option<Type> {
        self.ty
    }

    #[inline]
    pub(crate) fn get(&self, name: Option<&str>) -> Option<Arc<V>> {
        self.names.load().get(name).cloned()
    }

    /// Current snapshot of the name map
    #[inline]
    pub(crate) fn names(&self) -> Arc<NameMap<V>> {
        self.names.load_full()
    }

    #[inline]
    fn matches(&self, hash: u64, ty: Option<&Type>) -> bool {
        self.hash == hash && self.ty.as_ref() == ty
    }
}

struct Link<V> {
    slot: Arc<Slot<V>>,
    next: usize,
}

struct Table<V> {
    buckets: Box<[AtomicUsize]>,
    entries: Box<[OnceCell<Link<V>>]>,
    len: AtomicUsize,
}

impl<V> Table<V> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            buckets: (0..capacity).map(|_| AtomicUsize::new(EMPTY)).collect(),
            entries: (0..capacity).map(|_| OnceCell::new()).collect(),
            len: AtomicUsize::new(0),
        }
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    #[inline]
    fn bucket(&self, hash: u64) -> usize {
        (hash as usize) & (self.buckets.len() - 1)
    }

    #[inline]
    fn link(&self, index: usize) -> Option<&Link<V>> {
        self.entries.get(index).and_then(OnceCell::get)
    }

    /// Entry index of the slot for `ty`, plus the length of the chain walked
    fn find(&self, hash: u64, ty: Option<&Type>) -> (Option<usize>, usize) {
        let mut index = self.buckets[self.bucket(hash)].load(Ordering::Acquire);
        let mut chain = 0;
        while let Some(link) = self.link(index) {
            if link.slot.matches(hash, ty) {
                return (Some(index), chain);
            }
            chain += 1;
            index = link.next;
        }
        (None, chain)
    }

    /// Publish `slot` at `index`. Caller holds the registry write lock.
    fn push(&self, index: usize, slot: Arc<Slot<V>>) {
        let bucket = &self.buckets[self.bucket(slot.hash)];
        let next = bucket.load(Ordering::Acquire);
        // A cell at `index` is only ever filled once per table.
        let _ = self.entries[index].set(Link { slot, next });
        bucket.store(index, Ordering::Release);
        self.len.store(index + 1, Ordering::Release);
    }

    /// Copy every entry into a table of `capacity`, keeping indices
    fn rebuild(&self, capacity: usize) -> Self {
        let table = Self::with_capacity(capacity);
        for index in 0..self.len() {
            if let Some(link) = self.link(index) {
                table.push(index, Arc::clone(&link.slot));
            }
        }
        table
    }
}

/// Growable hash table of slots.
pub(crate) struct EntryTable<V> {
    table: ArcSwap<Table<V>>,
    hasher: RandomState,
    cutover: usize,
    max_collisions: usize,
    registrations: AtomicUsize,
}

impl<V> EntryTable<V> {
    pub(crate) fn new(capacity: usize, cutover: usize, max_collisions: usize) -> Self {
        Self {
            table: ArcSwap::from_pointee(Table::with_capacity(table_capacity(capacity))),
            hasher: RandomState::new(),
            cutover,
            max_collisions,
            registrations: AtomicUsize::new(0),
        }
    }

    /// The absent type hashes to 0
    #[inline]
    fn hash(&self, ty: Option<&Type>) -> u64 {
        ty.map_or(0, |ty| self.hasher.hash_one(ty.id()))
    }

    /// Lock-free lookup
    pub(crate) fn find(&self, ty: Option<&Type>, name: Option<&str>) -> Option<Arc<V>> {
        let hash = self.hash(ty);
        let table = self.table.load();
        let (index, _) = table.find(hash, ty);
        index
            .and_then(|index| table.link(index))
            .and_then(|link| link.slot.get(name))
    }

    /// Slot stored at `index`, if any
    pub(crate) fn slot(&self, index: usize) -> Option<Arc<Slot<V>>> {
        self.table
            .load()
            .link(index)
            .map(|link| Arc::clone(&link.slot))
    }

    /// All slots in insertion order
    pub(crate) fn slots(&self) -> Vec<Arc<Slot<V>>> {
        let table = self.table.load();
        (0..table.len())
            .filter_map(|index| table.link(index).map(|link| Arc::clone(&link.slot)))
            .collect()
    }

    /// Bind `(ty, name)` to `value`. Returns the entry index of the type's
    /// slot and the value that was replaced.
    ///
    /// Caller holds the registry write lock.
    pub(crate) fn insert(
        &self,
        ty: Option<&Type>,
        name: Option<Name>,
        value: Arc<V>,
    ) -> (usize, Option<Arc<V>>) {
        let hash = self.hash(ty);
        let index = self.slot_index(hash, ty);
        let Some(slot) = self.slot(index) else {
            // slot_index always leaves a slot at the returned index
            return (index, None);
        };

        let (names, previous) = slot.names.load().with(name, value, self.cutover);
        slot.names.store(Arc::new(names));
        if previous.is_none() {
            self.registrations.fetch_add(1, Ordering::Relaxed);
        }
        (index, previous)
    }

    /// Index of the slot for `ty`, creating it (and growing) when needed.
    fn slot_index(&self, hash: u64, ty: Option<&Type>) -> usize {
        let table = self.table.load_full();
        let (found, chain) = table.find(hash, ty);
        if let Some(index) = found {
            return index;
        }

        let index = table.len();
        let table = if index >= table.capacity() || chain >= self.max_collisions {
            self.grow(&table)
        } else {
            table
        };

        table.push(
            index,
            Arc::new(Slot {
                hash,
                ty: ty.copied(),
                names: ArcSwap::from_pointee(NameMap::new()),
            }),
        );
        index
    }

    fn grow(&self, table: &Table<V>) -> Arc<Table<V>> {
        let capacity = table.capacity() * 2;

        #[cfg(feature = "logging")]
        debug!(
            target: "wiring",
            from = table.capacity(),
            to = capacity,
            slots = table.len(),
            "Growing entry table"
        );

        let grown = Arc::new(table.rebuild(capacity));
        self.table.store(Arc::clone(&grown));
        grown
    }

    /// Number of `(type, name)` bindings
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.registrations.load(Ordering::Relaxed)
    }

    /// Number of type slots
    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        self.table.load().len()
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.table.load().capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B;

    fn ty<T: 'static>() -> Type {
        Type::of::<T>()
    }

    #[test]
    fn test_insert_and_find() {
        let table = EntryTable::new(4, 8, 8);
        table.insert(Some(&ty::<A>()), None, Arc::new("a"));
        table.insert(Some(&ty::<A>()), Some(Name::from("x")), Arc::new("ax"));
        table.insert(Some(&ty::<B>()), None, Arc::new("b"));

        assert_eq!(table.find(Some(&ty::<A>()), None).as_deref(), Some(&"a"));
        assert_eq!(table.find(Some(&ty::<A>()), Some("x")).as_deref(), Some(&"ax"));
        assert_eq!(table.find(Some(&ty::<B>()), None).as_deref(), Some(&"b"));
        assert!(table.find(Some(&ty::<B>()), Some("x")).is_none());
        assert_eq!(table.len(), 3);
        assert_eq!(table.slot_count(), 2);
    }

    #[test]
    fn test_absent_type_slot() {
        let table = EntryTable::new(4, 8, 8);
        assert!(table.find(None, None).is_none());
        table.insert(None, None, Arc::new(0u8));
        assert_eq!(table.find(None, None).as_deref(), Some(&0));
        assert!(table.find(Some(&ty::<A>()), None).is_none());
    }

    #[test]
    fn test_same_type_reuses_slot_index() {
        let table = EntryTable::new(4, 8, 8);
        let (first, _) = table.insert(Some(&ty::<A>()), None, Arc::new(1));
        let (second, previous) = table.insert(Some(&ty::<A>()), None, Arc::new(2));
        assert_eq!(first, second);
        assert_eq!(previous.as_deref(), Some(&1));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_growth_keeps_entries_and_indices() {
        macro_rules! keys {
            ($($t:ident),*) => {{
                $(struct $t;)*
                vec![$(Type::of::<$t>()),*]
            }};
        }
        let types = keys!(T0, T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12, T13, T14, T15, T16);

        let table = EntryTable::new(2, 8, 8);
        let mut indices = Vec::new();
        for (i, ty) in types.iter().enumerate() {
            indices.push(table.insert(Some(ty), None, Arc::new(i)).0);
        }

        assert!(table.capacity() >= types.len());
        for (i, ty) in types.iter().enumerate() {
            assert_eq!(table.find(Some(ty), None).as_deref(), Some(&i));
            assert_eq!(table.slot(indices[i]).and_then(|slot| slot.ty()), Some(*ty));
        }
    }

    #[test]
    fn test_old_snapshot_stays_readable() {
        let table = EntryTable::new(2, 8, 8);
        table.insert(Some(&ty::<A>()), None, Arc::new(1));
        let snapshot = table.table.load_full();

        table.insert(Some(&ty::<B>()), None, Arc::new(2));
        table.insert(Some(&ty::<u8>()), None, Arc::new(3));

        assert_eq!(snapshot.capacity(), 2);
        assert!(table.capacity() > 2);
        let hash = table.hash(Some(&ty::<A>()));
        assert!(snapshot.find(hash, Some(&ty::<A>())).0.is_some());
    }
}
