//! Per-container registration storage
//!
//! A [`Registry`] pairs the lock-free [`table::EntryTable`] with the
//! [`index::RegistryIndex`] and serializes every mutation of both behind one
//! mutex. Reads never take the lock.

pub(crate) mod index;
pub(crate) mod names;
pub(crate) mod table;

use crate::config::ContainerConfig;
use crate::types::{Name, Type};
use index::RegistryIndex;
use parking_lot::Mutex;
use std::sync::Arc;
use table::EntryTable;

/// A stored value together with the key it is stored under
pub(crate) struct Entry<V> {
    pub(crate) ty: Option<Type>,
    pub(crate) name: Option<Name>,
    pub(crate) value: Arc<V>,
}

pub(crate) struct Registry<V> {
    table: EntryTable<V>,
    index: RegistryIndex,
    write: Mutex<()>,
}

impl<V> Registry<V> {
    pub(crate) fn new(config: &ContainerConfig) -> Self {
        Self {
            table: EntryTable::new(config.capacity(), config.cutover(), config.collisions()),
            index: RegistryIndex::new(),
            write: Mutex::new(()),
        }
    }

    #[inline]
    pub(crate) fn find(&self, ty: Option<&Type>, name: Option<&str>) -> Option<Arc<V>> {
        self.table.find(ty, name)
    }

    /// Value for `(ty, name)`, created by `make` when absent.
    ///
    /// Concurrent callers for the same key all receive the value created by
    /// whichever of them took the write lock first.
    pub(crate) fn get_or_add(
        &self,
        ty: Option<&Type>,
        name: Option<&str>,
        make: impl FnOnce() -> V,
    ) -> Arc<V> {
        if let Some(value) = self.table.find(ty, name) {
            return value;
        }

        let _guard = self.write.lock();
        if let Some(value) = self.table.find(ty, name) {
            return value;
        }

        let value = Arc::new(make());
        self.bind(ty, name.map(Name::from), Arc::clone(&value));
        value
    }

    /// Bind `(ty, name)` to `value`, returning the replaced value
    pub(crate) fn set(&self, ty: Option<&Type>, name: Option<Name>, value: Arc<V>) -> Option<Arc<V>> {
        let _guard = self.write.lock();
        self.bind(ty, name, value)
    }

    fn bind(&self, ty: Option<&Type>, name: Option<Name>, value: Arc<V>) -> Option<Arc<V>> {
        let (slot, previous) = self.table.insert(ty, name.clone(), value);
        if let (None, Some(ty)) = (&previous, ty) {
            self.index.record(ty, slot, name);
        }
        previous
    }

    /// Values registered for exactly `ty`, in insertion order
    pub(crate) fn entries_for(&self, ty: &Type) -> Vec<Entry<V>> {
        self.index
            .entries_for(ty)
            .into_iter()
            .filter_map(|entry| {
                let value = self.table.slot(entry.slot)?.get(entry.name.as_deref())?;
                Some(Entry {
                    ty: Some(*ty),
                    name: entry.name,
                    value,
                })
            })
            .collect()
    }

    /// Every stored value, grouped by type in slot order
    pub(crate) fn entries(&self) -> Vec<Entry<V>> {
        let mut all = Vec::with_capacity(self.table.len());
        for slot in self.table.slots() {
            let ty = slot.ty();
            match ty {
                Some(ty) => all.extend(self.entries_for(&ty)),
                None => {
                    let names = slot.names();
                    all.extend(names.iter().map(|(name, value)| Entry {
                        ty: None,
                        name: name.cloned(),
                        value: Arc::clone(value),
                    }));
                }
            }
        }
        all
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.table.capacity()
    }
}
