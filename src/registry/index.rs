//! Type to slot index
//!
//! Answers "which entries hold registrations of exactly this type" without
//! scanning the entry table. Positions are entry-table indices, which stay
//! valid across growth.

use crate::types::{Name, Type};
use ahash::RandomState;
use dashmap::DashMap;
use std::any::TypeId;

/// One indexed registration: the entry-table slot and the name within it
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IndexEntry {
    pub(crate) slot: usize,
    pub(crate) name: Option<Name>,
}

#[derive(Default)]
pub(crate) struct RegistryIndex {
    entries: DashMap<TypeId, Vec<IndexEntry>, RandomState>,
}

impl RegistryIndex {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record a newly bound name. Caller holds the registry write lock.
    pub(crate) fn record(&self, ty: &Type, slot: usize, name: Option<Name>) {
        self.entries
            .entry(ty.id())
            .or_default()
            .push(IndexEntry { slot, name });
    }

    /// Entries for `ty` in insertion order
    pub(crate) fn entries_for(&self, ty: &Type) -> Vec<IndexEntry> {
        self.entries
            .get(&ty.id())
            .map(|entries| entries.value().clone())
            .unwrap_or_default()
    }

    /// Number of indexed types
    #[cfg(test)]
    pub(crate) fn type_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_per_type() {
        let index = RegistryIndex::new();
        let ty = Type::of::<String>();
        index.record(&ty, 3, Some(Name::from("b")));
        index.record(&ty, 3, None);
        index.record(&Type::of::<u8>(), 0, None);
        index.record(&ty, 3, Some(Name::from("a")));

        let names: Vec<_> = index
            .entries_for(&ty)
            .into_iter()
            .map(|entry| entry.name.as_deref().map(str::to_owned))
            .collect();
        assert_eq!(names, vec![Some("b".to_owned()), None, Some("a".to_owned())]);
        assert_eq!(index.type_count(), 2);
    }

    #[test]
    fn test_unknown_type_is_empty() {
        assert!(RegistryIndex::new().entries_for(&Type::of::<u8>()).is_empty());
    }
}
