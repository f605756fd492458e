//! Per-type name map
//!
//! Every entry-table slot owns one of these. A handful of names live in a
//! plain list; once a type collects more than the cutover the map switches
//! to a hash map. Maps are never mutated in place: writers build a new map
//! and publish it, readers keep whatever snapshot they loaded.

use crate::types::Name;
use ahash::RandomState;
use std::collections::HashMap;
use std::sync::Arc;

enum Named<V> {
    List(Vec<(Name, Arc<V>)>),
    Hash(HashMap<Name, Arc<V>, RandomState>),
}

pub(crate) struct NameMap<V> {
    default: Option<Arc<V>>,
    named: Named<V>,
}

impl<V> NameMap<V> {
    pub(crate) fn new() -> Self {
        Self {
            default: None,
            named: Named::List(Vec::new()),
        }
    }

    #[inline]
    pub(crate) fn get(&self, name: Option<&str>) -> Option<&Arc<V>> {
        match name {
            None => self.default.as_ref(),
            Some(name) => match &self.named {
                Named::List(list) => list
                    .iter()
                    .find(|(candidate, _)| &**candidate == name)
                    .map(|(_, value)| value),
                Named::Hash(map) => map.get(name),
            },
        }
    }

    /// Copy of this map with `name` bound to `value`, plus the value it
    /// replaced.
    pub(crate) fn with(
        &self,
        name: Option<Name>,
        value: Arc<V>,
        cutover: usize,
    ) -> (Self, Option<Arc<V>>) {
        let mut next = self.clone();
        let previous = match name {
            None => next.default.replace(value),
            Some(name) => next.bind(name, value, cutover),
        };
        (next, previous)
    }

    fn bind(&mut self, name: Name, value: Arc<V>, cutover: usize) -> Option<Arc<V>> {
        match &mut self.named {
            Named::List(list) => {
                if let Some((_, existing)) = list.iter_mut().find(|(n, _)| *n == name) {
                    return Some(std::mem::replace(existing, value));
                }
                list.push((name, value));
                if list.len() > cutover {
                    let map = list.drain(..).collect::<HashMap<_, _, RandomState>>();
                    self.named = Named::Hash(map);
                }
                None
            }
            Named::Hash(map) => map.insert(name, value),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        let named = match &self.named {
            Named::List(list) => list.len(),
            Named::Hash(map) => map.len(),
        };
        named + usize::from(self.default.is_some())
    }

    #[cfg(test)]
    pub(crate) fn is_hashed(&self) -> bool {
        matches!(self.named, Named::Hash(_))
    }

    /// All bound names; the default entry first
    pub(crate) fn iter(&self) -> Box<dyn Iterator<Item = (Option<&Name>, &Arc<V>)> + '_> {
        let default = self.default.iter().map(|value| (None, value));
        match &self.named {
            Named::List(list) => Box::new(default.chain(list.iter().map(|(n, v)| (Some(n), v)))),
            Named::Hash(map) => Box::new(default.chain(map.iter().map(|(n, v)| (Some(n), v)))),
        }
    }
}

impl<V> Clone for NameMap<V> {
    fn clone(&self) -> Self {
        let named = match &self.named {
            Named::List(list) => Named::List(list.clone()),
            Named::Hash(map) => Named::Hash(map.clone()),
        };
        Self {
            default: self.default.clone(),
            named,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Option<Name> {
        Some(Name::from(s))
    }

    #[test]
    fn test_default_and_named_are_distinct() {
        let map = NameMap::new();
        let (map, _) = map.with(None, Arc::new(1), 8);
        let (map, _) = map.with(name("a"), Arc::new(2), 8);

        assert_eq!(map.get(None).map(|v| **v), Some(1));
        assert_eq!(map.get(Some("a")).map(|v| **v), Some(2));
        assert!(map.get(Some("b")).is_none());
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_replacement_returns_previous() {
        let (map, _) = NameMap::new().with(name("a"), Arc::new(1), 8);
        let (map, previous) = map.with(name("a"), Arc::new(2), 8);
        assert_eq!(previous.map(|v| *v), Some(1));
        assert_eq!(map.get(Some("a")).map(|v| **v), Some(2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_cutover_promotes_to_hash() {
        let mut map = NameMap::new();
        for i in 0..8 {
            map = map.with(name(&format!("n{i}")), Arc::new(i), 8).0;
        }
        assert!(!map.is_hashed());

        map = map.with(name("n8"), Arc::new(8), 8).0;
        assert!(map.is_hashed());
        for i in 0..9 {
            assert_eq!(map.get(Some(format!("n{i}").as_str())).map(|v| **v), Some(i));
        }
    }

    #[test]
    fn test_snapshots_are_not_mutated() {
        let (before, _) = NameMap::new().with(name("a"), Arc::new(1), 8);
        let (after, _) = before.with(name("b"), Arc::new(2), 8);
        assert!(before.get(Some("b")).is_none());
        assert!(after.get(Some("b")).is_some());
    }
}
