//! Container tunables

/// Initial number of entry-table slots (rounded up to a power of two)
pub const DEFAULT_CAPACITY: usize = 37;

/// Largest initial table; bigger requests are clamped and the table grows
/// on demand instead
pub const MAX_INITIAL_CAPACITY: usize = 1 << 20;

/// Names per type kept in a linear list before switching to a hash map
pub const LIST_TO_HASH_CUTOVER: usize = 8;

/// Longest bucket chain tolerated before the entry table is rebuilt
pub const MAX_BUCKET_COLLISIONS: usize = 8;

/// Configuration for a [`Container`](crate::Container).
///
/// Child containers inherit the configuration of their parent.
///
/// # Examples
///
/// ```rust
/// use wiring::{Container, ContainerConfig};
///
/// let container = Container::with_config(
///     ContainerConfig::new()
///         .initial_capacity(128)
///         .list_to_hash_cutover(4),
/// );
/// assert_eq!(container.config().capacity(), 128);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerConfig {
    initial_capacity: usize,
    list_to_hash_cutover: usize,
    max_bucket_collisions: usize,
}

impl ContainerConfig {
    /// Default configuration
    #[inline]
    pub const fn new() -> Self {
        Self {
            initial_capacity: DEFAULT_CAPACITY,
            list_to_hash_cutover: LIST_TO_HASH_CUTOVER,
            max_bucket_collisions: MAX_BUCKET_COLLISIONS,
        }
    }

    /// Expected number of registered types per container level
    #[inline]
    pub const fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Number of names a type may hold before its name map becomes a hash map
    #[inline]
    pub const fn list_to_hash_cutover(mut self, cutover: usize) -> Self {
        self.list_to_hash_cutover = cutover;
        self
    }

    /// Longest bucket chain tolerated before the table grows
    #[inline]
    pub const fn max_bucket_collisions(mut self, collisions: usize) -> Self {
        self.max_bucket_collisions = collisions;
        self
    }

    /// Effective table capacity: a power of two between 2 and
    /// [`MAX_INITIAL_CAPACITY`]
    #[inline]
    pub fn capacity(&self) -> usize {
        table_capacity(self.initial_capacity)
    }

    #[inline]
    pub(crate) fn cutover(&self) -> usize {
        self.list_to_hash_cutover.max(1)
    }

    #[inline]
    pub(crate) fn collisions(&self) -> usize {
        self.max_bucket_collisions.max(1)
    }
}

/// Round a requested slot count to a usable table size
#[inline]
pub(crate) fn table_capacity(requested: usize) -> usize {
    requested.clamp(2, MAX_INITIAL_CAPACITY).next_power_of_two()
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ContainerConfig::default();
        assert_eq!(config.capacity(), 64);
        assert_eq!(config.cutover(), LIST_TO_HASH_CUTOVER);
        assert_eq!(config.collisions(), MAX_BUCKET_COLLISIONS);
    }

    #[test]
    fn test_capacity_rounds_to_power_of_two() {
        assert_eq!(ContainerConfig::new().initial_capacity(0).capacity(), 2);
        assert_eq!(ContainerConfig::new().initial_capacity(100).capacity(), 128);
        assert_eq!(ContainerConfig::new().initial_capacity(128).capacity(), 128);
    }

    #[test]
    fn test_huge_capacity_is_clamped() {
        let config = ContainerConfig::new().initial_capacity(usize::MAX);
        assert_eq!(config.capacity(), MAX_INITIAL_CAPACITY);
        assert_eq!(table_capacity(usize::MAX / 2 + 2), MAX_INITIAL_CAPACITY);
    }
}
