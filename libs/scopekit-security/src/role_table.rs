use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::role::RoleHierarchy;

/// Process-wide role table handle.
///
/// Loaded once at startup and shared by reference. A request takes one
/// [`snapshot`](Self::snapshot) and uses it for its whole lifetime; an
/// administrative reload replaces the whole table in one atomic swap, so no
/// request ever observes a partially updated table.
pub struct RoleTable {
    current: ArcSwap<RoleHierarchy>,
}

impl RoleTable {
    #[must_use]
    pub fn new(hierarchy: RoleHierarchy) -> Self {
        Self {
            current: ArcSwap::from_pointee(hierarchy),
        }
    }

    #[must_use]
    pub fn builtin() -> Self {
        Self::new(RoleHierarchy::builtin())
    }

    /// Current table. Cheap (`Arc` clone, lock-free).
    #[must_use]
    pub fn snapshot(&self) -> Arc<RoleHierarchy> {
        self.current.load_full()
    }

    /// Atomically replace the whole table, returning the previous one.
    pub fn replace(&self, hierarchy: RoleHierarchy) -> Arc<RoleHierarchy> {
        self.current.swap(Arc::new(hierarchy))
    }
}

impl Default for RoleTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for RoleTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleTable").finish_non_exhaustive()
    }
}
