//! Per-group lock registry for the enrollment protocol.
//!
//! # Responsibility
//! - Hand out one gate per group id so enroll/withdraw on the same group
//!   serialize while different groups proceed independently.
//!
//! # Invariants
//! - The registry mutex is held only to clone a gate handle, never across
//!   the enrollment protocol; it is not a global protocol lock.
//! - A group's gate is stable: every caller asking for the same group gets
//!   the same gate.

use crate::model::GroupId;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Registry of per-group gates, shared across all ledger handles of one
/// process via `Arc`.
#[derive(Default)]
pub struct GroupLockRegistry {
    gates: Mutex<BTreeMap<GroupId, Arc<Mutex<()>>>>,
}

impl GroupLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the gate for one group, creating it on first use.
    pub fn gate(&self, group_id: GroupId) -> Arc<Mutex<()>> {
        let mut gates = recover(self.gates.lock());
        gates
            .entry(group_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Gates guard no data of their own; a poisoned one is still usable.
pub(crate) fn recover<'a, T>(
    result: Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>,
) -> MutexGuard<'a, T> {
    result.unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::GroupLockRegistry;
    use std::sync::Arc;
    use uuid::Uuid;

    #[test]
    fn same_group_returns_the_same_gate() {
        let registry = GroupLockRegistry::new();
        let group_id = Uuid::new_v4();

        let first = registry.gate(group_id);
        let second = registry.gate(group_id);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn different_groups_get_independent_gates() {
        let registry = GroupLockRegistry::new();
        let gate_a = registry.gate(Uuid::new_v4());
        let gate_b = registry.gate(Uuid::new_v4());
        assert!(!Arc::ptr_eq(&gate_a, &gate_b));

        let _held_a = gate_a.lock().unwrap();
        // Holding one group's gate must not block another group's.
        let held_b = gate_b.try_lock();
        assert!(held_b.is_ok());
    }
}
