//! Per-parent counters for child id allocation.

use crate::error::{ResultExt, StoreResult};
use crate::schema::columns;
use devicestore_storage::{Cell, TableHandle};

/// Direction a counter moves on each allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterPolicy {
    /// Seeded at `i64::MAX`, stepped by -1. Newer children sort first.
    Descending,
    /// Seeded at 0, stepped by +1. Children sort in insertion order.
    Ascending,
}

impl CounterPolicy {
    /// Initial counter value written when the parent is created.
    #[must_use]
    pub const fn seed(self) -> i64 {
        match self {
            Self::Descending => i64::MAX,
            Self::Ascending => 0,
        }
    }

    /// Increment applied on each allocation.
    #[must_use]
    pub const fn step(self) -> i64 {
        match self {
            Self::Descending => -1,
            Self::Ascending => 1,
        }
    }
}

/// A counter column on a parent's primary row.
///
/// Allocation is one atomic substrate increment, so concurrent callers
/// targeting the same parent always receive distinct values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterAllocator {
    column: &'static [u8],
    policy: CounterPolicy,
}

impl CounterAllocator {
    /// Zone ids under an area.
    pub const ZONES: Self = Self::descending(columns::ZONE_COUNTER);
    /// Assignment ids under an area.
    pub const ASSIGNMENTS: Self = Self::descending(columns::ASSIGNMENT_COUNTER);
    /// Command ids under a device type.
    pub const COMMANDS: Self = Self::descending(columns::COMMAND_COUNTER);
    /// Status ids under a device type.
    pub const STATUSES: Self = Self::descending(columns::STATUS_COUNTER);
    /// Element indexes under a group.
    pub const ELEMENTS: Self = Self::ascending(columns::ELEMENT_COUNTER);

    /// A counter seeded at `i64::MAX` that counts down.
    #[must_use]
    pub const fn descending(column: &'static [u8]) -> Self {
        Self {
            column,
            policy: CounterPolicy::Descending,
        }
    }

    /// A counter seeded at zero that counts up.
    #[must_use]
    pub const fn ascending(column: &'static [u8]) -> Self {
        Self {
            column,
            policy: CounterPolicy::Ascending,
        }
    }

    /// The counter column.
    #[must_use]
    pub const fn column(&self) -> &'static [u8] {
        self.column
    }

    /// The allocation policy.
    #[must_use]
    pub const fn policy(&self) -> CounterPolicy {
        self.policy
    }

    /// The cell that seeds this counter on a new parent row.
    #[must_use]
    pub fn seed(&self) -> Cell {
        Cell::new(self.column, self.policy.seed().to_be_bytes())
    }

    /// Allocates the next value on `parent_key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent row is unreachable or the counter
    /// column is corrupt.
    pub fn allocate(&self, table: &dyn TableHandle, parent_key: &[u8]) -> StoreResult<i64> {
        table
            .increment(parent_key, self.column, self.policy.step())
            .context("unable to allocate counter value")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devicestore_storage::{MemorySubstrate, Substrate};
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn table() -> Box<dyn TableHandle> {
        let substrate = MemorySubstrate::new();
        substrate.ensure_table("t", "areas").unwrap();
        substrate.open_table("t", "areas").unwrap()
    }

    #[test]
    fn descending_counts_down_from_max() {
        let table = table();
        table.put(b"area", vec![CounterAllocator::ZONES.seed()]).unwrap();
        assert_eq!(CounterAllocator::ZONES.allocate(table.as_ref(), b"area").unwrap(), i64::MAX - 1);
        assert_eq!(CounterAllocator::ZONES.allocate(table.as_ref(), b"area").unwrap(), i64::MAX - 2);
    }

    #[test]
    fn ascending_counts_up_from_zero() {
        let table = table();
        table.put(b"group", vec![CounterAllocator::ELEMENTS.seed()]).unwrap();
        let values: Vec<i64> = (0..3)
            .map(|_| CounterAllocator::ELEMENTS.allocate(table.as_ref(), b"group").unwrap())
            .collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn counters_are_independent_columns() {
        let table = table();
        table
            .put(
                b"area",
                vec![CounterAllocator::ZONES.seed(), CounterAllocator::ASSIGNMENTS.seed()],
            )
            .unwrap();
        CounterAllocator::ZONES.allocate(table.as_ref(), b"area").unwrap();
        CounterAllocator::ZONES.allocate(table.as_ref(), b"area").unwrap();
        assert_eq!(
            CounterAllocator::ASSIGNMENTS.allocate(table.as_ref(), b"area").unwrap(),
            i64::MAX - 1
        );
    }

    #[test]
    fn concurrent_allocations_are_distinct() {
        let table: Arc<dyn TableHandle> = Arc::from(table());
        table.put(b"area", vec![CounterAllocator::ZONES.seed()]).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = Arc::clone(&table);
                thread::spawn(move || {
                    (0..50)
                        .map(|_| CounterAllocator::ZONES.allocate(table.as_ref(), b"area").unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(seen.insert(value), "duplicate value {value}");
            }
        }
        assert_eq!(seen.len(), 400);
        assert_eq!(seen.iter().min(), Some(&(i64::MAX - 400)));
    }
}
