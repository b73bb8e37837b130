//! Scoped acquisition of table handles.

use crate::schema::Table;
use devicestore_storage::{Cell, Column, Cursor, Row, Scan, StorageResult, Substrate, TableHandle};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A pool of open table handles.
///
/// Operations check a handle out with [`TablePool::checkout`] and get a
/// [`TableLease`] back; dropping the lease returns the handle on every exit
/// path, success or error. Up to `capacity` idle handles are kept per table;
/// extra handles are closed on return.
///
/// The idle-list lock is held only while moving a handle in or out of the
/// pool, never while the handle is in use.
pub struct TablePool {
    substrate: Arc<dyn Substrate>,
    tenant: String,
    prefix: String,
    capacity: usize,
    idle: Mutex<HashMap<Table, Vec<Box<dyn TableHandle>>>>,
    checked_out: AtomicUsize,
}

impl TablePool {
    /// Creates a pool over a substrate for one tenant.
    pub fn new(
        substrate: Arc<dyn Substrate>,
        tenant: impl Into<String>,
        prefix: impl Into<String>,
        capacity: usize,
    ) -> Self {
        Self {
            substrate,
            tenant: tenant.into(),
            prefix: prefix.into(),
            capacity,
            idle: Mutex::new(HashMap::new()),
            checked_out: AtomicUsize::new(0),
        }
    }

    /// Returns the tenant scope.
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Returns the substrate name of a table.
    pub fn table_name(&self, table: Table) -> String {
        format!("{}_{}", self.prefix, table.name())
    }

    /// Makes sure every table exists. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the substrate cannot create a table.
    pub fn ensure_tables(&self) -> StorageResult<()> {
        for table in Table::ALL {
            self.substrate
                .ensure_table(&self.tenant, &self.table_name(table))?;
        }
        Ok(())
    }

    /// Checks out a handle, opening a new one if none is idle.
    ///
    /// # Errors
    ///
    /// Returns an error if a new handle cannot be opened.
    pub fn checkout(&self, table: Table) -> StorageResult<TableLease<'_>> {
        let idle = self.idle.lock().get_mut(&table).and_then(Vec::pop);
        let handle = match idle {
            Some(handle) => handle,
            None => self
                .substrate
                .open_table(&self.tenant, &self.table_name(table))?,
        };
        self.checked_out.fetch_add(1, Ordering::SeqCst);
        Ok(TableLease {
            pool: self,
            table,
            handle: Some(handle),
        })
    }

    /// Number of leases currently alive.
    pub fn checked_out(&self) -> usize {
        self.checked_out.load(Ordering::SeqCst)
    }

    /// Number of idle handles across all tables.
    pub fn idle(&self) -> usize {
        self.idle.lock().values().map(Vec::len).sum()
    }

    fn release(&self, table: Table, handle: Box<dyn TableHandle>) {
        self.checked_out.fetch_sub(1, Ordering::SeqCst);
        let mut idle = self.idle.lock();
        let handles = idle.entry(table).or_default();
        if handles.len() < self.capacity {
            handles.push(handle);
        }
    }
}

impl fmt::Debug for TablePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TablePool")
            .field("tenant", &self.tenant)
            .field("prefix", &self.prefix)
            .field("capacity", &self.capacity)
            .field("checked_out", &self.checked_out())
            .finish_non_exhaustive()
    }
}

/// A checked-out table handle, returned to its pool on drop.
pub struct TableLease<'a> {
    pool: &'a TablePool,
    table: Table,
    handle: Option<Box<dyn TableHandle>>,
}

impl TableLease<'_> {
    /// The table this lease is for.
    pub fn table(&self) -> Table {
        self.table
    }
}

impl Deref for TableLease<'_> {
    type Target = dyn TableHandle;

    fn deref(&self) -> &Self::Target {
        match &self.handle {
            Some(handle) => handle.as_ref(),
            // handle is only taken in drop
            None => unreachable!("lease used after release"),
        }
    }
}

// Lets a `&TableLease` stand in wherever a `&dyn TableHandle` is expected.
impl TableHandle for TableLease<'_> {
    fn get(&self, key: &[u8], columns: &[Column]) -> StorageResult<Option<Row>> {
        (**self).get(key, columns)
    }

    fn put(&self, key: &[u8], cells: Vec<Cell>) -> StorageResult<()> {
        (**self).put(key, cells)
    }

    fn delete(&self, key: &[u8]) -> StorageResult<()> {
        (**self).delete(key)
    }

    fn delete_columns(&self, key: &[u8], columns: &[Column]) -> StorageResult<()> {
        (**self).delete_columns(key, columns)
    }

    fn increment(&self, key: &[u8], column: &[u8], step: i64) -> StorageResult<i64> {
        (**self).increment(key, column, step)
    }

    fn scan(&self, scan: Scan) -> StorageResult<Cursor> {
        (**self).scan(scan)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl Drop for TableLease<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.pool.release(self.table, handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devicestore_storage::{Cell, MemorySubstrate, StorageError};

    fn pool(capacity: usize) -> (Arc<MemorySubstrate>, TablePool) {
        let substrate = Arc::new(MemorySubstrate::new());
        let pool = TablePool::new(
            Arc::clone(&substrate) as Arc<dyn Substrate>,
            "t1",
            "dm",
            capacity,
        );
        pool.ensure_tables().unwrap();
        (substrate, pool)
    }

    #[test]
    fn ensure_tables_creates_prefixed_tables() {
        let (substrate, pool) = pool(2);
        assert_eq!(substrate.table_names().len(), Table::ALL.len());
        assert_eq!(pool.table_name(Table::Areas), "dm_areas");
        assert!(substrate.row_count("t1", "dm_areas").is_some());
    }

    #[test]
    fn lease_returns_handle_on_drop() {
        let (substrate, pool) = pool(2);
        {
            let lease = pool.checkout(Table::Devices).unwrap();
            lease
                .put(b"k", vec![Cell::new(b"p".to_vec(), b"v".to_vec())])
                .unwrap();
            assert_eq!(pool.checked_out(), 1);
        }
        assert_eq!(pool.checked_out(), 0);
        assert_eq!(pool.idle(), 1);

        // reuse does not open a new handle
        let _lease = pool.checkout(Table::Devices).unwrap();
        assert_eq!(substrate.stats().handles_opened(), 1);
    }

    #[test]
    fn lease_released_on_error_path() {
        let (substrate, pool) = pool(2);
        let result: StorageResult<()> = (|| {
            let lease = pool.checkout(Table::Devices)?;
            substrate.set_fail_writes(true);
            lease.put(b"k", vec![Cell::new(b"p".to_vec(), b"v".to_vec())])?;
            Ok(())
        })();
        substrate.set_fail_writes(false);

        assert!(matches!(result, Err(StorageError::Unavailable { .. })));
        assert_eq!(pool.checked_out(), 0);
    }

    fn write_through(table: &dyn TableHandle) -> StorageResult<i64> {
        table.put(b"row", vec![Cell::new(b"p".to_vec(), b"v".to_vec())])?;
        table.increment(b"row", b"c", 5)
    }

    #[test]
    fn lease_is_a_table_handle() {
        let (_, pool) = pool(1);
        let lease = pool.checkout(Table::Groups).unwrap();
        assert_eq!(write_through(&lease).unwrap(), 5);
        assert_eq!(lease.name(), "t1:dm_groups");
        let row = TableHandle::get(&lease, b"row", &[]).unwrap().unwrap();
        assert_eq!(row.get(b"p"), Some(&b"v"[..]));
        assert_eq!(lease.scan(Scan::all()).unwrap().count(), 1);
    }

    #[test]
    fn excess_handles_are_closed() {
        let (substrate, pool) = pool(1);
        let a = pool.checkout(Table::Areas).unwrap();
        let b = pool.checkout(Table::Areas).unwrap();
        assert_eq!(substrate.stats().open_handles(), 2);
        drop(a);
        drop(b);
        assert_eq!(pool.idle(), 1);
        assert_eq!(substrate.stats().open_handles(), 1);
    }
}
