//! In-memory substrate for testing and embedded use.

use crate::backend::{Cursor, Substrate, TableHandle};
use crate::error::{StorageError, StorageResult};
use crate::row::{Cell, Column, Row, Scan};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Resource counters exposed by [`MemorySubstrate`].
///
/// Tests use these to check that every handle and cursor acquired by an
/// operation is released again, including on failure paths.
#[derive(Debug, Default)]
pub struct SubstrateStats {
    open_handles: AtomicUsize,
    handles_opened: AtomicUsize,
    open_cursors: AtomicUsize,
}

impl SubstrateStats {
    /// Handles currently alive.
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    /// Handles opened since creation.
    pub fn handles_opened(&self) -> usize {
        self.handles_opened.load(Ordering::SeqCst)
    }

    /// Cursors currently alive.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct Faults {
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl Faults {
    fn check_read(&self) -> StorageResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable("injected read failure"));
        }
        Ok(())
    }

    fn check_write(&self) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable("injected write failure"));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryTable {
    rows: RwLock<BTreeMap<Vec<u8>, Row>>,
}

/// An in-memory substrate.
///
/// Rows of every table live in a `BTreeMap`, so scans see keys in byte
/// order exactly like a sorted on-disk store would.
///
/// # Thread Safety
///
/// Each table is guarded by its own lock; a mutation holds the write lock
/// only for the single row it touches, which gives per-row atomicity.
///
/// # Example
///
/// ```rust
/// use devicestore_storage::{Cell, MemorySubstrate, Substrate};
///
/// let substrate = MemorySubstrate::new();
/// substrate.ensure_table("acme", "devices").unwrap();
/// let table = substrate.open_table("acme", "devices").unwrap();
/// table.put(b"k", vec![Cell::new(b"p".to_vec(), b"v".to_vec())]).unwrap();
/// assert!(table.get(b"k", &[]).unwrap().is_some());
/// ```
#[derive(Debug, Default)]
pub struct MemorySubstrate {
    tables: RwLock<HashMap<String, Arc<MemoryTable>>>,
    stats: Arc<SubstrateStats>,
    faults: Arc<Faults>,
}

impl MemorySubstrate {
    /// Creates an empty substrate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the resource counters.
    #[must_use]
    pub fn stats(&self) -> Arc<SubstrateStats> {
        Arc::clone(&self.stats)
    }

    /// Makes every subsequent read fail with `Unavailable`.
    pub fn set_fail_reads(&self, fail: bool) {
        self.faults.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent write fail with `Unavailable`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.faults.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of rows in a table, or `None` if it does not exist.
    #[must_use]
    pub fn row_count(&self, tenant: &str, name: &str) -> Option<usize> {
        self.tables
            .read()
            .get(&qualified_name(tenant, name))
            .map(|t| t.rows.read().len())
    }

    /// Returns every table name currently present.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }
}

fn qualified_name(tenant: &str, name: &str) -> String {
    format!("{tenant}:{name}")
}

impl Substrate for MemorySubstrate {
    fn ensure_table(&self, tenant: &str, name: &str) -> StorageResult<()> {
        self.tables
            .write()
            .entry(qualified_name(tenant, name))
            .or_default();
        Ok(())
    }

    fn open_table(&self, tenant: &str, name: &str) -> StorageResult<Box<dyn TableHandle>> {
        let qualified = qualified_name(tenant, name);
        let table = self
            .tables
            .read()
            .get(&qualified)
            .cloned()
            .ok_or_else(|| StorageError::table_not_found(qualified.clone()))?;

        self.stats.open_handles.fetch_add(1, Ordering::SeqCst);
        self.stats.handles_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryTableHandle {
            name: qualified,
            table,
            stats: Arc::clone(&self.stats),
            faults: Arc::clone(&self.faults),
        }))
    }
}

struct MemoryTableHandle {
    name: String,
    table: Arc<MemoryTable>,
    stats: Arc<SubstrateStats>,
    faults: Arc<Faults>,
}

impl Drop for MemoryTableHandle {
    fn drop(&mut self) {
        self.stats.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TableHandle for MemoryTableHandle {
    fn get(&self, key: &[u8], columns: &[Column]) -> StorageResult<Option<Row>> {
        self.faults.check_read()?;
        let rows = self.table.rows.read();
        Ok(rows.get(key).cloned().map(|row| row.project(columns)))
    }

    fn put(&self, key: &[u8], cells: Vec<Cell>) -> StorageResult<()> {
        self.faults.check_write()?;
        let mut rows = self.table.rows.write();
        let row = rows.entry(key.to_vec()).or_default();
        for cell in cells {
            row.insert(cell.column, cell.value);
        }
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> StorageResult<()> {
        self.faults.check_write()?;
        self.table.rows.write().remove(key);
        Ok(())
    }

    fn delete_columns(&self, key: &[u8], columns: &[Column]) -> StorageResult<()> {
        self.faults.check_write()?;
        let mut rows = self.table.rows.write();
        if let Some(row) = rows.get_mut(key) {
            for column in columns {
                row.remove(column);
            }
            if row.is_empty() {
                rows.remove(key);
            }
        }
        Ok(())
    }

    fn increment(&self, key: &[u8], column: &[u8], step: i64) -> StorageResult<i64> {
        self.faults.check_write()?;
        let mut rows = self.table.rows.write();
        let row = rows.entry(key.to_vec()).or_default();

        let current = match row.get(column) {
            None => 0,
            Some(bytes) => {
                let arr: [u8; 8] =
                    bytes
                        .try_into()
                        .map_err(|_| StorageError::InvalidCounter {
                            column: column.to_vec(),
                            len: bytes.len(),
                        })?;
                i64::from_be_bytes(arr)
            }
        };
        let next = current
            .checked_add(step)
            .ok_or_else(|| StorageError::CounterOverflow {
                column: column.to_vec(),
            })?;
        row.insert(column.to_vec(), next.to_be_bytes().to_vec());
        Ok(next)
    }

    fn scan(&self, scan: Scan) -> StorageResult<Cursor> {
        self.faults.check_read()?;
        let rows = self.table.rows.read();

        let upper = match &scan.stop {
            Some(stop) => Bound::Excluded(stop.clone()),
            None => Bound::Unbounded,
        };
        if let Some(stop) = &scan.stop {
            if stop.as_slice() <= scan.start.as_slice() {
                return Ok(self.cursor(Vec::new()));
            }
        }

        let matched: Vec<(Vec<u8>, Row)> = rows
            .range((Bound::Included(scan.start.clone()), upper))
            .filter(|(key, _)| scan.filter.as_ref().map_or(true, |f| f.matches(key)))
            .map(|(key, row)| (key.clone(), row.clone().project(&scan.columns)))
            .collect();
        tracing::trace!(table = %self.name, rows = matched.len(), "scan");

        Ok(self.cursor(matched))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl MemoryTableHandle {
    fn cursor(&self, rows: Vec<(Vec<u8>, Row)>) -> Cursor {
        self.stats.open_cursors.fetch_add(1, Ordering::SeqCst);
        Box::new(MemoryCursor {
            rows: rows.into_iter(),
            stats: Arc::clone(&self.stats),
            faults: Arc::clone(&self.faults),
        })
    }
}

struct MemoryCursor {
    rows: std::vec::IntoIter<(Vec<u8>, Row)>,
    stats: Arc<SubstrateStats>,
    faults: Arc<Faults>,
}

impl Iterator for MemoryCursor {
    type Item = StorageResult<(Vec<u8>, Row)>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Err(e) = self.faults.check_read() {
            return Some(Err(e));
        }
        self.rows.next().map(Ok)
    }
}

impl Drop for MemoryCursor {
    fn drop(&mut self) {
        self.stats.open_cursors.fetch_sub(1, Ordering::SeqCst);
    }
}
