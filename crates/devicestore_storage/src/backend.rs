//! Substrate and table handle traits.

use crate::error::StorageResult;
use crate::row::{Cell, Column, Row, Scan};

/// A cursor over the rows produced by a [`Scan`].
///
/// Cursors hold substrate resources. Dropping the cursor releases them,
/// whether iteration finished or was abandoned part way.
pub type Cursor = Box<dyn Iterator<Item = StorageResult<(Vec<u8>, Row)>> + Send>;

/// Access to a sorted, column-family key-value substrate.
///
/// Tables are scoped by tenant. The substrate is an **opaque dependency**:
/// it knows nothing about entities, row-key layouts or payload encodings.
///
/// # Invariants
///
/// - `ensure_table` is idempotent
/// - `open_table` fails with `TableNotFound` for tables never ensured
/// - Implementations must be `Send + Sync` for concurrent access
pub trait Substrate: Send + Sync {
    /// Creates the table if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the substrate cannot be reached.
    fn ensure_table(&self, tenant: &str, name: &str) -> StorageResult<()>;

    /// Opens a handle to an existing table.
    ///
    /// # Errors
    ///
    /// Returns `TableNotFound` if the table does not exist, or an
    /// I/O error if the substrate cannot be reached.
    fn open_table(&self, tenant: &str, name: &str) -> StorageResult<Box<dyn TableHandle>>;
}

/// A handle to one table.
///
/// Every mutation targets exactly one row and is applied atomically per row.
/// `increment` is the only read-modify-write primitive.
pub trait TableHandle: Send + Sync {
    /// Reads a row, returning only the requested columns (all columns if
    /// `columns` is empty). Returns `None` if the row does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the substrate cannot be reached.
    fn get(&self, key: &[u8], columns: &[Column]) -> StorageResult<Option<Row>>;

    /// Writes the given cells into a row, creating the row if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the substrate cannot be reached.
    fn put(&self, key: &[u8], cells: Vec<Cell>) -> StorageResult<()>;

    /// Removes an entire row. Removing a missing row is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the substrate cannot be reached.
    fn delete(&self, key: &[u8]) -> StorageResult<()>;

    /// Removes individual columns from a row.
    ///
    /// # Errors
    ///
    /// Returns an error if the substrate cannot be reached.
    fn delete_columns(&self, key: &[u8], columns: &[Column]) -> StorageResult<()>;

    /// Atomically adds `step` to an 8-byte big-endian counter column and
    /// returns the new value. A missing column counts as zero.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCounter` if the column holds a non-counter value,
    /// `CounterOverflow` if the addition overflows, or an I/O error.
    fn increment(&self, key: &[u8], column: &[u8], step: i64) -> StorageResult<i64>;

    /// Starts a range scan.
    ///
    /// # Errors
    ///
    /// Returns an error if the substrate cannot be reached.
    fn scan(&self, scan: Scan) -> StorageResult<Cursor>;

    /// Returns the fully qualified table name.
    fn name(&self) -> &str;
}
