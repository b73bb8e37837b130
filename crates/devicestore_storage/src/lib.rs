//! # DeviceStore Storage
//!
//! The sorted, column-family key-value substrate that DeviceStore is built on.
//!
//! The substrate is deliberately small: point reads and writes of single
//! rows, whole-row and per-column deletes, an atomic per-column counter
//! increment, and byte-ordered range scans with simple key filters.
//! Everything above that (row-key layouts, secondary lookups,
//! id allocation, soft deletes) is owned by `devicestore_core`.
//!
//! ## Design Principles
//!
//! - Row keys and values are opaque byte strings
//! - Keys sort lexicographically; ordering is the only index
//! - Every mutation is atomic for the single row it targets
//! - Tables are scoped by tenant
//!
//! ## Available Substrates
//!
//! - [`MemorySubstrate`] - Thread-safe in-memory tables, for tests and embedding
//!
//! ## Example
//!
//! ```rust
//! use devicestore_storage::{MemorySubstrate, Scan, Substrate};
//!
//! let substrate = MemorySubstrate::new();
//! substrate.ensure_table("acme", "counters").unwrap();
//! let table = substrate.open_table("acme", "counters").unwrap();
//! assert_eq!(table.increment(b"row", b"c", 1).unwrap(), 1);
//! assert_eq!(table.scan(Scan::all()).unwrap().count(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod memory;
mod row;

pub use backend::{Cursor, Substrate, TableHandle};
pub use error::{StorageError, StorageResult};
pub use memory::{MemorySubstrate, SubstrateStats};
pub use row::{Cell, Column, Row, RowFilter, Scan};
