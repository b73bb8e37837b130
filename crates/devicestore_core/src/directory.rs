//! Token directory: external tokens to internal key fragments.
//!
//! Each family owns a namespace in the `uids` table:
//!
//! ```text
//! [0x00][ns][token]     v = fragment     forward lookup
//! [0x01][ns][fragment]  v = token        reverse lookup
//! [0x02][ns]            c = counter      id allocation
//! ```
//!
//! Forward and reverse rows are written when an entity is created and
//! removed only when it is force-deleted.

use crate::error::{ResultExt, StoreResult};
use crate::pool::TablePool;
use crate::schema::{columns, Table};
use devicestore_storage::Cell;
use std::sync::Arc;
use uuid::Uuid;

const FORWARD: u8 = 0x00;
const REVERSE: u8 = 0x01;
const COUNTER: u8 = 0x02;

/// Mints a random token.
#[must_use]
pub fn new_token() -> String {
    Uuid::new_v4().to_string()
}

/// Directory namespaces, one per tokenized family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum IdNamespace {
    /// Area types (counter keyed).
    AreaType = 0x01,
    /// Areas (counter keyed).
    Area = 0x02,
    /// Zones (row-key fragments).
    Zone = 0x03,
    /// Device types (counter keyed).
    DeviceType = 0x04,
    /// Device commands (row-key fragments).
    DeviceCommand = 0x05,
    /// Device statuses (row-key fragments).
    DeviceStatus = 0x06,
    /// Devices (counter keyed).
    Device = 0x07,
    /// Assignments (row-key fragments).
    DeviceAssignment = 0x08,
    /// Groups (counter keyed).
    DeviceGroup = 0x09,
    /// Streams (row-key fragments).
    DeviceStream = 0x0a,
}

/// Durable mapping between tokens and internal identifiers.
///
/// A directory either maps tokens to opaque row-key fragments, or to
/// 64-bit ids minted from its own counter with
/// [`next_counter_value`](IdDirectory::next_counter_value). An absent
/// mapping is a normal outcome, reported as `None`.
#[derive(Debug, Clone)]
pub struct IdDirectory {
    namespace: IdNamespace,
    pool: Arc<TablePool>,
}

impl IdDirectory {
    /// Creates a directory for one namespace.
    pub fn new(namespace: IdNamespace, pool: Arc<TablePool>) -> Self {
        Self { namespace, pool }
    }

    /// The namespace this directory writes to.
    pub fn namespace(&self) -> IdNamespace {
        self.namespace
    }

    fn row_key(&self, kind: u8, suffix: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(2 + suffix.len());
        key.push(kind);
        key.push(self.namespace as u8);
        key.extend_from_slice(suffix);
        key
    }

    /// Maps `token` to `fragment`, replacing any previous mapping.
    ///
    /// # Errors
    ///
    /// Returns an error if the substrate cannot be reached.
    pub fn create(&self, token: &str, fragment: &[u8]) -> StoreResult<()> {
        let table = self
            .pool
            .checkout(Table::Uids)
            .context("unable to open token directory")?;
        table
            .put(
                &self.row_key(FORWARD, token.as_bytes()),
                vec![Cell::new(columns::VALUE, fragment)],
            )
            .with_context(|| format!("unable to map token {token}"))?;
        table
            .put(
                &self.row_key(REVERSE, fragment),
                vec![Cell::new(columns::VALUE, token.as_bytes())],
            )
            .with_context(|| format!("unable to map token {token}"))?;
        Ok(())
    }

    /// Mints a fresh UUID token mapped to `fragment`.
    ///
    /// # Errors
    ///
    /// Returns an error if the substrate cannot be reached.
    pub fn create_unique_id(&self, fragment: &[u8]) -> StoreResult<String> {
        let token = new_token();
        self.create(&token, fragment)?;
        Ok(token)
    }

    /// Resolves a token, returning `None` if it is not mapped.
    ///
    /// # Errors
    ///
    /// Returns an error if the substrate cannot be reached.
    pub fn get_value(&self, token: &str) -> StoreResult<Option<Vec<u8>>> {
        let table = self
            .pool
            .checkout(Table::Uids)
            .context("unable to open token directory")?;
        let row = table
            .get(&self.row_key(FORWARD, token.as_bytes()), &[])
            .with_context(|| format!("unable to resolve token {token}"))?;
        Ok(row.and_then(|r| r.get(columns::VALUE).map(<[u8]>::to_vec)))
    }

    /// Returns true if the token is mapped.
    ///
    /// # Errors
    ///
    /// Returns an error if the substrate cannot be reached.
    pub fn exists(&self, token: &str) -> StoreResult<bool> {
        Ok(self.get_value(token)?.is_some())
    }

    /// Finds the token mapped to `fragment`.
    ///
    /// # Errors
    ///
    /// Returns an error if the substrate cannot be reached.
    pub fn get_token(&self, fragment: &[u8]) -> StoreResult<Option<String>> {
        let table = self
            .pool
            .checkout(Table::Uids)
            .context("unable to open token directory")?;
        let row = table
            .get(&self.row_key(REVERSE, fragment), &[])
            .context("unable to resolve reverse token mapping")?;
        Ok(row
            .and_then(|r| r.get(columns::VALUE).map(<[u8]>::to_vec))
            .and_then(|bytes| String::from_utf8(bytes).ok()))
    }

    /// Removes the forward and reverse mappings of a token.
    ///
    /// Returns the fragment the token mapped to, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the substrate cannot be reached.
    pub fn delete(&self, token: &str) -> StoreResult<Option<Vec<u8>>> {
        let fragment = self.get_value(token)?;
        let table = self
            .pool
            .checkout(Table::Uids)
            .context("unable to open token directory")?;
        table
            .delete(&self.row_key(FORWARD, token.as_bytes()))
            .with_context(|| format!("unable to remove token {token}"))?;
        if let Some(fragment) = &fragment {
            table
                .delete(&self.row_key(REVERSE, fragment))
                .with_context(|| format!("unable to remove reverse mapping for {token}"))?;
        }
        Ok(fragment)
    }

    /// Allocates the next internal id from this namespace's counter.
    ///
    /// # Errors
    ///
    /// Returns an error if the substrate cannot be reached.
    pub fn next_counter_value(&self) -> StoreResult<i64> {
        let table = self
            .pool
            .checkout(Table::Uids)
            .context("unable to open token directory")?;
        table
            .increment(&self.row_key(COUNTER, &[]), columns::COUNTER, 1)
            .context("unable to allocate internal id")
    }

    /// Maps `token` to an internal id.
    ///
    /// # Errors
    ///
    /// Returns an error if the substrate cannot be reached.
    pub fn create_id(&self, token: &str, id: i64) -> StoreResult<()> {
        self.create(token, &id.to_be_bytes())
    }

    /// Resolves a token to an internal id.
    ///
    /// Returns `None` if the token is unmapped or maps to something other
    /// than an id.
    ///
    /// # Errors
    ///
    /// Returns an error if the substrate cannot be reached.
    pub fn get_id(&self, token: &str) -> StoreResult<Option<i64>> {
        Ok(self
            .get_value(token)?
            .and_then(|bytes| <[u8; 8]>::try_from(bytes.as_slice()).ok())
            .map(i64::from_be_bytes))
    }

    /// Finds the token mapped to an internal id.
    ///
    /// # Errors
    ///
    /// Returns an error if the substrate cannot be reached.
    pub fn get_token_for_id(&self, id: i64) -> StoreResult<Option<String>> {
        self.get_token(&id.to_be_bytes())
    }
}

/// One directory per tokenized family.
#[derive(Debug, Clone)]
pub struct IdDirectories {
    /// Area types.
    pub area_types: IdDirectory,
    /// Areas.
    pub areas: IdDirectory,
    /// Zones.
    pub zones: IdDirectory,
    /// Device types.
    pub device_types: IdDirectory,
    /// Device commands.
    pub commands: IdDirectory,
    /// Device statuses.
    pub statuses: IdDirectory,
    /// Devices.
    pub devices: IdDirectory,
    /// Device assignments.
    pub assignments: IdDirectory,
    /// Device groups.
    pub groups: IdDirectory,
    /// Device streams.
    pub streams: IdDirectory,
}

impl IdDirectories {
    /// Creates every directory over the same pool.
    pub fn new(pool: &Arc<TablePool>) -> Self {
        let dir = |ns| IdDirectory::new(ns, Arc::clone(pool));
        Self {
            area_types: dir(IdNamespace::AreaType),
            areas: dir(IdNamespace::Area),
            zones: dir(IdNamespace::Zone),
            device_types: dir(IdNamespace::DeviceType),
            commands: dir(IdNamespace::DeviceCommand),
            statuses: dir(IdNamespace::DeviceStatus),
            devices: dir(IdNamespace::Device),
            assignments: dir(IdNamespace::DeviceAssignment),
            groups: dir(IdNamespace::DeviceGroup),
            streams: dir(IdNamespace::DeviceStream),
        }
    }
}
