//! Entity stores, one per family.
//!
//! Every store borrows a [`StoreContext`] and follows the same protocol:
//! resolve tokens through the family's [`IdDirectory`], build row keys
//! with [`keys`](crate::keys), allocate child ids with a
//! [`CounterAllocator`](crate::CounterAllocator), and read or write a
//! single row through a pooled table lease.
//!
//! Soft delete writes the marker column and keeps both the row and the
//! token mapping. Force delete removes the row and the mapping; records
//! elsewhere that still reference the token are left as they are.

mod area;
mod area_type;
mod assignment;
mod command;
mod device;
mod device_type;
mod group;
mod group_element;
mod status;
mod stream;
mod zone;

pub use area::{AreaSearchCriteria, AreaStore};
pub use area_type::AreaTypeStore;
pub use assignment::{AssignmentSearchCriteria, DeviceAssignmentStore};
pub use command::{CommandSearchCriteria, DeviceCommandStore};
pub use device::{DeviceSearchCriteria, DeviceStore};
pub use device_type::DeviceTypeStore;
pub use group::{DeviceGroupStore, GroupSearchCriteria};
pub use group_element::DeviceGroupElementStore;
pub use status::{DeviceStatusStore, StatusSearchCriteria};
pub use stream::{DeviceStreamStore, StreamSearchCriteria};
pub use zone::{ZoneSearchCriteria, ZoneStore};

use crate::context::StoreContext;
use crate::directory::{new_token, IdDirectory};
use crate::error::{Precondition, ResultExt, StoreError, StoreResult};
use crate::model::PersistentEntity;
use crate::paging::{Pager, SearchCriteria, SearchResults};
use crate::schema::{columns, DELETED_MARKER};
use crate::types::EntityFamily;
use devicestore_codec::{decode_entity, encode_entity};
use devicestore_storage::{Cell, Row, Scan, TableHandle};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// The create/get/update/list/delete contract shared by entity families.
pub trait EntityStore {
    /// The persisted entity.
    type Entity;
    /// Create and update request.
    type Request;
    /// List criteria.
    type Criteria;

    /// The family, used to scope errors.
    const FAMILY: EntityFamily;

    /// Validates the request, allocates keys and writes the new row.
    ///
    /// # Errors
    ///
    /// Returns a precondition error for invalid requests, `InvalidToken`
    /// when a referenced parent does not resolve, or a substrate error.
    fn create(&self, request: &Self::Request) -> StoreResult<Self::Entity>;

    /// Loads an entity. An unknown token is `None`, not an error.
    ///
    /// # Errors
    ///
    /// Returns a codec or substrate error.
    fn get_by_token(&self, token: &str) -> StoreResult<Option<Self::Entity>>;

    /// Applies an update and rewrites the payload at the unchanged key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the token does not resolve.
    fn update(&self, token: &str, request: &Self::Request) -> StoreResult<Self::Entity>;

    /// Scans for matching entities, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns a codec or substrate error; a row that cannot be decoded
    /// fails the whole listing.
    fn list(
        &self,
        criteria: &Self::Criteria,
        include_deleted: bool,
    ) -> StoreResult<SearchResults<Self::Entity>>;

    /// Soft or force deletes an entity, returning its pre-delete state.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the token does not resolve.
    fn delete(&self, token: &str, force: bool) -> StoreResult<Self::Entity>;

    /// Loads an entity, treating an unknown token as an error.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the token does not resolve.
    fn require(&self, token: &str) -> StoreResult<Self::Entity> {
        self.get_by_token(token)?
            .ok_or_else(|| StoreError::invalid_token(Self::FAMILY, token))
    }
}

/// Payload type and body cells for an entity.
pub(crate) fn payload_cells<T: Serialize>(ctx: &StoreContext, entity: &T) -> StoreResult<Vec<Cell>> {
    let (indicator, body) = encode_entity(ctx.resolver(), entity)?;
    Ok(vec![
        Cell::new(columns::PAYLOAD_TYPE, indicator),
        Cell::new(columns::PAYLOAD, body),
    ])
}

/// Decodes a row's payload with the marshaler its type column names.
pub(crate) fn decode_payload<T: DeserializeOwned>(
    ctx: &StoreContext,
    family: EntityFamily,
    row: &Row,
) -> StoreResult<T> {
    let indicator = row
        .get(columns::PAYLOAD_TYPE)
        .ok_or_else(|| StoreError::corrupt_row(family, "missing payload type"))?;
    let body = row
        .get(columns::PAYLOAD)
        .ok_or_else(|| StoreError::corrupt_row(family, "missing payload"))?;
    Ok(decode_entity(ctx.resolver(), indicator, body)?)
}

/// Decodes an entity row, taking the deleted flag from the marker column.
pub(crate) fn decode_row<T: DeserializeOwned + PersistentEntity>(
    ctx: &StoreContext,
    family: EntityFamily,
    row: &Row,
) -> StoreResult<T> {
    let mut entity: T = decode_payload(ctx, family, row)?;
    entity.set_deleted(row.contains(columns::DELETED));
    Ok(entity)
}

/// Reads and decodes the entity at `key`.
pub(crate) fn read_entity<T: DeserializeOwned + PersistentEntity>(
    ctx: &StoreContext,
    table: &dyn TableHandle,
    family: EntityFamily,
    key: &[u8],
) -> StoreResult<Option<T>> {
    let row = table
        .get(key, &[])
        .with_context(|| format!("unable to load {family}"))?;
    row.map(|row| decode_row(ctx, family, &row)).transpose()
}

/// Scans `scan`, paging every row `select` keeps.
///
/// The cursor is dropped on every return path, including a failing
/// `select` part way through the scan.
pub(crate) fn collect_page<T, F>(
    table: &dyn TableHandle,
    scan: Scan,
    criteria: &SearchCriteria,
    family: EntityFamily,
    mut select: F,
) -> StoreResult<SearchResults<T>>
where
    F: FnMut(&[u8], &Row) -> StoreResult<Option<T>>,
{
    let cursor = table
        .scan(scan)
        .with_context(|| format!("unable to scan {family} rows"))?;
    let mut pager = Pager::new(criteria);
    for item in cursor {
        let (key, row) = item.with_context(|| format!("unable to scan {family} rows"))?;
        if let Some(entity) = select(&key, &row)? {
            pager.process(entity);
        }
    }
    Ok(pager.finish())
}

/// Lists decoded entities, dropping soft-deleted rows unless asked and
/// applying the criteria's date range to the created date.
pub(crate) fn list_entities<T, F>(
    ctx: &StoreContext,
    table: &dyn TableHandle,
    family: EntityFamily,
    scan: Scan,
    criteria: &SearchCriteria,
    include_deleted: bool,
    mut accept: F,
) -> StoreResult<SearchResults<T>>
where
    T: DeserializeOwned + PersistentEntity,
    F: FnMut(&Row, &T) -> bool,
{
    collect_page(table, scan, criteria, family, |_, row| {
        let entity: T = decode_row(ctx, family, row)?;
        let keep = (include_deleted || !entity.is_deleted())
            && criteria.matches_date(Some(entity.created_date()))
            && accept(row, &entity);
        Ok(keep.then_some(entity))
    })
}

/// Writes the soft-delete marker.
pub(crate) fn mark_deleted(table: &dyn TableHandle, family: EntityFamily, key: &[u8]) -> StoreResult<()> {
    table
        .put(key, vec![Cell::new(columns::DELETED, vec![DELETED_MARKER])])
        .with_context(|| format!("unable to delete {family}"))
}

/// Removes the row and the token mapping.
pub(crate) fn remove_entity(
    table: &dyn TableHandle,
    directory: &IdDirectory,
    family: EntityFamily,
    key: &[u8],
    token: &str,
) -> StoreResult<()> {
    table
        .delete(key)
        .with_context(|| format!("unable to delete {family}"))?;
    directory.delete(token)?;
    Ok(())
}

/// Picks the caller's token or mints one, rejecting tokens already in use.
pub(crate) fn claim_token(
    directory: &IdDirectory,
    family: EntityFamily,
    requested: Option<&String>,
) -> StoreResult<String> {
    match requested {
        Some(token) => {
            ensure_token_free(directory, family, token)?;
            Ok(token.clone())
        }
        None => Ok(new_token()),
    }
}

/// Rejects a token that is already mapped.
pub(crate) fn ensure_token_free(
    directory: &IdDirectory,
    family: EntityFamily,
    token: &str,
) -> StoreResult<()> {
    if directory.exists(token)? {
        return Err(Precondition::DuplicateToken {
            family,
            token: token.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Maps a child token to its row key: the caller's token when given,
/// otherwise a minted one.
pub(crate) fn map_child_token(
    directory: &IdDirectory,
    requested: Option<&String>,
    key: &[u8],
) -> StoreResult<String> {
    match requested {
        Some(token) => {
            directory.create(token, key)?;
            Ok(token.clone())
        }
        None => directory.create_unique_id(key),
    }
}

/// Resolves a counter-keyed token, failing with `InvalidToken`.
pub(crate) fn resolve_id(directory: &IdDirectory, family: EntityFamily, token: &str) -> StoreResult<i64> {
    directory
        .get_id(token)?
        .ok_or_else(|| StoreError::invalid_token(family, token))
}

/// Resolves a fragment-keyed token, failing with `InvalidToken`.
pub(crate) fn resolve_key(
    directory: &IdDirectory,
    family: EntityFamily,
    token: &str,
) -> StoreResult<Vec<u8>> {
    directory
        .get_value(token)?
        .ok_or_else(|| StoreError::invalid_token(family, token))
}

/// Undoes a token mapping after the row write failed.
pub(crate) fn release_on_error<T>(
    directory: &IdDirectory,
    family: EntityFamily,
    token: &str,
    result: StoreResult<T>,
) -> StoreResult<T> {
    if result.is_err() {
        if let Err(e) = directory.delete(token) {
            tracing::warn!(%family, token, error = %e, "unable to release token after failed write");
        }
    }
    result
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::config::StoreConfig;
    use crate::context::StoreContext;
    use devicestore_storage::{MemorySubstrate, Substrate};
    use std::sync::Arc;

    pub(crate) fn context() -> (Arc<MemorySubstrate>, StoreContext) {
        let substrate = Arc::new(MemorySubstrate::new());
        let ctx = StoreContext::open(
            Arc::clone(&substrate) as Arc<dyn Substrate>,
            StoreConfig::new().tenant("test"),
        )
        .unwrap();
        (substrate, ctx)
    }

    pub(crate) fn rows(substrate: &MemorySubstrate, table: &str) -> usize {
        substrate
            .row_count("test", &format!("dm_{table}"))
            .unwrap_or_default()
    }
}
