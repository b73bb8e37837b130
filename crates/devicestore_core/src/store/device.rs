//! Device persistence.
//!
//! Besides its payload, a device row carries assignment side columns:
//!
//! - `ca` holds the token of the active assignment, if any
//! - `h` + `(i64::MAX - active_date)` + assignment key holds the token of
//!   every assignment the device ever had, newest first

use super::{
    claim_token, collect_page, decode_row, mark_deleted, payload_cells, release_on_error,
    remove_entity, resolve_id, EntityStore,
};
use crate::context::StoreContext;
use crate::error::{Precondition, ResultExt, StoreError, StoreResult};
use crate::keys;
use crate::logic;
use crate::model::{Device, DeviceRequest};
use crate::paging::{SearchCriteria, SearchResults};
use crate::schema::{columns, DeviceRecord, Table};
use crate::types::{now_millis, EntityFamily};
use devicestore_storage::{Row, Scan};

/// Filters for listing devices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSearchCriteria {
    /// Only devices of this type.
    pub device_type_token: Option<String>,
    /// Skip devices with an active assignment.
    pub exclude_assigned: bool,
    /// Paging and created-date range.
    pub paging: SearchCriteria,
}

/// Devices, keyed by a directory-minted id.
#[derive(Debug, Clone, Copy)]
pub struct DeviceStore<'a> {
    ctx: &'a StoreContext,
}

/// Primary key of a device.
pub(crate) fn device_key(id: i64) -> Vec<u8> {
    keys::primary_key(&keys::scope(id), DeviceRecord::Device)
}

/// Resolves a device token to its row key.
pub(crate) fn resolve_device_key(ctx: &StoreContext, token: &str) -> StoreResult<Vec<u8>> {
    Ok(device_key(resolve_id(&ctx.directories().devices, EntityFamily::Device, token)?))
}

/// History column qualifier for an assignment, sorting newest first.
pub(crate) fn history_column(active_date: u64, assignment_key: &[u8]) -> Vec<u8> {
    let active = i64::try_from(active_date).unwrap_or(i64::MAX);
    let mut column = columns::ASSIGNMENT_HISTORY.to_vec();
    column.extend_from_slice(&(i64::MAX - active).to_be_bytes());
    column.extend_from_slice(assignment_key);
    column
}

/// The active assignment token stored on a device row.
pub(crate) fn current_assignment(row: &Row) -> Option<String> {
    row.get(columns::CURRENT_ASSIGNMENT)
        .and_then(|bytes| String::from_utf8(bytes.to_vec()).ok())
}

fn decode_device(ctx: &StoreContext, row: &Row) -> StoreResult<Device> {
    let mut device: Device = decode_row(ctx, EntityFamily::Device, row)?;
    device.active_assignment_token = current_assignment(row);
    Ok(device)
}

impl<'a> DeviceStore<'a> {
    /// Creates a store over a context.
    pub fn new(ctx: &'a StoreContext) -> Self {
        Self { ctx }
    }

    fn check_references(&self, request: &DeviceRequest) -> StoreResult<()> {
        let directories = self.ctx.directories();
        if let Some(device_type) = &request.device_type_token {
            resolve_id(&directories.device_types, EntityFamily::DeviceType, device_type)?;
        }
        if let Some(parent) = &request.parent_device_token {
            resolve_id(&directories.devices, EntityFamily::Device, parent)?;
        }
        Ok(())
    }

    fn load(&self, token: &str) -> StoreResult<(Vec<u8>, Device)> {
        let key = resolve_device_key(self.ctx, token)?;
        let table = self.ctx.table(Table::Devices)?;
        let row = table
            .get(&key, &[])
            .context("unable to load device")?
            .ok_or_else(|| StoreError::invalid_token(EntityFamily::Device, token))?;
        Ok((key, decode_device(self.ctx, &row)?))
    }

    /// Returns the token of the device's active assignment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the device does not resolve.
    pub fn active_assignment_token(&self, token: &str) -> StoreResult<Option<String>> {
        let key = resolve_device_key(self.ctx, token)?;
        let table = self.ctx.table(Table::Devices)?;
        let row = table
            .get(&key, &[columns::CURRENT_ASSIGNMENT.to_vec()])
            .context("unable to load device")?;
        Ok(row.as_ref().and_then(current_assignment))
    }
}

impl EntityStore for DeviceStore<'_> {
    type Entity = Device;
    type Request = DeviceRequest;
    type Criteria = DeviceSearchCriteria;

    const FAMILY: EntityFamily = EntityFamily::Device;

    fn create(&self, request: &DeviceRequest) -> StoreResult<Device> {
        self.check_references(request)?;
        let directory = &self.ctx.directories().devices;
        let token = claim_token(directory, Self::FAMILY, request.token.as_ref())?;
        let device = logic::device(request, token, now_millis())?;
        let cells = payload_cells(self.ctx, &device)?;

        let id = directory.next_counter_value()?;
        directory.create_id(&device.token, id)?;
        let table = self.ctx.table(Table::Devices)?;
        let written = table
            .put(&device_key(id), cells)
            .context("unable to create device");
        release_on_error(directory, Self::FAMILY, &device.token, written)?;

        tracing::debug!(token = %device.token, id, device_type = %device.device_type_token, "created device");
        Ok(device)
    }

    fn get_by_token(&self, token: &str) -> StoreResult<Option<Device>> {
        let Some(id) = self.ctx.directories().devices.get_id(token)? else {
            return Ok(None);
        };
        let table = self.ctx.table(Table::Devices)?;
        let row = table
            .get(&device_key(id), &[])
            .context("unable to load device")?;
        row.map(|row| decode_device(self.ctx, &row)).transpose()
    }

    fn update(&self, token: &str, request: &DeviceRequest) -> StoreResult<Device> {
        self.check_references(request)?;
        let (key, existing) = self.load(token)?;
        let updated = logic::update_device(&existing, request, now_millis());

        // payload columns only; assignment side columns stay as they are
        let table = self.ctx.table(Table::Devices)?;
        table
            .put(&key, payload_cells(self.ctx, &updated)?)
            .context("unable to update device")?;
        tracing::debug!(token, "updated device");
        Ok(updated)
    }

    fn list(
        &self,
        criteria: &DeviceSearchCriteria,
        include_deleted: bool,
    ) -> StoreResult<SearchResults<Device>> {
        let table = self.ctx.table(Table::Devices)?;
        let scan = Scan::all().with_filter(keys::primary_filter(DeviceRecord::Device));
        collect_page(&table, scan, &criteria.paging, Self::FAMILY, |_, row| {
            let device = decode_device(self.ctx, row)?;
            let keep = (include_deleted || !device.deleted)
                && criteria.paging.matches_date(Some(device.created_date))
                && !(criteria.exclude_assigned && device.active_assignment_token.is_some())
                && criteria
                    .device_type_token
                    .as_ref()
                    .map_or(true, |t| &device.device_type_token == t);
            Ok(keep.then_some(device))
        })
    }

    fn delete(&self, token: &str, force: bool) -> StoreResult<Device> {
        let (key, existing) = self.load(token)?;
        if let Some(assignment_token) = &existing.active_assignment_token {
            return Err(Precondition::DeviceAssigned {
                device_token: token.to_string(),
                assignment_token: assignment_token.clone(),
            }
            .into());
        }

        let table = self.ctx.table(Table::Devices)?;
        if force {
            remove_entity(&table, &self.ctx.directories().devices, Self::FAMILY, &key, token)?;
            tracing::warn!(token, "force deleted device; past assignments keep referencing it");
        } else {
            mark_deleted(&table, Self::FAMILY, &key)?;
            tracing::debug!(token, "soft deleted device");
        }
        Ok(existing)
    }
}
