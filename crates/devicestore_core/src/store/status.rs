//! Device status persistence.

use super::device_type::{device_type_key, device_type_scope};
use super::{
    ensure_token_free, list_entities, map_child_token, mark_deleted, payload_cells, read_entity,
    release_on_error, remove_entity, resolve_key, EntityStore,
};
use crate::context::StoreContext;
use crate::counter::CounterAllocator;
use crate::error::{Precondition, ResultExt, StoreError, StoreResult};
use crate::keys;
use crate::logic;
use crate::model::{DeviceStatus, DeviceStatusRequest};
use crate::paging::{SearchCriteria, SearchResults};
use crate::schema::{DeviceTypeRecord, Table};
use crate::types::{now_millis, EntityFamily};
use devicestore_storage::TableHandle;

/// Statuses of one device type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSearchCriteria {
    /// Owning device type.
    pub device_type_token: String,
    /// Only the status with this code.
    pub code: Option<String>,
    /// Paging and created-date range.
    pub paging: SearchCriteria,
}

impl StatusSearchCriteria {
    /// Every status of a device type.
    pub fn for_device_type(device_type_token: impl Into<String>) -> Self {
        Self {
            device_type_token: device_type_token.into(),
            code: None,
            paging: SearchCriteria::all(),
        }
    }
}

/// Statuses, stored under their device type's scope with a descending id.
#[derive(Debug, Clone, Copy)]
pub struct DeviceStatusStore<'a> {
    ctx: &'a StoreContext,
}

impl<'a> DeviceStatusStore<'a> {
    /// Creates a store over a context.
    pub fn new(ctx: &'a StoreContext) -> Self {
        Self { ctx }
    }

    fn load(&self, token: &str) -> StoreResult<(Vec<u8>, DeviceStatus)> {
        let key = resolve_key(&self.ctx.directories().statuses, EntityFamily::DeviceStatus, token)?;
        let table = self.ctx.table(Table::DeviceTypes)?;
        let status = read_entity(self.ctx, &table, EntityFamily::DeviceStatus, &key)?
            .ok_or_else(|| StoreError::invalid_token(EntityFamily::DeviceStatus, token))?;
        Ok((key, status))
    }

    fn find_by_code(
        &self,
        table: &dyn TableHandle,
        scope: &[u8],
        code: &str,
    ) -> StoreResult<Option<DeviceStatus>> {
        let found = list_entities::<DeviceStatus, _>(
            self.ctx,
            table,
            EntityFamily::DeviceStatus,
            keys::child_range(scope, DeviceTypeRecord::Status),
            &SearchCriteria::new(1, 1),
            false,
            |_, status| status.code == code,
        )?;
        Ok(found.results.into_iter().next())
    }

    /// Finds a device type's status by code.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the device type does not resolve.
    pub fn get_by_code(&self, device_type_token: &str, code: &str) -> StoreResult<Option<DeviceStatus>> {
        let scope = device_type_scope(self.ctx, device_type_token)?;
        let table = self.ctx.table(Table::DeviceTypes)?;
        self.find_by_code(&table, &scope, code)
    }
}

impl EntityStore for DeviceStatusStore<'_> {
    type Entity = DeviceStatus;
    type Request = DeviceStatusRequest;
    type Criteria = StatusSearchCriteria;

    const FAMILY: EntityFamily = EntityFamily::DeviceStatus;

    fn create(&self, request: &DeviceStatusRequest) -> StoreResult<DeviceStatus> {
        let directory = &self.ctx.directories().statuses;
        if let Some(token) = &request.token {
            ensure_token_free(directory, Self::FAMILY, token)?;
        }
        let mut status = logic::device_status(request, String::new(), now_millis())?;
        let scope = device_type_scope(self.ctx, &status.device_type_token)?;

        let table = self.ctx.table(Table::DeviceTypes)?;
        if self.find_by_code(&table, &scope, &status.code)?.is_some() {
            return Err(Precondition::DuplicateStatusCode {
                device_type_token: status.device_type_token,
                code: status.code,
            }
            .into());
        }
        let value = CounterAllocator::STATUSES.allocate(&table, &device_type_key(&scope))?;
        let key = keys::child_key(&scope, DeviceTypeRecord::Status, &keys::local_id(value));
        status.token = map_child_token(directory, request.token.as_ref(), &key)?;

        let written = table
            .put(&key, payload_cells(self.ctx, &status)?)
            .context("unable to create device status");
        release_on_error(directory, Self::FAMILY, &status.token, written)?;

        tracing::debug!(token = %status.token, code = %status.code, "created device status");
        Ok(status)
    }

    fn get_by_token(&self, token: &str) -> StoreResult<Option<DeviceStatus>> {
        let Some(key) = self.ctx.directories().statuses.get_value(token)? else {
            return Ok(None);
        };
        let table = self.ctx.table(Table::DeviceTypes)?;
        read_entity(self.ctx, &table, Self::FAMILY, &key)
    }

    fn update(&self, token: &str, request: &DeviceStatusRequest) -> StoreResult<DeviceStatus> {
        let (key, existing) = self.load(token)?;
        let updated = logic::update_device_status(&existing, request, now_millis());

        let table = self.ctx.table(Table::DeviceTypes)?;
        if updated.code != existing.code {
            let scope = device_type_scope(self.ctx, &existing.device_type_token)?;
            if self.find_by_code(&table, &scope, &updated.code)?.is_some() {
                return Err(Precondition::DuplicateStatusCode {
                    device_type_token: updated.device_type_token,
                    code: updated.code,
                }
                .into());
            }
        }
        table
            .put(&key, payload_cells(self.ctx, &updated)?)
            .context("unable to update device status")?;
        tracing::debug!(token, "updated device status");
        Ok(updated)
    }

    fn list(
        &self,
        criteria: &StatusSearchCriteria,
        include_deleted: bool,
    ) -> StoreResult<SearchResults<DeviceStatus>> {
        let scope = device_type_scope(self.ctx, &criteria.device_type_token)?;
        let table = self.ctx.table(Table::DeviceTypes)?;
        list_entities(
            self.ctx,
            &table,
            Self::FAMILY,
            keys::child_range(&scope, DeviceTypeRecord::Status),
            &criteria.paging,
            include_deleted,
            |_, status: &DeviceStatus| criteria.code.as_ref().map_or(true, |code| &status.code == code),
        )
    }

    fn delete(&self, token: &str, force: bool) -> StoreResult<DeviceStatus> {
        let (key, existing) = self.load(token)?;
        let table = self.ctx.table(Table::DeviceTypes)?;
        if force {
            remove_entity(&table, &self.ctx.directories().statuses, Self::FAMILY, &key, token)?;
        } else {
            mark_deleted(&table, Self::FAMILY, &key)?;
        }
        tracing::debug!(token, force, "deleted device status");
        Ok(existing)
    }
}
