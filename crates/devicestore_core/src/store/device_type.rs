//! Device type persistence.
//!
//! A device type's primary row seeds the command and status counters;
//! commands and statuses live in the same table under its scope.

use super::{
    claim_token, list_entities, mark_deleted, payload_cells, read_entity, release_on_error,
    remove_entity, resolve_id, EntityStore,
};
use crate::context::StoreContext;
use crate::counter::CounterAllocator;
use crate::error::{ResultExt, StoreError, StoreResult};
use crate::keys;
use crate::logic;
use crate::model::{DeviceType, DeviceTypeRequest};
use crate::paging::{SearchCriteria, SearchResults};
use crate::schema::{DeviceTypeRecord, Table};
use crate::types::{now_millis, EntityFamily};
use devicestore_storage::Scan;

/// Device types, keyed by a directory-minted id.
#[derive(Debug, Clone, Copy)]
pub struct DeviceTypeStore<'a> {
    ctx: &'a StoreContext,
}

/// Scope bytes of a device type, the parent scope of its commands and statuses.
pub(crate) fn device_type_scope(ctx: &StoreContext, token: &str) -> StoreResult<Vec<u8>> {
    let id = resolve_id(&ctx.directories().device_types, EntityFamily::DeviceType, token)?;
    Ok(keys::scope(id))
}

/// Primary key of a device type with the given scope.
pub(crate) fn device_type_key(scope: &[u8]) -> Vec<u8> {
    keys::primary_key(scope, DeviceTypeRecord::DeviceType)
}

impl<'a> DeviceTypeStore<'a> {
    /// Creates a store over a context.
    pub fn new(ctx: &'a StoreContext) -> Self {
        Self { ctx }
    }

    fn load(&self, token: &str) -> StoreResult<(Vec<u8>, DeviceType)> {
        let key = device_type_key(&device_type_scope(self.ctx, token)?);
        let table = self.ctx.table(Table::DeviceTypes)?;
        let device_type = read_entity(self.ctx, &table, EntityFamily::DeviceType, &key)?
            .ok_or_else(|| StoreError::invalid_token(EntityFamily::DeviceType, token))?;
        Ok((key, device_type))
    }
}

impl EntityStore for DeviceTypeStore<'_> {
    type Entity = DeviceType;
    type Request = DeviceTypeRequest;
    type Criteria = SearchCriteria;

    const FAMILY: EntityFamily = EntityFamily::DeviceType;

    fn create(&self, request: &DeviceTypeRequest) -> StoreResult<DeviceType> {
        let directory = &self.ctx.directories().device_types;
        let token = claim_token(directory, Self::FAMILY, request.token.as_ref())?;
        let device_type = logic::device_type(request, token, now_millis())?;
        let mut cells = payload_cells(self.ctx, &device_type)?;
        cells.push(CounterAllocator::COMMANDS.seed());
        cells.push(CounterAllocator::STATUSES.seed());

        let id = directory.next_counter_value()?;
        directory.create_id(&device_type.token, id)?;
        let table = self.ctx.table(Table::DeviceTypes)?;
        let written = table
            .put(&device_type_key(&keys::scope(id)), cells)
            .context("unable to create device type");
        release_on_error(directory, Self::FAMILY, &device_type.token, written)?;

        tracing::debug!(token = %device_type.token, id, "created device type");
        Ok(device_type)
    }

    fn get_by_token(&self, token: &str) -> StoreResult<Option<DeviceType>> {
        let Some(id) = self.ctx.directories().device_types.get_id(token)? else {
            return Ok(None);
        };
        let table = self.ctx.table(Table::DeviceTypes)?;
        read_entity(self.ctx, &table, Self::FAMILY, &device_type_key(&keys::scope(id)))
    }

    fn update(&self, token: &str, request: &DeviceTypeRequest) -> StoreResult<DeviceType> {
        let (key, existing) = self.load(token)?;
        let updated = logic::update_device_type(&existing, request, now_millis());
        let table = self.ctx.table(Table::DeviceTypes)?;
        table
            .put(&key, payload_cells(self.ctx, &updated)?)
            .context("unable to update device type")?;
        tracing::debug!(token, "updated device type");
        Ok(updated)
    }

    fn list(
        &self,
        criteria: &SearchCriteria,
        include_deleted: bool,
    ) -> StoreResult<SearchResults<DeviceType>> {
        let table = self.ctx.table(Table::DeviceTypes)?;
        let scan = Scan::all().with_filter(keys::primary_filter(DeviceTypeRecord::DeviceType));
        list_entities(self.ctx, &table, Self::FAMILY, scan, criteria, include_deleted, |_, _| true)
    }

    fn delete(&self, token: &str, force: bool) -> StoreResult<DeviceType> {
        let (key, existing) = self.load(token)?;
        let table = self.ctx.table(Table::DeviceTypes)?;
        if force {
            remove_entity(&table, &self.ctx.directories().device_types, Self::FAMILY, &key, token)?;
            tracing::warn!(
                token,
                "force deleted device type; its commands, statuses and devices are orphaned"
            );
        } else {
            mark_deleted(&table, Self::FAMILY, &key)?;
            tracing::debug!(token, "soft deleted device type");
        }
        Ok(existing)
    }
}
