//! Zone persistence.

use super::area::{area_key, area_scope};
use super::{
    ensure_token_free, list_entities, map_child_token, mark_deleted, payload_cells, read_entity,
    release_on_error, remove_entity, resolve_key, EntityStore,
};
use crate::context::StoreContext;
use crate::counter::CounterAllocator;
use crate::error::{ResultExt, StoreError, StoreResult};
use crate::keys;
use crate::logic;
use crate::model::{Zone, ZoneRequest};
use crate::paging::{SearchCriteria, SearchResults};
use crate::schema::{AreaRecord, Table};
use crate::types::{now_millis, EntityFamily};

/// Zones of one area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSearchCriteria {
    /// Owning area.
    pub area_token: String,
    /// Paging and created-date range.
    pub paging: SearchCriteria,
}

impl ZoneSearchCriteria {
    /// Every zone of an area.
    pub fn for_area(area_token: impl Into<String>) -> Self {
        Self {
            area_token: area_token.into(),
            paging: SearchCriteria::all(),
        }
    }
}

/// Zones, stored under their area's scope with a descending local id.
#[derive(Debug, Clone, Copy)]
pub struct ZoneStore<'a> {
    ctx: &'a StoreContext,
}

impl<'a> ZoneStore<'a> {
    /// Creates a store over a context.
    pub fn new(ctx: &'a StoreContext) -> Self {
        Self { ctx }
    }

    fn load(&self, token: &str) -> StoreResult<(Vec<u8>, Zone)> {
        let key = resolve_key(&self.ctx.directories().zones, EntityFamily::Zone, token)?;
        let table = self.ctx.table(Table::Areas)?;
        let zone = read_entity(self.ctx, &table, EntityFamily::Zone, &key)?
            .ok_or_else(|| StoreError::invalid_token(EntityFamily::Zone, token))?;
        Ok((key, zone))
    }
}

impl EntityStore for ZoneStore<'_> {
    type Entity = Zone;
    type Request = ZoneRequest;
    type Criteria = ZoneSearchCriteria;

    const FAMILY: EntityFamily = EntityFamily::Zone;

    fn create(&self, request: &ZoneRequest) -> StoreResult<Zone> {
        let directory = &self.ctx.directories().zones;
        if let Some(token) = &request.token {
            ensure_token_free(directory, Self::FAMILY, token)?;
        }
        let mut zone = logic::zone(request, String::new(), now_millis())?;
        let scope = area_scope(self.ctx, &zone.area_token)?;

        let table = self.ctx.table(Table::Areas)?;
        let value = CounterAllocator::ZONES.allocate(&table, &area_key(&scope))?;
        let key = keys::child_key(&scope, AreaRecord::Zone, &keys::local_id(value));
        zone.token = map_child_token(directory, request.token.as_ref(), &key)?;

        let written = table
            .put(&key, payload_cells(self.ctx, &zone)?)
            .context("unable to create zone");
        release_on_error(directory, Self::FAMILY, &zone.token, written)?;

        tracing::debug!(token = %zone.token, area = %zone.area_token, value, "created zone");
        Ok(zone)
    }

    fn get_by_token(&self, token: &str) -> StoreResult<Option<Zone>> {
        let Some(key) = self.ctx.directories().zones.get_value(token)? else {
            return Ok(None);
        };
        let table = self.ctx.table(Table::Areas)?;
        read_entity(self.ctx, &table, Self::FAMILY, &key)
    }

    fn update(&self, token: &str, request: &ZoneRequest) -> StoreResult<Zone> {
        let (key, existing) = self.load(token)?;
        let updated = logic::update_zone(&existing, request, now_millis())?;
        let table = self.ctx.table(Table::Areas)?;
        table
            .put(&key, payload_cells(self.ctx, &updated)?)
            .context("unable to update zone")?;
        tracing::debug!(token, "updated zone");
        Ok(updated)
    }

    fn list(
        &self,
        criteria: &ZoneSearchCriteria,
        include_deleted: bool,
    ) -> StoreResult<SearchResults<Zone>> {
        let scope = area_scope(self.ctx, &criteria.area_token)?;
        let table = self.ctx.table(Table::Areas)?;
        list_entities(
            self.ctx,
            &table,
            Self::FAMILY,
            keys::child_range(&scope, AreaRecord::Zone),
            &criteria.paging,
            include_deleted,
            |_, _| true,
        )
    }

    fn delete(&self, token: &str, force: bool) -> StoreResult<Zone> {
        let (key, existing) = self.load(token)?;
        let table = self.ctx.table(Table::Areas)?;
        if force {
            remove_entity(&table, &self.ctx.directories().zones, Self::FAMILY, &key, token)?;
        } else {
            mark_deleted(&table, Self::FAMILY, &key)?;
        }
        tracing::debug!(token, force, "deleted zone");
        Ok(existing)
    }
}
