//! Area persistence.
//!
//! An area's primary row also carries the zone and assignment counters,
//! seeded at `i64::MAX` when the area is created. Zones and assignments
//! live in the same table under the area's scope.

use super::{
    claim_token, list_entities, mark_deleted, payload_cells, read_entity, release_on_error,
    remove_entity, resolve_id, EntityStore,
};
use crate::context::StoreContext;
use crate::counter::CounterAllocator;
use crate::error::{ResultExt, StoreError, StoreResult};
use crate::keys;
use crate::logic;
use crate::model::{Area, AreaRequest};
use crate::paging::{SearchCriteria, SearchResults};
use crate::schema::{AreaRecord, Table};
use crate::types::{now_millis, EntityFamily};
use devicestore_storage::Scan;

/// Filters for listing areas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AreaSearchCriteria {
    /// Only areas without a parent.
    pub root_only: bool,
    /// Only direct children of this area.
    pub parent_area_token: Option<String>,
    /// Only areas of this type.
    pub area_type_token: Option<String>,
    /// Paging and created-date range.
    pub paging: SearchCriteria,
}

impl AreaSearchCriteria {
    /// Matches every area, paged.
    #[must_use]
    pub fn paged(paging: SearchCriteria) -> Self {
        Self {
            paging,
            ..Self::default()
        }
    }

    fn accepts(&self, area: &Area) -> bool {
        if self.root_only && area.parent_area_token.is_some() {
            return false;
        }
        if let Some(parent) = &self.parent_area_token {
            if area.parent_area_token.as_ref() != Some(parent) {
                return false;
            }
        }
        if let Some(area_type) = &self.area_type_token {
            if area.area_type_token.as_ref() != Some(area_type) {
                return false;
            }
        }
        true
    }
}

/// Areas, keyed by a directory-minted id.
#[derive(Debug, Clone, Copy)]
pub struct AreaStore<'a> {
    ctx: &'a StoreContext,
}

/// Scope bytes of an area, the parent scope of its zones and assignments.
pub(crate) fn area_scope(ctx: &StoreContext, token: &str) -> StoreResult<Vec<u8>> {
    let id = resolve_id(&ctx.directories().areas, EntityFamily::Area, token)?;
    Ok(keys::scope(id))
}

/// Primary key of an area with the given scope.
pub(crate) fn area_key(scope: &[u8]) -> Vec<u8> {
    keys::primary_key(scope, AreaRecord::Area)
}

impl<'a> AreaStore<'a> {
    /// Creates a store over a context.
    pub fn new(ctx: &'a StoreContext) -> Self {
        Self { ctx }
    }

    fn check_references(&self, request: &AreaRequest) -> StoreResult<()> {
        let directories = self.ctx.directories();
        if let Some(area_type) = &request.area_type_token {
            resolve_id(&directories.area_types, EntityFamily::AreaType, area_type)?;
        }
        if let Some(parent) = &request.parent_area_token {
            resolve_id(&directories.areas, EntityFamily::Area, parent)?;
        }
        Ok(())
    }

    fn load(&self, token: &str) -> StoreResult<(Vec<u8>, Area)> {
        let key = area_key(&area_scope(self.ctx, token)?);
        let table = self.ctx.table(Table::Areas)?;
        let area = read_entity(self.ctx, &table, EntityFamily::Area, &key)?
            .ok_or_else(|| StoreError::invalid_token(EntityFamily::Area, token))?;
        Ok((key, area))
    }

    /// Lists the direct children of an area.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the parent does not resolve.
    pub fn list_child_areas(
        &self,
        parent_token: &str,
        paging: &SearchCriteria,
        include_deleted: bool,
    ) -> StoreResult<SearchResults<Area>> {
        resolve_id(&self.ctx.directories().areas, EntityFamily::Area, parent_token)?;
        let criteria = AreaSearchCriteria {
            parent_area_token: Some(parent_token.to_string()),
            paging: *paging,
            ..AreaSearchCriteria::default()
        };
        self.list(&criteria, include_deleted)
    }
}

impl EntityStore for AreaStore<'_> {
    type Entity = Area;
    type Request = AreaRequest;
    type Criteria = AreaSearchCriteria;

    const FAMILY: EntityFamily = EntityFamily::Area;

    fn create(&self, request: &AreaRequest) -> StoreResult<Area> {
        self.check_references(request)?;
        let directory = &self.ctx.directories().areas;
        let token = claim_token(directory, Self::FAMILY, request.token.as_ref())?;
        let area = logic::area(request, token, now_millis())?;
        let mut cells = payload_cells(self.ctx, &area)?;
        cells.push(CounterAllocator::ZONES.seed());
        cells.push(CounterAllocator::ASSIGNMENTS.seed());

        let id = directory.next_counter_value()?;
        directory.create_id(&area.token, id)?;
        let table = self.ctx.table(Table::Areas)?;
        let written = table
            .put(&area_key(&keys::scope(id)), cells)
            .context("unable to create area");
        release_on_error(directory, Self::FAMILY, &area.token, written)?;

        tracing::debug!(token = %area.token, id, "created area");
        Ok(area)
    }

    fn get_by_token(&self, token: &str) -> StoreResult<Option<Area>> {
        let Some(id) = self.ctx.directories().areas.get_id(token)? else {
            return Ok(None);
        };
        let table = self.ctx.table(Table::Areas)?;
        read_entity(self.ctx, &table, Self::FAMILY, &area_key(&keys::scope(id)))
    }

    fn update(&self, token: &str, request: &AreaRequest) -> StoreResult<Area> {
        self.check_references(request)?;
        let (key, existing) = self.load(token)?;
        let updated = logic::update_area(&existing, request, now_millis())?;

        let table = self.ctx.table(Table::Areas)?;
        table
            .put(&key, payload_cells(self.ctx, &updated)?)
            .context("unable to update area")?;
        tracing::debug!(token, "updated area");
        Ok(updated)
    }

    fn list(
        &self,
        criteria: &AreaSearchCriteria,
        include_deleted: bool,
    ) -> StoreResult<SearchResults<Area>> {
        let table = self.ctx.table(Table::Areas)?;
        let scan = Scan::all().with_filter(keys::primary_filter(AreaRecord::Area));
        list_entities(
            self.ctx,
            &table,
            Self::FAMILY,
            scan,
            &criteria.paging,
            include_deleted,
            |_, area| criteria.accepts(area),
        )
    }

    fn delete(&self, token: &str, force: bool) -> StoreResult<Area> {
        let (key, existing) = self.load(token)?;
        let table = self.ctx.table(Table::Areas)?;
        if force {
            remove_entity(&table, &self.ctx.directories().areas, Self::FAMILY, &key, token)?;
            tracing::warn!(token, "force deleted area; its zones and assignments are orphaned");
        } else {
            mark_deleted(&table, Self::FAMILY, &key)?;
            tracing::debug!(token, "soft deleted area");
        }
        Ok(existing)
    }
}
