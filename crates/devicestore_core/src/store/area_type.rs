//! Area type persistence.

use super::{
    claim_token, list_entities, mark_deleted, payload_cells, read_entity, release_on_error,
    remove_entity, resolve_id, EntityStore,
};
use crate::context::StoreContext;
use crate::error::{ResultExt, StoreError, StoreResult};
use crate::keys;
use crate::logic;
use crate::model::{AreaType, AreaTypeRequest};
use crate::paging::{SearchCriteria, SearchResults};
use crate::schema::{AreaTypeRecord, Table};
use crate::types::{now_millis, EntityFamily};
use devicestore_storage::Scan;

/// Area types, keyed by a directory-minted id.
#[derive(Debug, Clone, Copy)]
pub struct AreaTypeStore<'a> {
    ctx: &'a StoreContext,
}

fn primary_key(id: i64) -> Vec<u8> {
    keys::primary_key(&keys::scope(id), AreaTypeRecord::AreaType)
}

impl<'a> AreaTypeStore<'a> {
    /// Creates a store over a context.
    pub fn new(ctx: &'a StoreContext) -> Self {
        Self { ctx }
    }
}

impl EntityStore for AreaTypeStore<'_> {
    type Entity = AreaType;
    type Request = AreaTypeRequest;
    type Criteria = SearchCriteria;

    const FAMILY: EntityFamily = EntityFamily::AreaType;

    fn create(&self, request: &AreaTypeRequest) -> StoreResult<AreaType> {
        let directory = &self.ctx.directories().area_types;
        let token = claim_token(directory, Self::FAMILY, request.token.as_ref())?;
        let area_type = logic::area_type(request, token, now_millis())?;
        let cells = payload_cells(self.ctx, &area_type)?;

        let id = directory.next_counter_value()?;
        directory.create_id(&area_type.token, id)?;
        let table = self.ctx.table(Table::AreaTypes)?;
        let written = table
            .put(&primary_key(id), cells)
            .context("unable to create area type");
        release_on_error(directory, Self::FAMILY, &area_type.token, written)?;

        tracing::debug!(token = %area_type.token, id, "created area type");
        Ok(area_type)
    }

    fn get_by_token(&self, token: &str) -> StoreResult<Option<AreaType>> {
        let Some(id) = self.ctx.directories().area_types.get_id(token)? else {
            return Ok(None);
        };
        let table = self.ctx.table(Table::AreaTypes)?;
        read_entity(self.ctx, &table, Self::FAMILY, &primary_key(id))
    }

    fn update(&self, token: &str, request: &AreaTypeRequest) -> StoreResult<AreaType> {
        let id = resolve_id(&self.ctx.directories().area_types, Self::FAMILY, token)?;
        let key = primary_key(id);
        let table = self.ctx.table(Table::AreaTypes)?;
        let existing: AreaType = read_entity(self.ctx, &table, Self::FAMILY, &key)?
            .ok_or_else(|| StoreError::invalid_token(Self::FAMILY, token))?;

        let updated = logic::update_area_type(&existing, request, now_millis());
        table
            .put(&key, payload_cells(self.ctx, &updated)?)
            .context("unable to update area type")?;
        tracing::debug!(token, "updated area type");
        Ok(updated)
    }

    fn list(
        &self,
        criteria: &SearchCriteria,
        include_deleted: bool,
    ) -> StoreResult<SearchResults<AreaType>> {
        let table = self.ctx.table(Table::AreaTypes)?;
        let scan = Scan::all().with_filter(keys::primary_filter(AreaTypeRecord::AreaType));
        list_entities(self.ctx, &table, Self::FAMILY, scan, criteria, include_deleted, |_, _| true)
    }

    fn delete(&self, token: &str, force: bool) -> StoreResult<AreaType> {
        let directory = &self.ctx.directories().area_types;
        let id = resolve_id(directory, Self::FAMILY, token)?;
        let key = primary_key(id);
        let table = self.ctx.table(Table::AreaTypes)?;
        let existing: AreaType = read_entity(self.ctx, &table, Self::FAMILY, &key)?
            .ok_or_else(|| StoreError::invalid_token(Self::FAMILY, token))?;

        if force {
            remove_entity(&table, directory, Self::FAMILY, &key, token)?;
            tracing::warn!(token, "force deleted area type; areas referencing it are not updated");
        } else {
            mark_deleted(&table, Self::FAMILY, &key)?;
            tracing::debug!(token, "soft deleted area type");
        }
        Ok(existing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing;

    fn request(name: &str) -> AreaTypeRequest {
        AreaTypeRequest {
            name: Some(name.to_string()),
            ..AreaTypeRequest::default()
        }
    }

    #[test]
    fn create_then_get() {
        let (_, ctx) = testing::context();
        let store = AreaTypeStore::new(&ctx);
        let created = store.create(&request("Warehouse")).unwrap();
        assert_eq!(store.get_by_token(&created.token).unwrap(), Some(created));
    }

    #[test]
    fn caller_token_is_kept_and_unique() {
        let (_, ctx) = testing::context();
        let store = AreaTypeStore::new(&ctx);
        let mut req = request("Campus");
        req.token = Some("campus".into());
        assert_eq!(store.create(&req).unwrap().token, "campus");

        let err = store.create(&req).unwrap_err();
        assert!(matches!(
            err.precondition(),
            Some(crate::error::Precondition::DuplicateToken { .. })
        ));
    }

    #[test]
    fn list_orders_by_key() {
        let (_, ctx) = testing::context();
        let store = AreaTypeStore::new(&ctx);
        for name in ["a", "b", "c"] {
            store.create(&request(name)).unwrap();
        }
        let names: Vec<String> = store
            .list(&SearchCriteria::all(), false)
            .unwrap()
            .results
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn substrate_failure_leaves_no_mapping() {
        let (substrate, ctx) = testing::context();
        let store = AreaTypeStore::new(&ctx);
        let mut req = request("Depot");
        req.token = Some("depot".into());

        substrate.set_fail_writes(true);
        let err = store.create(&req).unwrap_err();
        substrate.set_fail_writes(false);

        assert!(matches!(err, StoreError::Substrate { .. }));
        assert!(!ctx.directories().area_types.exists("depot").unwrap());
        assert_eq!(ctx.pool().checked_out(), 0);
    }
}
