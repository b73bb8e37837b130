//! Device group persistence.
//!
//! A group's primary row seeds an ascending element counter; elements live
//! in the same table under the group's scope.

use super::{
    claim_token, list_entities, mark_deleted, payload_cells, read_entity, release_on_error,
    remove_entity, resolve_id, EntityStore,
};
use crate::context::StoreContext;
use crate::counter::CounterAllocator;
use crate::error::{ResultExt, StoreError, StoreResult};
use crate::keys;
use crate::logic;
use crate::model::{DeviceGroup, DeviceGroupRequest};
use crate::paging::{SearchCriteria, SearchResults};
use crate::schema::{GroupRecord, Table};
use crate::types::{now_millis, EntityFamily};
use devicestore_storage::Scan;

/// Filters for listing groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupSearchCriteria {
    /// Only groups playing this role.
    pub role: Option<String>,
    /// Paging and created-date range.
    pub paging: SearchCriteria,
}

/// Device groups, keyed by a directory-minted id.
#[derive(Debug, Clone, Copy)]
pub struct DeviceGroupStore<'a> {
    ctx: &'a StoreContext,
}

/// Scope bytes of a group, the parent scope of its elements.
pub(crate) fn group_scope(ctx: &StoreContext, token: &str) -> StoreResult<Vec<u8>> {
    let id = resolve_id(&ctx.directories().groups, EntityFamily::DeviceGroup, token)?;
    Ok(keys::scope(id))
}

/// Primary key of a group with the given scope.
pub(crate) fn group_key(scope: &[u8]) -> Vec<u8> {
    keys::primary_key(scope, GroupRecord::Group)
}

impl<'a> DeviceGroupStore<'a> {
    /// Creates a store over a context.
    pub fn new(ctx: &'a StoreContext) -> Self {
        Self { ctx }
    }

    fn load(&self, token: &str) -> StoreResult<(Vec<u8>, DeviceGroup)> {
        let scope = group_scope(self.ctx, token)?;
        let key = group_key(&scope);
        let table = self.ctx.table(Table::Groups)?;
        let group = read_entity(self.ctx, &table, EntityFamily::DeviceGroup, &key)?
            .ok_or_else(|| StoreError::invalid_token(EntityFamily::DeviceGroup, token))?;
        Ok((scope, group))
    }
}

impl EntityStore for DeviceGroupStore<'_> {
    type Entity = DeviceGroup;
    type Request = DeviceGroupRequest;
    type Criteria = GroupSearchCriteria;

    const FAMILY: EntityFamily = EntityFamily::DeviceGroup;

    fn create(&self, request: &DeviceGroupRequest) -> StoreResult<DeviceGroup> {
        let directory = &self.ctx.directories().groups;
        let token = claim_token(directory, Self::FAMILY, request.token.as_ref())?;
        let group = logic::device_group(request, token, now_millis())?;
        let mut cells = payload_cells(self.ctx, &group)?;
        cells.push(CounterAllocator::ELEMENTS.seed());

        let id = directory.next_counter_value()?;
        directory.create_id(&group.token, id)?;
        let table = self.ctx.table(Table::Groups)?;
        let written = table
            .put(&group_key(&keys::scope(id)), cells)
            .context("unable to create device group");
        release_on_error(directory, Self::FAMILY, &group.token, written)?;

        tracing::debug!(token = %group.token, id, "created device group");
        Ok(group)
    }

    fn get_by_token(&self, token: &str) -> StoreResult<Option<DeviceGroup>> {
        let Some(id) = self.ctx.directories().groups.get_id(token)? else {
            return Ok(None);
        };
        let table = self.ctx.table(Table::Groups)?;
        read_entity(self.ctx, &table, Self::FAMILY, &group_key(&keys::scope(id)))
    }

    fn update(&self, token: &str, request: &DeviceGroupRequest) -> StoreResult<DeviceGroup> {
        let (scope, existing) = self.load(token)?;
        let updated = logic::update_device_group(&existing, request, now_millis());
        let table = self.ctx.table(Table::Groups)?;
        table
            .put(&group_key(&scope), payload_cells(self.ctx, &updated)?)
            .context("unable to update device group")?;
        tracing::debug!(token, "updated device group");
        Ok(updated)
    }

    fn list(
        &self,
        criteria: &GroupSearchCriteria,
        include_deleted: bool,
    ) -> StoreResult<SearchResults<DeviceGroup>> {
        let table = self.ctx.table(Table::Groups)?;
        let scan = Scan::all().with_filter(keys::primary_filter(GroupRecord::Group));
        list_entities(
            self.ctx,
            &table,
            Self::FAMILY,
            scan,
            &criteria.paging,
            include_deleted,
            |_, group: &DeviceGroup| {
                criteria
                    .role
                    .as_ref()
                    .map_or(true, |role| group.roles.contains(role))
            },
        )
    }

    fn delete(&self, token: &str, force: bool) -> StoreResult<DeviceGroup> {
        let (scope, existing) = self.load(token)?;
        let key = group_key(&scope);
        let table = self.ctx.table(Table::Groups)?;
        if !force {
            mark_deleted(&table, Self::FAMILY, &key)?;
            tracing::debug!(token, "soft deleted device group");
            return Ok(existing);
        }

        let element_keys = {
            let cursor = table
                .scan(keys::children_range(&scope, GroupRecord::Element))
                .context("unable to scan group elements")?;
            cursor
                .map(|item| item.map(|(key, _)| key))
                .collect::<Result<Vec<_>, _>>()
                .context("unable to scan group elements")?
        };
        for element_key in &element_keys {
            table
                .delete(element_key)
                .context("unable to delete group element")?;
        }
        remove_entity(&table, &self.ctx.directories().groups, Self::FAMILY, &key, token)?;

        tracing::debug!(token, elements = element_keys.len(), "force deleted device group");
        Ok(existing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing;

    fn request(name: &str, roles: &[&str]) -> DeviceGroupRequest {
        DeviceGroupRequest {
            name: Some(name.to_string()),
            roles: Some(roles.iter().map(|r| r.to_string()).collect()),
            ..DeviceGroupRequest::default()
        }
    }

    #[test]
    fn list_by_role() {
        let (_, ctx) = testing::context();
        let store = DeviceGroupStore::new(&ctx);
        let fleet = store.create(&request("fleet", &["vehicles"])).unwrap();
        store.create(&request("sensors", &["environment"])).unwrap();

        let criteria = GroupSearchCriteria {
            role: Some("vehicles".into()),
            ..GroupSearchCriteria::default()
        };
        assert_eq!(store.list(&criteria, false).unwrap().results, vec![fleet]);
        assert_eq!(
            store
                .list(&GroupSearchCriteria::default(), false)
                .unwrap()
                .num_results,
            2
        );
    }

    #[test]
    fn update_keeps_element_counter() {
        let (_, ctx) = testing::context();
        let store = DeviceGroupStore::new(&ctx);
        let group = store.create(&request("fleet", &[])).unwrap();
        store
            .update(
                &group.token,
                &DeviceGroupRequest {
                    description: Some("all trucks".into()),
                    ..DeviceGroupRequest::default()
                },
            )
            .unwrap();

        let key = group_key(&group_scope(&ctx, &group.token).unwrap());
        let table = ctx.table(Table::Groups).unwrap();
        assert_eq!(CounterAllocator::ELEMENTS.allocate(&table, &key).unwrap(), 1);
    }
}
