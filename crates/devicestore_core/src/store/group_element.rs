//! Group membership.
//!
//! Elements are keyed by an ascending index under the group's scope and
//! have no token of their own.

use super::group::{group_key, group_scope};
use super::{collect_page, decode_payload, payload_cells, resolve_id};
use crate::context::StoreContext;
use crate::counter::CounterAllocator;
use crate::error::{ResultExt, StoreResult};
use crate::keys;
use crate::logic;
use crate::model::{DeviceGroupElement, DeviceGroupElementRequest};
use crate::paging::{SearchCriteria, SearchResults};
use crate::schema::{GroupRecord, Table};
use crate::types::EntityFamily;

/// Adds, lists and removes the members of device groups.
#[derive(Debug, Clone, Copy)]
pub struct DeviceGroupElementStore<'a> {
    ctx: &'a StoreContext,
}

fn element_key(scope: &[u8], index: i64) -> Vec<u8> {
    keys::child_key(scope, GroupRecord::Element, &keys::local_id(index))
}

impl<'a> DeviceGroupElementStore<'a> {
    /// Creates a store over a context.
    pub fn new(ctx: &'a StoreContext) -> Self {
        Self { ctx }
    }

    fn check_references(&self, group_token: &str, request: &DeviceGroupElementRequest) -> StoreResult<()> {
        logic::validate_group_element(group_token, request)?;
        let directories = self.ctx.directories();
        if let Some(device) = &request.device_token {
            resolve_id(&directories.devices, EntityFamily::Device, device)?;
        }
        if let Some(nested) = &request.nested_group_token {
            resolve_id(&directories.groups, EntityFamily::DeviceGroup, nested)?;
        }
        Ok(())
    }

    /// Appends elements to a group in request order.
    ///
    /// Every request is checked before anything is written, so a bad
    /// element leaves the group unchanged.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the group or a referenced member does not
    /// resolve, and `InvalidGroupElement` or `SelfReferencingGroup` for
    /// malformed requests.
    pub fn add_elements(
        &self,
        group_token: &str,
        requests: &[DeviceGroupElementRequest],
    ) -> StoreResult<Vec<DeviceGroupElement>> {
        let scope = group_scope(self.ctx, group_token)?;
        for request in requests {
            self.check_references(group_token, request)?;
        }

        let table = self.ctx.table(Table::Groups)?;
        let parent = group_key(&scope);
        let mut added = Vec::with_capacity(requests.len());
        for request in requests {
            let index = CounterAllocator::ELEMENTS.allocate(&table, &parent)?;
            let element = logic::group_element(group_token, index, request)?;
            table
                .put(&element_key(&scope, index), payload_cells(self.ctx, &element)?)
                .context("unable to add group element")?;
            added.push(element);
        }
        tracing::debug!(group = group_token, count = added.len(), "added group elements");
        Ok(added)
    }

    /// Loads one element by index.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the group does not resolve.
    pub fn get_element(&self, group_token: &str, index: i64) -> StoreResult<Option<DeviceGroupElement>> {
        let scope = group_scope(self.ctx, group_token)?;
        let table = self.ctx.table(Table::Groups)?;
        let row = table
            .get(&element_key(&scope, index), &[])
            .context("unable to load group element")?;
        row.map(|row| decode_payload(self.ctx, EntityFamily::DeviceGroupElement, &row))
            .transpose()
    }

    /// Lists a group's elements in index order. A group that does not
    /// resolve, including one removed by a force delete, has no elements.
    ///
    /// # Errors
    ///
    /// Returns a substrate error if the directory or table cannot be read.
    pub fn list_elements(
        &self,
        group_token: &str,
        paging: &SearchCriteria,
    ) -> StoreResult<SearchResults<DeviceGroupElement>> {
        let Some(id) = self.ctx.directories().groups.get_id(group_token)? else {
            return Ok(SearchResults {
                num_results: 0,
                results: Vec::new(),
            });
        };
        let scope = keys::scope(id);
        let table = self.ctx.table(Table::Groups)?;
        collect_page(
            &table,
            keys::child_range(&scope, GroupRecord::Element),
            paging,
            EntityFamily::DeviceGroupElement,
            |_, row| decode_payload(self.ctx, EntityFamily::DeviceGroupElement, row).map(Some),
        )
    }

    /// Removes elements by index, returning the ones that existed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the group does not resolve.
    pub fn remove_elements(&self, group_token: &str, indexes: &[i64]) -> StoreResult<Vec<DeviceGroupElement>> {
        let scope = group_scope(self.ctx, group_token)?;
        let table = self.ctx.table(Table::Groups)?;
        let mut removed = Vec::new();
        for &index in indexes {
            let key = element_key(&scope, index);
            let Some(row) = table.get(&key, &[]).context("unable to load group element")? else {
                continue;
            };
            let element: DeviceGroupElement = decode_payload(self.ctx, EntityFamily::DeviceGroupElement, &row)?;
            table.delete(&key).context("unable to remove group element")?;
            removed.push(element);
        }
        tracing::debug!(group = group_token, count = removed.len(), "removed group elements");
        Ok(removed)
    }
}
