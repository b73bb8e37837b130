//! Device assignment persistence.
//!
//! Assignments live in the `areas` table under their area's scope with a
//! descending local id, so an area's newest assignments list first.
//!
//! Status and presence state are kept in their own columns next to the
//! payload (`as`, `at`/`ad`) and override the payload on read. Status and
//! state updates write only those columns.
//!
//! Checking and setting the device's `ca` column are two separate row
//! operations. Two creates racing for the same device can both succeed.

use super::area::{area_key, area_scope};
use super::device::{current_assignment, history_column, resolve_device_key};
use super::{
    collect_page, decode_row, ensure_token_free, map_child_token, mark_deleted, payload_cells,
    release_on_error, remove_entity, resolve_key, EntityStore,
};
use crate::context::StoreContext;
use crate::counter::CounterAllocator;
use crate::error::{Precondition, ResultExt, StoreError, StoreResult};
use crate::keys;
use crate::logic;
use crate::model::{AssignmentState, AssignmentStatus, DeviceAssignment, DeviceAssignmentRequest};
use crate::paging::{Pager, SearchCriteria, SearchResults};
use crate::schema::{columns, AreaRecord, Table};
use crate::types::{now_millis, EntityFamily};
use devicestore_codec::{decode_entity, encode_entity};
use devicestore_storage::{Cell, Row};

const FAMILY: EntityFamily = EntityFamily::DeviceAssignment;

/// Assignments of one area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentSearchCriteria {
    /// Owning area.
    pub area_token: String,
    /// Only assignments with this status.
    pub status: Option<AssignmentStatus>,
    /// Paging and active-date range.
    pub paging: SearchCriteria,
}

impl AssignmentSearchCriteria {
    /// Every assignment of an area.
    pub fn for_area(area_token: impl Into<String>) -> Self {
        Self {
            area_token: area_token.into(),
            status: None,
            paging: SearchCriteria::all(),
        }
    }
}

/// Assignments of devices to areas.
#[derive(Debug, Clone, Copy)]
pub struct DeviceAssignmentStore<'a> {
    ctx: &'a StoreContext,
}

/// Resolves an assignment token to its row key in the `areas` table.
pub(crate) fn resolve_assignment_key(ctx: &StoreContext, token: &str) -> StoreResult<Vec<u8>> {
    resolve_key(&ctx.directories().assignments, FAMILY, token)
}

fn status_cell(status: AssignmentStatus) -> Cell {
    Cell::new(columns::ASSIGNMENT_STATUS, vec![status.code()])
}

fn state_cells(ctx: &StoreContext, state: &AssignmentState) -> StoreResult<Vec<Cell>> {
    let (indicator, body) = encode_entity(ctx.resolver(), state)?;
    Ok(vec![
        Cell::new(columns::ASSIGNMENT_STATE_TYPE, indicator),
        Cell::new(columns::ASSIGNMENT_STATE, body),
    ])
}

fn row_cells(ctx: &StoreContext, assignment: &DeviceAssignment) -> StoreResult<Vec<Cell>> {
    let mut cells = payload_cells(ctx, assignment)?;
    cells.push(status_cell(assignment.status));
    if let Some(state) = &assignment.state {
        cells.extend(state_cells(ctx, state)?);
    }
    Ok(cells)
}

fn decode_assignment(ctx: &StoreContext, row: &Row) -> StoreResult<DeviceAssignment> {
    let mut assignment: DeviceAssignment = decode_row(ctx, FAMILY, row)?;
    if let Some(code) = row.get(columns::ASSIGNMENT_STATUS) {
        assignment.status = code
            .first()
            .copied()
            .and_then(AssignmentStatus::from_code)
            .ok_or_else(|| StoreError::corrupt_row(FAMILY, "unknown assignment status code"))?;
    }
    if let (Some(indicator), Some(body)) = (
        row.get(columns::ASSIGNMENT_STATE_TYPE),
        row.get(columns::ASSIGNMENT_STATE),
    ) {
        assignment.state = Some(decode_entity(ctx.resolver(), indicator, body)?);
    }
    Ok(assignment)
}

impl<'a> DeviceAssignmentStore<'a> {
    /// Creates a store over a context.
    pub fn new(ctx: &'a StoreContext) -> Self {
        Self { ctx }
    }

    fn load(&self, token: &str) -> StoreResult<(Vec<u8>, DeviceAssignment)> {
        let key = resolve_assignment_key(self.ctx, token)?;
        let table = self.ctx.table(Table::Areas)?;
        let row = table
            .get(&key, &[])
            .context("unable to load device assignment")?
            .ok_or_else(|| StoreError::invalid_token(FAMILY, token))?;
        Ok((key, decode_assignment(self.ctx, &row)?))
    }

    /// Clears the device's active assignment column if it still names `token`.
    fn clear_current(&self, device_token: &str, token: &str) -> StoreResult<()> {
        let Some(id) = self.ctx.directories().devices.get_id(device_token)? else {
            return Ok(());
        };
        let key = super::device::device_key(id);
        let table = self.ctx.table(Table::Devices)?;
        let row = table
            .get(&key, &[columns::CURRENT_ASSIGNMENT.to_vec()])
            .context("unable to load device")?;
        if row.as_ref().and_then(current_assignment).as_deref() == Some(token) {
            table
                .delete_columns(&key, &[columns::CURRENT_ASSIGNMENT.to_vec()])
                .context("unable to release device assignment")?;
        }
        Ok(())
    }

    fn list_area<F>(
        &self,
        area_token: &str,
        paging: &SearchCriteria,
        mut accept: F,
    ) -> StoreResult<SearchResults<DeviceAssignment>>
    where
        F: FnMut(&DeviceAssignment) -> bool,
    {
        let scope = area_scope(self.ctx, area_token)?;
        let table = self.ctx.table(Table::Areas)?;
        collect_page(
            &table,
            keys::child_range(&scope, AreaRecord::Assignment),
            paging,
            FAMILY,
            |_, row| {
                let assignment = decode_assignment(self.ctx, row)?;
                Ok(accept(&assignment).then_some(assignment))
            },
        )
    }

    /// Sets an assignment's status, writing only the status column.
    ///
    /// Setting [`AssignmentStatus::Released`] ends the assignment as
    /// [`end_assignment`](Self::end_assignment) does.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` for unknown tokens or `AssignmentNotActive`
    /// if the assignment was already released.
    pub fn update_status(&self, token: &str, status: AssignmentStatus) -> StoreResult<DeviceAssignment> {
        if status == AssignmentStatus::Released {
            return self.end_assignment(token);
        }
        let (key, mut assignment) = self.load(token)?;
        if !assignment.is_active() {
            return Err(Precondition::AssignmentNotActive {
                assignment_token: token.to_string(),
            }
            .into());
        }
        let table = self.ctx.table(Table::Areas)?;
        table
            .put(&key, vec![status_cell(status)])
            .context("unable to update assignment status")?;
        assignment.status = status;
        tracing::debug!(token, ?status, "updated assignment status");
        Ok(assignment)
    }

    /// Replaces an assignment's presence state, writing only the state columns.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` for unknown tokens or `NonFiniteValue` if
    /// the last location is not finite.
    pub fn update_state(&self, token: &str, state: &AssignmentState) -> StoreResult<DeviceAssignment> {
        logic::check_assignment_state(state)?;
        let (key, mut assignment) = self.load(token)?;
        let table = self.ctx.table(Table::Areas)?;
        table
            .put(&key, state_cells(self.ctx, state)?)
            .context("unable to update assignment state")?;
        assignment.state = Some(state.clone());
        tracing::trace!(token, "updated assignment state");
        Ok(assignment)
    }

    /// Ends an assignment and frees its device for a new one.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` for unknown tokens or `AssignmentNotActive`
    /// if the assignment was already released.
    pub fn end_assignment(&self, token: &str) -> StoreResult<DeviceAssignment> {
        let (key, existing) = self.load(token)?;
        let released = logic::release_assignment(&existing, now_millis())?;

        let table = self.ctx.table(Table::Areas)?;
        let mut cells = payload_cells(self.ctx, &released)?;
        cells.push(status_cell(released.status));
        table
            .put(&key, cells)
            .context("unable to end device assignment")?;
        self.clear_current(&released.device_token, token)?;

        tracing::debug!(token, device = %released.device_token, "ended device assignment");
        Ok(released)
    }

    /// Returns the device's active assignment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the device does not resolve.
    pub fn get_active_assignment(&self, device_token: &str) -> StoreResult<Option<DeviceAssignment>> {
        let key = resolve_device_key(self.ctx, device_token)?;
        let table = self.ctx.table(Table::Devices)?;
        let token = table
            .get(&key, &[columns::CURRENT_ASSIGNMENT.to_vec()])
            .context("unable to load device")?
            .as_ref()
            .and_then(current_assignment);
        drop(table);
        match token {
            Some(token) => self.get_by_token(&token),
            None => Ok(None),
        }
    }

    /// Lists every assignment a device has had, newest first.
    ///
    /// Assignments removed by force delete are skipped.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the device does not resolve.
    pub fn list_device_history(
        &self,
        device_token: &str,
        paging: &SearchCriteria,
    ) -> StoreResult<SearchResults<DeviceAssignment>> {
        let key = resolve_device_key(self.ctx, device_token)?;
        let row = self
            .ctx
            .table(Table::Devices)?
            .get(&key, &[])
            .context("unable to load device")?
            .ok_or_else(|| StoreError::invalid_token(EntityFamily::Device, device_token))?;

        let mut pager = Pager::new(paging);
        for (_, value) in row.with_prefix(columns::ASSIGNMENT_HISTORY) {
            let Ok(token) = std::str::from_utf8(value) else {
                continue;
            };
            if let Some(assignment) = self.get_by_token(token)? {
                if paging.matches_date(Some(assignment.active_date)) {
                    pager.process(assignment);
                }
            }
        }
        Ok(pager.finish())
    }

    /// Lists an area's assignments whose last interaction falls inside the
    /// criteria's date range.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the area does not resolve.
    pub fn list_assignments_with_last_interaction(
        &self,
        area_token: &str,
        criteria: &SearchCriteria,
    ) -> StoreResult<SearchResults<DeviceAssignment>> {
        self.list_area(area_token, criteria, |assignment| {
            let last_interaction = assignment
                .state
                .as_ref()
                .and_then(|s| s.last_interaction_date);
            !assignment.deleted
                && last_interaction.is_some()
                && criteria.matches_date(last_interaction)
        })
    }

    /// Lists an area's unreleased assignments whose device is flagged missing.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the area does not resolve.
    pub fn list_missing_assignments(
        &self,
        area_token: &str,
        paging: &SearchCriteria,
    ) -> StoreResult<SearchResults<DeviceAssignment>> {
        self.list_area(area_token, paging, |assignment| {
            !assignment.deleted
                && assignment.is_active()
                && assignment
                    .state
                    .as_ref()
                    .is_some_and(|s| s.presence_missing_date.is_some())
        })
    }
}

impl EntityStore for DeviceAssignmentStore<'_> {
    type Entity = DeviceAssignment;
    type Request = DeviceAssignmentRequest;
    type Criteria = AssignmentSearchCriteria;

    const FAMILY: EntityFamily = FAMILY;

    fn create(&self, request: &DeviceAssignmentRequest) -> StoreResult<DeviceAssignment> {
        let directory = &self.ctx.directories().assignments;
        if let Some(token) = &request.token {
            ensure_token_free(directory, FAMILY, token)?;
        }
        let mut assignment = logic::device_assignment(request, String::new(), now_millis())?;

        let device_key = resolve_device_key(self.ctx, &assignment.device_token)?;
        let devices = self.ctx.table(Table::Devices)?;
        let device_row = devices
            .get(&device_key, &[columns::CURRENT_ASSIGNMENT.to_vec()])
            .context("unable to load device")?
            .ok_or_else(|| StoreError::invalid_token(EntityFamily::Device, &assignment.device_token))?;
        if let Some(active) = current_assignment(&device_row) {
            return Err(Precondition::DeviceAlreadyAssigned {
                device_token: assignment.device_token,
                assignment_token: active,
            }
            .into());
        }
        let scope = area_scope(self.ctx, &assignment.area_token)?;

        let areas = self.ctx.table(Table::Areas)?;
        let value = CounterAllocator::ASSIGNMENTS.allocate(&areas, &area_key(&scope))?;
        let key = keys::child_key(&scope, AreaRecord::Assignment, &keys::local_id(value));
        assignment.token = map_child_token(directory, request.token.as_ref(), &key)?;

        let written = areas
            .put(&key, row_cells(self.ctx, &assignment)?)
            .context("unable to create device assignment");
        release_on_error(directory, FAMILY, &assignment.token, written)?;

        let token = assignment.token.as_bytes();
        let marked = devices
            .put(
                &device_key,
                vec![
                    Cell::new(columns::CURRENT_ASSIGNMENT, token),
                    Cell::new(history_column(assignment.active_date, &key), token),
                ],
            )
            .context("unable to mark device assigned");
        if marked.is_err() {
            if let Err(e) = areas.delete(&key) {
                tracing::warn!(token = %assignment.token, error = %e, "unable to remove unlinked assignment row");
            }
            release_on_error(directory, FAMILY, &assignment.token, marked)?;
        }

        tracing::debug!(
            token = %assignment.token,
            device = %assignment.device_token,
            area = %assignment.area_token,
            "created device assignment"
        );
        Ok(assignment)
    }

    fn get_by_token(&self, token: &str) -> StoreResult<Option<DeviceAssignment>> {
        let Some(key) = self.ctx.directories().assignments.get_value(token)? else {
            return Ok(None);
        };
        let table = self.ctx.table(Table::Areas)?;
        let row = table
            .get(&key, &[])
            .context("unable to load device assignment")?;
        row.map(|row| decode_assignment(self.ctx, &row)).transpose()
    }

    fn update(&self, token: &str, request: &DeviceAssignmentRequest) -> StoreResult<DeviceAssignment> {
        let (key, existing) = self.load(token)?;
        let updated = logic::update_device_assignment(&existing, request, now_millis());
        let table = self.ctx.table(Table::Areas)?;
        table
            .put(&key, payload_cells(self.ctx, &updated)?)
            .context("unable to update device assignment")?;
        tracing::debug!(token, "updated device assignment");
        Ok(updated)
    }

    fn list(
        &self,
        criteria: &AssignmentSearchCriteria,
        include_deleted: bool,
    ) -> StoreResult<SearchResults<DeviceAssignment>> {
        self.list_area(&criteria.area_token, &criteria.paging, |assignment| {
            (include_deleted || !assignment.deleted)
                && criteria.paging.matches_date(Some(assignment.active_date))
                && criteria.status.map_or(true, |s| assignment.status == s)
        })
    }

    fn delete(&self, token: &str, force: bool) -> StoreResult<DeviceAssignment> {
        let (key, existing) = self.load(token)?;
        let table = self.ctx.table(Table::Areas)?;
        if force {
            remove_entity(&table, &self.ctx.directories().assignments, FAMILY, &key, token)?;
            drop(table);
            self.clear_current(&existing.device_token, token)?;
            tracing::warn!(token, "force deleted device assignment; its streams are orphaned");
        } else {
            mark_deleted(&table, FAMILY, &key)?;
            tracing::debug!(token, "soft deleted device assignment");
        }
        Ok(existing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AreaRequest, DeviceRequest, DeviceTypeRequest, Location};
    use crate::store::{testing, AreaStore, DeviceStore, DeviceTypeStore};

    struct Fixture {
        area: String,
        device: String,
    }

    fn fixture(ctx: &StoreContext) -> Fixture {
        let area = AreaStore::new(ctx)
            .create(&AreaRequest {
                name: Some("yard".into()),
                ..AreaRequest::default()
            })
            .unwrap()
            .token;
        let device_type = DeviceTypeStore::new(ctx)
            .create(&DeviceTypeRequest {
                name: Some("tag".into()),
                ..DeviceTypeRequest::default()
            })
            .unwrap()
            .token;
        let device = DeviceStore::new(ctx)
            .create(&DeviceRequest {
                device_type_token: Some(device_type),
                ..DeviceRequest::default()
            })
            .unwrap()
            .token;
        Fixture { area, device }
    }

    fn request(f: &Fixture) -> DeviceAssignmentRequest {
        DeviceAssignmentRequest {
            device_token: Some(f.device.clone()),
            area_token: Some(f.area.clone()),
            ..DeviceAssignmentRequest::default()
        }
    }

    #[test]
    fn create_links_device() {
        let (_, ctx) = testing::context();
        let f = fixture(&ctx);
        let store = DeviceAssignmentStore::new(&ctx);
        let assignment = store.create(&request(&f)).unwrap();

        assert_eq!(assignment.status, AssignmentStatus::Active);
        assert_eq!(store.get_by_token(&assignment.token).unwrap(), Some(assignment.clone()));
        assert_eq!(store.get_active_assignment(&f.device).unwrap(), Some(assignment));
    }

    #[test]
    fn end_assignment_frees_device() {
        let (_, ctx) = testing::context();
        let f = fixture(&ctx);
        let store = DeviceAssignmentStore::new(&ctx);
        let first = store.create(&request(&f)).unwrap();

        let released = store.end_assignment(&first.token).unwrap();
        assert_eq!(released.status, AssignmentStatus::Released);
        assert!(released.released_date.is_some());
        assert_eq!(store.get_active_assignment(&f.device).unwrap(), None);
        assert!(matches!(
            store.end_assignment(&first.token).unwrap_err().precondition(),
            Some(Precondition::AssignmentNotActive { .. })
        ));

        let second = store.create(&request(&f)).unwrap();
        let history = store
            .list_device_history(&f.device, &SearchCriteria::all())
            .unwrap();
        let tokens: Vec<_> = history.results.iter().map(|a| a.token.clone()).collect();
        assert_eq!(tokens.len(), 2);
        assert!(tokens.contains(&first.token) && tokens.contains(&second.token));
    }

    #[test]
    fn status_column_overrides_payload() {
        let (_, ctx) = testing::context();
        let f = fixture(&ctx);
        let store = DeviceAssignmentStore::new(&ctx);
        let assignment = store.create(&request(&f)).unwrap();

        store
            .update_status(&assignment.token, AssignmentStatus::Missing)
            .unwrap();
        let loaded = store.require(&assignment.token).unwrap();
        assert_eq!(loaded.status, AssignmentStatus::Missing);
        assert_eq!(loaded.metadata, assignment.metadata);
    }

    #[test]
    fn state_filters_use_decoded_state() {
        let (_, ctx) = testing::context();
        let f = fixture(&ctx);
        let store = DeviceAssignmentStore::new(&ctx);
        let assignment = store.create(&request(&f)).unwrap();

        assert!(store
            .list_assignments_with_last_interaction(&f.area, &SearchCriteria::all())
            .unwrap()
            .is_empty());

        let state = AssignmentState {
            last_interaction_date: Some(5_000),
            presence_missing_date: Some(6_000),
            last_location: Some(Location::new(1.5, 2.5)),
        };
        store.update_state(&assignment.token, &state).unwrap();
        assert_eq!(store.require(&assignment.token).unwrap().state, Some(state));

        let in_range = SearchCriteria::all().in_date_range(Some(4_000), Some(5_500));
        let out_of_range = SearchCriteria::all().in_date_range(Some(5_001), None);
        assert_eq!(
            store.list_assignments_with_last_interaction(&f.area, &in_range).unwrap().num_results,
            1
        );
        assert!(store
            .list_assignments_with_last_interaction(&f.area, &out_of_range)
            .unwrap()
            .is_empty());
        assert_eq!(
            store.list_missing_assignments(&f.area, &SearchCriteria::all()).unwrap().num_results,
            1
        );

        store.end_assignment(&assignment.token).unwrap();
        assert!(store.list_missing_assignments(&f.area, &SearchCriteria::all()).unwrap().is_empty());
    }

    #[test]
    fn list_by_status() {
        let (_, ctx) = testing::context();
        let f = fixture(&ctx);
        let store = DeviceAssignmentStore::new(&ctx);
        let first = store.create(&request(&f)).unwrap();
        store.end_assignment(&first.token).unwrap();
        let second = store.create(&request(&f)).unwrap();

        let mut criteria = AssignmentSearchCriteria::for_area(&f.area);
        criteria.status = Some(AssignmentStatus::Active);
        let active = store.list(&criteria, false).unwrap();
        assert_eq!(active.results, vec![second]);
    }

    #[test]
    fn force_delete_releases_device() {
        let (_, ctx) = testing::context();
        let f = fixture(&ctx);
        let store = DeviceAssignmentStore::new(&ctx);
        let assignment = store.create(&request(&f)).unwrap();

        store.delete(&assignment.token, true).unwrap();
        assert_eq!(store.get_by_token(&assignment.token).unwrap(), None);
        assert_eq!(
            DeviceStore::new(&ctx)
                .active_assignment_token(&f.device)
                .unwrap(),
            None
        );
        assert!(store
            .list_device_history(&f.device, &SearchCriteria::all())
            .unwrap()
            .is_empty());
    }
}
