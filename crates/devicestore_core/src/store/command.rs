//! Device command persistence.

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
use crate::model::{DeviceCommand, DeviceCommandRequest};
use crate::paging::{SearchCriteria, SearchResults};
use crate::schema::{DeviceTypeRecord, Table};
use crate::types::{now_millis, EntityFamily};
use devicestore_storage::TableHandle;

/// Commands of one device type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSearchCriteria {
    /// Owning device type.
    pub device_type_token: String,
    /// Only commands in this namespace.
    pub namespace: Option<String>,
    /// Paging and created-date range.
    pub paging: SearchCriteria,
}

impl CommandSearchCriteria {
    /// Every command of a device type.
    pub fn for_device_type(device_type_token: impl Into<String>) -> Self {
        Self {
            device_type_token: device_type_token.into(),
            namespace: None,
            paging: SearchCriteria::all(),
        }
    }
}

/// Commands, stored under their device type's scope with a descending id.
#[derive(Debug, Clone, Copy)]
pub struct DeviceCommandStore<'a> {
    ctx: &'a StoreContext,
}

impl<'a> DeviceCommandStore<'a> {
    /// Creates a store over a context.
    pub fn new(ctx: &'a StoreContext) -> Self {
        Self { ctx }
    }

    fn load(&self, token: &str) -> StoreResult<(Vec<u8>, DeviceCommand)> {
        let key = resolve_key(&self.ctx.directories().commands, EntityFamily::DeviceCommand, token)?;
        let table = self.ctx.table(Table::DeviceTypes)?;
        let command = read_entity(self.ctx, &table, EntityFamily::DeviceCommand, &key)?
            .ok_or_else(|| StoreError::invalid_token(EntityFamily::DeviceCommand, token))?;
        Ok((key, command))
    }

    fn ensure_unique(
        &self,
        table: &dyn TableHandle,
        scope: &[u8],
        command: &DeviceCommand,
    ) -> StoreResult<()> {
        let existing = list_entities::<DeviceCommand, _>(
            self.ctx,
            table,
            EntityFamily::DeviceCommand,
            keys::child_range(scope, DeviceTypeRecord::Command),
            &SearchCriteria::all(),
            false,
            |_, c| c.token != command.token && c.namespace == command.namespace && c.name == command.name,
        )?;
        if !existing.is_empty() {
            return Err(Precondition::DuplicateCommand {
                device_type_token: command.device_type_token.clone(),
                namespace: command.namespace.clone(),
                name: command.name.clone(),
            }
            .into());
        }
        Ok(())
    }
}

impl EntityStore for DeviceCommandStore<'_> {
    type Entity = DeviceCommand;
    type Request = DeviceCommandRequest;
    type Criteria = CommandSearchCriteria;

    const FAMILY: EntityFamily = EntityFamily::DeviceCommand;

    fn create(&self, request: &DeviceCommandRequest) -> StoreResult<DeviceCommand> {
        let directory = &self.ctx.directories().commands;
        if let Some(token) = &request.token {
            ensure_token_free(directory, Self::FAMILY, token)?;
        }
        let mut command = logic::device_command(request, String::new(), now_millis())?;
        let scope = device_type_scope(self.ctx, &command.device_type_token)?;

        let table = self.ctx.table(Table::DeviceTypes)?;
        self.ensure_unique(&table, &scope, &command)?;
        let value = CounterAllocator::COMMANDS.allocate(&table, &device_type_key(&scope))?;
        let key = keys::child_key(&scope, DeviceTypeRecord::Command, &keys::local_id(value));
        command.token = map_child_token(directory, request.token.as_ref(), &key)?;

        let written = table
            .put(&key, payload_cells(self.ctx, &command)?)
            .context("unable to create device command");
        release_on_error(directory, Self::FAMILY, &command.token, written)?;

        tracing::debug!(
            token = %command.token,
            device_type = %command.device_type_token,
            "created device command"
        );
        Ok(command)
    }

    fn get_by_token(&self, token: &str) -> StoreResult<Option<DeviceCommand>> {
        let Some(key) = self.ctx.directories().commands.get_value(token)? else {
            return Ok(None);
        };
        let table = self.ctx.table(Table::DeviceTypes)?;
        read_entity(self.ctx, &table, Self::FAMILY, &key)
    }

    fn update(&self, token: &str, request: &DeviceCommandRequest) -> StoreResult<DeviceCommand> {
        let (key, existing) = self.load(token)?;
        let updated = logic::update_device_command(&existing, request, now_millis());

        let table = self.ctx.table(Table::DeviceTypes)?;
        if (&updated.namespace, &updated.name) != (&existing.namespace, &existing.name) {
            let scope = device_type_scope(self.ctx, &existing.device_type_token)?;
            self.ensure_unique(&table, &scope, &updated)?;
        }
        table
            .put(&key, payload_cells(self.ctx, &updated)?)
            .context("unable to update device command")?;
        tracing::debug!(token, "updated device command");
        Ok(updated)
    }

    fn list(
        &self,
        criteria: &CommandSearchCriteria,
        include_deleted: bool,
    ) -> StoreResult<SearchResults<DeviceCommand>> {
        let scope = device_type_scope(self.ctx, &criteria.device_type_token)?;
        let table = self.ctx.table(Table::DeviceTypes)?;
        list_entities(
            self.ctx,
            &table,
            Self::FAMILY,
            keys::child_range(&scope, DeviceTypeRecord::Command),
            &criteria.paging,
            include_deleted,
            |_, command: &DeviceCommand| {
                criteria
                    .namespace
                    .as_ref()
                    .map_or(true, |ns| &command.namespace == ns)
            },
        )
    }

    fn delete(&self, token: &str, force: bool) -> StoreResult<DeviceCommand> {
        let (key, existing) = self.load(token)?;
        let table = self.ctx.table(Table::DeviceTypes)?;
        if force {
            remove_entity(&table, &self.ctx.directories().commands, Self::FAMILY, &key, token)?;
        } else {
            mark_deleted(&table, Self::FAMILY, &key)?;
        }
        tracing::debug!(token, force, "deleted device command");
        Ok(existing)
    }
}
