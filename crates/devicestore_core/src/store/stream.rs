//! Device stream persistence.
//!
//! Stream rows are keyed by the owning assignment's key followed by the
//! stream id, so an assignment's streams scan in stream id order.

use super::assignment::resolve_assignment_key;
use super::{
    ensure_token_free, list_entities, map_child_token, mark_deleted, payload_cells, read_entity,
    release_on_error, remove_entity, resolve_key, EntityStore,
};
use crate::context::StoreContext;
use crate::error::{Precondition, ResultExt, StoreError, StoreResult};
use crate::keys;
use crate::logic;
use crate::model::{DeviceStream, DeviceStreamRequest};
use crate::paging::{SearchCriteria, SearchResults};
use crate::schema::{columns, AssignmentRecord, Table};
use crate::types::{now_millis, EntityFamily};

/// Streams of one assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSearchCriteria {
    /// Owning assignment.
    pub assignment_token: String,
    /// Paging and created-date range.
    pub paging: SearchCriteria,
}

impl StreamSearchCriteria {
    /// Every stream of an assignment.
    pub fn for_assignment(assignment_token: impl Into<String>) -> Self {
        Self {
            assignment_token: assignment_token.into(),
            paging: SearchCriteria::all(),
        }
    }
}

/// Streams attached to device assignments.
#[derive(Debug, Clone, Copy)]
pub struct DeviceStreamStore<'a> {
    ctx: &'a StoreContext,
}

fn stream_key(assignment_key: &[u8], stream_id: &str) -> Vec<u8> {
    keys::child_key(assignment_key, AssignmentRecord::Stream, stream_id.as_bytes())
}

impl<'a> DeviceStreamStore<'a> {
    /// Creates a store over a context.
    pub fn new(ctx: &'a StoreContext) -> Self {
        Self { ctx }
    }

    fn load(&self, token: &str) -> StoreResult<(Vec<u8>, DeviceStream)> {
        let key = resolve_key(&self.ctx.directories().streams, EntityFamily::DeviceStream, token)?;
        let table = self.ctx.table(Table::Streams)?;
        let stream = read_entity(self.ctx, &table, EntityFamily::DeviceStream, &key)?
            .ok_or_else(|| StoreError::invalid_token(EntityFamily::DeviceStream, token))?;
        Ok((key, stream))
    }

    /// Looks up a stream by its id within an assignment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the assignment does not resolve.
    pub fn get_stream(&self, assignment_token: &str, stream_id: &str) -> StoreResult<Option<DeviceStream>> {
        let assignment_key = resolve_assignment_key(self.ctx, assignment_token)?;
        let table = self.ctx.table(Table::Streams)?;
        read_entity(
            self.ctx,
            &table,
            EntityFamily::DeviceStream,
            &stream_key(&assignment_key, stream_id),
        )
    }
}

impl EntityStore for DeviceStreamStore<'_> {
    type Entity = DeviceStream;
    type Request = DeviceStreamRequest;
    type Criteria = StreamSearchCriteria;

    const FAMILY: EntityFamily = EntityFamily::DeviceStream;

    fn create(&self, request: &DeviceStreamRequest) -> StoreResult<DeviceStream> {
        let directory = &self.ctx.directories().streams;
        if let Some(token) = &request.token {
            ensure_token_free(directory, Self::FAMILY, token)?;
        }
        let mut stream = logic::device_stream(request, String::new(), now_millis())?;
        let assignment_key = resolve_assignment_key(self.ctx, &stream.assignment_token)?;
        let key = stream_key(&assignment_key, &stream.stream_id);

        let table = self.ctx.table(Table::Streams)?;
        let existing = table
            .get(&key, &[columns::PAYLOAD_TYPE.to_vec()])
            .context("unable to check device stream")?;
        if existing.is_some() {
            return Err(Precondition::DuplicateStreamId {
                assignment_token: stream.assignment_token,
                stream_id: stream.stream_id,
            }
            .into());
        }
        stream.token = map_child_token(directory, request.token.as_ref(), &key)?;

        let written = table
            .put(&key, payload_cells(self.ctx, &stream)?)
            .context("unable to create device stream");
        release_on_error(directory, Self::FAMILY, &stream.token, written)?;

        tracing::debug!(
            token = %stream.token,
            assignment = %stream.assignment_token,
            stream_id = %stream.stream_id,
            "created device stream"
        );
        Ok(stream)
    }

    fn get_by_token(&self, token: &str) -> StoreResult<Option<DeviceStream>> {
        let Some(key) = self.ctx.directories().streams.get_value(token)? else {
            return Ok(None);
        };
        let table = self.ctx.table(Table::Streams)?;
        read_entity(self.ctx, &table, Self::FAMILY, &key)
    }

    fn update(&self, token: &str, request: &DeviceStreamRequest) -> StoreResult<DeviceStream> {
        let (key, existing) = self.load(token)?;
        let updated = logic::update_device_stream(&existing, request, now_millis());
        let table = self.ctx.table(Table::Streams)?;
        table
            .put(&key, payload_cells(self.ctx, &updated)?)
            .context("unable to update device stream")?;
        tracing::debug!(token, "updated device stream");
        Ok(updated)
    }

    fn list(
        &self,
        criteria: &StreamSearchCriteria,
        include_deleted: bool,
    ) -> StoreResult<SearchResults<DeviceStream>> {
        let assignment_key = resolve_assignment_key(self.ctx, &criteria.assignment_token)?;
        let table = self.ctx.table(Table::Streams)?;
        list_entities(
            self.ctx,
            &table,
            Self::FAMILY,
            keys::child_range(&assignment_key, AssignmentRecord::Stream),
            &criteria.paging,
            include_deleted,
            |_, _| true,
        )
    }

    fn delete(&self, token: &str, force: bool) -> StoreResult<DeviceStream> {
        let (key, existing) = self.load(token)?;
        let table = self.ctx.table(Table::Streams)?;
        if force {
            remove_entity(&table, &self.ctx.directories().streams, Self::FAMILY, &key, token)?;
        } else {
            mark_deleted(&table, Self::FAMILY, &key)?;
        }
        tracing::debug!(token, force, "deleted device stream");
        Ok(existing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AreaRequest, DeviceAssignmentRequest, DeviceRequest, DeviceTypeRequest};
    use crate::store::{testing, AreaStore, DeviceAssignmentStore, DeviceStore, DeviceTypeStore};

    fn assignment(ctx: &StoreContext) -> String {
        let area = AreaStore::new(ctx)
            .create(&AreaRequest {
                name: Some("dock".into()),
                ..AreaRequest::default()
            })
            .unwrap()
            .token;
        let device_type = DeviceTypeStore::new(ctx)
            .create(&DeviceTypeRequest {
                name: Some("camera".into()),
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
        DeviceAssignmentStore::new(ctx)
            .create(&DeviceAssignmentRequest {
                device_token: Some(device),
                area_token: Some(area),
                ..DeviceAssignmentRequest::default()
            })
            .unwrap()
            .token
    }

    fn stream(assignment: &str, id: &str) -> DeviceStreamRequest {
        DeviceStreamRequest {
            assignment_token: Some(assignment.to_string()),
            stream_id: Some(id.to_string()),
            content_type: Some("video/mp4".into()),
            ..DeviceStreamRequest::default()
        }
    }

    #[test]
    fn duplicate_stream_id_is_rejected() {
        let (_, ctx) = testing::context();
        let a = assignment(&ctx);
        let store = DeviceStreamStore::new(&ctx);
        let first = store.create(&stream(&a, "front")).unwrap();

        let err = store.create(&stream(&a, "front")).unwrap_err();
        assert!(matches!(
            err.precondition(),
            Some(Precondition::DuplicateStreamId { .. })
        ));
        assert_eq!(store.get_stream(&a, "front").unwrap(), Some(first));
    }

    #[test]
    fn streams_list_in_id_order() {
        let (_, ctx) = testing::context();
        let a = assignment(&ctx);
        let b = assignment(&ctx);
        let store = DeviceStreamStore::new(&ctx);
        store.create(&stream(&a, "rear")).unwrap();
        store.create(&stream(&a, "front")).unwrap();
        store.create(&stream(&b, "front")).unwrap();

        let listed = store
            .list(&StreamSearchCriteria::for_assignment(&a), false)
            .unwrap();
        let ids: Vec<_> = listed.results.iter().map(|s| s.stream_id.as_str()).collect();
        assert_eq!(ids, ["front", "rear"]);
    }

    #[test]
    fn update_keeps_stream_id() {
        let (_, ctx) = testing::context();
        let a = assignment(&ctx);
        let store = DeviceStreamStore::new(&ctx);
        let created = store.create(&stream(&a, "audio")).unwrap();

        let mut request = stream(&a, "renamed");
        request.content_type = Some("audio/ogg".into());
        let updated = store.update(&created.token, &request).unwrap();
        assert_eq!(updated.stream_id, "audio");
        assert_eq!(updated.content_type.as_deref(), Some("audio/ogg"));
        assert_eq!(store.get_stream(&a, "renamed").unwrap(), None);
    }

    #[test]
    fn unknown_assignment_is_invalid_token() {
        let (_, ctx) = testing::context();
        let err = DeviceStreamStore::new(&ctx)
            .create(&stream("nope", "x"))
            .unwrap_err();
        assert!(err.is_invalid_token(EntityFamily::DeviceAssignment));
    }
}
