//! # DeviceStore Core
//!
//! Entity storage and indexing for IoT device management, built on the
//! sorted column-family substrate in `devicestore_storage`.
//!
//! This crate provides:
//! - Token directories mapping external tokens to internal ids and row keys
//! - Compact row keys that keep each parent's children contiguous
//! - Per-parent counters for child id allocation
//! - Create, read, update, list and soft or hard delete for every family
//! - Pluggable payload encodings through `devicestore_codec`
//!
//! ## Row keys
//!
//! Every parent family gets a 4-byte scope from its directory counter.
//! Children are stored under the parent's scope:
//!
//! ```text
//! [scope:4][discriminator][local:4]
//! ```
//!
//! Descending counters make the newest child sort first, so listing an
//! area's zones is one bounded scan in newest-first order. See
//! [`schema`] for the full layout and [`keys`] for the helpers.
//!
//! ## Token directories
//!
//! Tokens are opaque strings, generated as UUIDs unless the caller supplies
//! one. The [`IdDirectory`] for each family maps a token to an internal id
//! (counter-keyed families) or to the child's full row key (fragment-keyed
//! families) and keeps the reverse mapping.
//!
//! ## Example
//!
//! ```rust,ignore
//! use devicestore_core::{DeviceManagement, EntityStore, StoreConfig};
//! use devicestore_core::model::{AreaRequest, ZoneRequest};
//! use devicestore_storage::MemorySubstrate;
//! use std::sync::Arc;
//!
//! let dm = DeviceManagement::open(Arc::new(MemorySubstrate::new()), StoreConfig::new())?;
//! let area = dm.areas().create(&AreaRequest {
//!     name: Some("Dock".into()),
//!     ..AreaRequest::default()
//! })?;
//! dm.zones().create(&ZoneRequest {
//!     area_token: Some(area.token.clone()),
//!     name: Some("Bay 1".into()),
//!     ..ZoneRequest::default()
//! })?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod context;
mod counter;
mod directory;
mod error;
pub mod keys;
pub mod logic;
mod management;
pub mod model;
mod paging;
mod pool;
pub mod schema;
mod store;
mod types;

pub use config::StoreConfig;
pub use context::StoreContext;
pub use counter::{CounterAllocator, CounterPolicy};
pub use directory::{new_token, IdDirectories, IdDirectory, IdNamespace};
pub use error::{Precondition, ResultExt, StoreError, StoreResult};
pub use management::DeviceManagement;
pub use paging::{Pager, SearchCriteria, SearchResults};
pub use pool::{TableLease, TablePool};
pub use store::{
    AreaSearchCriteria, AreaStore, AreaTypeStore, AssignmentSearchCriteria, CommandSearchCriteria,
    DeviceAssignmentStore, DeviceCommandStore, DeviceGroupElementStore, DeviceGroupStore,
    DeviceSearchCriteria, DeviceStatusStore, DeviceStore, DeviceStreamStore, DeviceTypeStore,
    EntityStore, GroupSearchCriteria, StatusSearchCriteria, StreamSearchCriteria,
    ZoneSearchCriteria, ZoneStore,
};
pub use types::{now_millis, EntityFamily};
