//! # DeviceStore Testkit
//!
//! Test utilities for DeviceStore.
//!
//! This crate provides:
//! - A fault-injectable in-memory store with sample entity requests
//! - Property-based test generators using proptest
//! - Concurrent allocation helpers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use devicestore_testkit::prelude::*;
//!
//! #[test]
//! fn zones_list_newest_first() {
//!     let store = TestStore::new();
//!     let area = store.sample_area("yard");
//!     // ... test operations
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
    pub use crate::init_test_logging;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;

use std::sync::Once;

static LOGGING: Once = Once::new();

/// Installs a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`, defaulting to warnings only.
pub fn init_test_logging() {
    LOGGING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
