//! Common test infrastructure
//!
//! Builds a small data lake on disk (song files, event logs and the event
//! jsonpaths document) and opens local warehouses over it.
//! Tests should only import from this module, not from internal submodules.

mod constants;
mod fixtures;

pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::{open_pipeline, query_string, TestDataLake};
