#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Data-access choke point for row-level scoping.
//!
//! Every read of an enrolled entity goes through [`secure::ScopedReader`],
//! which ANDs the caller's [`AccessScope`](gatekit_security::AccessScope)
//! into the query. Writes are not affected.

pub mod secure;

pub use secure::{ScopableEntity, ScopedReader, build_scope_condition};
