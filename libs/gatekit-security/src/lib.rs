#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

pub mod access_scope;
pub mod authz_context;
pub mod identity;

pub use access_scope::{AccessScope, FilterOp, ScopeFilter, ScopeValue, ScopedRecord, properties};
pub use authz_context::{AuthzContext, Capabilities, ScopingFlags, capabilities};
pub use identity::{Identity, IdentityBuilder};
