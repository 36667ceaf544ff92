#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Declarative role-based access control.
//!
//! A policy document defines permissions (sets of `(path template, methods)`
//! rules), roles granting permissions with single inheritance, and public
//! rules. The document is loaded and validated once; effective permissions
//! are resolved once; decisions are then lock-free reads.

pub mod config;
pub mod engine;
pub mod error;
pub mod path;
pub mod resolver;

pub use config::{
    PermissionDefinition, RbacConfig, RbacRule, RoleDefinition, load_rbac_config,
};
pub use engine::RbacEngine;
pub use error::ConfigError;
pub use path::{MethodSet, PathTemplate, PathTemplateError};
pub use resolver::{EffectivePermissions, compute_effective};
