#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Request authorization on top of validated identities.
//!
//! A route-policy document decides which requests need authentication and
//! which roles they require; handler overrides add to it by operation id.
//! [`AccessGuard`] runs the whole pipeline and hands back the
//! [`AuthzContext`](gatekit_security::AuthzContext) and the row scope.

pub mod context_builder;
pub mod error;
pub mod guard;
pub mod overrides;
pub mod route_policy;
pub mod scoping;
pub mod user;

pub use context_builder::AuthorizationContextBuilder;
pub use error::{AuthzError, RoutePolicyError};
pub use guard::{AccessDecision, AccessGuard, extract_bearer};
pub use overrides::{HandlerOverride, OverrideRegistry};
pub use route_policy::{
    BearerSettings, DefaultPolicy, EffectiveRoutePolicy, RouteRule, SecurityPolicy,
    load_security_policy,
};
pub use scoping::{access_scope, department_predicate, sensitivity_predicate};
pub use user::{ClaimsUserResolver, ResolvedUser, UserResolver};
