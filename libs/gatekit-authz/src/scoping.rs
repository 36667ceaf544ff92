//! Row-level scoping predicates derived from an [`AuthzContext`].
//!
//! The resulting [`AccessScope`] is handed to the data-access layer, which
//! applies it to every read of an enrolled entity type.

use gatekit_security::{AccessScope, AuthzContext, ScopeFilter, properties};

/// `department == ctx.department`, when department scoping applies and the
/// caller has a department.
#[must_use]
pub fn department_predicate(ctx: &AuthzContext) -> Option<ScopeFilter> {
    if !ctx.applies_department_filter() {
        return None;
    }
    ctx.department()
        .map(|department| ScopeFilter::eq(properties::DEPARTMENT, department))
}

/// `is_sensitive == false`, when sensitivity scoping applies.
#[must_use]
pub fn sensitivity_predicate(ctx: &AuthzContext) -> Option<ScopeFilter> {
    ctx.applies_sensitivity_filter()
        .then(|| ScopeFilter::eq(properties::IS_SENSITIVE, false))
}

/// Combine every active predicate with AND.
///
/// No context (a route without authentication) and a context with no active
/// predicate both yield an unconstrained scope. Department scoping for a
/// caller without a department denies every row.
#[must_use]
pub fn access_scope(ctx: Option<&AuthzContext>) -> AccessScope {
    let Some(ctx) = ctx else {
        return AccessScope::allow_all();
    };

    if ctx.applies_department_filter() && ctx.department().is_none() {
        tracing::debug!(user_id = ctx.user_id(), "department scoping without a department");
        return AccessScope::deny_all();
    }

    let filters = department_predicate(ctx)
        .into_iter()
        .chain(sensitivity_predicate(ctx))
        .collect();
    AccessScope::from_filters(filters)
}
