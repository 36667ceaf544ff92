use serde::{Deserialize, Serialize};

/// Well-known scoping property names.
///
/// These constants are shared between the scoping hook that produces filters
/// and the data-access layer (`ScopableEntity::resolve_property()`), ensuring
/// a single source of truth for property names.
pub mod properties {
    /// Owning department of a row. Typically maps to a `department` column.
    pub const DEPARTMENT: &str = "department";

    /// Row-level sensitivity marker. Typically maps to an `is_sensitive` column.
    pub const IS_SENSITIVE: &str = "is_sensitive";
}

/// Predicate operation type for scope filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    /// `property = value`.
    Eq,
}

/// A value a scope filter compares against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeValue {
    Text(String),
    Flag(bool),
}

impl From<&str> for ScopeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for ScopeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for ScopeValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

/// A single scope filter: a condition on a named row property.
///
/// The property name (e.g. `"department"`) is an authorization concept.
/// Mapping to storage columns is done by the data-access layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeFilter {
    property: String,
    op: FilterOp,
    value: ScopeValue,
}

impl ScopeFilter {
    /// Create a new scope filter.
    #[must_use]
    pub fn new(property: impl Into<String>, op: FilterOp, value: impl Into<ScopeValue>) -> Self {
        Self {
            property: property.into(),
            op,
            value: value.into(),
        }
    }

    /// Shorthand for an equality filter.
    #[must_use]
    pub fn eq(property: impl Into<String>, value: impl Into<ScopeValue>) -> Self {
        Self::new(property, FilterOp::Eq, value)
    }

    #[inline]
    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }

    #[inline]
    #[must_use]
    pub fn op(&self) -> FilterOp {
        self.op
    }

    #[inline]
    #[must_use]
    pub fn value(&self) -> &ScopeValue {
        &self.value
    }

    fn permits(&self, record: &impl ScopedRecord) -> bool {
        match self.op {
            FilterOp::Eq => record.scope_property(&self.property).as_ref() == Some(&self.value),
        }
    }
}

/// A row that can be checked against an [`AccessScope`] without a query engine.
///
/// Returning `None` for a property means the row does not carry it; filters on
/// such a property never match (fail-closed).
pub trait ScopedRecord {
    fn scope_property(&self, property: &str) -> Option<ScopeValue>;
}

/// A conjunction (AND) of scope filters defining which rows are visible.
///
/// An unconstrained scope (no filters) bypasses row-level filtering.
/// A deny-all scope matches nothing regardless of its filters.
///
/// # Examples
///
/// ```
/// use gatekit_security::access_scope::{AccessScope, ScopeFilter, properties};
///
/// let scope = AccessScope::deny_all();
/// assert!(scope.is_deny_all());
///
/// let scope = AccessScope::allow_all().and(ScopeFilter::eq(properties::DEPARTMENT, "IT"));
/// assert!(!scope.is_unconstrained());
/// assert!(scope.has_property(properties::DEPARTMENT));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessScope {
    filters: Vec<ScopeFilter>,
    deny_all: bool,
}

impl Default for AccessScope {
    /// Default is deny-all.
    fn default() -> Self {
        Self::deny_all()
    }
}

impl AccessScope {
    // ── Constructors ────────────────────────────────────────────────

    /// Create a scope from a list of filters (AND-ed).
    #[must_use]
    pub fn from_filters(filters: Vec<ScopeFilter>) -> Self {
        Self {
            filters,
            deny_all: false,
        }
    }

    /// Create an "allow all" (unconstrained) scope.
    ///
    /// This is a legitimate outcome when no scoping flag is active or the
    /// caller holds the capabilities that lift them.
    #[must_use]
    pub fn allow_all() -> Self {
        Self::from_filters(Vec::new())
    }

    /// Create a "deny all" scope (no rows visible).
    #[must_use]
    pub fn deny_all() -> Self {
        Self {
            filters: Vec::new(),
            deny_all: true,
        }
    }

    /// Add another filter to the conjunction.
    #[must_use]
    pub fn and(mut self, filter: ScopeFilter) -> Self {
        self.filters.push(filter);
        self
    }

    // ── Accessors ───────────────────────────────────────────────────

    /// The filters in this scope (AND-ed).
    #[inline]
    #[must_use]
    pub fn filters(&self) -> &[ScopeFilter] {
        &self.filters
    }

    /// Returns `true` if this scope applies no row filtering at all.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        !self.deny_all && self.filters.is_empty()
    }

    /// Returns `true` if this scope denies all rows.
    #[inline]
    #[must_use]
    pub fn is_deny_all(&self) -> bool {
        self.deny_all
    }

    /// Check if any filter references the given property.
    #[must_use]
    pub fn has_property(&self, property: &str) -> bool {
        self.filters.iter().any(|f| f.property() == property)
    }

    /// Evaluate the scope against a single in-memory row.
    #[must_use]
    pub fn permits(&self, record: &impl ScopedRecord) -> bool {
        !self.deny_all && self.filters.iter().all(|f| f.permits(record))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    struct Row {
        department: &'static str,
        is_sensitive: bool,
    }

    impl ScopedRecord for Row {
        fn scope_property(&self, property: &str) -> Option<ScopeValue> {
            match property {
                properties::DEPARTMENT => Some(self.department.into()),
                properties::IS_SENSITIVE => Some(self.is_sensitive.into()),
                _ => None,
            }
        }
    }

    #[test]
    fn default_scope_is_deny_all() {
        let scope = AccessScope::default();
        assert!(scope.is_deny_all());
        assert!(!scope.permits(&Row {
            department: "IT",
            is_sensitive: false,
        }));
    }

    #[test]
    fn allow_all_permits_every_row() {
        let scope = AccessScope::allow_all();
        assert!(scope.is_unconstrained());
        assert!(scope.permits(&Row {
            department: "HR",
            is_sensitive: true,
        }));
    }

    #[test]
    fn filters_are_and_ed() {
        let scope = AccessScope::allow_all()
            .and(ScopeFilter::eq(properties::DEPARTMENT, "IT"))
            .and(ScopeFilter::eq(properties::IS_SENSITIVE, false));

        assert!(scope.permits(&Row {
            department: "IT",
            is_sensitive: false,
        }));
        assert!(!scope.permits(&Row {
            department: "IT",
            is_sensitive: true,
        }));
        assert!(!scope.permits(&Row {
            department: "FIN",
            is_sensitive: false,
        }));
    }

    #[test]
    fn unknown_property_fails_closed() {
        let scope = AccessScope::from_filters(vec![ScopeFilter::eq("owner_id", "u1")]);
        assert!(!scope.permits(&Row {
            department: "IT",
            is_sensitive: false,
        }));
    }

    #[test]
    fn scope_serializes_with_plain_values() {
        let scope = AccessScope::from_filters(vec![ScopeFilter::eq(properties::IS_SENSITIVE, false)]);
        let json = serde_json::to_value(&scope).unwrap();
        assert_eq!(json["filters"][0]["value"], serde_json::json!(false));
        assert_eq!(json["deny_all"], serde_json::json!(false));
    }
}
