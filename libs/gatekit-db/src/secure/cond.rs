use sea_orm::{ColumnTrait, Condition, EntityTrait, Value, sea_query::Expr};

use gatekit_security::{AccessScope, FilterOp, ScopeFilter, ScopeValue};

use crate::secure::ScopableEntity;

/// Build a deny-all condition (`WHERE false`).
fn deny_all() -> Condition {
    Condition::all().add(Expr::value(false))
}

fn to_value(value: &ScopeValue) -> Value {
    match value {
        ScopeValue::Text(text) => text.clone().into(),
        ScopeValue::Flag(flag) => (*flag).into(),
    }
}

/// Builds a `SeaORM` `Condition` from an `AccessScope` using property resolution.
///
/// | Scope | Behavior |
/// |-------|----------|
/// | deny-all | `WHERE false` |
/// | unconstrained | no filtering |
/// | filters | AND of resolved filters |
/// | any unknown property | `WHERE false` |
pub fn build_scope_condition<E>(scope: &AccessScope) -> Condition
where
    E: ScopableEntity,
    E::Column: ColumnTrait + Copy,
{
    if scope.is_deny_all() {
        return deny_all();
    }
    if scope.is_unconstrained() {
        return Condition::all();
    }

    scope
        .filters()
        .iter()
        .try_fold(Condition::all(), |cond, filter| {
            filter_condition::<E>(filter).map(|c| cond.add(c))
        })
        .unwrap_or_else(deny_all)
}

/// `None` if the entity does not map the filter's property.
fn filter_condition<E>(filter: &ScopeFilter) -> Option<Condition>
where
    E: ScopableEntity,
    E::Column: ColumnTrait + Copy,
{
    let Some(col) = E::resolve_property(filter.property()) else {
        let entity = E::default();
        tracing::warn!(
            entity = entity.table_name(),
            property = filter.property(),
            "scope property not mapped by entity; denying"
        );
        return None;
    };
    match filter.op() {
        FilterOp::Eq => Some(Condition::all().add(col.eq(to_value(filter.value())))),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use sea_orm::{DbBackend, QueryFilter, QueryTrait};

    use super::*;
    use gatekit_security::properties;

    mod doc {
        use sea_orm::entity::prelude::*;

        use crate::secure::ScopableEntity;
        use gatekit_security::properties;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "docs")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i32,
            pub department: String,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}

        impl ScopableEntity for Entity {
            fn resolve_property(property: &str) -> Option<Column> {
                (property == properties::DEPARTMENT).then_some(Column::Department)
            }
        }
    }

    /// Text after `WHERE`, if any.
    fn where_clause(scope: &AccessScope) -> Option<String> {
        let sql = doc::Entity::find()
            .filter(build_scope_condition::<doc::Entity>(scope))
            .build(DbBackend::Sqlite)
            .to_string();
        sql.split_once(" WHERE ").map(|(_, w)| w.to_owned())
    }

    #[test]
    fn deny_all_filters_on_constant() {
        let clause = where_clause(&AccessScope::deny_all()).unwrap();
        assert!(!clause.contains("department"), "{clause}");
    }

    #[test]
    fn mapped_filter_becomes_equality() {
        let scope = AccessScope::allow_all().and(ScopeFilter::eq(properties::DEPARTMENT, "IT"));
        let clause = where_clause(&scope).unwrap();
        assert!(clause.contains(r#""docs"."department" = 'IT'"#), "{clause}");
    }

    #[test]
    fn unmapped_property_fails_closed() {
        let scope = AccessScope::allow_all()
            .and(ScopeFilter::eq(properties::DEPARTMENT, "IT"))
            .and(ScopeFilter::eq(properties::IS_SENSITIVE, false));
        assert_eq!(
            where_clause(&scope),
            where_clause(&AccessScope::deny_all())
        );
    }
}
