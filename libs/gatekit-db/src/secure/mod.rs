//! Scoped reads over `SeaORM`.

mod cond;

pub use cond::build_scope_condition;

use gatekit_security::AccessScope;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, PrimaryKeyTrait,
    QueryFilter, Select,
};

/// An entity whose rows are subject to row-level scoping.
///
/// Maps authorization property names (see
/// [`gatekit_security::properties`]) to columns. A property the entity does
/// not map makes every scoped read of it return nothing.
pub trait ScopableEntity: EntityTrait {
    fn resolve_property(property: &str) -> Option<Self::Column>;
}

/// The single read path for scopable entities.
///
/// Built once per request from the caller's [`AccessScope`]; every query it
/// hands out already carries the scope condition.
pub struct ScopedReader<'a, C> {
    conn: &'a C,
    scope: AccessScope,
}

impl<'a, C> ScopedReader<'a, C>
where
    C: ConnectionTrait,
{
    #[must_use]
    pub fn new(conn: &'a C, scope: AccessScope) -> Self {
        Self { conn, scope }
    }

    #[must_use]
    pub fn scope(&self) -> &AccessScope {
        &self.scope
    }

    /// `E::find()` with the scope applied. Further filters and ordering may
    /// be added; they are AND-ed with the scope.
    #[must_use]
    pub fn select<E>(&self) -> Select<E>
    where
        E: ScopableEntity,
        E::Column: ColumnTrait + Copy,
    {
        E::find().filter(build_scope_condition::<E>(&self.scope))
    }

    /// All visible rows.
    ///
    /// # Errors
    ///
    /// Returns [`DbErr`] if the query fails.
    pub async fn find_all<E>(&self) -> Result<Vec<E::Model>, DbErr>
    where
        E: ScopableEntity,
        E::Column: ColumnTrait + Copy,
    {
        self.select::<E>().all(self.conn).await
    }

    /// The row with primary key `id`, if it exists and is visible.
    ///
    /// # Errors
    ///
    /// Returns [`DbErr`] if the query fails.
    pub async fn find_by_id<E, T>(&self, id: T) -> Result<Option<E::Model>, DbErr>
    where
        E: ScopableEntity,
        E::Column: ColumnTrait + Copy,
        T: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
    {
        E::find_by_id(id)
            .filter(build_scope_condition::<E>(&self.scope))
            .one(self.conn)
            .await
    }

    /// Number of visible rows.
    ///
    /// # Errors
    ///
    /// Returns [`DbErr`] if the query fails.
    pub async fn count<E>(&self) -> Result<u64, DbErr>
    where
        E: ScopableEntity,
        E::Column: ColumnTrait + Copy,
        E::Model: Sync,
    {
        self.select::<E>().count(self.conn).await
    }
}
