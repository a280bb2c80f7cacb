use crate::{
    db::DbPool,
    entities::{buyer, customer, distributor, material, product, production_line, supplier},
    errors::ServiceError,
};
use metrics::histogram;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use strum::Display;
use tracing::{debug, instrument};
use utoipa::ToSchema;

/// Table a foreign-key identifier points into.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReferenceTarget {
    Supplier,
    Customer,
    /// Purchasing employee.
    Buyer,
    /// Sales employee.
    Distributor,
    Material,
    Product,
    ProductionLine,
}

/// Identifiers referenced by one request, grouped by target table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSet(BTreeMap<ReferenceTarget, BTreeSet<i32>>);

impl ReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, target: ReferenceTarget, id: i32) -> &mut Self {
        self.0.entry(target).or_default().insert(id);
        self
    }

    pub fn extend(
        &mut self,
        target: ReferenceTarget,
        ids: impl IntoIterator<Item = i32>,
    ) -> &mut Self {
        self.0.entry(target).or_default().extend(ids);
        self
    }

    pub fn ids(&self, target: ReferenceTarget) -> Option<&BTreeSet<i32>> {
        self.0.get(&target)
    }

    /// Number of distinct target tables, i.e. the number of lookups needed.
    pub fn target_count(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ReferenceTarget, &BTreeSet<i32>)> {
        self.0.iter().map(|(target, ids)| (*target, ids))
    }
}

/// Identifiers of one target table that do not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MissingReference {
    pub entity: ReferenceTarget,
    /// Ascending, deduplicated.
    pub ids: Vec<i32>,
}

/// Confirms referenced rows exist before any write is attempted.
///
/// Lookups are batched: one `SELECT pk ... WHERE pk IN (..)` per target
/// table, however many line items reference it.
#[derive(Clone)]
pub struct ReferenceChecker {
    db_pool: Arc<DbPool>,
}

impl ReferenceChecker {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Every reference that does not resolve, ordered by target then id.
    /// Empty when all exist.
    #[instrument(skip(self, references), fields(targets = references.target_count()))]
    pub async fn missing(
        &self,
        references: &ReferenceSet,
    ) -> Result<Vec<MissingReference>, ServiceError> {
        let db = &*self.db_pool;
        let start = Instant::now();
        let mut missing = Vec::new();

        for (target, ids) in references.iter() {
            if ids.is_empty() {
                continue;
            }
            let found = existing_for(db, target, ids).await?;
            let absent: Vec<i32> = ids.difference(&found).copied().collect();
            if !absent.is_empty() {
                missing.push(MissingReference {
                    entity: target,
                    ids: absent,
                });
            }
        }

        histogram!("chem_factory_references.check.duration", start.elapsed());
        debug!(missing = missing.len(), "Reference check completed");
        Ok(missing)
    }

    /// Fails with [`ServiceError::MissingReferences`] listing every
    /// unresolved identifier.
    pub async fn ensure_exist(&self, references: &ReferenceSet) -> Result<(), ServiceError> {
        let missing = self.missing(references).await?;
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::MissingReferences(missing))
        }
    }
}

async fn existing_for<C: ConnectionTrait>(
    db: &C,
    target: ReferenceTarget,
    ids: &BTreeSet<i32>,
) -> Result<BTreeSet<i32>, DbErr> {
    match target {
        ReferenceTarget::Supplier => {
            existing_ids::<supplier::Entity, _>(db, supplier::Column::SupplierId, ids).await
        }
        ReferenceTarget::Customer => {
            existing_ids::<customer::Entity, _>(db, customer::Column::CustomerId, ids).await
        }
        ReferenceTarget::Buyer => {
            existing_ids::<buyer::Entity, _>(db, buyer::Column::EmployeeId, ids).await
        }
        ReferenceTarget::Distributor => {
            existing_ids::<distributor::Entity, _>(db, distributor::Column::EmployeeId, ids).await
        }
        ReferenceTarget::Material => {
            existing_ids::<material::Entity, _>(db, material::Column::MaterialId, ids).await
        }
        ReferenceTarget::Product => {
            existing_ids::<product::Entity, _>(db, product::Column::ProductId, ids).await
        }
        ReferenceTarget::ProductionLine => {
            existing_ids::<production_line::Entity, _>(db, production_line::Column::LineId, ids)
                .await
        }
    }
}

async fn existing_ids<E, C>(
    db: &C,
    column: E::Column,
    ids: &BTreeSet<i32>,
) -> Result<BTreeSet<i32>, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let found: Vec<i32> = E::find()
        .select_only()
        .column(column)
        .filter(column.is_in(ids.iter().copied()))
        .into_tuple()
        .all(db)
        .await?;
    Ok(found.into_iter().collect())
}
