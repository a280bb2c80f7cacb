/*!
 * Compound record writer
 *
 * Purchase, sale and production records share one write path: check that
 * every referenced row exists, then insert the parent row and all of its
 * line items in a single transaction. Each record type describes its own
 * tables through [`CompoundRecord`]; the pipeline lives in
 * [`CompoundWriter`].
 */

use crate::{
    db::{with_transaction, DbPool, WriteStage},
    errors::ServiceError,
    services::references::{ReferenceChecker, ReferenceSet},
    validation::{ValidationError, ValidationReason},
};
use async_trait::async_trait;
use metrics::counter;
use sea_orm::{DatabaseTransaction, DbErr};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// A parent row plus its line items, ready to be written.
#[async_trait]
pub trait CompoundRecord: Send + Sync + 'static {
    type Line: Send + Sync;

    /// Operation name used for logs and metrics.
    const OPERATION: &'static str;
    /// Name of the line-item collection in the request body.
    const COLLECTION: &'static str;

    fn lines(&self) -> &[Self::Line];

    /// Every foreign key the parent and its lines point at.
    fn references(&self) -> ReferenceSet;

    /// Inserts the parent row and returns its generated identifier.
    async fn insert_parent(&self, txn: &DatabaseTransaction) -> Result<i32, DbErr>;

    async fn insert_line(
        &self,
        txn: &DatabaseTransaction,
        record_id: i32,
        line: &Self::Line,
    ) -> Result<(), DbErr>;
}

/// Treats an insert that touched no rows as a failed write.
pub(crate) fn ensure_inserted(rows_affected: u64) -> Result<(), DbErr> {
    if rows_affected == 0 {
        Err(DbErr::RecordNotInserted)
    } else {
        Ok(())
    }
}

#[derive(Clone)]
pub struct CompoundWriter {
    db_pool: Arc<DbPool>,
    references: ReferenceChecker,
    write_timeout: Duration,
}

impl CompoundWriter {
    pub fn new(db_pool: Arc<DbPool>, write_timeout: Duration) -> Self {
        Self {
            references: ReferenceChecker::new(db_pool.clone()),
            db_pool,
            write_timeout,
        }
    }

    /// Checks references, then writes the record atomically.
    ///
    /// Missing references fail with `MissingReferences` before any
    /// transaction is opened. A reference deleted between the check and the
    /// insert is still caught by the store's foreign keys and surfaces as a
    /// `Constraint` error.
    #[instrument(skip_all, fields(operation = R::OPERATION, line_count = record.lines().len()))]
    pub async fn create<R: CompoundRecord>(&self, record: R) -> Result<i32, ServiceError> {
        if record.lines().is_empty() {
            return Err(ValidationError::new(R::COLLECTION, ValidationReason::EmptyCollection).into());
        }
        self.references.ensure_exist(&record.references()).await?;
        self.write(record).await
    }

    /// Parent insert, line inserts, commit. Any failure rolls back the lot.
    pub(crate) async fn write<R: CompoundRecord>(&self, record: R) -> Result<i32, ServiceError> {
        let line_count = record.lines().len();

        let record_id = with_transaction(
            &self.db_pool,
            R::OPERATION,
            self.write_timeout,
            move |txn| {
                Box::pin(async move {
                    let record_id = record
                        .insert_parent(txn)
                        .await
                        .map_err(|e| ServiceError::at_stage(WriteStage::Parent, e))?;

                    for (index, line) in record.lines().iter().enumerate() {
                        record
                            .insert_line(txn, record_id, line)
                            .await
                            .map_err(|e| ServiceError::at_stage(WriteStage::Line(index), e))?;
                    }

                    Ok(record_id)
                })
            },
        )
        .await?;

        counter!("chem_factory_records.created", 1, "operation" => R::OPERATION);
        info!(record_id, line_count, operation = R::OPERATION, "Compound record committed");
        Ok(record_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{memory_pool, StoreErrorKind};
    use crate::entities::{buyer, purchase_material, purchase_record, supplier};
    use crate::services::purchase_records::{NewPurchaseRecord, PurchaseLine};
    use assert_matches::assert_matches;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};

    async fn seed(db: &DbPool) -> (i32, i32) {
        let supplier = supplier::ActiveModel {
            name: Set("Acme".into()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
        let buyer = buyer::ActiveModel {
            name: Set("Li Wei".into()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
        (supplier.supplier_id, buyer.employee_id)
    }

    fn record(supplier_id: i32, employee_id: i32, material_ids: &[i32]) -> NewPurchaseRecord {
        NewPurchaseRecord {
            supplier_id,
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            employee_id,
            lines: material_ids
                .iter()
                .map(|&material_id| PurchaseLine {
                    material_id,
                    quantity: dec!(5),
                    unit_price: dec!(2.5),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn line_failure_rolls_back_parent() {
        let db = Arc::new(memory_pool().await);
        let (supplier_id, employee_id) = seed(&db).await;
        let writer = CompoundWriter::new(db.clone(), Duration::from_secs(5));

        // Skips the pre-check so the store's foreign key has to catch it.
        let err = writer
            .write(record(supplier_id, employee_id, &[999]))
            .await
            .unwrap_err();

        assert_matches!(
            err,
            ServiceError::Constraint {
                stage: WriteStage::Line(0),
                kind: StoreErrorKind::ForeignKeyViolation,
                ..
            }
        );
        assert_eq!(purchase_record::Entity::find().count(&*db).await.unwrap(), 0);
        assert_eq!(purchase_material::Entity::find().count(&*db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn pre_check_reports_missing_before_writing() {
        let db = Arc::new(memory_pool().await);
        let (supplier_id, _) = seed(&db).await;
        let writer = CompoundWriter::new(db.clone(), Duration::from_secs(5));

        let err = writer
            .create(record(supplier_id, 4242, &[7, 8]))
            .await
            .unwrap_err();

        let ServiceError::MissingReferences(missing) = err else {
            panic!("expected missing references, got {err:?}");
        };
        assert_eq!(missing.len(), 2);
        assert_eq!(missing[0].ids, vec![4242]);
        assert_eq!(missing[1].ids, vec![7, 8]);
        assert_eq!(purchase_record::Entity::find().count(&*db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_lines_rejected_without_store_access() {
        let db = Arc::new(memory_pool().await);
        let writer = CompoundWriter::new(db, Duration::from_secs(5));
        let err = writer.create(record(1, 1, &[])).await.unwrap_err();
        assert_matches!(err, ServiceError::Validation(v) if v.field == "materials");
    }
}
