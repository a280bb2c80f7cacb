/*!
 * Transaction helper and store error classification
 *
 * Writes that span several statements go through [`with_transaction`], which
 * bounds the whole begin..commit sequence by a timeout and records outcome
 * metrics. Driver errors are reduced to a [`StoreErrorKind`] through
 * `DbErr::sql_err()`, never by matching message text.
 */

use crate::errors::ServiceError;
use futures::future::BoxFuture;
use metrics::{counter, histogram};
use sea_orm::{
    ConnAcquireErr, DatabaseConnection, DatabaseTransaction, DbErr, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::time::{Duration, Instant};
use strum::{AsRefStr, Display};
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Typed classification of a store failure.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StoreErrorKind {
    UniqueViolation,
    ForeignKeyViolation,
    Connection,
    Timeout,
    RecordNotInserted,
    Other,
}

impl StoreErrorKind {
    pub fn classify(err: &DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => return Self::UniqueViolation,
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => return Self::ForeignKeyViolation,
            _ => {}
        }
        match err {
            DbErr::ConnectionAcquire(ConnAcquireErr::Timeout) => Self::Timeout,
            DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => Self::Connection,
            DbErr::RecordNotInserted => Self::RecordNotInserted,
            _ => Self::Other,
        }
    }

    /// Constraint violations mean the payload conflicts with stored data.
    pub fn is_constraint(self) -> bool {
        matches!(self, Self::UniqueViolation | Self::ForeignKeyViolation)
    }

    /// Resubmitting the same payload may succeed.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Connection | Self::Timeout)
    }
}

/// Step of a compound write at which a statement failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    Parent,
    /// Zero-based index into the submitted line items.
    Line(usize),
    /// Deferred constraints and I/O failures surface here.
    Commit,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteStage::Parent => f.write_str("parent"),
            WriteStage::Line(index) => write!(f, "line[{}]", index),
            WriteStage::Commit => f.write_str("commit"),
        }
    }
}

impl Serialize for WriteStage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Runs `f` inside one transaction on a connection checked out from `db`.
///
/// The transaction commits when `f` returns `Ok` and rolls back otherwise.
/// A failing commit is reported at [`WriteStage::Commit`]. If begin..commit
/// takes longer than `timeout` the future is dropped, which rolls the
/// transaction back and returns its connection to the pool, and a
/// `Store { kind: Timeout }` error is returned.
pub async fn with_transaction<F, T>(
    db: &DatabaseConnection,
    operation: &'static str,
    timeout: Duration,
    f: F,
) -> Result<T, ServiceError>
where
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, ServiceError>> + Send,
    T: Send,
{
    let transaction_id = Uuid::new_v4();
    let start = Instant::now();

    debug!(%transaction_id, operation, "Starting database transaction");
    counter!("chem_factory_db.transaction.started", 1, "operation" => operation);

    let result = match tokio::time::timeout(timeout, run_transaction(db, f)).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Store {
            kind: StoreErrorKind::Timeout,
            stage: None,
            detail: format!("{} did not complete within {:?}", operation, timeout),
        }),
    };

    let elapsed = start.elapsed();
    histogram!("chem_factory_db.transaction.duration", elapsed, "operation" => operation);

    match &result {
        Ok(_) => {
            counter!("chem_factory_db.transaction.committed", 1, "operation" => operation);
            debug!(%transaction_id, operation, ?elapsed, "Transaction committed");
        }
        Err(err) => {
            counter!("chem_factory_db.transaction.rolled_back", 1, "operation" => operation);
            warn!(%transaction_id, operation, ?elapsed, error = %err, "Transaction rolled back");
        }
    }

    result
}

async fn run_transaction<F, T>(db: &DatabaseConnection, f: F) -> Result<T, ServiceError>
where
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, ServiceError>> + Send,
    T: Send,
{
    let txn = db.begin().await.map_err(|e| ServiceError::store(None, &e))?;

    match f(&txn).await {
        Ok(value) => {
            txn.commit()
                .await
                .map_err(|e| ServiceError::store(Some(WriteStage::Commit), &e))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::entities::{material, purchase_record, supplier};
    use assert_matches::assert_matches;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, PaginatorTrait, Set};

    fn new_material(name: &str, cas: &str) -> material::ActiveModel {
        material::ActiveModel {
            name: Set(name.into()),
            cas_number: Set(cas.into()),
            stock: Set(Decimal::ZERO),
            unit: Set("kg".into()),
            concentration: Set(Decimal::from(99)),
            category: Set("acid".into()),
            storage_condition: Set("dry".into()),
            min_stock_threshold: Set(Decimal::ONE),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn classifies_unique_violation() {
        let db = memory_pool().await;
        new_material("Sulfuric acid", "7664-93-9").insert(&db).await.unwrap();
        let err = new_material("Sulfuric acid", "0000-00-0")
            .insert(&db)
            .await
            .unwrap_err();
        assert_eq!(StoreErrorKind::classify(&err), StoreErrorKind::UniqueViolation);
    }

    #[tokio::test]
    async fn classifies_foreign_key_violation() {
        let db = memory_pool().await;
        let err = purchase_record::ActiveModel {
            supplier_id: Set(404),
            date: Set(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            employee_id: Set(404),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap_err();
        assert_eq!(
            StoreErrorKind::classify(&err),
            StoreErrorKind::ForeignKeyViolation
        );
    }

    #[test]
    fn classifies_driver_level_errors() {
        assert_eq!(
            StoreErrorKind::classify(&DbErr::ConnectionAcquire(ConnAcquireErr::Timeout)),
            StoreErrorKind::Timeout
        );
        assert_eq!(
            StoreErrorKind::classify(&DbErr::ConnectionAcquire(ConnAcquireErr::ConnectionClosed)),
            StoreErrorKind::Connection
        );
        assert_eq!(
            StoreErrorKind::classify(&DbErr::RecordNotInserted),
            StoreErrorKind::RecordNotInserted
        );
        assert_eq!(
            StoreErrorKind::classify(&DbErr::Custom("boom".into())),
            StoreErrorKind::Other
        );
        assert!(StoreErrorKind::Timeout.is_retryable());
        assert!(!StoreErrorKind::UniqueViolation.is_retryable());
        assert!(StoreErrorKind::ForeignKeyViolation.is_constraint());
    }

    #[test]
    fn stage_renders_line_index() {
        assert_eq!(WriteStage::Parent.to_string(), "parent");
        assert_eq!(WriteStage::Line(3).to_string(), "line[3]");
        assert_eq!(WriteStage::Commit.to_string(), "commit");
        assert_eq!(
            serde_json::to_value(WriteStage::Line(0)).unwrap(),
            serde_json::json!("line[0]")
        );
    }

    #[tokio::test]
    async fn error_inside_transaction_rolls_back() {
        let db = memory_pool().await;
        let result: Result<(), ServiceError> =
            with_transaction(&db, "test", Duration::from_secs(5), |txn| {
                Box::pin(async move {
                    supplier::ActiveModel {
                        name: Set("Acme".into()),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;
                    Err(ServiceError::Conflict("abort".into()))
                })
            })
            .await;

        assert_matches!(result, Err(ServiceError::Conflict(_)));
        assert_eq!(supplier::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn deferred_constraint_fails_at_commit() {
        let db = memory_pool().await;
        let result: Result<(), ServiceError> =
            with_transaction(&db, "test", Duration::from_secs(5), |txn| {
                Box::pin(async move {
                    txn.execute_unprepared("PRAGMA defer_foreign_keys = ON")
                        .await?;
                    purchase_record::ActiveModel {
                        supplier_id: Set(404),
                        date: Set(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
                        employee_id: Set(404),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;
                    Ok(())
                })
            })
            .await;

        assert_matches!(
            result,
            Err(ServiceError::Constraint {
                stage: WriteStage::Commit,
                kind: StoreErrorKind::ForeignKeyViolation,
                ..
            })
        );
        assert_eq!(purchase_record::Entity::find().count(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn success_commits() {
        let db = memory_pool().await;
        let id = with_transaction(&db, "test", Duration::from_secs(5), |txn| {
            Box::pin(async move {
                let row = supplier::ActiveModel {
                    name: Set("Acme".into()),
                    ..Default::default()
                }
                .insert(txn)
                .await?;
                Ok(row.supplier_id)
            })
        })
        .await
        .unwrap();

        assert!(supplier::Entity::find_by_id(id).one(&db).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn slow_transaction_times_out_and_rolls_back() {
        let db = memory_pool().await;
        let result: Result<(), ServiceError> =
            with_transaction(&db, "test", Duration::from_millis(50), |txn| {
                Box::pin(async move {
                    supplier::ActiveModel {
                        name: Set("Slow".into()),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    Ok(())
                })
            })
            .await;

        assert_matches!(
            result,
            Err(ServiceError::Store {
                kind: StoreErrorKind::Timeout,
                ..
            })
        );
        assert_eq!(supplier::Entity::find().count(&db).await.unwrap(), 0);
    }
}
