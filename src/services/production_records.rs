use crate::{
    db::DbPool,
    entities::{material, product, production_line, production_record, use_material},
    errors::ServiceError,
    services::{
        compound::{ensure_inserted, CompoundRecord, CompoundWriter},
        references::{ReferenceSet, ReferenceTarget},
    },
};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, FromQueryResult, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

/// Material consumed by a production run.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageLine {
    pub material_id: i32,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProductionRecord {
    pub product_id: i32,
    pub line_id: i32,
    pub date: NaiveDate,
    pub theoretical_output: Decimal,
    pub actual_output: Decimal,
    pub materials: Vec<UsageLine>,
}

#[async_trait]
impl CompoundRecord for NewProductionRecord {
    type Line = UsageLine;

    const OPERATION: &'static str = "create_production_record";
    const COLLECTION: &'static str = "materials";

    fn lines(&self) -> &[UsageLine] {
        &self.materials
    }

    fn references(&self) -> ReferenceSet {
        let mut refs = ReferenceSet::new();
        refs.insert(ReferenceTarget::Product, self.product_id)
            .insert(ReferenceTarget::ProductionLine, self.line_id)
            .extend(
                ReferenceTarget::Material,
                self.materials.iter().map(|m| m.material_id),
            );
        refs
    }

    async fn insert_parent(&self, txn: &DatabaseTransaction) -> Result<i32, DbErr> {
        let parent = production_record::ActiveModel {
            product_id: Set(self.product_id),
            line_id: Set(self.line_id),
            date: Set(self.date),
            theoretical_output: Set(self.theoretical_output),
            actual_output: Set(self.actual_output),
            ..Default::default()
        };
        let result = production_record::Entity::insert(parent).exec(txn).await?;
        Ok(result.last_insert_id)
    }

    async fn insert_line(
        &self,
        txn: &DatabaseTransaction,
        record_id: i32,
        line: &UsageLine,
    ) -> Result<(), DbErr> {
        let row = use_material::ActiveModel {
            record_id: Set(record_id),
            material_id: Set(line.material_id),
            quantity_used: Set(line.quantity),
        };
        let affected = use_material::Entity::insert(row)
            .exec_without_returning(txn)
            .await?;
        ensure_inserted(affected)
    }
}

/// Row of the production record listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromQueryResult, ToSchema)]
pub struct ProductionRecordSummary {
    pub record_id: i32,
    pub date: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub theoretical_output: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub actual_output: Decimal,
    pub product_name: String,
    pub line_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromQueryResult, ToSchema)]
pub struct ProductionRecordDetail {
    pub record_id: i32,
    pub date: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub theoretical_output: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub actual_output: Decimal,
    pub product_id: i32,
    pub product_name: String,
    pub line_id: i32,
    pub line_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromQueryResult, ToSchema)]
pub struct UsageLineView {
    pub material_id: i32,
    pub material_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub quantity_used: Decimal,
    pub unit: String,
}

/// Production records joined with product and line names.
fn with_names() -> Select<production_record::Entity> {
    production_record::Entity::find()
        .select_only()
        .column(production_record::Column::RecordId)
        .column(production_record::Column::Date)
        .column(production_record::Column::TheoreticalOutput)
        .column(production_record::Column::ActualOutput)
        .column(production_record::Column::ProductId)
        .column_as(product::Column::Name, "product_name")
        .column(production_record::Column::LineId)
        .column_as(production_line::Column::Name, "line_name")
        .join(JoinType::InnerJoin, production_record::Relation::Product.def())
        .join(
            JoinType::InnerJoin,
            production_record::Relation::ProductionLine.def(),
        )
}

#[derive(Clone)]
pub struct ProductionRecordService {
    db_pool: Arc<DbPool>,
    writer: CompoundWriter,
}

impl ProductionRecordService {
    pub fn new(db_pool: Arc<DbPool>, writer: CompoundWriter) -> Self {
        Self { db_pool, writer }
    }

    #[instrument(skip(self, record), fields(product_id = record.product_id, line_id = record.line_id))]
    pub async fn create(&self, record: NewProductionRecord) -> Result<i32, ServiceError> {
        self.writer.create(record).await
    }

    /// Newest first.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<ProductionRecordSummary>, ServiceError> {
        let db = &*self.db_pool;
        let records = with_names()
            .order_by_desc(production_record::Column::Date)
            .order_by_desc(production_record::Column::RecordId)
            .into_model::<ProductionRecordSummary>()
            .all(db)
            .await?;
        Ok(records)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, record_id: i32) -> Result<ProductionRecordDetail, ServiceError> {
        let db = &*self.db_pool;
        with_names()
            .filter(production_record::Column::RecordId.eq(record_id))
            .into_model::<ProductionRecordDetail>()
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("production record {}", record_id)))
    }

    /// Materials consumed by a record; 404 when the record itself is absent.
    #[instrument(skip(self))]
    pub async fn materials(&self, record_id: i32) -> Result<Vec<UsageLineView>, ServiceError> {
        let db = &*self.db_pool;
        let exists = production_record::Entity::find_by_id(record_id)
            .count(db)
            .await?
            > 0;
        if !exists {
            return Err(ServiceError::NotFound(format!(
                "production record {}",
                record_id
            )));
        }

        let usage = use_material::Entity::find()
            .select_only()
            .column(use_material::Column::MaterialId)
            .column_as(material::Column::Name, "material_name")
            .column(use_material::Column::QuantityUsed)
            .column(material::Column::Unit)
            .join(JoinType::InnerJoin, use_material::Relation::Material.def())
            .filter(use_material::Column::RecordId.eq(record_id))
            .order_by_asc(use_material::Column::MaterialId)
            .into_model::<UsageLineView>()
            .all(db)
            .await?;
        Ok(usage)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, record_id: i32) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let result = production_record::Entity::delete_by_id(record_id)
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "production record {}",
                record_id
            )));
        }
        info!(record_id, "Production record deleted");
        Ok(())
    }
}
