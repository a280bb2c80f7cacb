use crate::{
    db::DbPool,
    entities::{customer, distributor, product, sale_product, sale_record},
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
    ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq)]
pub struct SaleLine {
    pub product_id: i32,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Sale of finished products to a customer, recorded by a distributor.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSaleRecord {
    pub customer_id: i32,
    pub date: NaiveDate,
    pub employee_id: i32,
    pub lines: Vec<SaleLine>,
}

#[async_trait]
impl CompoundRecord for NewSaleRecord {
    type Line = SaleLine;

    const OPERATION: &'static str = "create_sale_record";
    const COLLECTION: &'static str = "products";

    fn lines(&self) -> &[SaleLine] {
        &self.lines
    }

    fn references(&self) -> ReferenceSet {
        let mut refs = ReferenceSet::new();
        refs.insert(ReferenceTarget::Customer, self.customer_id)
            .insert(ReferenceTarget::Distributor, self.employee_id)
            .extend(
                ReferenceTarget::Product,
                self.lines.iter().map(|l| l.product_id),
            );
        refs
    }

    async fn insert_parent(&self, txn: &DatabaseTransaction) -> Result<i32, DbErr> {
        let parent = sale_record::ActiveModel {
            customer_id: Set(self.customer_id),
            date: Set(self.date),
            employee_id: Set(self.employee_id),
            ..Default::default()
        };
        let result = sale_record::Entity::insert(parent).exec(txn).await?;
        Ok(result.last_insert_id)
    }

    async fn insert_line(
        &self,
        txn: &DatabaseTransaction,
        record_id: i32,
        line: &SaleLine,
    ) -> Result<(), DbErr> {
        let row = sale_product::ActiveModel {
            record_id: Set(record_id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
        };
        let affected = sale_product::Entity::insert(row)
            .exec_without_returning(txn)
            .await?;
        ensure_inserted(affected)
    }
}

/// Sale header joined with customer and distributor names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromQueryResult, ToSchema)]
pub struct SaleRecordDetail {
    pub record_id: i32,
    pub date: NaiveDate,
    pub customer_id: i32,
    pub customer_name: String,
    pub employee_id: i32,
    pub employee_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromQueryResult, ToSchema)]
pub struct SaleLineView {
    pub product_id: i32,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub quantity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub unit_price: Decimal,
    pub unit: String,
}

#[derive(Clone)]
pub struct SaleRecordService {
    db_pool: Arc<DbPool>,
    writer: CompoundWriter,
}

impl SaleRecordService {
    pub fn new(db_pool: Arc<DbPool>, writer: CompoundWriter) -> Self {
        Self { db_pool, writer }
    }

    /// Creates the sale record and its product lines; returns the new id.
    #[instrument(skip(self, record), fields(customer_id = record.customer_id))]
    pub async fn create(&self, record: NewSaleRecord) -> Result<i32, ServiceError> {
        self.writer.create(record).await
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<sale_record::Model>, ServiceError> {
        let db = &*self.db_pool;
        let records = sale_record::Entity::find()
            .order_by_asc(sale_record::Column::RecordId)
            .all(db)
            .await?;
        Ok(records)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, record_id: i32) -> Result<SaleRecordDetail, ServiceError> {
        let db = &*self.db_pool;
        sale_record::Entity::find_by_id(record_id)
            .select_only()
            .column(sale_record::Column::RecordId)
            .column(sale_record::Column::Date)
            .column(sale_record::Column::CustomerId)
            .column_as(customer::Column::Name, "customer_name")
            .column(sale_record::Column::EmployeeId)
            .column_as(distributor::Column::Name, "employee_name")
            .join(JoinType::InnerJoin, sale_record::Relation::Customer.def())
            .join(JoinType::InnerJoin, sale_record::Relation::Distributor.def())
            .into_model::<SaleRecordDetail>()
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("sale record {}", record_id)))
    }

    /// Product lines of a record. An unknown record simply has no lines.
    #[instrument(skip(self))]
    pub async fn lines(&self, record_id: i32) -> Result<Vec<SaleLineView>, ServiceError> {
        let db = &*self.db_pool;
        let lines = sale_product::Entity::find()
            .select_only()
            .column(sale_product::Column::ProductId)
            .column(product::Column::Name)
            .column(sale_product::Column::Quantity)
            .column(sale_product::Column::UnitPrice)
            .column(product::Column::Unit)
            .join(JoinType::InnerJoin, sale_product::Relation::Product.def())
            .filter(sale_product::Column::RecordId.eq(record_id))
            .order_by_asc(sale_product::Column::ProductId)
            .into_model::<SaleLineView>()
            .all(db)
            .await?;
        Ok(lines)
    }

    /// Deletes the record; its lines go with it through `ON DELETE CASCADE`.
    #[instrument(skip(self))]
    pub async fn delete(&self, record_id: i32) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let result = sale_record::Entity::delete_by_id(record_id)
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "sale record {}",
                record_id
            )));
        }
        info!(record_id, "Sale record deleted");
        Ok(())
    }
}
