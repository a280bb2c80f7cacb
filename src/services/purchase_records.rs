use crate::{
    db::DbPool,
    entities::{buyer, material, purchase_material, purchase_record, supplier},
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
pub struct PurchaseLine {
    pub material_id: i32,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Purchase of raw materials from a supplier, recorded by a buyer.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPurchaseRecord {
    pub supplier_id: i32,
    pub date: NaiveDate,
    pub employee_id: i32,
    pub lines: Vec<PurchaseLine>,
}

#[async_trait]
impl CompoundRecord for NewPurchaseRecord {
    type Line = PurchaseLine;

    const OPERATION: &'static str = "create_purchase_record";
    const COLLECTION: &'static str = "materials";

    fn lines(&self) -> &[PurchaseLine] {
        &self.lines
    }

    fn references(&self) -> ReferenceSet {
        let mut refs = ReferenceSet::new();
        refs.insert(ReferenceTarget::Supplier, self.supplier_id)
            .insert(ReferenceTarget::Buyer, self.employee_id)
            .extend(
                ReferenceTarget::Material,
                self.lines.iter().map(|l| l.material_id),
            );
        refs
    }

    async fn insert_parent(&self, txn: &DatabaseTransaction) -> Result<i32, DbErr> {
        let parent = purchase_record::ActiveModel {
            supplier_id: Set(self.supplier_id),
            date: Set(self.date),
            employee_id: Set(self.employee_id),
            ..Default::default()
        };
        let result = purchase_record::Entity::insert(parent).exec(txn).await?;
        Ok(result.last_insert_id)
    }

    async fn insert_line(
        &self,
        txn: &DatabaseTransaction,
        record_id: i32,
        line: &PurchaseLine,
    ) -> Result<(), DbErr> {
        let row = purchase_material::ActiveModel {
            record_id: Set(record_id),
            material_id: Set(line.material_id),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
        };
        let affected = purchase_material::Entity::insert(row)
            .exec_without_returning(txn)
            .await?;
        ensure_inserted(affected)
    }
}

/// Purchase header joined with supplier and buyer names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromQueryResult, ToSchema)]
pub struct PurchaseRecordDetail {
    pub record_id: i32,
    pub date: NaiveDate,
    pub supplier_id: i32,
    pub supplier_name: String,
    pub employee_id: i32,
    pub employee_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromQueryResult, ToSchema)]
pub struct PurchaseLineView {
    pub material_id: i32,
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
pub struct PurchaseRecordService {
    db_pool: Arc<DbPool>,
    writer: CompoundWriter,
}

impl PurchaseRecordService {
    pub fn new(db_pool: Arc<DbPool>, writer: CompoundWriter) -> Self {
        Self { db_pool, writer }
    }

    /// Creates the purchase record and its material lines; returns the new id.
    #[instrument(skip(self, record), fields(supplier_id = record.supplier_id))]
    pub async fn create(&self, record: NewPurchaseRecord) -> Result<i32, ServiceError> {
        self.writer.create(record).await
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<purchase_record::Model>, ServiceError> {
        let db = &*self.db_pool;
        let records = purchase_record::Entity::find()
            .order_by_asc(purchase_record::Column::RecordId)
            .all(db)
            .await?;
        Ok(records)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, record_id: i32) -> Result<PurchaseRecordDetail, ServiceError> {
        let db = &*self.db_pool;
        purchase_record::Entity::find_by_id(record_id)
            .select_only()
            .column(purchase_record::Column::RecordId)
            .column(purchase_record::Column::Date)
            .column(purchase_record::Column::SupplierId)
            .column_as(supplier::Column::Name, "supplier_name")
            .column(purchase_record::Column::EmployeeId)
            .column_as(buyer::Column::Name, "employee_name")
            .join(JoinType::InnerJoin, purchase_record::Relation::Supplier.def())
            .join(JoinType::InnerJoin, purchase_record::Relation::Buyer.def())
            .into_model::<PurchaseRecordDetail>()
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("purchase record {}", record_id)))
    }

    /// Material lines of a record. An unknown record simply has no lines.
    #[instrument(skip(self))]
    pub async fn lines(&self, record_id: i32) -> Result<Vec<PurchaseLineView>, ServiceError> {
        let db = &*self.db_pool;
        let lines = purchase_material::Entity::find()
            .select_only()
            .column(purchase_material::Column::MaterialId)
            .column(material::Column::Name)
            .column(purchase_material::Column::Quantity)
            .column(purchase_material::Column::UnitPrice)
            .column(material::Column::Unit)
            .join(JoinType::InnerJoin, purchase_material::Relation::Material.def())
            .filter(purchase_material::Column::RecordId.eq(record_id))
            .order_by_asc(purchase_material::Column::MaterialId)
            .into_model::<PurchaseLineView>()
            .all(db)
            .await?;
        Ok(lines)
    }

    /// Deletes the record; its lines go with it through `ON DELETE CASCADE`.
    #[instrument(skip(self))]
    pub async fn delete(&self, record_id: i32) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let result = purchase_record::Entity::delete_by_id(record_id)
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "purchase record {}",
                record_id
            )));
        }
        info!(record_id, "Purchase record deleted");
        Ok(())
    }
}
