use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = PurchaseRecord)]
#[sea_orm(table_name = "purchase_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub record_id: i32,
    pub supplier_id: i32,
    pub date: NaiveDate,
    pub employee_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::supplier::Entity",
        from = "Column::SupplierId",
        to = "super::supplier::Column::SupplierId"
    )]
    Supplier,
    #[sea_orm(
        belongs_to = "super::buyer::Entity",
        from = "Column::EmployeeId",
        to = "super::buyer::Column::EmployeeId"
    )]
    Buyer,
    #[sea_orm(has_many = "super::purchase_material::Entity")]
    PurchaseMaterials,
}

impl Related<super::supplier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl Related<super::buyer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Buyer.def()
    }
}

impl Related<super::purchase_material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseMaterials.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
