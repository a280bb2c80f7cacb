use chrono::NaiveDate;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = SaleRecord)]
#[sea_orm(table_name = "sale_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub record_id: i32,
    pub customer_id: i32,
    pub date: NaiveDate,
    pub employee_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::CustomerId"
    )]
    Customer,
    #[sea_orm(
        belongs_to = "super::distributor::Entity",
        from = "Column::EmployeeId",
        to = "super::distributor::Column::EmployeeId"
    )]
    Distributor,
    #[sea_orm(has_many = "super::sale_product::Entity")]
    SaleProducts,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::distributor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Distributor.def()
    }
}

impl Related<super::sale_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleProducts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
