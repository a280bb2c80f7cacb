use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "production_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub record_id: i32,
    pub product_id: i32,
    pub line_id: i32,
    pub date: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    pub theoretical_output: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub actual_output: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::ProductId"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::production_line::Entity",
        from = "Column::LineId",
        to = "super::production_line::Column::LineId"
    )]
    ProductionLine,
    #[sea_orm(has_many = "super::use_material::Entity")]
    UseMaterials,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::production_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductionLine.def()
    }
}

impl Related<super::use_material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UseMaterials.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
