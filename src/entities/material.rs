use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Raw chemical material kept in stock.
///
/// `stock` is maintained by the store's triggers as purchase and usage lines
/// are written; the API never assigns it after the initial zero.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Material)]
#[sea_orm(table_name = "chemical_materials")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub material_id: i32,
    #[sea_orm(unique)]
    pub name: String,
    #[sea_orm(unique)]
    pub cas_number: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub stock: Decimal,
    pub unit: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub concentration: Decimal,
    pub category: String,
    pub storage_condition: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub min_stock_threshold: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase_material::Entity")]
    PurchaseMaterials,
    #[sea_orm(has_many = "super::use_material::Entity")]
    UseMaterials,
}

impl Related<super::purchase_material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseMaterials.def()
    }
}

impl Related<super::use_material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UseMaterials.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
