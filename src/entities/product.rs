use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Finished chemical product. Stock moves through sale and production triggers.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Product)]
#[sea_orm(table_name = "chemical_products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub product_id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub unit: String,
    /// Roman numeral hazard class, `I` through `V`.
    pub hazard_rating: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub stock: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sale_product::Entity")]
    SaleProducts,
    #[sea_orm(has_many = "super::production_record::Entity")]
    ProductionRecords,
}

impl Related<super::sale_product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleProducts.def()
    }
}

impl Related<super::production_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductionRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
