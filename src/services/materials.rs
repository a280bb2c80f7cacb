use crate::{
    db::DbPool,
    entities::{material, purchase_material, use_material},
    errors::ServiceError,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Writable attributes of a material. Stock is owned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialInput {
    pub name: String,
    pub cas_number: String,
    pub unit: String,
    pub concentration: Decimal,
    pub category: String,
    pub storage_condition: String,
    pub min_stock_threshold: Decimal,
}

impl MaterialInput {
    fn into_active_model(self) -> material::ActiveModel {
        material::ActiveModel {
            material_id: NotSet,
            name: Set(self.name),
            cas_number: Set(self.cas_number),
            stock: NotSet,
            unit: Set(self.unit),
            concentration: Set(self.concentration),
            category: Set(self.category),
            storage_condition: Set(self.storage_condition),
            min_stock_threshold: Set(self.min_stock_threshold),
        }
    }
}

fn duplicate_as_conflict(err: ServiceError) -> ServiceError {
    match err {
        ServiceError::Conflict(_) => {
            ServiceError::Conflict("material name or CAS number already exists".into())
        }
        other => other,
    }
}

#[derive(Clone)]
pub struct MaterialService {
    db_pool: Arc<DbPool>,
}

impl MaterialService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<material::Model>, ServiceError> {
        let db = &*self.db_pool;
        Ok(material::Entity::find()
            .order_by_asc(material::Column::MaterialId)
            .all(db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, material_id: i32) -> Result<material::Model, ServiceError> {
        let db = &*self.db_pool;
        material::Entity::find_by_id(material_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("material {}", material_id)))
    }

    /// Inserts with zero stock.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: MaterialInput) -> Result<i32, ServiceError> {
        let db = &*self.db_pool;
        let mut row = input.into_active_model();
        row.stock = Set(Decimal::ZERO);

        let result = material::Entity::insert(row)
            .exec(db)
            .await
            .map_err(|e| duplicate_as_conflict(e.into()))?;

        info!(material_id = result.last_insert_id, "Material created");
        Ok(result.last_insert_id)
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, material_id: i32, input: MaterialInput) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let result = material::Entity::update_many()
            .set(input.into_active_model())
            .filter(material::Column::MaterialId.eq(material_id))
            .exec(db)
            .await
            .map_err(|e| duplicate_as_conflict(e.into()))?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("material {}", material_id)));
        }
        Ok(())
    }

    /// Refuses while any purchase line or production usage still points here.
    #[instrument(skip(self))]
    pub async fn delete(&self, material_id: i32) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        self.get(material_id).await?;

        let purchases = purchase_material::Entity::find()
            .filter(purchase_material::Column::MaterialId.eq(material_id))
            .count(db)
            .await?;
        let usages = use_material::Entity::find()
            .filter(use_material::Column::MaterialId.eq(material_id))
            .count(db)
            .await?;
        if purchases > 0 || usages > 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "material {} is referenced by {} purchase line(s) and {} production usage(s)",
                material_id, purchases, usages
            )));
        }

        material::Entity::delete_by_id(material_id).exec(db).await?;
        info!(material_id, "Material deleted");
        Ok(())
    }
}
