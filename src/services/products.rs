use crate::{
    db::DbPool,
    entities::{product, production_record, sale_product},
    errors::ServiceError,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct ProductInput {
    pub name: String,
    pub unit: String,
    /// One of `I`..`V`.
    pub hazard_rating: String,
}

impl ProductInput {
    fn into_active_model(self) -> product::ActiveModel {
        product::ActiveModel {
            product_id: NotSet,
            name: Set(self.name),
            unit: Set(self.unit),
            hazard_rating: Set(self.hazard_rating),
            stock: NotSet,
        }
    }
}

fn duplicate_as_conflict(err: ServiceError) -> ServiceError {
    match err {
        ServiceError::Conflict(_) => ServiceError::Conflict("product name already exists".into()),
        other => other,
    }
}

#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<product::Model>, ServiceError> {
        let db = &*self.db_pool;
        Ok(product::Entity::find()
            .order_by_asc(product::Column::ProductId)
            .all(db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, product_id: i32) -> Result<product::Model, ServiceError> {
        let db = &*self.db_pool;
        product::Entity::find_by_id(product_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product {}", product_id)))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: ProductInput) -> Result<i32, ServiceError> {
        let db = &*self.db_pool;
        let mut row = input.into_active_model();
        row.stock = Set(Decimal::ZERO);

        let result = product::Entity::insert(row)
            .exec(db)
            .await
            .map_err(|e| duplicate_as_conflict(e.into()))?;

        info!(product_id = result.last_insert_id, "Product created");
        Ok(result.last_insert_id)
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, product_id: i32, input: ProductInput) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let result = product::Entity::update_many()
            .set(input.into_active_model())
            .filter(product::Column::ProductId.eq(product_id))
            .exec(db)
            .await
            .map_err(|e| duplicate_as_conflict(e.into()))?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("product {}", product_id)));
        }
        Ok(())
    }

    /// Refuses while a sale line or production record still points here.
    #[instrument(skip(self))]
    pub async fn delete(&self, product_id: i32) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        self.get(product_id).await?;

        let sales = sale_product::Entity::find()
            .filter(sale_product::Column::ProductId.eq(product_id))
            .count(db)
            .await?;
        let productions = production_record::Entity::find()
            .filter(production_record::Column::ProductId.eq(product_id))
            .count(db)
            .await?;
        if sales > 0 || productions > 0 {
            return Err(ServiceError::Conflict(format!(
                "product {} is referenced by {} sale line(s) and {} production record(s)",
                product_id, sales, productions
            )));
        }

        product::Entity::delete_by_id(product_id).exec(db).await?;
        info!(product_id, "Product deleted");
        Ok(())
    }
}
