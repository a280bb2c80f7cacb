pub mod common;
pub mod materials;
pub mod production_records;
pub mod products;
pub mod purchase_records;
pub mod sale_records;

use crate::{
    config::AppConfig,
    db::DbPool,
    services::{
        compound::CompoundWriter, materials::MaterialService,
        production_records::ProductionRecordService, products::ProductService,
        purchase_records::PurchaseRecordService, sale_records::SaleRecordService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub materials: Arc<MaterialService>,
    pub products: Arc<ProductService>,
    pub purchase_records: Arc<PurchaseRecordService>,
    pub sale_records: Arc<SaleRecordService>,
    pub production_records: Arc<ProductionRecordService>,
    /// Purchase lines must also have positive quantity and unit price.
    pub purchase_require_positive: bool,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        let writer = CompoundWriter::new(db_pool.clone(), config.write_timeout());

        Self {
            materials: Arc::new(MaterialService::new(db_pool.clone())),
            products: Arc::new(ProductService::new(db_pool.clone())),
            purchase_records: Arc::new(PurchaseRecordService::new(
                db_pool.clone(),
                writer.clone(),
            )),
            sale_records: Arc::new(SaleRecordService::new(db_pool.clone(), writer.clone())),
            production_records: Arc::new(ProductionRecordService::new(db_pool, writer)),
            purchase_require_positive: config.purchase_require_positive,
        }
    }
}
