// Shared write path
pub mod compound;
pub mod references;

// Compound records
pub mod production_records;
pub mod purchase_records;
pub mod sale_records;

// Catalog
pub mod materials;
pub mod products;
