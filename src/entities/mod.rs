pub mod buyer;
pub mod customer;
pub mod distributor;
pub mod material;
pub mod product;
pub mod production_line;
pub mod production_record;
pub mod purchase_material;
pub mod purchase_record;
pub mod sale_product;
pub mod sale_record;
pub mod supplier;
pub mod use_material;
