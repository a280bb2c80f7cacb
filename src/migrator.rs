use crate::validation::{DECIMAL_PRECISION, DECIMAL_SCALE};
use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_catalog_tables::Migration),
            Box::new(m20240101_000002_create_party_tables::Migration),
            Box::new(m20240101_000003_create_purchase_tables::Migration),
            Box::new(m20240101_000004_create_sale_tables::Migration),
            Box::new(m20240101_000005_create_production_tables::Migration),
        ]
    }
}

// Quantities, prices and outputs. Request validation rejects values that do
// not fit this column.
fn quantity(col: impl IntoIden) -> ColumnDef {
    ColumnDef::new(col)
        .decimal_len(DECIMAL_PRECISION, DECIMAL_SCALE)
        .not_null()
        .to_owned()
}

fn serial(col: impl IntoIden) -> ColumnDef {
    ColumnDef::new(col)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

// Schema identifiers

#[derive(DeriveIden)]
enum ChemicalMaterials {
    Table,
    MaterialId,
    Name,
    CasNumber,
    Stock,
    Unit,
    Concentration,
    Category,
    StorageCondition,
    MinStockThreshold,
}

#[derive(DeriveIden)]
enum ChemicalProducts {
    Table,
    ProductId,
    Name,
    Unit,
    HazardRating,
    Stock,
}

#[derive(DeriveIden)]
enum Suppliers {
    Table,
    SupplierId,
    Name,
}

#[derive(DeriveIden)]
enum Customers {
    Table,
    CustomerId,
    Name,
}

#[derive(DeriveIden)]
enum Buyers {
    Table,
    EmployeeId,
    Name,
}

#[derive(DeriveIden)]
enum Distributors {
    Table,
    EmployeeId,
    Name,
}

#[derive(DeriveIden)]
enum ProductionLines {
    Table,
    LineId,
    Name,
}

#[derive(DeriveIden)]
enum PurchaseRecords {
    Table,
    RecordId,
    SupplierId,
    Date,
    EmployeeId,
}

#[derive(DeriveIden)]
enum PurchaseMaterials {
    Table,
    RecordId,
    MaterialId,
    Quantity,
    UnitPrice,
}

#[derive(DeriveIden)]
enum SaleRecords {
    Table,
    RecordId,
    CustomerId,
    Date,
    EmployeeId,
}

#[derive(DeriveIden)]
enum SaleProducts {
    Table,
    RecordId,
    ProductId,
    Quantity,
    UnitPrice,
}

#[derive(DeriveIden)]
enum ProductionRecords {
    Table,
    RecordId,
    ProductId,
    LineId,
    Date,
    TheoreticalOutput,
    ActualOutput,
}

#[derive(DeriveIden)]
enum UseMaterials {
    Table,
    RecordId,
    MaterialId,
    QuantityUsed,
}

// Migration implementations

mod m20240101_000001_create_catalog_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ChemicalMaterials::Table)
                        .if_not_exists()
                        .col(serial(ChemicalMaterials::MaterialId))
                        .col(
                            ColumnDef::new(ChemicalMaterials::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(ChemicalMaterials::CasNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(quantity(ChemicalMaterials::Stock).default(0))
                        .col(ColumnDef::new(ChemicalMaterials::Unit).string().not_null())
                        .col(quantity(ChemicalMaterials::Concentration))
                        .col(ColumnDef::new(ChemicalMaterials::Category).string().not_null())
                        .col(
                            ColumnDef::new(ChemicalMaterials::StorageCondition)
                                .string()
                                .not_null(),
                        )
                        .col(quantity(ChemicalMaterials::MinStockThreshold).default(0))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ChemicalProducts::Table)
                        .if_not_exists()
                        .col(serial(ChemicalProducts::ProductId))
                        .col(
                            ColumnDef::new(ChemicalProducts::Name)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(ChemicalProducts::Unit).string().not_null())
                        .col(
                            ColumnDef::new(ChemicalProducts::HazardRating)
                                .string()
                                .not_null(),
                        )
                        .col(quantity(ChemicalProducts::Stock).default(0))
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ChemicalProducts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ChemicalMaterials::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000002_create_party_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_party_tables"
        }
    }

    // Every party table is just an id and a display name.
    fn named_table(table: impl IntoIden + 'static, id: impl IntoIden, name: impl IntoIden) -> TableCreateStatement {
        Table::create()
            .table(table)
            .if_not_exists()
            .col(serial(id))
            .col(ColumnDef::new(name).string().not_null())
            .to_owned()
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(named_table(
                    Suppliers::Table,
                    Suppliers::SupplierId,
                    Suppliers::Name,
                ))
                .await?;
            manager
                .create_table(named_table(
                    Customers::Table,
                    Customers::CustomerId,
                    Customers::Name,
                ))
                .await?;
            manager
                .create_table(named_table(Buyers::Table, Buyers::EmployeeId, Buyers::Name))
                .await?;
            manager
                .create_table(named_table(
                    Distributors::Table,
                    Distributors::EmployeeId,
                    Distributors::Name,
                ))
                .await?;
            manager
                .create_table(named_table(
                    ProductionLines::Table,
                    ProductionLines::LineId,
                    ProductionLines::Name,
                ))
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductionLines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Distributors::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Buyers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Suppliers::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000003_create_purchase_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_purchase_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PurchaseRecords::Table)
                        .if_not_exists()
                        .col(serial(PurchaseRecords::RecordId))
                        .col(ColumnDef::new(PurchaseRecords::SupplierId).integer().not_null())
                        .col(ColumnDef::new(PurchaseRecords::Date).date().not_null())
                        .col(ColumnDef::new(PurchaseRecords::EmployeeId).integer().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_records_supplier_id")
                                .from(PurchaseRecords::Table, PurchaseRecords::SupplierId)
                                .to(Suppliers::Table, Suppliers::SupplierId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_records_employee_id")
                                .from(PurchaseRecords::Table, PurchaseRecords::EmployeeId)
                                .to(Buyers::Table, Buyers::EmployeeId),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PurchaseMaterials::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(PurchaseMaterials::RecordId).integer().not_null())
                        .col(ColumnDef::new(PurchaseMaterials::MaterialId).integer().not_null())
                        .col(quantity(PurchaseMaterials::Quantity))
                        .col(quantity(PurchaseMaterials::UnitPrice))
                        .primary_key(
                            Index::create()
                                .col(PurchaseMaterials::RecordId)
                                .col(PurchaseMaterials::MaterialId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_materials_record_id")
                                .from(PurchaseMaterials::Table, PurchaseMaterials::RecordId)
                                .to(PurchaseRecords::Table, PurchaseRecords::RecordId)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_materials_material_id")
                                .from(PurchaseMaterials::Table, PurchaseMaterials::MaterialId)
                                .to(ChemicalMaterials::Table, ChemicalMaterials::MaterialId),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_purchase_materials_material_id")
                        .table(PurchaseMaterials::Table)
                        .col(PurchaseMaterials::MaterialId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PurchaseMaterials::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PurchaseRecords::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000004_create_sale_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_sale_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(SaleRecords::Table)
                        .if_not_exists()
                        .col(serial(SaleRecords::RecordId))
                        .col(ColumnDef::new(SaleRecords::CustomerId).integer().not_null())
                        .col(ColumnDef::new(SaleRecords::Date).date().not_null())
                        .col(ColumnDef::new(SaleRecords::EmployeeId).integer().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sale_records_customer_id")
                                .from(SaleRecords::Table, SaleRecords::CustomerId)
                                .to(Customers::Table, Customers::CustomerId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sale_records_employee_id")
                                .from(SaleRecords::Table, SaleRecords::EmployeeId)
                                .to(Distributors::Table, Distributors::EmployeeId),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SaleProducts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(SaleProducts::RecordId).integer().not_null())
                        .col(ColumnDef::new(SaleProducts::ProductId).integer().not_null())
                        .col(quantity(SaleProducts::Quantity))
                        .col(quantity(SaleProducts::UnitPrice))
                        .primary_key(
                            Index::create()
                                .col(SaleProducts::RecordId)
                                .col(SaleProducts::ProductId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sale_products_record_id")
                                .from(SaleProducts::Table, SaleProducts::RecordId)
                                .to(SaleRecords::Table, SaleRecords::RecordId)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sale_products_product_id")
                                .from(SaleProducts::Table, SaleProducts::ProductId)
                                .to(ChemicalProducts::Table, ChemicalProducts::ProductId),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sale_products_product_id")
                        .table(SaleProducts::Table)
                        .col(SaleProducts::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SaleProducts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SaleRecords::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000005_create_production_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_production_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProductionRecords::Table)
                        .if_not_exists()
                        .col(serial(ProductionRecords::RecordId))
                        .col(ColumnDef::new(ProductionRecords::ProductId).integer().not_null())
                        .col(ColumnDef::new(ProductionRecords::LineId).integer().not_null())
                        .col(ColumnDef::new(ProductionRecords::Date).date().not_null())
                        .col(quantity(ProductionRecords::TheoreticalOutput))
                        .col(quantity(ProductionRecords::ActualOutput))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_production_records_product_id")
                                .from(ProductionRecords::Table, ProductionRecords::ProductId)
                                .to(ChemicalProducts::Table, ChemicalProducts::ProductId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_production_records_line_id")
                                .from(ProductionRecords::Table, ProductionRecords::LineId)
                                .to(ProductionLines::Table, ProductionLines::LineId),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(UseMaterials::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(UseMaterials::RecordId).integer().not_null())
                        .col(ColumnDef::new(UseMaterials::MaterialId).integer().not_null())
                        .col(quantity(UseMaterials::QuantityUsed))
                        .primary_key(
                            Index::create()
                                .col(UseMaterials::RecordId)
                                .col(UseMaterials::MaterialId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_use_materials_record_id")
                                .from(UseMaterials::Table, UseMaterials::RecordId)
                                .to(ProductionRecords::Table, ProductionRecords::RecordId)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_use_materials_material_id")
                                .from(UseMaterials::Table, UseMaterials::MaterialId)
                                .to(ChemicalMaterials::Table, ChemicalMaterials::MaterialId),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_production_records_date")
                        .table(ProductionRecords::Table)
                        .col(ProductionRecords::Date)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(UseMaterials::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductionRecords::Table).to_owned())
                .await
        }
    }
}
