use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Chemical Factory API",
        version = "0.1.0",
        description = r#"
# Chemical Factory API

Records what a chemical plant buys, sells and produces.

## Compound records

Purchase, sale and production records are submitted together with their
line items. The header row and every line are written in a single
transaction: either the whole record is stored or nothing is.

Every referenced supplier, customer, employee, production line, material
and product is checked before the write. Unknown ids are rejected with
`400` and a `missing` list naming each of them.

## Error Handling

Every error uses the same body:

```json
{
  "error": "Bad Request",
  "code": "validation_error",
  "message": "Validation error: products[1].quantity: must be greater than 0",
  "field": "products[1].quantity",
  "reason": "must be greater than 0",
  "retryable": false,
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "materials", description = "Raw material catalog"),
        (name = "products", description = "Finished product catalog"),
        (name = "purchase-records", description = "Material purchases from suppliers"),
        (name = "sale-records", description = "Product sales to customers"),
        (name = "production-records", description = "Production runs and material usage")
    ),
    paths(
        // Materials
        crate::handlers::materials::list_materials,
        crate::handlers::materials::get_material,
        crate::handlers::materials::create_material,
        crate::handlers::materials::update_material,
        crate::handlers::materials::delete_material,

        // Products
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,

        // Purchase records
        crate::handlers::purchase_records::create_purchase_record,
        crate::handlers::purchase_records::list_purchase_records,
        crate::handlers::purchase_records::get_purchase_record,
        crate::handlers::purchase_records::get_purchase_record_materials,
        crate::handlers::purchase_records::delete_purchase_record,

        // Sale records
        crate::handlers::sale_records::create_sale_record,
        crate::handlers::sale_records::list_sale_records,
        crate::handlers::sale_records::get_sale_record,
        crate::handlers::sale_records::get_sale_record_products,
        crate::handlers::sale_records::delete_sale_record,

        // Production records
        crate::handlers::production_records::create_production_record,
        crate::handlers::production_records::list_production_records,
        crate::handlers::production_records::get_production_record,
        crate::handlers::production_records::get_production_record_materials,
        crate::handlers::production_records::delete_production_record,

        // Health intentionally omitted from OpenAPI paths
    ),
    components(
        schemas(
            // Common types
            crate::handlers::common::RecordCreated,
            crate::handlers::common::MessageResponse,
            crate::handlers::materials::MaterialCreated,
            crate::handlers::products::ProductCreated,

            // Request bodies
            crate::handlers::materials::MaterialRequest,
            crate::handlers::products::ProductRequest,
            crate::handlers::purchase_records::CreatePurchaseRecordRequest,
            crate::handlers::purchase_records::PurchaseLineRequest,
            crate::handlers::sale_records::CreateSaleRecordRequest,
            crate::handlers::sale_records::SaleLineRequest,
            crate::handlers::production_records::CreateProductionRecordRequest,
            crate::handlers::production_records::UsageLineRequest,

            // Catalog
            crate::entities::material::Model,
            crate::entities::product::Model,

            // Records
            crate::entities::purchase_record::Model,
            crate::entities::sale_record::Model,
            crate::services::purchase_records::PurchaseRecordDetail,
            crate::services::purchase_records::PurchaseLineView,
            crate::services::sale_records::SaleRecordDetail,
            crate::services::sale_records::SaleLineView,
            crate::services::production_records::ProductionRecordSummary,
            crate::services::production_records::ProductionRecordDetail,
            crate::services::production_records::UsageLineView,

            // Error types
            crate::errors::ErrorResponse,
            crate::errors::ErrorCode,
            crate::db::StoreErrorKind,
            crate::services::references::MissingReference,
            crate::services::references::ReferenceTarget
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_record_endpoints() {
        let openapi = ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Chemical Factory API"));
        assert!(json.contains("/purchase_records/{id}/materials"));
        assert!(json.contains("/sale_records/{id}/products"));
        assert!(json.contains("/production_records"));
        assert!(json.contains("ErrorResponse"));
    }

    #[test]
    fn request_bodies_reference_typed_schemas() {
        let openapi = ApiDoc::openapi();
        let json = serde_json::to_value(&openapi).unwrap();
        let schemas = &json["components"]["schemas"];
        for name in [
            "MaterialRequest",
            "ProductRequest",
            "CreatePurchaseRecordRequest",
            "CreateSaleRecordRequest",
            "CreateProductionRecordRequest",
            "SaleLineRequest",
        ] {
            assert!(schemas.get(name).is_some(), "missing schema {name}");
        }

        let sale_body = &json["paths"]["/sale_records"]["post"]["requestBody"]["content"]
            ["application/json"]["schema"]["$ref"];
        assert_eq!(sale_body, "#/components/schemas/CreateSaleRecordRequest");
    }
}
