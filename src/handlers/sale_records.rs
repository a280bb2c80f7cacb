use super::common::{
    created_response, success_response, IdPath, MessageResponse, RecordCreated, ValidatedJson,
};
use crate::{
    entities::sale_record,
    errors::ServiceError,
    services::sale_records::{NewSaleRecord, SaleLine, SaleLineView, SaleRecordDetail},
    validation::{coerce, coerced, positive, Input, ValidatedRequest, ValidationError},
    AppState,
};
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct SaleLineRequest {
    #[serde(default, deserialize_with = "coerce::id")]
    #[validate(custom = "coerced")]
    #[schema(value_type = i32)]
    pub product_id: Input<i32>,
    #[serde(default, deserialize_with = "coerce::decimal")]
    #[validate(custom = "positive")]
    #[schema(value_type = f64)]
    pub quantity: Input<Decimal>,
    #[serde(default, deserialize_with = "coerce::decimal")]
    #[validate(custom = "positive")]
    #[schema(value_type = f64)]
    pub unit_price: Input<Decimal>,
}

/// Body of a sale record insert
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "customer_id": 1,
    "date": "2024-01-01",
    "employee_id": 2,
    "products": [{"product_id": 5, "quantity": 10, "unit_price": 3.5}]
}))]
pub struct CreateSaleRecordRequest {
    #[serde(default, deserialize_with = "coerce::id")]
    #[validate(custom = "coerced")]
    #[schema(value_type = i32)]
    pub customer_id: Input<i32>,
    #[serde(default, deserialize_with = "coerce::date")]
    #[validate(custom = "coerced")]
    #[schema(value_type = String, format = Date)]
    pub date: Input<NaiveDate>,
    #[serde(default, deserialize_with = "coerce::id")]
    #[validate(custom = "coerced")]
    #[schema(value_type = i32)]
    pub employee_id: Input<i32>,
    #[serde(default, deserialize_with = "coerce::lines")]
    #[validate(required, length(min = 1))]
    #[validate]
    #[schema(value_type = Vec<SaleLineRequest>)]
    pub products: Option<Vec<SaleLineRequest>>,
}

impl ValidatedRequest for CreateSaleRecordRequest {
    const FIELDS: &'static [&'static str] = &["customer_id", "date", "employee_id", "products"];
    const LINE_FIELDS: &'static [&'static str] = &["product_id", "quantity", "unit_price"];
}

impl TryFrom<CreateSaleRecordRequest> for NewSaleRecord {
    type Error = ValidationError;

    fn try_from(request: CreateSaleRecordRequest) -> Result<Self, Self::Error> {
        let lines = request
            .products
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, line)| {
                Ok(SaleLine {
                    product_id: line.product_id.into_value(format!("products[{i}].product_id"))?,
                    quantity: line.quantity.into_value(format!("products[{i}].quantity"))?,
                    unit_price: line.unit_price.into_value(format!("products[{i}].unit_price"))?,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        Ok(Self {
            customer_id: request.customer_id.into_value("customer_id")?,
            date: request.date.into_value("date")?,
            employee_id: request.employee_id.into_value("employee_id")?,
            lines,
        })
    }
}

/// Record a sale with its product lines
///
/// Quantities and unit prices must be greater than zero.
#[utoipa::path(
    post,
    path = "/sale_records",
    request_body = CreateSaleRecordRequest,
    responses(
        (status = 201, description = "Sale record created", body = RecordCreated),
        (status = 400, description = "Invalid field or unknown reference", body = crate::errors::ErrorResponse),
        (status = 409, description = "Constraint violation", body = crate::errors::ErrorResponse),
        (status = 500, description = "Store error", body = crate::errors::ErrorResponse)
    ),
    tag = "sale-records"
)]
pub async fn create_sale_record(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateSaleRecordRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = NewSaleRecord::try_from(request)?;
    let record_id = state.services.sale_records.create(record).await?;

    info!(record_id, "Sale record created");

    Ok(created_response(RecordCreated::new(
        "Sale record added successfully",
        record_id,
    )))
}

/// List sale records
#[utoipa::path(
    get,
    path = "/sale_records",
    responses(
        (status = 200, description = "All sale records", body = [sale_record::Model])
    ),
    tag = "sale-records"
)]
pub async fn list_sale_records(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.sale_records.list().await?,
    ))
}

/// Get a sale record with customer and distributor names
#[utoipa::path(
    get,
    path = "/sale_records/{id}",
    params(("id" = i32, Path, description = "Sale record ID")),
    responses(
        (status = 200, description = "Sale record fetched", body = SaleRecordDetail),
        (status = 404, description = "Sale record not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sale-records"
)]
pub async fn get_sale_record(
    State(state): State<AppState>,
    IdPath(record_id): IdPath,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.sale_records.get(record_id).await?,
    ))
}

/// Product lines of a sale record
#[utoipa::path(
    get,
    path = "/sale_records/{id}/products",
    params(("id" = i32, Path, description = "Sale record ID")),
    responses(
        (status = 200, description = "Product lines, empty for an unknown record", body = [SaleLineView])
    ),
    tag = "sale-records"
)]
pub async fn get_sale_record_products(
    State(state): State<AppState>,
    IdPath(record_id): IdPath,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.sale_records.lines(record_id).await?,
    ))
}

/// Delete a sale record and its lines
#[utoipa::path(
    delete,
    path = "/sale_records/{id}",
    params(("id" = i32, Path, description = "Sale record ID")),
    responses(
        (status = 200, description = "Sale record deleted", body = MessageResponse),
        (status = 404, description = "Sale record not found", body = crate::errors::ErrorResponse)
    ),
    tag = "sale-records"
)]
pub async fn delete_sale_record(
    State(state): State<AppState>,
    IdPath(record_id): IdPath,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.sale_records.delete(record_id).await?;
    Ok(success_response(MessageResponse::new(format!(
        "Sale record {} deleted successfully",
        record_id
    ))))
}

pub fn sale_record_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/sale_records",
            get(list_sale_records).post(create_sale_record),
        )
        .route(
            "/sale_records/:id",
            get(get_sale_record).delete(delete_sale_record),
        )
        .route(
            "/sale_records/:id/products",
            get(get_sale_record_products),
        )
}
