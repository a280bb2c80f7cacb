use super::common::{
    created_response, success_response, IdPath, MessageResponse, RecordCreated, ValidatedJson,
};
use crate::{
    errors::ServiceError,
    services::production_records::{
        NewProductionRecord, ProductionRecordDetail, ProductionRecordSummary, UsageLine,
        UsageLineView,
    },
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
pub struct UsageLineRequest {
    #[serde(default, deserialize_with = "coerce::id")]
    #[validate(custom = "coerced")]
    #[schema(value_type = i32)]
    pub material_id: Input<i32>,
    #[serde(default, deserialize_with = "coerce::decimal")]
    #[validate(custom = "positive")]
    #[schema(value_type = f64)]
    pub quantity: Input<Decimal>,
}

/// Body of a production record insert
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "product_id": 1,
    "line_id": 1,
    "date": "2024-03-02",
    "theoretical_output": 500,
    "actual_output": 480,
    "materials": [{"material_id": 3, "quantity": 120.5}]
}))]
pub struct CreateProductionRecordRequest {
    #[serde(default, deserialize_with = "coerce::id")]
    #[validate(custom = "coerced")]
    #[schema(value_type = i32)]
    pub product_id: Input<i32>,
    #[serde(default, deserialize_with = "coerce::id")]
    #[validate(custom = "coerced")]
    #[schema(value_type = i32)]
    pub line_id: Input<i32>,
    #[serde(default, deserialize_with = "coerce::date")]
    #[validate(custom = "coerced")]
    #[schema(value_type = String, format = Date)]
    pub date: Input<NaiveDate>,
    #[serde(default, deserialize_with = "coerce::decimal")]
    #[validate(custom = "positive")]
    #[schema(value_type = f64)]
    pub theoretical_output: Input<Decimal>,
    #[serde(default, deserialize_with = "coerce::decimal")]
    #[validate(custom = "positive")]
    #[schema(value_type = f64)]
    pub actual_output: Input<Decimal>,
    #[serde(default, deserialize_with = "coerce::lines")]
    #[validate(required, length(min = 1))]
    #[validate]
    #[schema(value_type = Vec<UsageLineRequest>)]
    pub materials: Option<Vec<UsageLineRequest>>,
}

impl ValidatedRequest for CreateProductionRecordRequest {
    const FIELDS: &'static [&'static str] = &[
        "product_id",
        "line_id",
        "date",
        "theoretical_output",
        "actual_output",
        "materials",
    ];
    const LINE_FIELDS: &'static [&'static str] = &["material_id", "quantity"];
}

impl TryFrom<CreateProductionRecordRequest> for NewProductionRecord {
    type Error = ValidationError;

    fn try_from(request: CreateProductionRecordRequest) -> Result<Self, Self::Error> {
        let materials = request
            .materials
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, line)| {
                Ok(UsageLine {
                    material_id: line.material_id.into_value(format!("materials[{i}].material_id"))?,
                    quantity: line.quantity.into_value(format!("materials[{i}].quantity"))?,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        Ok(Self {
            product_id: request.product_id.into_value("product_id")?,
            line_id: request.line_id.into_value("line_id")?,
            date: request.date.into_value("date")?,
            theoretical_output: request.theoretical_output.into_value("theoretical_output")?,
            actual_output: request.actual_output.into_value("actual_output")?,
            materials,
        })
    }
}

/// Record a production run with the materials it consumed
#[utoipa::path(
    post,
    path = "/production_records",
    request_body = CreateProductionRecordRequest,
    responses(
        (status = 201, description = "Production record created", body = RecordCreated),
        (status = 400, description = "Invalid field or unknown product, line or material", body = crate::errors::ErrorResponse),
        (status = 409, description = "Constraint violation", body = crate::errors::ErrorResponse),
        (status = 500, description = "Store error", body = crate::errors::ErrorResponse)
    ),
    tag = "production-records"
)]
pub async fn create_production_record(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateProductionRecordRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = NewProductionRecord::try_from(request)?;
    let record_id = state.services.production_records.create(record).await?;

    info!(record_id, "Production record created");

    Ok(created_response(RecordCreated::new(
        "Production record added successfully",
        record_id,
    )))
}

/// List production records, newest first
#[utoipa::path(
    get,
    path = "/production_records",
    responses(
        (status = 200, description = "Production record summaries", body = [ProductionRecordSummary])
    ),
    tag = "production-records"
)]
pub async fn list_production_records(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.production_records.list().await?,
    ))
}

#[utoipa::path(
    get,
    path = "/production_records/{id}",
    params(("id" = i32, Path, description = "Production record ID")),
    responses(
        (status = 200, description = "Production record fetched", body = ProductionRecordDetail),
        (status = 404, description = "Production record not found", body = crate::errors::ErrorResponse)
    ),
    tag = "production-records"
)]
pub async fn get_production_record(
    State(state): State<AppState>,
    IdPath(record_id): IdPath,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.production_records.get(record_id).await?,
    ))
}

/// Materials consumed by a production record
#[utoipa::path(
    get,
    path = "/production_records/{id}/materials",
    params(("id" = i32, Path, description = "Production record ID")),
    responses(
        (status = 200, description = "Consumed materials", body = [UsageLineView]),
        (status = 404, description = "Production record not found", body = crate::errors::ErrorResponse)
    ),
    tag = "production-records"
)]
pub async fn get_production_record_materials(
    State(state): State<AppState>,
    IdPath(record_id): IdPath,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.production_records.materials(record_id).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/production_records/{id}",
    params(("id" = i32, Path, description = "Production record ID")),
    responses(
        (status = 200, description = "Production record deleted", body = MessageResponse),
        (status = 404, description = "Production record not found", body = crate::errors::ErrorResponse)
    ),
    tag = "production-records"
)]
pub async fn delete_production_record(
    State(state): State<AppState>,
    IdPath(record_id): IdPath,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.production_records.delete(record_id).await?;
    Ok(success_response(MessageResponse::new(format!(
        "Production record {} deleted successfully",
        record_id
    ))))
}

pub fn production_record_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/production_records",
            get(list_production_records).post(create_production_record),
        )
        .route(
            "/production_records/:id",
            get(get_production_record).delete(delete_production_record),
        )
        .route(
            "/production_records/:id/materials",
            get(get_production_record_materials),
        )
}
