use super::common::{
    created_response, success_response, IdPath, MessageResponse, RecordCreated, ValidatedJson,
};
use crate::{
    entities::purchase_record,
    errors::ServiceError,
    services::purchase_records::{
        NewPurchaseRecord, PurchaseLine, PurchaseLineView, PurchaseRecordDetail,
    },
    validation::{coerce, coerced, Bound, Input, ValidatedRequest, ValidationError},
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
pub struct PurchaseLineRequest {
    #[serde(default, deserialize_with = "coerce::id")]
    #[validate(custom = "coerced")]
    #[schema(value_type = i32)]
    pub material_id: Input<i32>,
    #[serde(default, deserialize_with = "coerce::decimal")]
    #[validate(custom = "coerced")]
    #[schema(value_type = f64)]
    pub quantity: Input<Decimal>,
    #[serde(default, deserialize_with = "coerce::decimal")]
    #[validate(custom = "coerced")]
    #[schema(value_type = f64)]
    pub unit_price: Input<Decimal>,
}

/// Body of a purchase record insert
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "supplier_id": 1,
    "date": "2024-01-15",
    "employee_id": 2,
    "materials": [{"material_id": 3, "quantity": 100, "unit_price": 12.5}]
}))]
pub struct CreatePurchaseRecordRequest {
    #[serde(default, deserialize_with = "coerce::id")]
    #[validate(custom = "coerced")]
    #[schema(value_type = i32)]
    pub supplier_id: Input<i32>,
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
    #[schema(value_type = Vec<PurchaseLineRequest>)]
    pub materials: Option<Vec<PurchaseLineRequest>>,
}

impl ValidatedRequest for CreatePurchaseRecordRequest {
    const FIELDS: &'static [&'static str] = &["supplier_id", "date", "employee_id", "materials"];
    const LINE_FIELDS: &'static [&'static str] = &["material_id", "quantity", "unit_price"];
}

impl CreatePurchaseRecordRequest {
    /// Stricter line check enabled by `purchase_require_positive`.
    ///
    /// Runs after [`Validate`], so every value is already coerced.
    pub fn require_positive(&self) -> Result<(), ValidationError> {
        for (i, line) in self.materials.iter().flatten().enumerate() {
            for (name, input) in [("quantity", &line.quantity), ("unit_price", &line.unit_price)] {
                if let Some(value) = input.value() {
                    Bound::Positive.check(value).map_err(|reason| {
                        ValidationError::new(format!("materials[{i}].{name}"), reason)
                    })?;
                }
            }
        }
        Ok(())
    }
}

impl TryFrom<CreatePurchaseRecordRequest> for NewPurchaseRecord {
    type Error = ValidationError;

    fn try_from(request: CreatePurchaseRecordRequest) -> Result<Self, Self::Error> {
        let lines = request
            .materials
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, line)| {
                Ok(PurchaseLine {
                    material_id: line.material_id.into_value(format!("materials[{i}].material_id"))?,
                    quantity: line.quantity.into_value(format!("materials[{i}].quantity"))?,
                    unit_price: line.unit_price.into_value(format!("materials[{i}].unit_price"))?,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        Ok(Self {
            supplier_id: request.supplier_id.into_value("supplier_id")?,
            date: request.date.into_value("date")?,
            employee_id: request.employee_id.into_value("employee_id")?,
            lines,
        })
    }
}

/// Record a purchase with its material lines
///
/// The header and every line are written in one transaction; if any
/// referenced supplier, buyer or material is unknown nothing is written.
#[utoipa::path(
    post,
    path = "/purchase_records",
    request_body = CreatePurchaseRecordRequest,
    responses(
        (status = 201, description = "Purchase record created", body = RecordCreated),
        (status = 400, description = "Invalid field or unknown reference", body = crate::errors::ErrorResponse),
        (status = 409, description = "Constraint violation", body = crate::errors::ErrorResponse),
        (status = 500, description = "Store error", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-records"
)]
pub async fn create_purchase_record(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreatePurchaseRecordRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    if state.services.purchase_require_positive {
        request.require_positive()?;
    }
    let record = NewPurchaseRecord::try_from(request)?;
    let record_id = state.services.purchase_records.create(record).await?;

    info!(record_id, "Purchase record created");

    Ok(created_response(RecordCreated::new(
        "Purchase record added successfully",
        record_id,
    )))
}

/// List purchase records
#[utoipa::path(
    get,
    path = "/purchase_records",
    responses(
        (status = 200, description = "All purchase records", body = [purchase_record::Model])
    ),
    tag = "purchase-records"
)]
pub async fn list_purchase_records(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.purchase_records.list().await?,
    ))
}

/// Get a purchase record with supplier and buyer names
#[utoipa::path(
    get,
    path = "/purchase_records/{id}",
    params(("id" = i32, Path, description = "Purchase record ID")),
    responses(
        (status = 200, description = "Purchase record fetched", body = PurchaseRecordDetail),
        (status = 404, description = "Purchase record not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-records"
)]
pub async fn get_purchase_record(
    State(state): State<AppState>,
    IdPath(record_id): IdPath,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.purchase_records.get(record_id).await?,
    ))
}

/// Material lines of a purchase record
#[utoipa::path(
    get,
    path = "/purchase_records/{id}/materials",
    params(("id" = i32, Path, description = "Purchase record ID")),
    responses(
        (status = 200, description = "Material lines, empty for an unknown record", body = [PurchaseLineView])
    ),
    tag = "purchase-records"
)]
pub async fn get_purchase_record_materials(
    State(state): State<AppState>,
    IdPath(record_id): IdPath,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.purchase_records.lines(record_id).await?,
    ))
}

/// Delete a purchase record and its lines
#[utoipa::path(
    delete,
    path = "/purchase_records/{id}",
    params(("id" = i32, Path, description = "Purchase record ID")),
    responses(
        (status = 200, description = "Purchase record deleted", body = MessageResponse),
        (status = 404, description = "Purchase record not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-records"
)]
pub async fn delete_purchase_record(
    State(state): State<AppState>,
    IdPath(record_id): IdPath,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.purchase_records.delete(record_id).await?;
    Ok(success_response(MessageResponse::new(format!(
        "Purchase record {} deleted successfully",
        record_id
    ))))
}

pub fn purchase_record_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/purchase_records",
            get(list_purchase_records).post(create_purchase_record),
        )
        .route(
            "/purchase_records/:id",
            get(get_purchase_record).delete(delete_purchase_record),
        )
        .route(
            "/purchase_records/:id/materials",
            get(get_purchase_record_materials),
        )
}
