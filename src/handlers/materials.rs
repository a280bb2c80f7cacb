use super::common::{created_response, success_response, IdPath, MessageResponse, ValidatedJson};
use crate::{
    entities::material,
    errors::ServiceError,
    services::materials::MaterialInput,
    validation::{
        coerce, coerced, non_negative, percentage, Input, ValidatedRequest, ValidationError,
    },
    AppState,
};
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Body of material create and update requests
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Sulfuric acid",
    "cas_number": "7664-93-9",
    "unit": "kg",
    "concentration": 98,
    "category": "acid",
    "storage_condition": "acid cabinet",
    "min_stock_threshold": 50
}))]
pub struct MaterialRequest {
    #[serde(default, deserialize_with = "coerce::text")]
    #[validate(custom = "coerced")]
    #[schema(value_type = String)]
    pub name: Input<String>,
    #[serde(default, deserialize_with = "coerce::text")]
    #[validate(custom = "coerced")]
    #[schema(value_type = String)]
    pub cas_number: Input<String>,
    #[serde(default, deserialize_with = "coerce::text")]
    #[validate(custom = "coerced")]
    #[schema(value_type = String)]
    pub unit: Input<String>,
    /// Percentage, 0 to 100
    #[serde(default, deserialize_with = "coerce::decimal")]
    #[validate(custom = "percentage")]
    #[schema(value_type = f64)]
    pub concentration: Input<Decimal>,
    #[serde(default, deserialize_with = "coerce::text")]
    #[validate(custom = "coerced")]
    #[schema(value_type = String)]
    pub category: Input<String>,
    #[serde(default, deserialize_with = "coerce::text")]
    #[validate(custom = "coerced")]
    #[schema(value_type = String)]
    pub storage_condition: Input<String>,
    #[serde(default, deserialize_with = "coerce::decimal")]
    #[validate(custom = "non_negative")]
    #[schema(value_type = f64)]
    pub min_stock_threshold: Input<Decimal>,
}

impl ValidatedRequest for MaterialRequest {
    const FIELDS: &'static [&'static str] = &[
        "name",
        "cas_number",
        "unit",
        "concentration",
        "category",
        "storage_condition",
        "min_stock_threshold",
    ];
}

impl TryFrom<MaterialRequest> for MaterialInput {
    type Error = ValidationError;

    fn try_from(request: MaterialRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            name: request.name.into_value("name")?,
            cas_number: request.cas_number.into_value("cas_number")?,
            unit: request.unit.into_value("unit")?,
            concentration: request.concentration.into_value("concentration")?,
            category: request.category.into_value("category")?,
            storage_condition: request.storage_condition.into_value("storage_condition")?,
            min_stock_threshold: request.min_stock_threshold.into_value("min_stock_threshold")?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MaterialCreated {
    pub message: String,
    pub material_id: i32,
}

/// List all materials
#[utoipa::path(
    get,
    path = "/materials",
    responses(
        (status = 200, description = "All materials", body = [material::Model]),
        (status = 500, description = "Store error", body = crate::errors::ErrorResponse)
    ),
    tag = "materials"
)]
pub async fn list_materials(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let materials = state.services.materials.list().await?;
    Ok(success_response(materials))
}

/// Get a material by ID
#[utoipa::path(
    get,
    path = "/materials/{id}",
    params(("id" = i32, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Material fetched", body = material::Model),
        (status = 404, description = "Material not found", body = crate::errors::ErrorResponse)
    ),
    tag = "materials"
)]
pub async fn get_material(
    State(state): State<AppState>,
    IdPath(material_id): IdPath,
) -> Result<impl IntoResponse, ServiceError> {
    let material = state.services.materials.get(material_id).await?;
    Ok(success_response(material))
}

/// Create a material; stock starts at zero
#[utoipa::path(
    post,
    path = "/materials",
    request_body = MaterialRequest,
    responses(
        (status = 201, description = "Material created", body = MaterialCreated),
        (status = 400, description = "Invalid field", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate name or CAS number", body = crate::errors::ErrorResponse)
    ),
    tag = "materials"
)]
pub async fn create_material(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<MaterialRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let input = MaterialInput::try_from(request)?;
    let material_id = state.services.materials.create(input).await?;

    Ok(created_response(MaterialCreated {
        message: "Material created successfully".to_string(),
        material_id,
    }))
}

/// Update a material's attributes
#[utoipa::path(
    put,
    path = "/materials/{id}",
    request_body = MaterialRequest,
    params(("id" = i32, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Material updated", body = MessageResponse),
        (status = 400, description = "Invalid field", body = crate::errors::ErrorResponse),
        (status = 404, description = "Material not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate name or CAS number", body = crate::errors::ErrorResponse)
    ),
    tag = "materials"
)]
pub async fn update_material(
    State(state): State<AppState>,
    IdPath(material_id): IdPath,
    ValidatedJson(request): ValidatedJson<MaterialRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let input = MaterialInput::try_from(request)?;
    state.services.materials.update(material_id, input).await?;
    Ok(success_response(MessageResponse::new(
        "Material updated successfully",
    )))
}

/// Delete an unreferenced material
#[utoipa::path(
    delete,
    path = "/materials/{id}",
    params(("id" = i32, Path, description = "Material ID")),
    responses(
        (status = 200, description = "Material deleted", body = MessageResponse),
        (status = 400, description = "Material is still referenced", body = crate::errors::ErrorResponse),
        (status = 404, description = "Material not found", body = crate::errors::ErrorResponse)
    ),
    tag = "materials"
)]
pub async fn delete_material(
    State(state): State<AppState>,
    IdPath(material_id): IdPath,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.materials.delete(material_id).await?;
    Ok(success_response(MessageResponse::new(
        "Material deleted successfully",
    )))
}

pub fn material_routes() -> Router<AppState> {
    Router::new()
        .route("/materials", get(list_materials).post(create_material))
        .route(
            "/materials/:id",
            get(get_material).put(update_material).delete(delete_material),
        )
}
