use super::common::{created_response, success_response, IdPath, MessageResponse, ValidatedJson};
use crate::{
    entities::product,
    errors::ServiceError,
    services::products::ProductInput,
    validation::{coerce, coerced, hazard_rating, Input, ValidatedRequest, ValidationError},
    AppState,
};
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Body of product create and update requests
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({"name": "Sodium hypochlorite 10%", "unit": "L", "hazard_rating": "II"}))]
pub struct ProductRequest {
    #[serde(default, deserialize_with = "coerce::text")]
    #[validate(custom = "coerced")]
    #[schema(value_type = String)]
    pub name: Input<String>,
    #[serde(default, deserialize_with = "coerce::text")]
    #[validate(custom = "coerced")]
    #[schema(value_type = String)]
    pub unit: Input<String>,
    /// One of `I`, `II`, `III`, `IV`, `V`
    #[serde(default, deserialize_with = "coerce::text")]
    #[validate(custom = "hazard_rating")]
    #[schema(value_type = String)]
    pub hazard_rating: Input<String>,
}

impl ValidatedRequest for ProductRequest {
    const FIELDS: &'static [&'static str] = &["name", "unit", "hazard_rating"];
}

impl TryFrom<ProductRequest> for ProductInput {
    type Error = ValidationError;

    fn try_from(request: ProductRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            name: request.name.into_value("name")?,
            unit: request.unit.into_value("unit")?,
            hazard_rating: request.hazard_rating.into_value("hazard_rating")?,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductCreated {
    pub message: String,
    pub product_id: i32,
}

/// List all products
#[utoipa::path(
    get,
    path = "/products",
    responses(
        (status = 200, description = "All products", body = [product::Model])
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.products.list().await?))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product fetched", body = product::Model),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    IdPath(product_id): IdPath,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.products.get(product_id).await?,
    ))
}

/// Create a product
#[utoipa::path(
    post,
    path = "/products",
    request_body = ProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductCreated),
        (status = 400, description = "Invalid field", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate product name", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let input = ProductInput::try_from(request)?;
    let product_id = state.services.products.create(input).await?;

    Ok(created_response(ProductCreated {
        message: "Product created successfully".to_string(),
        product_id,
    }))
}

/// Update a product
#[utoipa::path(
    put,
    path = "/products/{id}",
    request_body = ProductRequest,
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product updated", body = MessageResponse),
        (status = 400, description = "Invalid field", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate product name", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    IdPath(product_id): IdPath,
    ValidatedJson(request): ValidatedJson<ProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let input = ProductInput::try_from(request)?;
    state.services.products.update(product_id, input).await?;
    Ok(success_response(MessageResponse::new(
        "Product updated successfully",
    )))
}

/// Delete a product with no sales or production history
#[utoipa::path(
    delete,
    path = "/products/{id}",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deleted", body = MessageResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Product is still referenced", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    IdPath(product_id): IdPath,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.products.delete(product_id).await?;
    Ok(success_response(MessageResponse::new(
        "Product deleted successfully",
    )))
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}
