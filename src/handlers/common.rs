use crate::{
    errors::ServiceError,
    validation::{parse_request, ValidatedRequest, ValidationError, ValidationReason},
};
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use utoipa::ToSchema;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Body of a successful compound insert.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordCreated {
    pub message: String,
    pub new_record_id: i32,
}

impl RecordCreated {
    pub fn new(message: impl Into<String>, new_record_id: i32) -> Self {
        Self {
            message: message.into(),
            new_record_id,
        }
    }
}

/// Body of writes that only report an outcome.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// JSON request body decoded into `R` and validated.
///
/// Unlike `axum::Json` a missing content type or unparsable body is
/// reported through the regular validation error shape, so clients only
/// ever see one 400 body format.
#[derive(Debug, Clone)]
pub struct ValidatedJson<R>(pub R);

#[async_trait]
impl<S, R> FromRequest<S> for ValidatedJson<R>
where
    S: Send + Sync,
    R: ValidatedRequest + Send,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| {
                debug!(error = %rejection.body_text(), "Rejected request body");
                ValidationError::malformed_body()
            })?;
        Ok(Self(parse_request(body)?))
    }
}

/// Integer `{id}` path segment, rejected with the same 400 body as payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdPath(pub i32);

#[async_trait]
impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<i32>::from_request_parts(parts, state).await {
            Ok(Path(id)) => Ok(Self(id)),
            Err(rejection) => {
                debug!(error = %rejection.body_text(), "Rejected path parameter");
                Err(ValidationError::new("id", ValidationReason::NotInteger).into())
            }
        }
    }
}
