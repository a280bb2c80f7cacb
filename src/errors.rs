use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use utoipa::ToSchema;

use crate::db::{StoreErrorKind, WriteStage};
use crate::services::references::MissingReference;
use crate::validation::ValidationError;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Machine-readable error category carried in every error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCode {
    ValidationError,
    MissingReference,
    ConstraintViolation,
    StoreError,
    WriteError,
    NotFound,
    Conflict,
    InvalidOperation,
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Bad Request",
    "code": "missing_reference",
    "message": "Missing references: material [42, 43]",
    "missing": [{"entity": "material", "ids": [42, 43]}],
    "retryable": false,
    "request_id": "3f0c1c1e-8f6b-4c53-9a57-0d9b0f0e6a10",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    pub code: ErrorCode,
    /// Human-readable error description
    pub message: String,
    /// Offending field path for validation failures, e.g. `products[1].quantity`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Every unresolved reference, grouped by entity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<MissingReference>>,
    /// Write step that failed, `parent` or `line[i]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_error: Option<StoreErrorKind>,
    /// Whether resubmitting the same payload unchanged may succeed
    pub retryable: bool,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Missing references: {}", describe_missing(.0))]
    MissingReferences(Vec<MissingReference>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Unique or foreign-key violation raised inside a compound write.
    #[error("Constraint violation ({kind}) at {stage}: {detail}")]
    Constraint {
        stage: WriteStage,
        kind: StoreErrorKind,
        detail: String,
    },

    /// A statement ran but produced no row.
    #[error("Write failed at {stage}: {detail}")]
    Write { stage: WriteStage, detail: String },

    #[error("Store error ({kind}): {detail}")]
    Store {
        kind: StoreErrorKind,
        stage: Option<WriteStage>,
        detail: String,
    },
}

fn describe_missing(missing: &[MissingReference]) -> String {
    missing
        .iter()
        .map(|m| format!("{} {:?}", m.entity, m.ids))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<DbErr> for ServiceError {
    fn from(err: DbErr) -> Self {
        ServiceError::store(None, &err)
    }
}

impl ServiceError {
    /// Store failure outside a compound write. Constraint violations from
    /// single-row writes surface as conflicts.
    pub fn store(stage: Option<WriteStage>, err: &DbErr) -> Self {
        let kind = StoreErrorKind::classify(err);
        match (kind, stage) {
            (kind, Some(stage)) if kind.is_constraint() => ServiceError::Constraint {
                stage,
                kind,
                detail: err.to_string(),
            },
            (kind, None) if kind.is_constraint() => ServiceError::Conflict(err.to_string()),
            (kind, stage) => ServiceError::Store {
                kind,
                stage,
                detail: err.to_string(),
            },
        }
    }

    /// Classifies a failure of the statement executed at `stage` of a
    /// compound write.
    pub fn at_stage(stage: WriteStage, err: DbErr) -> Self {
        match StoreErrorKind::classify(&err) {
            StoreErrorKind::RecordNotInserted => ServiceError::Write {
                stage,
                detail: err.to_string(),
            },
            _ => ServiceError::store(Some(stage), &err),
        }
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::MissingReferences(_) | Self::InvalidOperation(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) | Self::Constraint { .. } => StatusCode::CONFLICT,
            Self::Write { .. } | Self::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::MissingReferences(_) => ErrorCode::MissingReference,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Conflict(_) => ErrorCode::Conflict,
            Self::InvalidOperation(_) => ErrorCode::InvalidOperation,
            Self::Constraint { .. } => ErrorCode::ConstraintViolation,
            Self::Write { .. } => ErrorCode::WriteError,
            Self::Store { .. } => ErrorCode::StoreError,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store { kind, .. } if kind.is_retryable())
    }

    /// Returns the error message suitable for HTTP responses.
    /// Driver text of unexpected store failures is not echoed.
    pub fn response_message(&self) -> String {
        match self {
            Self::Store {
                kind: StoreErrorKind::Timeout,
                ..
            } => self.to_string(),
            Self::Store {
                kind,
                stage: Some(stage),
                ..
            } => format!("Store error ({}) at {}", kind, stage),
            Self::Store { kind, .. } => format!("Store error ({})", kind),
            _ => self.to_string(),
        }
    }

    fn to_body(&self) -> ErrorResponse {
        let status = self.status_code();
        let mut body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            code: self.code(),
            message: self.response_message(),
            field: None,
            reason: None,
            missing: None,
            stage: None,
            store_error: None,
            retryable: self.is_retryable(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        match self {
            Self::Validation(err) => {
                body.field = Some(err.field.clone());
                body.reason = Some(err.reason.to_string());
            }
            Self::MissingReferences(missing) => body.missing = Some(missing.clone()),
            Self::Constraint { stage, kind, .. } => {
                body.stage = Some(stage.to_string());
                body.store_error = Some(*kind);
            }
            Self::Write { stage, .. } => {
                body.stage = Some(stage.to_string());
                body.store_error = Some(StoreErrorKind::RecordNotInserted);
            }
            Self::Store { kind, stage, .. } => {
                body.stage = stage.map(|s| s.to_string());
                body.store_error = Some(*kind);
            }
            _ => {}
        }

        body
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = %self.code(), "Request failed");
        }
        (status, Json(self.to_body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::references::ReferenceTarget;
    use crate::validation::ValidationReason;
    use axum::body::to_bytes;

    async fn body_of(err: ServiceError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::NotFound("missing".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert_eq!(payload.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn validation_error_names_field_and_reason() {
        let err = ValidationError::new("products[1].quantity", ValidationReason::NotNumeric);
        let (status, body) = body_of(err.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_error");
        assert_eq!(body["field"], "products[1].quantity");
        assert_eq!(body["reason"], "not numeric");
        assert_eq!(body["retryable"], false);
    }

    #[tokio::test]
    async fn missing_references_lists_every_id() {
        let err = ServiceError::MissingReferences(vec![MissingReference {
            entity: ReferenceTarget::Material,
            ids: vec![42, 43],
        }]);
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "missing_reference");
        assert_eq!(
            body["missing"],
            serde_json::json!([{"entity": "material", "ids": [42, 43]}])
        );
    }

    #[tokio::test]
    async fn constraint_error_reports_stage() {
        let err = ServiceError::Constraint {
            stage: WriteStage::Line(2),
            kind: StoreErrorKind::UniqueViolation,
            detail: "duplicate key".into(),
        };
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "constraint_violation");
        assert_eq!(body["stage"], "line[2]");
        assert_eq!(body["store_error"], "unique_violation");
        assert_eq!(body["retryable"], false);
    }

    #[tokio::test]
    async fn store_timeout_is_retryable() {
        let err = ServiceError::Store {
            kind: StoreErrorKind::Timeout,
            stage: None,
            detail: "create_sale_record did not complete within 15s".into(),
        };
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "store_error");
        assert_eq!(body["retryable"], true);
    }

    #[test]
    fn status_code_mapping() {
        assert_eq!(
            ServiceError::InvalidOperation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::Write {
                stage: WriteStage::Parent,
                detail: "x".into()
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn at_stage_classifies_driver_errors() {
        assert!(matches!(
            ServiceError::at_stage(WriteStage::Parent, DbErr::RecordNotInserted),
            ServiceError::Write {
                stage: WriteStage::Parent,
                ..
            }
        ));
        assert!(matches!(
            ServiceError::at_stage(WriteStage::Line(0), DbErr::Custom("x".into())),
            ServiceError::Store {
                kind: StoreErrorKind::Other,
                stage: Some(WriteStage::Line(0)),
                ..
            }
        ));
    }

    #[test]
    fn unexpected_store_detail_is_not_echoed() {
        let err = ServiceError::from(DbErr::Custom("password=hunter2".into()));
        assert_eq!(err.response_message(), "Store error (other)");
    }
}
