use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use strum::{AsRefStr, Display, EnumString};
use tracing::error;

use crate::ResponseMeta;

/// Machine-readable error codes carried in every error envelope.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Work order lifecycle
    InvalidStatusTransition,
    WorkOrderClosed,
    InvalidDateRange,
    InvalidQuantity,
    BomInactive,

    // Machine availability
    MachineInactive,
    MachineMaintenance,
    MachineBroken,
    MachineMaintenanceOverdue,

    // Quantities
    NegativeQuantity,
    AllocationExceeded,
    NegativeGoodQuantity,
    NegativeScrappedQuantity,
    OutputExceedsOrder,

    // BOM and sales orders
    DuplicateSequenceOrder,
    OrderNotConfirmed,
    LineAlreadyCommitted,

    SequenceFormatError,
    ValidationError,
    NotFound,
    Unauthorized,
    DatabaseError,
    InternalError,
}

/// A broken business rule: code, human message and structured details.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleViolation {
    pub code: ErrorCode,
    pub message: String,
    pub details: Map<String, Value>,
}

impl RuleViolation {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Map::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.details.insert(key.to_string(), value);
        self
    }
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Business-rule failures, one variant per domain.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error("Work order rule violated: {0}")]
    WorkOrder(RuleViolation),

    #[error("Machine unavailable: {0}")]
    Machine(RuleViolation),

    #[error("Material allocation rejected: {0}")]
    MaterialAllocation(RuleViolation),

    #[error("Production output rejected: {0}")]
    Production(RuleViolation),

    #[error("Business rule violated: {0}")]
    BusinessRule(RuleViolation),
}

impl DomainError {
    pub fn violation(&self) -> &RuleViolation {
        match self {
            Self::WorkOrder(v)
            | Self::Machine(v)
            | Self::MaterialAllocation(v)
            | Self::Production(v)
            | Self::BusinessRule(v) => v,
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.violation().code
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Validation failed")]
    InvalidFields(#[from] validator::ValidationErrors),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Sequence format error: cannot parse a number from '{value}'")]
    SequenceFormat { value: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::DatabaseError(_) => ErrorCode::DatabaseError,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::ValidationError(_) | Self::InvalidFields(_) => ErrorCode::ValidationError,
            Self::Domain(err) => err.code(),
            Self::SequenceFormat { .. } => ErrorCode::SequenceFormatError,
            Self::Unauthorized(_) => ErrorCode::Unauthorized,
            Self::InternalError(_) | Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) | Self::InvalidFields(_) | Self::Domain(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::DatabaseError(_)
            | Self::SequenceFormat { .. }
            | Self::InternalError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) | Self::Other(_) => "Internal server error".to_string(),
            Self::Domain(err) => err.violation().message.clone(),
            _ => self.to_string(),
        }
    }

    pub fn details(&self) -> Map<String, Value> {
        match self {
            Self::Domain(err) => err.violation().details.clone(),
            Self::InvalidFields(errors) => {
                let mut details = Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), Value::from(messages));
                }
                details
            }
            Self::SequenceFormat { value } => {
                let mut details = Map::new();
                details.insert("value".to_string(), Value::from(value.clone()));
                details
            }
            _ => Map::new(),
        }
    }
}

/// Body of a failed response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    pub details: Map<String, Value>,
}

/// `{success: false, error: {...}, meta: {...}}`
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

impl From<&ServiceError> for ErrorEnvelope {
    fn from(err: &ServiceError) -> Self {
        Self {
            success: false,
            error: ErrorBody {
                code: err.code(),
                message: err.response_message(),
                details: err.details(),
            },
            meta: ResponseMeta::capture(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, code = %self.code(), "request failed");
        }

        (status, Json(ErrorEnvelope::from(&self))).into_response()
    }
}
