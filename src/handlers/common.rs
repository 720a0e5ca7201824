use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use validator::Validate;

use crate::{config::AppConfig, errors::ServiceError, services::Page, ApiResponse};

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// JSON body that has passed `validator` checks.
///
/// Malformed bodies and failed field rules both surface as
/// `VALIDATION_ERROR`.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ServiceError::ValidationError(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Pagination parameters for list operations
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl PaginationParams {
    /// `(page, per_page)` with the size clamped to the configured maximum
    /// and the page clamped so the row offset fits a signed 64-bit integer.
    pub fn resolve(&self, config: &AppConfig) -> (u64, u64) {
        let per_page = self
            .per_page
            .unwrap_or(config.api_default_page_size)
            .clamp(1, config.api_max_page_size);
        let last_page = i64::MAX as u64 / per_page;
        let page = self.page.unwrap_or(1).clamp(1, last_page);
        (page, per_page)
    }
}

/// Standard paginated response wrapper
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T> From<Page<T>> for PaginatedResponse<T> {
    fn from(page: Page<T>) -> Self {
        let total_pages = if page.total == 0 {
            0
        } else {
            (page.total + page.per_page - 1) / page.per_page
        };
        Self {
            items: page.items,
            total: page.total,
            page: page.page,
            per_page: page.per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            "x".repeat(64),
            "127.0.0.1".into(),
            8080,
            "test".into(),
        )
    }

    #[test_case(None, None => (1, 20) ; "defaults")]
    #[test_case(Some(0), Some(0) => (1, 1) ; "zero is raised")]
    #[test_case(Some(3), Some(500) => (3, 100) ; "size is capped")]
    #[test_case(Some(2), Some(50) => (2, 50) ; "within bounds")]
    #[test_case(Some(u64::MAX), Some(100) => (i64::MAX as u64 / 100, 100) ; "huge page is capped")]
    #[test_case(Some(u64::MAX), Some(1) => (i64::MAX as u64, 1) ; "huge page with unit size")]
    fn resolves(page: Option<u64>, per_page: Option<u64>) -> (u64, u64) {
        PaginationParams { page, per_page }.resolve(&config())
    }

    #[test]
    fn capped_page_offset_does_not_overflow() {
        let (page, per_page) = PaginationParams {
            page: Some(u64::MAX),
            per_page: Some(100),
        }
        .resolve(&config());
        let offset = (page - 1).checked_mul(per_page).expect("offset fits u64");
        assert!(offset <= i64::MAX as u64);
    }

    #[test]
    fn total_pages_round_up() {
        let response = PaginatedResponse::from(Page {
            items: vec![1, 2],
            total: 41,
            page: 1,
            per_page: 20,
        });
        assert_eq!(response.total_pages, 3);
    }
}
