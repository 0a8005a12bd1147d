//! HTTP API 계층
//!
//! 원장 결과를 HTTP 응답으로 옮기는 얇은 계층입니다.

pub mod handlers;
pub mod models;
pub mod routes;

use axum::async_trait;
use axum::extract::{FromRequest, Request};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use log::{debug, error, warn};
use serde::de::DeserializeOwned;

use crate::error::{ErrorKind, LedgerError};
use crate::server::ServerState;
use models::ErrorResponse;

pub use routes::create_api_router;

/// 핸들러 공통 에러 타입
pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// 관리자 비밀 헤더
pub const ADMIN_SECRET_HEADER: &str = "x-admin-secret";

/// 오류 종류 → HTTP 상태 코드
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation
        | ErrorKind::InsufficientBalance
        | ErrorKind::InsufficientBonus
        | ErrorKind::PlanNotActivated => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidStateTransition | ErrorKind::TransactionConflict => StatusCode::CONFLICT,
        ErrorKind::ClaimNotYetAvailable => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::DailyClaimDisabled => StatusCode::FORBIDDEN,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl From<LedgerError> for ErrorResponse {
    fn from(err: LedgerError) -> Self {
        let next_eligible_at = match &err {
            LedgerError::ClaimNotYetAvailable { next_eligible_at } => Some(*next_eligible_at),
            _ => None,
        };
        ErrorResponse {
            error: err.kind().code().to_string(),
            message: err.public_message(),
            next_eligible_at,
        }
    }
}

/// 원장 오류를 HTTP 에러 응답으로 변환
pub fn api_error(err: LedgerError) -> ApiError {
    let status = status_for(err.kind());
    if status == StatusCode::SERVICE_UNAVAILABLE {
        error!("저장소 오류: {}", err);
    }
    (status, Json(ErrorResponse::from(err)))
}

/// JSON 본문 추출기
///
/// 본문이 없거나 형식이 틀리면 axum 기본 응답(422 텍스트) 대신
/// `VALIDATION_ERROR` 400 응답을 돌려줍니다.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                debug!("요청 본문 거부: {}", rejection.body_text());
                Err(api_error(LedgerError::Validation(rejection.body_text())))
            }
        }
    }
}

/// `Authorization: Bearer <token>`에서 사용자 ID 확인
pub fn authenticate(state: &ServerState, headers: &HeaderMap) -> Result<String, ApiError> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| api_error(LedgerError::Unauthorized))?;

    state.auth.resolve_user_id(token).map_err(api_error)
}

/// 관리자 비밀 헤더 확인
pub fn require_admin(state: &ServerState, headers: &HeaderMap) -> Result<(), ApiError> {
    let provided = headers
        .get(ADMIN_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(secret) if secret == state.admin_secret.as_str() => Ok(()),
        _ => {
            warn!("관리자 인증 실패");
            Err(api_error(LedgerError::Unauthorized))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::Validation), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(ErrorKind::ClaimNotYetAvailable),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(status_for(ErrorKind::DailyClaimDisabled), StatusCode::FORBIDDEN);
        assert_eq!(
            status_for(ErrorKind::StoreUnavailable),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_claim_error_carries_next_eligible_at() {
        let at = Utc.with_ymd_and_hms(2025, 5, 2, 9, 0, 0).unwrap();
        let (status, Json(body)) = api_error(LedgerError::ClaimNotYetAvailable {
            next_eligible_at: at,
        });

        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body.error, "CLAIM_NOT_YET_AVAILABLE");
        assert_eq!(body.next_eligible_at, Some(at));
    }

    #[test]
    fn test_store_failures_hide_details() {
        let (_, Json(body)) = api_error(LedgerError::StoreUnavailable("disk I/O error at /var".into()));
        assert!(!body.message.contains("/var"));
    }
}
