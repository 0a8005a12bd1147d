use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 출금 요청
#[derive(Debug, Deserialize, Serialize)]
pub struct WithdrawRequest {
    pub amount: Decimal,
    pub network: String,
    pub wallet_address: String,
}

/// 일일 수령 요청
#[derive(Debug, Deserialize, Serialize)]
pub struct ClaimDailyRequest {
    pub plan_id: String,
}

/// 입금 접수 요청
#[derive(Debug, Deserialize, Serialize)]
pub struct DepositRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub product_id: Option<String>,
}

/// 계정 생성 요청 (관리자)
#[derive(Debug, Deserialize, Serialize)]
pub struct OpenAccountRequest {
    pub user_id: String,
}

/// 보너스 지급 요청 (관리자)
#[derive(Debug, Deserialize, Serialize)]
pub struct AddBonusRequest {
    pub user_id: String,
    pub bonus_type: String,
    pub amount: Decimal,
    #[serde(default)]
    pub source_user_id: Option<String>,
}

/// 보너스 전환 요청 (관리자)
#[derive(Debug, Deserialize, Serialize)]
pub struct ConvertBonusRequest {
    pub user_id: String,
    pub bonus_type: String,
    pub amount: Decimal,
}

/// 보너스 조회 쿼리
#[derive(Debug, Deserialize)]
pub struct BonusQuery {
    pub bonus_type: String,
}

/// 보너스 조회 응답
#[derive(Debug, Serialize)]
pub struct BonusAvailableResponse {
    pub user_id: String,
    pub bonus_type: String,
    pub available: Decimal,
}

/// 상품 등록 요청 (관리자)
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub daily_income: Decimal,
}

/// 일일 수령 토글 요청 (관리자)
#[derive(Debug, Deserialize, Serialize)]
pub struct DailyClaimToggleRequest {
    pub enabled: bool,
}

/// 출금 목록 쿼리
#[derive(Debug, Deserialize)]
pub struct WithdrawalListQuery {
    #[serde(default)]
    pub status: Option<String>,
}

/// 에러 응답
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    /// `CLAIM_NOT_YET_AVAILABLE`에서만 포함
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub next_eligible_at: Option<DateTime<Utc>>,
}
