use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Json,
};

use crate::api::models::*;
use crate::api::{api_error, authenticate, require_admin, ApiError, ApiJson, ApiResult};
use crate::ledger::{
    Account, AccountDeletion, AwardBonus, BonusEntry, BonusType, ClaimReceipt, Conversion, Deposit,
    DepositConfirmation, InvestmentProduct, LedgerEntry, Plan, Reconciliation, UserSummary,
    WithdrawalInput, WithdrawalRequest, WithdrawalStatus,
};
use crate::server::ServerState;

fn parse_bonus_type(raw: &str) -> Result<BonusType, ApiError> {
    raw.parse::<BonusType>().map_err(api_error)
}

// ----- 사용자 API (Bearer JWT) -----

/// 출금 요청 핸들러
pub async fn withdraw(
    State(state): State<ServerState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<WithdrawRequest>,
) -> ApiResult<WithdrawalRequest> {
    let user_id = authenticate(&state, &headers)?;

    let input = WithdrawalInput {
        amount: payload.amount,
        network: payload.network,
        wallet_address: payload.wallet_address,
    };
    state
        .ledger
        .withdrawals
        .create(&user_id, input)
        .await
        .map(Json)
        .map_err(api_error)
}

/// 일일 수익 수령 핸들러
pub async fn claim_daily(
    State(state): State<ServerState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<ClaimDailyRequest>,
) -> ApiResult<ClaimReceipt> {
    let user_id = authenticate(&state, &headers)?;

    state
        .ledger
        .accrual
        .claim(&user_id, &payload.plan_id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// 잔고 요약 조회 핸들러
pub async fn user_summary(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> ApiResult<UserSummary> {
    let user_id = authenticate(&state, &headers)?;

    state
        .ledger
        .user_summary(&user_id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// 플랜 목록 조회 핸들러
pub async fn list_plans(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> ApiResult<Vec<Plan>> {
    let user_id = authenticate(&state, &headers)?;

    state
        .ledger
        .accrual
        .plans(&user_id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// 입금 접수 핸들러
pub async fn submit_deposit(
    State(state): State<ServerState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<DepositRequest>,
) -> ApiResult<Deposit> {
    let user_id = authenticate(&state, &headers)?;

    state
        .ledger
        .deposits
        .submit(&user_id, payload.amount, payload.product_id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// 원장 내역 조회 핸들러
pub async fn ledger_history(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> ApiResult<Vec<LedgerEntry>> {
    let user_id = authenticate(&state, &headers)?;

    state
        .ledger
        .audit
        .history(&user_id)
        .await
        .map(Json)
        .map_err(api_error)
}

// ----- 관리자 API (x-admin-secret) -----

pub async fn open_account(
    State(state): State<ServerState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<OpenAccountRequest>,
) -> ApiResult<Account> {
    require_admin(&state, &headers)?;

    state
        .ledger
        .accounts
        .open_account(&payload.user_id)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn list_users(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> ApiResult<Vec<Account>> {
    require_admin(&state, &headers)?;

    state
        .ledger
        .accounts
        .list_accounts()
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn delete_user(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> ApiResult<AccountDeletion> {
    require_admin(&state, &headers)?;

    state
        .ledger
        .accounts
        .delete_account(&user_id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// 일일 수령 허용 토글
pub async fn toggle_daily_claim(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    ApiJson(payload): ApiJson<DailyClaimToggleRequest>,
) -> ApiResult<Account> {
    require_admin(&state, &headers)?;

    state
        .ledger
        .accounts
        .set_daily_claim_enabled(&user_id, payload.enabled)
        .await
        .map(Json)
        .map_err(api_error)
}

/// 잔고 대사
pub async fn reconcile_user(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> ApiResult<Reconciliation> {
    require_admin(&state, &headers)?;

    state
        .ledger
        .audit
        .reconcile(&user_id)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn add_bonus(
    State(state): State<ServerState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<AddBonusRequest>,
) -> ApiResult<BonusEntry> {
    require_admin(&state, &headers)?;
    let bonus_type = parse_bonus_type(&payload.bonus_type)?;

    state
        .ledger
        .bonuses
        .award(AwardBonus {
            user_id: payload.user_id,
            bonus_type,
            amount: payload.amount,
            source_user_id: payload.source_user_id,
        })
        .await
        .map(Json)
        .map_err(api_error)
}

/// 전체 보너스 목록 (최신순)
pub async fn list_bonuses(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> ApiResult<Vec<BonusEntry>> {
    require_admin(&state, &headers)?;

    state
        .ledger
        .bonuses
        .list_all()
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn available_bonus(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
    Query(query): Query<BonusQuery>,
) -> ApiResult<BonusAvailableResponse> {
    require_admin(&state, &headers)?;
    let bonus_type = parse_bonus_type(&query.bonus_type)?;

    let available = state
        .ledger
        .bonuses
        .available(&user_id, bonus_type)
        .await
        .map_err(api_error)?;

    Ok(Json(BonusAvailableResponse {
        user_id,
        bonus_type: bonus_type.as_str().to_string(),
        available,
    }))
}

/// 보너스 전환 (FIFO)
pub async fn convert_bonus(
    State(state): State<ServerState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<ConvertBonusRequest>,
) -> ApiResult<Conversion> {
    require_admin(&state, &headers)?;
    let bonus_type = parse_bonus_type(&payload.bonus_type)?;

    state
        .ledger
        .bonuses
        .convert(&payload.user_id, bonus_type, payload.amount)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn create_product(
    State(state): State<ServerState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<CreateProductRequest>,
) -> ApiResult<InvestmentProduct> {
    require_admin(&state, &headers)?;

    state
        .ledger
        .deposits
        .create_product(&payload.name, payload.daily_income)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn confirm_deposit(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Path(deposit_id): Path<String>,
) -> ApiResult<DepositConfirmation> {
    require_admin(&state, &headers)?;

    state
        .ledger
        .deposits
        .confirm(&deposit_id)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn close_plan(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Path(plan_id): Path<String>,
) -> ApiResult<Plan> {
    require_admin(&state, &headers)?;

    state
        .ledger
        .accrual
        .close_plan(&plan_id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// 출금 요청 목록 (상태 필터)
pub async fn list_withdrawals(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Query(query): Query<WithdrawalListQuery>,
) -> ApiResult<Vec<WithdrawalRequest>> {
    require_admin(&state, &headers)?;

    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(raw.parse::<WithdrawalStatus>().map_err(api_error)?),
        None => None,
    };

    state
        .ledger
        .withdrawals
        .list(status)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn approve_withdrawal(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Path(withdrawal_id): Path<String>,
) -> ApiResult<WithdrawalRequest> {
    require_admin(&state, &headers)?;

    state
        .ledger
        .withdrawals
        .approve(&withdrawal_id)
        .await
        .map(Json)
        .map_err(api_error)
}

pub async fn reject_withdrawal(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Path(withdrawal_id): Path<String>,
) -> ApiResult<WithdrawalRequest> {
    require_admin(&state, &headers)?;

    state
        .ledger
        .withdrawals
        .reject(&withdrawal_id)
        .await
        .map(Json)
        .map_err(api_error)
}
