use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::api::handlers::*;
use crate::server::ServerState;

/// API 라우터 생성
pub fn create_api_router() -> Router<ServerState> {
    Router::new()
        // 사용자 API
        .route("/api/withdraw", post(withdraw))
        .route("/api/claim-daily", post(claim_daily))
        .route("/api/user-summary", get(user_summary))
        .route("/api/plans", get(list_plans))
        .route("/api/deposits", post(submit_deposit))
        .route("/api/ledger", get(ledger_history))

        // 관리자 API: 계정
        .route("/api/admin/users", get(list_users).post(open_account))
        .route("/api/admin/users/:user_id", delete(delete_user))
        .route("/api/admin/users/:user_id/daily-claim", post(toggle_daily_claim))
        .route("/api/admin/users/:user_id/reconcile", get(reconcile_user))

        // 관리자 API: 보너스
        .route("/api/admin/bonus", get(list_bonuses).post(add_bonus))
        .route("/api/admin/bonus/convert", post(convert_bonus))
        .route("/api/admin/bonus/:user_id", get(available_bonus))

        // 관리자 API: 입금 및 플랜
        .route("/api/admin/products", post(create_product))
        .route("/api/admin/deposits/:deposit_id/confirm", post(confirm_deposit))
        .route("/api/admin/plans/:plan_id/close", post(close_plan))

        // 관리자 API: 출금
        .route("/api/admin/withdrawals", get(list_withdrawals))
        .route("/api/admin/withdrawals/:withdrawal_id/approve", post(approve_withdrawal))
        .route("/api/admin/withdrawals/:withdrawal_id/reject", post(reject_withdrawal))
}
