//! 원장 오류 타입
//!
//! 모든 원장 연산은 [`LedgerError`]로 실패를 보고합니다.
//! 호출자는 [`ErrorKind`]의 안정적인 코드로 분기하고,
//! 사용자에게는 `Display` 메시지만 노출합니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::ledger::model::WithdrawalStatus;

/// 크레이트 전역 결과 타입
pub type Result<T> = std::result::Result<T, LedgerError>;

/// 원장 연산 실패
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// 입력 형식 오류 (재시도 불가)
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: Decimal, requested: Decimal },

    #[error("insufficient bonus: available {available}, requested {requested}")]
    InsufficientBonus { available: Decimal, requested: Decimal },

    #[error("account not found")]
    AccountNotFound,

    #[error("plan not found")]
    PlanNotFound,

    #[error("withdrawal request not found")]
    WithdrawalNotFound,

    #[error("deposit not found")]
    DepositNotFound,

    #[error("investment product not found")]
    ProductNotFound,

    /// 플랜이 활성 상태가 아님
    #[error("plan is not active")]
    PlanNotActivated,

    #[error("daily claim is disabled for this account")]
    DailyClaimDisabled,

    /// 다음 수령 가능 시각 이전의 수령 시도
    #[error("claim not yet available, next eligible at {next_eligible_at}")]
    ClaimNotYetAvailable { next_eligible_at: DateTime<Utc> },

    /// 종결 상태 재진입 (중복 관리자 요청 가능성)
    #[error("cannot move {entity} from {from} to {to}")]
    InvalidStateTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("unauthorized")]
    Unauthorized,

    /// 동시 쓰기 충돌 (연산 전체 재시도 가능)
    #[error("transaction conflict: {0}")]
    TransactionConflict(String),

    /// 저장소 연결 실패 또는 시간 초과 (연산 전체 재시도 가능)
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// 저장된 행을 해석할 수 없음
    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

/// 호출자에게 노출되는 안정적인 오류 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    InsufficientBalance,
    InsufficientBonus,
    NotFound,
    PlanNotActivated,
    DailyClaimDisabled,
    ClaimNotYetAvailable,
    InvalidStateTransition,
    Unauthorized,
    TransactionConflict,
    StoreUnavailable,
}

impl ErrorKind {
    /// 전송 계층에서 사용하는 오류 코드
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::InsufficientBalance => "INSUFFICIENT_BALANCE",
            ErrorKind::InsufficientBonus => "INSUFFICIENT_BONUS",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::PlanNotActivated => "PLAN_NOT_ACTIVATED",
            ErrorKind::DailyClaimDisabled => "DAILY_CLAIM_DISABLED",
            ErrorKind::ClaimNotYetAvailable => "CLAIM_NOT_YET_AVAILABLE",
            ErrorKind::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::TransactionConflict => "TRANSACTION_CONFLICT",
            ErrorKind::StoreUnavailable => "STORE_UNAVAILABLE",
        }
    }
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_) => ErrorKind::Validation,
            LedgerError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            LedgerError::InsufficientBonus { .. } => ErrorKind::InsufficientBonus,
            LedgerError::AccountNotFound
            | LedgerError::PlanNotFound
            | LedgerError::WithdrawalNotFound
            | LedgerError::DepositNotFound
            | LedgerError::ProductNotFound => ErrorKind::NotFound,
            LedgerError::PlanNotActivated => ErrorKind::PlanNotActivated,
            LedgerError::DailyClaimDisabled => ErrorKind::DailyClaimDisabled,
            LedgerError::ClaimNotYetAvailable { .. } => ErrorKind::ClaimNotYetAvailable,
            LedgerError::InvalidStateTransition { .. } => ErrorKind::InvalidStateTransition,
            LedgerError::Unauthorized => ErrorKind::Unauthorized,
            LedgerError::TransactionConflict(_) => ErrorKind::TransactionConflict,
            LedgerError::StoreUnavailable(_) | LedgerError::CorruptRow(_) => {
                ErrorKind::StoreUnavailable
            }
        }
    }

    /// 일시적 인프라 오류 여부
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::TransactionConflict | ErrorKind::StoreUnavailable
        )
    }

    /// 사용자에게 보여줄 메시지 (내부 세부 정보 제외)
    pub fn public_message(&self) -> String {
        match self {
            LedgerError::TransactionConflict(_) => {
                "the request conflicted with another update, please retry".to_string()
            }
            LedgerError::StoreUnavailable(_) | LedgerError::CorruptRow(_) => {
                "the ledger is temporarily unavailable".to_string()
            }
            other => other.to_string(),
        }
    }

    pub(crate) fn withdrawal_transition(from: WithdrawalStatus, to: WithdrawalStatus) -> Self {
        LedgerError::InvalidStateTransition {
            entity: "withdrawal",
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                LedgerError::StoreUnavailable(err.to_string())
            }
            sqlx::Error::Database(db_err) => {
                // SQLITE_BUSY(5), SQLITE_LOCKED(6) 및 확장 코드
                let busy = db_err
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .map(|code| matches!(code & 0xff, 5 | 6))
                    .unwrap_or(false);
                if busy {
                    LedgerError::TransactionConflict(db_err.message().to_string())
                } else {
                    LedgerError::StoreUnavailable(db_err.message().to_string())
                }
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                LedgerError::CorruptRow(err.to_string())
            }
            _ => LedgerError::StoreUnavailable(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_kinds_are_stable() {
        let err = LedgerError::InsufficientBalance {
            available: dec!(1),
            requested: dec!(2),
        };
        assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
        assert_eq!(err.kind().code(), "INSUFFICIENT_BALANCE");
        assert!(!err.is_retryable());

        assert_eq!(LedgerError::PlanNotFound.kind(), ErrorKind::NotFound);
        assert!(LedgerError::TransactionConflict("busy".into()).is_retryable());
    }

    #[test]
    fn test_public_message_hides_store_details() {
        let err = LedgerError::StoreUnavailable("disk I/O error at /var/db".into());
        assert!(!err.public_message().contains("/var/db"));

        let err = LedgerError::withdrawal_transition(
            WithdrawalStatus::Approved,
            WithdrawalStatus::Rejected,
        );
        assert_eq!(err.public_message(), "cannot move withdrawal from approved to rejected");
    }

    #[test]
    fn test_pool_timeout_maps_to_unavailable() {
        let err: LedgerError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
    }
}
