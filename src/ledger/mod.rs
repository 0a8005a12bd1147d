//! 수익 원장 핵심 모듈
//!
//! - 계정 잔고 관리 (`account`)
//! - 보너스 풀 및 FIFO 전환 (`bonus`)
//! - 입금 확인과 플랜 활성화 (`deposit`)
//! - 일일 수익 적립 (`accrual`)
//! - 출금 상태 머신 (`withdrawal`)
//! - 원장 감사 로그 (`audit`)

pub mod account;
pub mod accrual;
pub mod audit;
pub mod bonus;
pub mod clock;
pub mod deposit;
pub mod model;
pub mod withdrawal;

use std::sync::Arc;

use log::info;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::PolicyConfig;
use crate::db::LedgerStore;
use crate::error::Result;

pub use account::{AccountDeletion, AccountManager};
pub use accrual::{ClaimReceipt, IncomeAccrual};
pub use audit::{AuditLog, Reconciliation};
pub use bonus::{AwardBonus, BonusPool, BonusSummary, Conversion};
pub use clock::{Clock, ManualClock, SystemClock};
pub use deposit::{DepositConfirmation, DepositDesk};
pub use model::*;
pub use withdrawal::{WithdrawalInput, WithdrawalMachine};

/// 사용자 요약 (잔고 + 종류별 보너스)
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub user_id: String,
    pub withdrawable_balance: Decimal,
    pub bonus: BonusSummary,
}

/// 원장 컴포넌트 묶음
///
/// 모든 컴포넌트가 같은 저장소와 시계를 공유합니다.
#[derive(Clone)]
pub struct Ledger {
    pub store: LedgerStore,
    pub accounts: AccountManager,
    pub bonuses: BonusPool,
    pub deposits: DepositDesk,
    pub accrual: IncomeAccrual,
    pub withdrawals: WithdrawalMachine,
    pub audit: AuditLog,
}

impl Ledger {
    pub fn new(store: LedgerStore, policy: &PolicyConfig, clock: Arc<dyn Clock>) -> Self {
        info!(
            "원장 초기화: 최소 출금 {}, 수령 간격 {}시간",
            policy.minimum_withdrawal,
            policy.claim_interval.num_hours()
        );

        Self {
            accounts: AccountManager::new(store.clone(), clock.clone()),
            bonuses: BonusPool::new(store.clone(), clock.clone()),
            deposits: DepositDesk::new(store.clone(), clock.clone()),
            accrual: IncomeAccrual::new(store.clone(), clock.clone(), policy.claim_interval),
            withdrawals: WithdrawalMachine::new(
                store.clone(),
                clock,
                policy.minimum_withdrawal,
            ),
            audit: AuditLog::new(store.clone()),
            store,
        }
    }

    /// 잔고와 보너스 요약
    pub async fn user_summary(&self, user_id: &str) -> Result<UserSummary> {
        let account = self.accounts.account(user_id).await?;
        let bonus = self.bonuses.summary(user_id).await?;

        Ok(UserSummary {
            user_id: account.id,
            withdrawable_balance: account.withdrawable_balance,
            bonus,
        })
    }
}
