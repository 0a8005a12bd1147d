//! 계정 잔고 관리자
//!
//! 출금 가능 잔고의 유일한 소유자입니다. 다른 컴포넌트는
//! [`AccountManager::apply_delta_in`]을 통해서만 잔고를 바꿉니다.
//! 잔고 변경과 원장 항목 추가는 항상 같은 트랜잭션에서 일어납니다.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::models::{encode_amount, parse_amount, to_millis, AccountRecord};
use crate::db::repository::{
    AccountRepository, BonusRepository, DepositRepository, PlanRepository, WithdrawalRepository,
};
use crate::db::{LedgerStore, LedgerTx};
use crate::error::{LedgerError, Result};
use crate::ledger::audit::AuditLog;
use crate::ledger::clock::Clock;
use crate::ledger::model::{Account, LedgerReason};

/// 계정 삭제 결과 (단계별 삭제 건수)
#[derive(Debug, Clone, Default, Serialize)]
pub struct AccountDeletion {
    pub withdrawals: u64,
    pub deposits: u64,
    pub plans: u64,
    pub bonuses: u64,
    /// 삭제 시 남은 잔고를 상계한 `adjustment` 금액 (원장 항목은 보존)
    pub written_off: Decimal,
}

pub(crate) fn validate_user_id(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(LedgerError::Validation("user_id is required".into()));
    }
    Ok(())
}

/// 계정 잔고 관리자
#[derive(Clone)]
pub struct AccountManager {
    store: LedgerStore,
    clock: Arc<dyn Clock>,
}

impl AccountManager {
    pub fn new(store: LedgerStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// 계정 조회 또는 생성 (잔고 0)
    pub async fn open_account(&self, user_id: &str) -> Result<Account> {
        validate_user_id(user_id)?;
        let now = self.clock.now();

        let mut tx = self.store.begin().await?;
        let result: Result<Account> = async {
            if let Some(existing) = AccountRepository::find(&mut tx, user_id).await? {
                return Account::try_from(existing);
            }

            let record = AccountRecord {
                id: user_id.to_string(),
                withdrawable_balance: encode_amount(Decimal::ZERO),
                daily_claim_enabled: true,
                created_at: to_millis(now),
            };
            AccountRepository::insert(&mut tx, &record).await?;
            info!("계정 생성: {}", user_id);
            Account::try_from(record)
        }
        .await;
        tx.finish(result).await
    }

    pub async fn account(&self, user_id: &str) -> Result<Account> {
        let mut tx = self.store.begin_read().await?;
        let result = AccountRepository::find(&mut tx, user_id).await;
        let record = tx.finish(result).await?.ok_or(LedgerError::AccountNotFound)?;
        Account::try_from(record)
    }

    pub async fn balance(&self, user_id: &str) -> Result<Decimal> {
        Ok(self.account(user_id).await?.withdrawable_balance)
    }

    /// 잔고에 부호 있는 금액 적용 후 새 잔고 반환
    pub async fn apply_delta(
        &self,
        user_id: &str,
        amount: Decimal,
        reason: LedgerReason,
        source: &str,
    ) -> Result<Decimal> {
        validate_user_id(user_id)?;
        let now = self.clock.now();

        let mut tx = self.store.begin().await?;
        let result = Self::apply_delta_in(&mut tx, user_id, amount, reason, source, now).await;
        tx.finish(result).await
    }

    /// 열린 트랜잭션 안에서 잔고 변경 + 원장 항목 추가
    ///
    /// 음수 금액의 절댓값이 현재 잔고보다 크면 아무것도 쓰지 않고
    /// `InsufficientBalance`로 실패합니다.
    pub(crate) async fn apply_delta_in(
        tx: &mut LedgerTx,
        user_id: &str,
        amount: Decimal,
        reason: LedgerReason,
        source: &str,
        at: DateTime<Utc>,
    ) -> Result<Decimal> {
        if amount.is_zero() {
            return Err(LedgerError::Validation("amount must be non-zero".into()));
        }

        let record = AccountRepository::find(tx, user_id)
            .await?
            .ok_or(LedgerError::AccountNotFound)?;
        let current = parse_amount("withdrawable_balance", &record.withdrawable_balance)?;

        let new_balance = current
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Validation("amount out of range".into()))?;
        if new_balance < Decimal::ZERO {
            return Err(LedgerError::InsufficientBalance {
                available: current,
                requested: -amount,
            });
        }

        AccountRepository::swap_balance(
            tx,
            user_id,
            &record.withdrawable_balance,
            &encode_amount(new_balance),
        )
        .await?;
        AuditLog::append_in(tx, user_id, amount, reason, source, at).await?;

        Ok(new_balance)
    }

    /// 일일 수령 허용 여부 변경
    pub async fn set_daily_claim_enabled(&self, user_id: &str, enabled: bool) -> Result<Account> {
        let mut tx = self.store.begin().await?;
        let result: Result<AccountRecord> = async {
            if !AccountRepository::set_daily_claim_enabled(&mut tx, user_id, enabled).await? {
                return Err(LedgerError::AccountNotFound);
            }
            AccountRepository::find(&mut tx, user_id)
                .await?
                .ok_or(LedgerError::AccountNotFound)
        }
        .await;
        let record = tx.finish(result).await?;

        info!("일일 수령 설정 변경: {} -> {}", user_id, enabled);
        Account::try_from(record)
    }

    /// 전체 계정 목록 (최신순)
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let mut tx = self.store.begin_read().await?;
        let result = AccountRepository::list(&mut tx).await;
        let rows = tx.finish(result).await?;

        rows.into_iter().map(Account::try_from).collect()
    }

    /// 계정과 하위 데이터 일괄 삭제
    ///
    /// 모든 단계는 같은 트랜잭션이며 하나라도 실패하면 전체가 취소됩니다.
    /// 대기 중인 출금이 있으면 거부합니다. 원장 항목은 지우지 않고,
    /// 남은 잔고를 상계하는 항목을 추가해 합계를 0으로 맞춥니다.
    pub async fn delete_account(&self, user_id: &str) -> Result<AccountDeletion> {
        validate_user_id(user_id)?;
        let now = self.clock.now();

        let mut tx = self.store.begin().await?;
        let result = Self::delete_account_in(&mut tx, user_id, now).await;
        let deletion = tx.finish(result).await?;

        warn!("계정 삭제: {} ({:?})", user_id, deletion);
        Ok(deletion)
    }

    async fn delete_account_in(
        tx: &mut LedgerTx,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> Result<AccountDeletion> {
        let account = AccountRepository::find(tx, user_id)
            .await?
            .ok_or(LedgerError::AccountNotFound)?;
        let balance = parse_amount("withdrawable_balance", &account.withdrawable_balance)?;

        let pending = WithdrawalRepository::count_pending(tx, user_id).await?;
        if pending > 0 {
            return Err(LedgerError::Validation(format!(
                "account has {} pending withdrawal(s)",
                pending
            )));
        }

        if !balance.is_zero() {
            Self::apply_delta_in(
                tx,
                user_id,
                -balance,
                LedgerReason::Adjustment,
                "account:deleted",
                at,
            )
            .await?;
        }

        let deletion = AccountDeletion {
            withdrawals: WithdrawalRepository::delete_by_user(tx, user_id).await?,
            deposits: DepositRepository::delete_by_user(tx, user_id).await?,
            plans: PlanRepository::delete_by_user(tx, user_id).await?,
            bonuses: BonusRepository::delete_by_user(tx, user_id).await?,
            written_off: balance,
        };
        AccountRepository::delete(tx, user_id).await?;

        Ok(deletion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_user_id_rejected() {
        assert!(matches!(validate_user_id("  "), Err(LedgerError::Validation(_))));
        assert!(validate_user_id("user-1").is_ok());
    }
}
