//! 일일 수익 적립 엔진
//!
//! 플랜별 수령 가능 시각을 요청 시점에 저장된 타임스탬프로 판정합니다.
//! 백그라운드 스케줄러는 없습니다.
//!
//! 수령 순서:
//! 1. `next_claimable_at = now + interval` 잠금 (이중 수령 방지의 기준)
//! 2. `daily_income`을 잔고에 적립
//! 3. `daily_claim` 원장 항목 추가
//!
//! 세 단계는 하나의 트랜잭션입니다.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::models::to_millis;
use crate::db::repository::{AccountRepository, PlanRepository};
use crate::db::{LedgerStore, LedgerTx};
use crate::error::{LedgerError, Result};
use crate::ledger::account::{validate_user_id, AccountManager};
use crate::ledger::clock::Clock;
use crate::ledger::model::{LedgerReason, Plan, PlanStatus};

/// 수령 결과
#[derive(Debug, Clone, Serialize)]
pub struct ClaimReceipt {
    pub plan_id: String,
    pub added: Decimal,
    pub new_balance: Decimal,
    pub next_claim_at: DateTime<Utc>,
}

/// 다음 수령 가능 시각
///
/// 첫 수령은 활성화 후 한 간격이 지나야 하며,
/// 이후에는 저장된 `next_claimable_at`을 따릅니다.
pub fn next_eligible_at(plan: &Plan, interval: Duration) -> DateTime<Utc> {
    let first = plan.activated_at + interval;
    match plan.next_claimable_at {
        Some(next) if next > first => next,
        _ => first,
    }
}

/// 수익 적립 엔진
#[derive(Clone)]
pub struct IncomeAccrual {
    store: LedgerStore,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl IncomeAccrual {
    pub fn new(store: LedgerStore, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self {
            store,
            clock,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 일일 수익 수령
    pub async fn claim(&self, user_id: &str, plan_id: &str) -> Result<ClaimReceipt> {
        validate_user_id(user_id)?;
        if plan_id.trim().is_empty() {
            return Err(LedgerError::Validation("plan_id is required".into()));
        }
        let now = self.clock.now();

        let mut tx = self.store.begin().await?;
        let result = self.claim_in(&mut tx, user_id, plan_id, now).await;
        let receipt = tx.finish(result).await?;

        info!(
            "일일 수령: {} 플랜 {} +{} (잔고: {}, 다음: {})",
            user_id, plan_id, receipt.added, receipt.new_balance, receipt.next_claim_at
        );
        Ok(receipt)
    }

    async fn claim_in(
        &self,
        tx: &mut LedgerTx,
        user_id: &str,
        plan_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ClaimReceipt> {
        let record = PlanRepository::find(tx, plan_id)
            .await?
            .filter(|plan| plan.user_id == user_id)
            .ok_or(LedgerError::PlanNotFound)?;
        let expected_next = record.next_claimable_at;
        let plan = Plan::try_from(record)?;

        if plan.status != PlanStatus::Active {
            return Err(LedgerError::PlanNotActivated);
        }

        let account = AccountRepository::find(tx, user_id)
            .await?
            .ok_or(LedgerError::AccountNotFound)?;
        if !account.daily_claim_enabled {
            return Err(LedgerError::DailyClaimDisabled);
        }

        let eligible_at = next_eligible_at(&plan, self.interval);
        if now < eligible_at {
            debug!("수령 불가: 플랜 {} 다음 가능 시각 {}", plan_id, eligible_at);
            return Err(LedgerError::ClaimNotYetAvailable {
                next_eligible_at: eligible_at,
            });
        }

        if plan.daily_income <= Decimal::ZERO {
            return Err(LedgerError::Validation("plan has no daily income".into()));
        }

        let next_claim_at = now + self.interval;
        PlanRepository::lock_next_claim(tx, plan_id, expected_next, to_millis(next_claim_at))
            .await?;

        let new_balance = AccountManager::apply_delta_in(
            tx,
            user_id,
            plan.daily_income,
            LedgerReason::DailyClaim,
            &format!("plan:{}", plan_id),
            now,
        )
        .await?;

        Ok(ClaimReceipt {
            plan_id: plan_id.to_string(),
            added: plan.daily_income,
            new_balance,
            next_claim_at,
        })
    }

    /// 사용자의 플랜 목록
    pub async fn plans(&self, user_id: &str) -> Result<Vec<Plan>> {
        let mut tx = self.store.begin_read().await?;
        let result = PlanRepository::find_by_user(&mut tx, user_id).await;
        let rows = tx.finish(result).await?;

        rows.into_iter().map(Plan::try_from).collect()
    }

    pub async fn plan(&self, plan_id: &str) -> Result<Plan> {
        let mut tx = self.store.begin_read().await?;
        let result = PlanRepository::find(&mut tx, plan_id).await;
        let record = tx.finish(result).await?.ok_or(LedgerError::PlanNotFound)?;
        Plan::try_from(record)
    }

    /// 플랜 종료 (active → closed)
    pub async fn close_plan(&self, plan_id: &str) -> Result<Plan> {
        let mut tx = self.store.begin().await?;
        let result: Result<Plan> = async {
            let record = PlanRepository::find(&mut tx, plan_id)
                .await?
                .ok_or(LedgerError::PlanNotFound)?;
            let mut plan = Plan::try_from(record)?;
            if plan.status != PlanStatus::Active {
                return Err(LedgerError::InvalidStateTransition {
                    entity: "plan",
                    from: plan.status.as_str().to_string(),
                    to: PlanStatus::Closed.as_str().to_string(),
                });
            }
            PlanRepository::transition(
                &mut tx,
                plan_id,
                PlanStatus::Active.as_str(),
                PlanStatus::Closed.as_str(),
            )
            .await?;
            plan.status = PlanStatus::Closed;
            Ok(plan)
        }
        .await;
        let plan = tx.finish(result).await?;

        info!("플랜 종료: {}", plan_id);
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn plan(activated_at: DateTime<Utc>, next: Option<DateTime<Utc>>) -> Plan {
        Plan {
            id: "p1".into(),
            user_id: "u1".into(),
            deposit_id: None,
            daily_income: dec!(5),
            status: PlanStatus::Active,
            activated_at,
            next_claimable_at: next,
        }
    }

    #[test]
    fn test_first_claim_waits_one_interval() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let eligible = next_eligible_at(&plan(start, None), Duration::hours(24));
        assert_eq!(eligible, start + Duration::hours(24));
    }

    #[test]
    fn test_stored_next_claim_takes_precedence() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let next = start + Duration::hours(50);
        let eligible = next_eligible_at(&plan(start, Some(next)), Duration::hours(24));
        assert_eq!(eligible, next);
    }
}
