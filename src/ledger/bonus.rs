//! 보너스 풀
//!
//! 보너스는 종류(`signup`, `referral`)별로 쌓이며, 출금 가능 잔고로 전환할 때
//! 가장 오래된 항목부터 소진합니다(FIFO).
//! 소진과 잔고 적립은 하나의 트랜잭션으로 처리되어 부분 적용이 관찰되지 않습니다.

use std::sync::Arc;

use log::{debug, info};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::db::models::{encode_amount, to_millis, BonusRecord};
use crate::db::repository::{AccountRepository, BonusRepository};
use crate::db::{LedgerStore, LedgerTx};
use crate::error::{LedgerError, Result};
use crate::ledger::account::{validate_user_id, AccountManager};
use crate::ledger::clock::Clock;
use crate::ledger::model::{BonusEntry, BonusType, LedgerReason};

/// 보너스 지급 입력
#[derive(Debug, Clone)]
pub struct AwardBonus {
    pub user_id: String,
    pub bonus_type: BonusType,
    pub amount: Decimal,
    /// 추천인 (추천 보너스에서만 보존)
    pub source_user_id: Option<String>,
}

/// 전환 결과
#[derive(Debug, Clone, Serialize)]
pub struct Conversion {
    pub converted: Decimal,
    pub remaining_bonus: Decimal,
    pub new_balance: Decimal,
}

/// 종류별 보너스 합계
#[derive(Debug, Clone, Default, Serialize)]
pub struct BonusSummary {
    pub signup: Decimal,
    pub referral: Decimal,
    pub total: Decimal,
}

/// FIFO 소진 단계
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Consumption {
    /// 항목 전체 소진 (삭제)
    Consume { index: usize },
    /// 항목 일부 소진, `left`만 남김
    Reduce { index: usize, left: Decimal },
}

/// 요청 금액을 오래된 항목부터 소진하는 계획 수립
///
/// `entries`는 생성 순으로 정렬되어 있어야 합니다.
/// 금액이 0 이하인 항목은 이미 소진된 것으로 보고 건너뜁니다.
pub(crate) fn plan_consumption(entries: &[BonusEntry], requested: Decimal) -> Vec<Consumption> {
    let mut steps = Vec::new();
    let mut remaining = requested;

    for (index, entry) in entries.iter().enumerate() {
        if remaining <= Decimal::ZERO {
            break;
        }
        if entry.amount <= Decimal::ZERO {
            continue;
        }

        if entry.amount <= remaining {
            steps.push(Consumption::Consume { index });
            remaining -= entry.amount;
        } else {
            steps.push(Consumption::Reduce {
                index,
                left: entry.amount - remaining,
            });
            remaining = Decimal::ZERO;
        }
    }

    steps
}

fn out_of_range() -> LedgerError {
    LedgerError::Validation("bonus total out of range".into())
}

/// 양수 항목의 합계 (`Decimal` 범위를 넘으면 `Validation`)
fn positive_total(entries: &[BonusEntry]) -> Result<Decimal> {
    entries
        .iter()
        .map(|entry| entry.amount)
        .filter(|amount| *amount > Decimal::ZERO)
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount).ok_or_else(out_of_range))
}

/// 보너스 풀
#[derive(Clone)]
pub struct BonusPool {
    store: LedgerStore,
    clock: Arc<dyn Clock>,
}

impl BonusPool {
    pub fn new(store: LedgerStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// 보너스 지급
    pub async fn award(&self, input: AwardBonus) -> Result<BonusEntry> {
        validate_user_id(&input.user_id)?;
        if input.amount <= Decimal::ZERO {
            return Err(LedgerError::Validation("bonus amount must be positive".into()));
        }

        let source_user_id = match input.bonus_type {
            BonusType::Referral => input.source_user_id.filter(|id| !id.trim().is_empty()),
            BonusType::Signup => None,
        };
        let entry = BonusEntry {
            id: Uuid::new_v4().to_string(),
            user_id: input.user_id,
            bonus_type: input.bonus_type,
            amount: input.amount,
            source_user_id,
            created_at: self.clock.now(),
        };

        let mut tx = self.store.begin().await?;
        let result: Result<()> = async {
            if AccountRepository::find(&mut tx, &entry.user_id).await?.is_none() {
                return Err(LedgerError::AccountNotFound);
            }
            // 사용자 전체 합계가 표현 범위를 넘는 지급은 거부
            let held = BonusRepository::find_by_user(&mut tx, &entry.user_id)
                .await?
                .into_iter()
                .map(BonusEntry::try_from)
                .collect::<Result<Vec<_>>>()?;
            positive_total(&held)?
                .checked_add(entry.amount)
                .ok_or_else(out_of_range)?;
            BonusRepository::insert(
                &mut tx,
                &BonusRecord {
                    id: entry.id.clone(),
                    user_id: entry.user_id.clone(),
                    bonus_type: entry.bonus_type.as_str().to_string(),
                    amount: encode_amount(entry.amount),
                    source_user_id: entry.source_user_id.clone(),
                    created_at: to_millis(entry.created_at),
                },
            )
            .await
        }
        .await;
        tx.finish(result).await?;

        info!(
            "보너스 지급: {} {} {}",
            entry.user_id,
            entry.bonus_type.as_str(),
            entry.amount
        );
        Ok(entry)
    }

    /// 사용자의 보너스 항목 (오래된 순)
    pub async fn entries(&self, user_id: &str) -> Result<Vec<BonusEntry>> {
        let mut tx = self.store.begin_read().await?;
        let result = BonusRepository::find_by_user(&mut tx, user_id).await;
        let rows = tx.finish(result).await?;

        rows.into_iter().map(BonusEntry::try_from).collect()
    }

    /// 전체 사용자의 보너스 항목 (최신순)
    pub async fn list_all(&self) -> Result<Vec<BonusEntry>> {
        let mut tx = self.store.begin_read().await?;
        let result = BonusRepository::list_all(&mut tx).await;
        let rows = tx.finish(result).await?;

        rows.into_iter().map(BonusEntry::try_from).collect()
    }

    /// 종류별 사용 가능 보너스 합계
    pub async fn available(&self, user_id: &str, bonus_type: BonusType) -> Result<Decimal> {
        let entries = self.entries(user_id).await?;
        let of_type: Vec<BonusEntry> = entries
            .into_iter()
            .filter(|entry| entry.bonus_type == bonus_type)
            .collect();
        positive_total(&of_type)
    }

    pub async fn summary(&self, user_id: &str) -> Result<BonusSummary> {
        let mut summary = BonusSummary::default();
        for entry in self.entries(user_id).await? {
            if entry.amount <= Decimal::ZERO {
                continue;
            }
            let slot = match entry.bonus_type {
                BonusType::Signup => &mut summary.signup,
                BonusType::Referral => &mut summary.referral,
            };
            *slot = slot.checked_add(entry.amount).ok_or_else(out_of_range)?;
        }
        summary.total = summary
            .signup
            .checked_add(summary.referral)
            .ok_or_else(out_of_range)?;
        Ok(summary)
    }

    /// 보너스를 출금 가능 잔고로 전환 (FIFO)
    pub async fn convert(
        &self,
        user_id: &str,
        bonus_type: BonusType,
        requested: Decimal,
    ) -> Result<Conversion> {
        validate_user_id(user_id)?;
        if requested <= Decimal::ZERO {
            return Err(LedgerError::Validation("convert amount must be positive".into()));
        }

        let mut tx = self.store.begin().await?;
        let result = self.convert_in(&mut tx, user_id, bonus_type, requested).await;
        let conversion = tx.finish(result).await?;

        info!(
            "보너스 전환: {} {} {} (남은 보너스: {}, 잔고: {})",
            user_id,
            bonus_type.as_str(),
            conversion.converted,
            conversion.remaining_bonus,
            conversion.new_balance
        );
        Ok(conversion)
    }

    async fn convert_in(
        &self,
        tx: &mut LedgerTx,
        user_id: &str,
        bonus_type: BonusType,
        requested: Decimal,
    ) -> Result<Conversion> {
        let rows = BonusRepository::find_fifo(tx, user_id, bonus_type.as_str()).await?;
        let entries = rows
            .iter()
            .cloned()
            .map(BonusEntry::try_from)
            .collect::<Result<Vec<_>>>()?;

        let available = positive_total(&entries)?;
        if requested > available {
            return Err(LedgerError::InsufficientBonus {
                available,
                requested,
            });
        }

        for step in plan_consumption(&entries, requested) {
            match step {
                Consumption::Consume { index } => {
                    debug!("보너스 항목 소진: {}", rows[index].id);
                    BonusRepository::delete(tx, &rows[index].id).await?;
                }
                Consumption::Reduce { index, left } => {
                    debug!("보너스 항목 차감: {} -> {}", rows[index].id, left);
                    BonusRepository::swap_amount(
                        tx,
                        &rows[index].id,
                        &rows[index].amount,
                        &encode_amount(left),
                    )
                    .await?;
                }
            }
        }

        let new_balance = AccountManager::apply_delta_in(
            tx,
            user_id,
            requested,
            LedgerReason::BonusConvert,
            &format!("bonus:{}", bonus_type.as_str()),
            self.clock.now(),
        )
        .await?;

        Ok(Conversion {
            converted: requested,
            remaining_bonus: available - requested,
            new_balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn entry(id: &str, amount: Decimal, minutes: i64) -> BonusEntry {
        BonusEntry {
            id: id.to_string(),
            user_id: "user1".to_string(),
            bonus_type: BonusType::Referral,
            amount,
            source_user_id: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes),
        }
    }

    #[test]
    fn test_fifo_consumes_oldest_first() {
        let entries = vec![entry("t1", dec!(30), 0), entry("t2", dec!(50), 1)];

        let steps = plan_consumption(&entries, dec!(40));

        assert_eq!(
            steps,
            vec![
                Consumption::Consume { index: 0 },
                Consumption::Reduce { index: 1, left: dec!(40) },
            ]
        );
    }

    #[test]
    fn test_exact_match_deletes_without_touching_next() {
        let entries = vec![entry("t1", dec!(30), 0), entry("t2", dec!(50), 1)];

        let steps = plan_consumption(&entries, dec!(30));

        assert_eq!(steps, vec![Consumption::Consume { index: 0 }]);
    }

    #[test]
    fn test_non_positive_entries_are_skipped() {
        let entries = vec![
            entry("t0", dec!(0), 0),
            entry("t1", dec!(-5), 1),
            entry("t2", dec!(10), 2),
        ];

        let steps = plan_consumption(&entries, dec!(4));

        assert_eq!(steps, vec![Consumption::Reduce { index: 2, left: dec!(6) }]);
        assert_eq!(positive_total(&entries).unwrap(), dec!(10));
    }

    #[test]
    fn test_total_beyond_decimal_range_is_an_error() {
        let entries = vec![entry("t1", Decimal::MAX, 0), entry("t2", dec!(1), 1)];

        assert!(matches!(
            positive_total(&entries),
            Err(LedgerError::Validation(_))
        ));
    }
}
