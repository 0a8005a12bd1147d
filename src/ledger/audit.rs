//! 감사 원장
//!
//! 잔고에 영향을 주는 모든 사건을 추가 전용으로 기록하고,
//! 계정 잔고와 원장 합계의 일치 여부를 검사합니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::db::models::{encode_amount, parse_amount, to_millis, LedgerEntryRecord};
use crate::db::repository::{AccountRepository, LedgerEntryRepository};
use crate::db::{LedgerStore, LedgerTx};
use crate::error::{LedgerError, Result};
use crate::ledger::model::{LedgerEntry, LedgerReason};

/// 잔고 대사 결과
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    pub user_id: String,
    pub balance: Decimal,
    pub ledger_sum: Decimal,
    pub entry_count: usize,
    pub consistent: bool,
}

/// 감사 원장
#[derive(Clone)]
pub struct AuditLog {
    store: LedgerStore,
}

impl AuditLog {
    pub fn new(store: LedgerStore) -> Self {
        Self { store }
    }

    /// 열린 트랜잭션 안에서 원장 항목 추가
    pub(crate) async fn append_in(
        tx: &mut LedgerTx,
        user_id: &str,
        amount: Decimal,
        reason: LedgerReason,
        source: &str,
        at: DateTime<Utc>,
    ) -> Result<LedgerEntry> {
        let entry = LedgerEntry {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            amount,
            reason,
            source: source.to_string(),
            created_at: at,
        };

        LedgerEntryRepository::append(
            tx,
            &LedgerEntryRecord {
                id: entry.id.clone(),
                user_id: entry.user_id.clone(),
                amount: encode_amount(amount),
                entry_type: reason.as_str().to_string(),
                source: entry.source.clone(),
                created_at: to_millis(at),
            },
        )
        .await?;

        Ok(entry)
    }

    /// 사용자의 원장 항목 (오래된 순)
    pub async fn history(&self, user_id: &str) -> Result<Vec<LedgerEntry>> {
        let mut tx = self.store.begin_read().await?;
        let result = LedgerEntryRepository::find_by_user(&mut tx, user_id).await;
        let rows = tx.finish(result).await?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }

    /// 잔고와 원장 합계 비교 (같은 스냅샷에서 읽음)
    pub async fn reconcile(&self, user_id: &str) -> Result<Reconciliation> {
        let mut tx = self.store.begin_read().await?;
        let result = Self::reconcile_in(&mut tx, user_id).await;
        tx.finish(result).await
    }

    async fn reconcile_in(tx: &mut LedgerTx, user_id: &str) -> Result<Reconciliation> {
        let account = AccountRepository::find(tx, user_id)
            .await?
            .ok_or(LedgerError::AccountNotFound)?;
        let balance = parse_amount("withdrawable_balance", &account.withdrawable_balance)?;

        let entries = LedgerEntryRepository::find_by_user(tx, user_id).await?;
        let mut ledger_sum = Decimal::ZERO;
        for entry in &entries {
            ledger_sum += parse_amount("amount", &entry.amount)?;
        }

        Ok(Reconciliation {
            user_id: user_id.to_string(),
            balance,
            ledger_sum,
            entry_count: entries.len(),
            consistent: balance == ledger_sum,
        })
    }
}
