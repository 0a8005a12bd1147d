//! 출금 상태 머신
//!
//! `pending`(초기) → `approved` | `rejected` (둘 다 종결)
//!
//! - 생성: 금액을 즉시 잔고에서 차감하고 `pending` 요청을 기록 (차감에 의한 예약)
//! - 승인: 상태만 바꿈, 잔고 변화 없음
//! - 거절: 상태를 바꾸고 금액을 잔고로 환불
//!
//! 상태 확인과 전이는 같은 트랜잭션에서 일어나므로 중복 승인/거절은
//! `InvalidStateTransition`으로 실패하고 아무것도 바꾸지 않습니다.

use std::sync::Arc;

use log::{info, warn};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::db::models::{encode_amount, to_millis, WithdrawalRecord};
use crate::db::repository::WithdrawalRepository;
use crate::db::{LedgerStore, LedgerTx};
use crate::error::{LedgerError, Result};
use crate::ledger::account::{validate_user_id, AccountManager};
use crate::ledger::clock::Clock;
use crate::ledger::model::{LedgerReason, WithdrawalRequest, WithdrawalStatus, WITHDRAWAL_CURRENCY};

/// 출금 요청 입력
#[derive(Debug, Clone)]
pub struct WithdrawalInput {
    pub amount: Decimal,
    pub network: String,
    pub wallet_address: String,
}

/// 출금 상태 머신
#[derive(Clone)]
pub struct WithdrawalMachine {
    store: LedgerStore,
    clock: Arc<dyn Clock>,
    minimum_withdrawal: Decimal,
}

impl WithdrawalMachine {
    pub fn new(store: LedgerStore, clock: Arc<dyn Clock>, minimum_withdrawal: Decimal) -> Self {
        Self {
            store,
            clock,
            minimum_withdrawal,
        }
    }

    pub fn minimum_withdrawal(&self) -> Decimal {
        self.minimum_withdrawal
    }

    fn validate(&self, input: &WithdrawalInput) -> Result<()> {
        if input.amount <= Decimal::ZERO {
            return Err(LedgerError::Validation("withdrawal amount must be positive".into()));
        }
        if input.amount < self.minimum_withdrawal {
            return Err(LedgerError::Validation(format!(
                "minimum withdrawal is {}",
                self.minimum_withdrawal
            )));
        }
        if input.network.trim().is_empty() {
            return Err(LedgerError::Validation("network is required".into()));
        }
        if input.wallet_address.trim().is_empty() {
            return Err(LedgerError::Validation("wallet_address is required".into()));
        }
        Ok(())
    }

    /// 출금 요청 생성 (금액 즉시 차감)
    pub async fn create(&self, user_id: &str, input: WithdrawalInput) -> Result<WithdrawalRequest> {
        validate_user_id(user_id)?;
        self.validate(&input)?;

        let request = WithdrawalRequest {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            amount: input.amount,
            currency: WITHDRAWAL_CURRENCY.to_string(),
            network: input.network.trim().to_string(),
            wallet_address: input.wallet_address.trim().to_string(),
            status: WithdrawalStatus::Pending,
            created_at: self.clock.now(),
            processed_at: None,
        };

        let mut tx = self.store.begin().await?;
        let result = Self::create_in(&mut tx, &request).await;
        let new_balance = tx.finish(result).await?;

        info!(
            "출금 요청: {} {} {} (잔고: {})",
            request.id, request.user_id, request.amount, new_balance
        );
        Ok(request)
    }

    async fn create_in(tx: &mut LedgerTx, request: &WithdrawalRequest) -> Result<Decimal> {
        let new_balance = AccountManager::apply_delta_in(
            tx,
            &request.user_id,
            -request.amount,
            LedgerReason::Withdrawal,
            &format!("withdrawal:{}", request.id),
            request.created_at,
        )
        .await?;

        WithdrawalRepository::insert(
            tx,
            &WithdrawalRecord {
                id: request.id.clone(),
                user_id: request.user_id.clone(),
                amount: encode_amount(request.amount),
                currency: request.currency.clone(),
                network: request.network.clone(),
                wallet_address: request.wallet_address.clone(),
                status: WithdrawalStatus::Pending.as_str().to_string(),
                created_at: to_millis(request.created_at),
                processed_at: None,
            },
        )
        .await?;

        Ok(new_balance)
    }

    /// 승인 (잔고 변화 없음)
    pub async fn approve(&self, withdrawal_id: &str) -> Result<WithdrawalRequest> {
        self.resolve(withdrawal_id, WithdrawalStatus::Approved).await
    }

    /// 거절 (금액 환불)
    pub async fn reject(&self, withdrawal_id: &str) -> Result<WithdrawalRequest> {
        self.resolve(withdrawal_id, WithdrawalStatus::Rejected).await
    }

    async fn resolve(&self, withdrawal_id: &str, to: WithdrawalStatus) -> Result<WithdrawalRequest> {
        if withdrawal_id.trim().is_empty() {
            return Err(LedgerError::Validation("withdrawal_id is required".into()));
        }

        let mut tx = self.store.begin().await?;
        let result = self.resolve_in(&mut tx, withdrawal_id, to).await;
        let request = match tx.finish(result).await {
            Ok(request) => request,
            Err(err @ LedgerError::InvalidStateTransition { .. }) => {
                warn!("출금 {} 중복 처리 시도 거부: {}", withdrawal_id, err);
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        info!("출금 {} 처리: {} ({})", request.id, request.status, request.amount);
        Ok(request)
    }

    async fn resolve_in(
        &self,
        tx: &mut LedgerTx,
        withdrawal_id: &str,
        to: WithdrawalStatus,
    ) -> Result<WithdrawalRequest> {
        let record = WithdrawalRepository::find(tx, withdrawal_id)
            .await?
            .ok_or(LedgerError::WithdrawalNotFound)?;
        let mut request = WithdrawalRequest::try_from(record)?;

        if request.status != WithdrawalStatus::Pending {
            return Err(LedgerError::withdrawal_transition(request.status, to));
        }

        let now = self.clock.now();
        WithdrawalRepository::transition(
            tx,
            withdrawal_id,
            WithdrawalStatus::Pending.as_str(),
            to.as_str(),
            to_millis(now),
        )
        .await?;

        if to == WithdrawalStatus::Rejected {
            AccountManager::apply_delta_in(
                tx,
                &request.user_id,
                request.amount,
                LedgerReason::WithdrawalRefund,
                &format!("withdrawal:{}", request.id),
                now,
            )
            .await?;
        }

        request.status = to;
        request.processed_at = Some(now);
        Ok(request)
    }

    pub async fn get(&self, withdrawal_id: &str) -> Result<WithdrawalRequest> {
        let mut tx = self.store.begin_read().await?;
        let result = WithdrawalRepository::find(&mut tx, withdrawal_id).await;
        let record = tx.finish(result).await?.ok_or(LedgerError::WithdrawalNotFound)?;
        WithdrawalRequest::try_from(record)
    }

    /// 출금 요청 목록 (최신순)
    pub async fn list(&self, status: Option<WithdrawalStatus>) -> Result<Vec<WithdrawalRequest>> {
        let mut tx = self.store.begin_read().await?;
        let result = WithdrawalRepository::list(&mut tx, status.map(|s| s.as_str())).await;
        let rows = tx.finish(result).await?;

        rows.into_iter().map(WithdrawalRequest::try_from).collect()
    }
}
