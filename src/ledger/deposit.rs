//! 입금 확인 및 플랜 활성화
//!
//! 입금은 잔고를 바꾸지 않습니다. 확인 시 상품이 지정되어 있으면
//! 해당 상품의 일일 수익으로 새 플랜을 만듭니다.

use std::sync::Arc;

use log::info;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::db::models::{encode_amount, to_millis, DepositRecord, PlanRecord, ProductRecord};
use crate::db::repository::{AccountRepository, DepositRepository, PlanRepository, ProductRepository};
use crate::db::{LedgerStore, LedgerTx};
use crate::error::{LedgerError, Result};
use crate::ledger::account::validate_user_id;
use crate::ledger::clock::Clock;
use crate::ledger::model::{Deposit, DepositStatus, InvestmentProduct, Plan, PlanStatus};

/// 입금 확인 결과
#[derive(Debug, Clone, Serialize)]
pub struct DepositConfirmation {
    pub deposit: Deposit,
    pub plan: Option<Plan>,
}

/// 입금 창구
#[derive(Clone)]
pub struct DepositDesk {
    store: LedgerStore,
    clock: Arc<dyn Clock>,
}

impl DepositDesk {
    pub fn new(store: LedgerStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// 투자 상품 등록
    pub async fn create_product(&self, name: &str, daily_income: Decimal) -> Result<InvestmentProduct> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::Validation("product name is required".into()));
        }
        if daily_income <= Decimal::ZERO {
            return Err(LedgerError::Validation("daily income must be positive".into()));
        }

        let product = InvestmentProduct {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            daily_income,
        };
        let record = ProductRecord {
            id: product.id.clone(),
            name: product.name.clone(),
            daily_income: encode_amount(daily_income),
        };

        let mut tx = self.store.begin().await?;
        let result = ProductRepository::insert(&mut tx, &record, to_millis(self.clock.now())).await;
        tx.finish(result).await?;

        info!("투자 상품 등록: {} ({} / 일)", product.name, product.daily_income);
        Ok(product)
    }

    /// 입금 접수 (pending)
    pub async fn submit(
        &self,
        user_id: &str,
        amount: Decimal,
        product_id: Option<String>,
    ) -> Result<Deposit> {
        validate_user_id(user_id)?;
        if amount <= Decimal::ZERO {
            return Err(LedgerError::Validation("deposit amount must be positive".into()));
        }

        let deposit = Deposit {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            amount,
            product_id: product_id.filter(|id| !id.trim().is_empty()),
            status: DepositStatus::Pending,
            created_at: self.clock.now(),
        };

        let mut tx = self.store.begin().await?;
        let result: Result<()> = async {
            if AccountRepository::find(&mut tx, user_id).await?.is_none() {
                return Err(LedgerError::AccountNotFound);
            }
            if let Some(product_id) = &deposit.product_id {
                if ProductRepository::find(&mut tx, product_id).await?.is_none() {
                    return Err(LedgerError::ProductNotFound);
                }
            }
            DepositRepository::insert(
                &mut tx,
                &DepositRecord {
                    id: deposit.id.clone(),
                    user_id: deposit.user_id.clone(),
                    amount: encode_amount(amount),
                    product_id: deposit.product_id.clone(),
                    status: DepositStatus::Pending.as_str().to_string(),
                    created_at: to_millis(deposit.created_at),
                },
            )
            .await
        }
        .await;
        tx.finish(result).await?;

        info!("입금 접수: {} {} ({})", user_id, amount, deposit.id);
        Ok(deposit)
    }

    /// 입금 확인 (pending → confirmed, 한 번만)
    pub async fn confirm(&self, deposit_id: &str) -> Result<DepositConfirmation> {
        if deposit_id.trim().is_empty() {
            return Err(LedgerError::Validation("deposit_id is required".into()));
        }

        let mut tx = self.store.begin().await?;
        let result = self.confirm_in(&mut tx, deposit_id).await;
        let confirmation = tx.finish(result).await?;

        info!(
            "입금 확인: {} (플랜 생성: {})",
            deposit_id,
            confirmation.plan.is_some()
        );
        Ok(confirmation)
    }

    async fn confirm_in(&self, tx: &mut LedgerTx, deposit_id: &str) -> Result<DepositConfirmation> {
        let record = DepositRepository::find(tx, deposit_id)
            .await?
            .ok_or(LedgerError::DepositNotFound)?;
        let mut deposit = Deposit::try_from(record)?;

        if deposit.status != DepositStatus::Pending {
            return Err(LedgerError::InvalidStateTransition {
                entity: "deposit",
                from: deposit.status.as_str().to_string(),
                to: DepositStatus::Confirmed.as_str().to_string(),
            });
        }

        let now = self.clock.now();
        DepositRepository::transition(
            tx,
            deposit_id,
            DepositStatus::Pending.as_str(),
            DepositStatus::Confirmed.as_str(),
            to_millis(now),
        )
        .await?;
        deposit.status = DepositStatus::Confirmed;

        let plan = match &deposit.product_id {
            Some(product_id) => {
                let product = ProductRepository::find(tx, product_id)
                    .await?
                    .ok_or(LedgerError::ProductNotFound)?;
                let product = InvestmentProduct::try_from(product)?;

                let plan = Plan {
                    id: Uuid::new_v4().to_string(),
                    user_id: deposit.user_id.clone(),
                    deposit_id: Some(deposit.id.clone()),
                    daily_income: product.daily_income,
                    status: PlanStatus::Active,
                    activated_at: now,
                    next_claimable_at: None,
                };
                PlanRepository::insert(
                    tx,
                    &PlanRecord {
                        id: plan.id.clone(),
                        user_id: plan.user_id.clone(),
                        deposit_id: plan.deposit_id.clone(),
                        daily_income: encode_amount(plan.daily_income),
                        status: plan.status.as_str().to_string(),
                        activated_at: to_millis(plan.activated_at),
                        next_claimable_at: None,
                    },
                )
                .await?;
                Some(plan)
            }
            None => None,
        };

        Ok(DepositConfirmation { deposit, plan })
    }
}
