//! DB 행 모델
//!
//! 금액은 정규화된 십진 문자열(TEXT), 시각은 Unix 밀리초(INTEGER)로 저장합니다.
//! 도메인 타입으로의 변환은 `TryFrom`으로 수행합니다.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::LedgerError;
use crate::ledger::model::{
    Account, BonusEntry, Deposit, InvestmentProduct, LedgerEntry, Plan, WithdrawalRequest,
};

/// 금액 컬럼 해석
pub fn parse_amount(column: &str, raw: &str) -> Result<Decimal, LedgerError> {
    Decimal::from_str(raw)
        .map_err(|_| LedgerError::CorruptRow(format!("{} is not a decimal: {}", column, raw)))
}

/// 금액 컬럼 인코딩
pub fn encode_amount(amount: Decimal) -> String {
    amount.normalize().to_string()
}

pub fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub fn from_millis(column: &str, millis: i64) -> Result<DateTime<Utc>, LedgerError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| LedgerError::CorruptRow(format!("{} is out of range: {}", column, millis)))
}

/// 계정 DB 모델
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AccountRecord {
    pub id: String,
    pub withdrawable_balance: String,
    pub daily_claim_enabled: bool,
    pub created_at: i64,
}

impl TryFrom<AccountRecord> for Account {
    type Error = LedgerError;

    fn try_from(row: AccountRecord) -> Result<Self, Self::Error> {
        Ok(Account {
            withdrawable_balance: parse_amount("withdrawable_balance", &row.withdrawable_balance)?,
            created_at: from_millis("created_at", row.created_at)?,
            daily_claim_enabled: row.daily_claim_enabled,
            id: row.id,
        })
    }
}

/// 보너스 DB 모델
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BonusRecord {
    pub id: String,
    pub user_id: String,
    pub bonus_type: String,
    pub amount: String,
    pub source_user_id: Option<String>,
    pub created_at: i64,
}

impl TryFrom<BonusRecord> for BonusEntry {
    type Error = LedgerError;

    fn try_from(row: BonusRecord) -> Result<Self, Self::Error> {
        Ok(BonusEntry {
            bonus_type: row
                .bonus_type
                .parse()
                .map_err(|_| LedgerError::CorruptRow(format!("bonus_type: {}", row.bonus_type)))?,
            amount: parse_amount("amount", &row.amount)?,
            created_at: from_millis("created_at", row.created_at)?,
            id: row.id,
            user_id: row.user_id,
            source_user_id: row.source_user_id,
        })
    }
}

/// 투자 상품 DB 모델
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    pub daily_income: String,
}

impl TryFrom<ProductRecord> for InvestmentProduct {
    type Error = LedgerError;

    fn try_from(row: ProductRecord) -> Result<Self, Self::Error> {
        Ok(InvestmentProduct {
            daily_income: parse_amount("daily_income", &row.daily_income)?,
            id: row.id,
            name: row.name,
        })
    }
}

/// 입금 DB 모델
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DepositRecord {
    pub id: String,
    pub user_id: String,
    pub amount: String,
    pub product_id: Option<String>,
    pub status: String,
    pub created_at: i64,
}

impl TryFrom<DepositRecord> for Deposit {
    type Error = LedgerError;

    fn try_from(row: DepositRecord) -> Result<Self, Self::Error> {
        Ok(Deposit {
            amount: parse_amount("amount", &row.amount)?,
            status: row.status.parse()?,
            created_at: from_millis("created_at", row.created_at)?,
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
        })
    }
}

/// 플랜 DB 모델
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlanRecord {
    pub id: String,
    pub user_id: String,
    pub deposit_id: Option<String>,
    pub daily_income: String,
    pub status: String,
    pub activated_at: i64,
    pub next_claimable_at: Option<i64>,
}

impl TryFrom<PlanRecord> for Plan {
    type Error = LedgerError;

    fn try_from(row: PlanRecord) -> Result<Self, Self::Error> {
        Ok(Plan {
            daily_income: parse_amount("daily_income", &row.daily_income)?,
            status: row.status.parse()?,
            activated_at: from_millis("activated_at", row.activated_at)?,
            next_claimable_at: row
                .next_claimable_at
                .map(|millis| from_millis("next_claimable_at", millis))
                .transpose()?,
            id: row.id,
            user_id: row.user_id,
            deposit_id: row.deposit_id,
        })
    }
}

/// 출금 요청 DB 모델
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WithdrawalRecord {
    pub id: String,
    pub user_id: String,
    pub amount: String,
    pub currency: String,
    pub network: String,
    pub wallet_address: String,
    pub status: String,
    pub created_at: i64,
    pub processed_at: Option<i64>,
}

impl TryFrom<WithdrawalRecord> for WithdrawalRequest {
    type Error = LedgerError;

    fn try_from(row: WithdrawalRecord) -> Result<Self, Self::Error> {
        Ok(WithdrawalRequest {
            amount: parse_amount("amount", &row.amount)?,
            status: row
                .status
                .parse()
                .map_err(|_| LedgerError::CorruptRow(format!("status: {}", row.status)))?,
            created_at: from_millis("created_at", row.created_at)?,
            processed_at: row
                .processed_at
                .map(|millis| from_millis("processed_at", millis))
                .transpose()?,
            id: row.id,
            user_id: row.user_id,
            currency: row.currency,
            network: row.network,
            wallet_address: row.wallet_address,
        })
    }
}

/// 원장 항목 DB 모델
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LedgerEntryRecord {
    pub id: String,
    pub user_id: String,
    pub amount: String,
    pub entry_type: String,
    pub source: String,
    pub created_at: i64,
}

impl TryFrom<LedgerEntryRecord> for LedgerEntry {
    type Error = LedgerError;

    fn try_from(row: LedgerEntryRecord) -> Result<Self, Self::Error> {
        Ok(LedgerEntry {
            amount: parse_amount("amount", &row.amount)?,
            reason: row.entry_type.parse()?,
            created_at: from_millis("created_at", row.created_at)?,
            id: row.id,
            user_id: row.user_id,
            source: row.source,
        })
    }
}
