//! 원장의 기본 모델
//!
//! 계정, 보너스, 플랜, 입금, 출금 요청, 원장 항목 등
//! 원장 코어가 다루는 도메인 타입을 정의합니다.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// 출금 통화 (고정)
pub const WITHDRAWAL_CURRENCY: &str = "USDT";

/// 사용자 계정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
  pub id: String,
  /// 출금 가능 잔고 (항상 0 이상)
  pub withdrawable_balance: Decimal,
  /// 일일 수령 허용 여부 (관리자 토글)
  pub daily_claim_enabled: bool,
  pub created_at: DateTime<Utc>,
}

/// 보너스 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BonusType {
  /// 가입 보너스
  Signup,
  /// 추천 보너스
  Referral,
}

impl BonusType {
  pub fn as_str(&self) -> &'static str {
    match self {
      BonusType::Signup => "signup",
      BonusType::Referral => "referral",
    }
  }
}

impl FromStr for BonusType {
  type Err = LedgerError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "signup" => Ok(BonusType::Signup),
      "referral" => Ok(BonusType::Referral),
      other => Err(LedgerError::Validation(format!("unknown bonus type: {}", other))),
    }
  }
}

/// 보너스 항목
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusEntry {
  pub id: String,
  pub user_id: String,
  pub bonus_type: BonusType,
  pub amount: Decimal,
  /// 추천인 (추천 보너스에만 있음)
  pub source_user_id: Option<String>,
  pub created_at: DateTime<Utc>,
}

/// 플랜 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
  Active,
  Closed,
}

impl PlanStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      PlanStatus::Active => "active",
      PlanStatus::Closed => "closed",
    }
  }
}

impl FromStr for PlanStatus {
  type Err = LedgerError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "active" => Ok(PlanStatus::Active),
      "closed" => Ok(PlanStatus::Closed),
      other => Err(LedgerError::CorruptRow(format!("unknown plan status: {}", other))),
    }
  }
}

/// 수익 플랜
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
  pub id: String,
  pub user_id: String,
  pub deposit_id: Option<String>,
  pub daily_income: Decimal,
  pub status: PlanStatus,
  pub activated_at: DateTime<Utc>,
  /// 다음 수령 가능 시각 (첫 수령 전에는 없음)
  pub next_claimable_at: Option<DateTime<Utc>>,
}

/// 투자 상품 (플랜 생성의 기준)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentProduct {
  pub id: String,
  pub name: String,
  pub daily_income: Decimal,
}

/// 입금 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepositStatus {
  Pending,
  Confirmed,
}

impl DepositStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      DepositStatus::Pending => "pending",
      DepositStatus::Confirmed => "confirmed",
    }
  }
}

impl FromStr for DepositStatus {
  type Err = LedgerError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "pending" => Ok(DepositStatus::Pending),
      "confirmed" => Ok(DepositStatus::Confirmed),
      other => Err(LedgerError::CorruptRow(format!("unknown deposit status: {}", other))),
    }
  }
}

/// 입금
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deposit {
  pub id: String,
  pub user_id: String,
  pub amount: Decimal,
  pub product_id: Option<String>,
  pub status: DepositStatus,
  pub created_at: DateTime<Utc>,
}

/// 출금 요청 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
  /// 대기 (초기 상태, 금액은 이미 차감됨)
  Pending,
  /// 승인 (종결)
  Approved,
  /// 거절 (종결, 금액 환불됨)
  Rejected,
}

impl WithdrawalStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      WithdrawalStatus::Pending => "pending",
      WithdrawalStatus::Approved => "approved",
      WithdrawalStatus::Rejected => "rejected",
    }
  }

  pub fn is_terminal(&self) -> bool {
    !matches!(self, WithdrawalStatus::Pending)
  }
}

impl fmt::Display for WithdrawalStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for WithdrawalStatus {
  type Err = LedgerError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "pending" => Ok(WithdrawalStatus::Pending),
      "approved" => Ok(WithdrawalStatus::Approved),
      "rejected" => Ok(WithdrawalStatus::Rejected),
      other => Err(LedgerError::Validation(format!("unknown withdrawal status: {}", other))),
    }
  }
}

/// 출금 요청
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequest {
  pub id: String,
  pub user_id: String,
  pub amount: Decimal,
  pub currency: String,
  pub network: String,
  pub wallet_address: String,
  pub status: WithdrawalStatus,
  pub created_at: DateTime<Utc>,
  pub processed_at: Option<DateTime<Utc>>,
}

/// 잔고 변경 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerReason {
  DailyClaim,
  BonusConvert,
  Withdrawal,
  WithdrawalRefund,
  Adjustment,
}

impl LedgerReason {
  pub fn as_str(&self) -> &'static str {
    match self {
      LedgerReason::DailyClaim => "daily_claim",
      LedgerReason::BonusConvert => "bonus_convert",
      LedgerReason::Withdrawal => "withdrawal",
      LedgerReason::WithdrawalRefund => "withdrawal_refund",
      LedgerReason::Adjustment => "adjustment",
    }
  }
}

impl FromStr for LedgerReason {
  type Err = LedgerError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "daily_claim" => Ok(LedgerReason::DailyClaim),
      "bonus_convert" => Ok(LedgerReason::BonusConvert),
      "withdrawal" => Ok(LedgerReason::Withdrawal),
      "withdrawal_refund" => Ok(LedgerReason::WithdrawalRefund),
      "adjustment" => Ok(LedgerReason::Adjustment),
      other => Err(LedgerError::CorruptRow(format!("unknown ledger reason: {}", other))),
    }
  }
}

/// 원장 항목 (추가 전용)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
  pub id: String,
  pub user_id: String,
  /// 부호 있는 금액
  pub amount: Decimal,
  #[serde(rename = "type")]
  pub reason: LedgerReason,
  pub source: String,
  pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_status_strings_round_trip() {
    for status in [WithdrawalStatus::Pending, WithdrawalStatus::Approved, WithdrawalStatus::Rejected] {
      assert_eq!(status.as_str().parse::<WithdrawalStatus>().unwrap(), status);
    }
    assert!(!WithdrawalStatus::Pending.is_terminal());
    assert!(WithdrawalStatus::Rejected.is_terminal());
  }

  #[test]
  fn test_unknown_bonus_type_is_validation_error() {
    let err = "loyalty".parse::<BonusType>().unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
  }

  #[test]
  fn test_ledger_entry_serializes_reason_as_type() {
    let entry = LedgerEntry {
      id: "e1".into(),
      user_id: "u1".into(),
      amount: Decimal::new(-500, 2),
      reason: LedgerReason::Withdrawal,
      source: "withdrawal:w1".into(),
      created_at: Utc::now(),
    };
    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["type"], "withdrawal");
    assert_eq!(json["amount"], "-5.00");
  }
}
