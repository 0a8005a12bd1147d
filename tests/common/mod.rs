#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use tempfile::TempDir;

use yield_ledger::config::{PolicyConfig, StoreConfig};
use yield_ledger::db::init_database;
use yield_ledger::ledger::{AwardBonus, BonusType, Ledger, ManualClock, Plan};

/// 임시 파일 DB 위의 원장 (디렉터리는 `Harness`와 함께 삭제)
pub struct Harness {
    pub ledger: Ledger,
    pub clock: Arc<ManualClock>,
    _dir: TempDir,
}

pub async fn harness() -> Harness {
    harness_with_policy(PolicyConfig::default()).await
}

pub async fn harness_with_policy(policy: PolicyConfig) -> Harness {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("ledger.db");
    let config = StoreConfig {
        database_url: format!("sqlite://{}", path.display()),
        max_connections: 8,
        op_timeout: Duration::from_secs(5),
    };

    let store = init_database(&config).await.expect("init database");
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap(),
    ));
    let ledger = Ledger::new(store, &policy, clock.clone());

    Harness {
        ledger,
        clock,
        _dir: dir,
    }
}

impl Harness {
    /// 계정 생성 후 `adjustment`로 잔고 적립
    pub async fn funded_account(&self, user_id: &str, balance: Decimal) {
        self.ledger.accounts.open_account(user_id).await.expect("open account");
        if !balance.is_zero() {
            self.ledger
                .accounts
                .apply_delta(
                    user_id,
                    balance,
                    yield_ledger::ledger::LedgerReason::Adjustment,
                    "test:seed",
                )
                .await
                .expect("seed balance");
        }
    }

    pub async fn award(&self, user_id: &str, bonus_type: BonusType, amount: Decimal) {
        self.ledger
            .bonuses
            .award(AwardBonus {
                user_id: user_id.to_string(),
                bonus_type,
                amount,
                source_user_id: None,
            })
            .await
            .expect("award bonus");
        // 같은 밀리초에 쌓이지 않도록 시계 이동
        self.clock.advance(chrono::Duration::milliseconds(1));
    }

    /// 상품 → 입금 → 확인으로 활성 플랜 생성
    pub async fn active_plan(&self, user_id: &str, daily_income: Decimal) -> Plan {
        let product = self
            .ledger
            .deposits
            .create_product("Starter", daily_income)
            .await
            .expect("create product");
        let deposit = self
            .ledger
            .deposits
            .submit(user_id, Decimal::from(100), Some(product.id))
            .await
            .expect("submit deposit");
        self.ledger
            .deposits
            .confirm(&deposit.id)
            .await
            .expect("confirm deposit")
            .plan
            .expect("plan created")
    }

    pub async fn assert_consistent(&self, user_id: &str) {
        let report = self
            .ledger
            .audit
            .reconcile(user_id)
            .await
            .expect("reconcile");
        assert!(
            report.consistent,
            "balance {} != ledger sum {}",
            report.balance, report.ledger_sum
        );
    }
}
