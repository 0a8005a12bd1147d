pub mod models;
pub mod repository;
pub mod store;

use log::info;

use crate::config::StoreConfig;
use crate::error::Result;

pub use store::{LedgerStore, LedgerTx};

/// SQLite 데이터베이스 초기화 및 연결
pub async fn init_database(config: &StoreConfig) -> Result<LedgerStore> {
    info!("🗄️  원장 데이터베이스 초기화 중...");

    let store = LedgerStore::connect(config).await?;

    // 테이블 생성
    create_tables(&store).await?;

    info!("✅ 데이터베이스 초기화 완료");

    Ok(store)
}

const SCHEMA: &[&str] = &[
    // 계정 테이블
    "CREATE TABLE IF NOT EXISTS accounts (
        id TEXT PRIMARY KEY,
        withdrawable_balance TEXT NOT NULL,
        daily_claim_enabled INTEGER NOT NULL DEFAULT 1,
        created_at INTEGER NOT NULL
    )",
    // 보너스 테이블
    "CREATE TABLE IF NOT EXISTS bonus_entries (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        bonus_type TEXT NOT NULL CHECK (bonus_type IN ('signup', 'referral')),
        amount TEXT NOT NULL,
        source_user_id TEXT,
        created_at INTEGER NOT NULL
    )",
    // 투자 상품 테이블
    "CREATE TABLE IF NOT EXISTS investment_plans (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        daily_income TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )",
    // 입금 테이블
    "CREATE TABLE IF NOT EXISTS deposits (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        amount TEXT NOT NULL,
        product_id TEXT,
        status TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        confirmed_at INTEGER
    )",
    // 플랜 테이블
    "CREATE TABLE IF NOT EXISTS plans (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        deposit_id TEXT,
        daily_income TEXT NOT NULL,
        status TEXT NOT NULL,
        activated_at INTEGER NOT NULL,
        next_claimable_at INTEGER
    )",
    // 출금 요청 테이블
    "CREATE TABLE IF NOT EXISTS withdrawal_requests (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        amount TEXT NOT NULL,
        currency TEXT NOT NULL,
        network TEXT NOT NULL,
        wallet_address TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        processed_at INTEGER
    )",
    // 원장 항목 테이블 (추가 전용)
    "CREATE TABLE IF NOT EXISTS ledger_entries (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        amount TEXT NOT NULL,
        entry_type TEXT NOT NULL,
        source TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_bonus_user_type ON bonus_entries(user_id, bonus_type, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_plans_user ON plans(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_deposits_user ON deposits(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_withdrawals_status ON withdrawal_requests(status, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_withdrawals_user ON withdrawal_requests(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_ledger_user ON ledger_entries(user_id, created_at)",
    // 원장 항목은 수정/삭제 불가
    "CREATE TRIGGER IF NOT EXISTS ledger_entries_no_update
        BEFORE UPDATE ON ledger_entries
        BEGIN SELECT RAISE(ABORT, 'ledger entries are append-only'); END",
    "CREATE TRIGGER IF NOT EXISTS ledger_entries_no_delete
        BEFORE DELETE ON ledger_entries
        BEGIN SELECT RAISE(ABORT, 'ledger entries are append-only'); END",
];

/// 필요한 테이블 생성
async fn create_tables(store: &LedgerStore) -> Result<()> {
    let mut tx = store.begin().await?;
    let result: Result<()> = async {
        let (limit, conn) = tx.parts()?;
        for statement in SCHEMA {
            store::timed(limit, sqlx::query(*statement).execute(&mut *conn)).await?;
        }
        Ok(())
    }
    .await;
    tx.finish(result).await?;

    info!("📋 테이블 생성 완료");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_ledger_entries_are_append_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            database_url: format!("sqlite://{}", dir.path().join("schema.db").display()),
            max_connections: 2,
            op_timeout: Duration::from_secs(2),
        };
        let store = init_database(&config).await.unwrap();
        // 두 번 초기화해도 문제 없어야 함
        create_tables(&store).await.unwrap();

        sqlx::query(
            "INSERT INTO ledger_entries (id, user_id, amount, entry_type, source, created_at)
             VALUES ('e1', 'u1', '5', 'adjustment', 'test', 0)",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let update = sqlx::query("UPDATE ledger_entries SET amount = '500' WHERE id = 'e1'")
            .execute(store.pool())
            .await;
        assert!(update.is_err());

        let delete = sqlx::query("DELETE FROM ledger_entries WHERE id = 'e1'")
            .execute(store.pool())
            .await;
        assert!(delete.is_err());

        store.close().await;
    }
}
