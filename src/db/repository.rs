//! 테이블별 저장소
//!
//! 모든 함수는 열린 [`LedgerTx`] 안에서 실행됩니다.
//! 조건부 갱신(`WHERE ... AND <이전 값>`)이 0행에 적용되면
//! 다른 쓰기와 경합한 것으로 보고 `TransactionConflict`를 반환합니다.

use sqlx::sqlite::SqliteQueryResult;

use super::models::{
    AccountRecord, BonusRecord, DepositRecord, LedgerEntryRecord, PlanRecord, ProductRecord,
    WithdrawalRecord,
};
use super::store::{timed, LedgerTx};
use crate::error::{LedgerError, Result};

fn expect_one(result: SqliteQueryResult, what: &str) -> Result<()> {
    if result.rows_affected() == 1 {
        Ok(())
    } else {
        Err(LedgerError::TransactionConflict(format!("{} changed concurrently", what)))
    }
}

/// 계정 저장소
pub struct AccountRepository;

impl AccountRepository {
    pub async fn find(tx: &mut LedgerTx, user_id: &str) -> Result<Option<AccountRecord>> {
        let (limit, conn) = tx.parts()?;
        timed(
            limit,
            sqlx::query_as::<_, AccountRecord>(
                "SELECT id, withdrawable_balance, daily_claim_enabled, created_at
                 FROM accounts
                 WHERE id = ?",
            )
            .bind(user_id)
            .fetch_optional(conn),
        )
        .await
    }

    pub async fn insert(tx: &mut LedgerTx, account: &AccountRecord) -> Result<()> {
        let (limit, conn) = tx.parts()?;
        timed(
            limit,
            sqlx::query(
                "INSERT INTO accounts (id, withdrawable_balance, daily_claim_enabled, created_at)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&account.id)
            .bind(&account.withdrawable_balance)
            .bind(account.daily_claim_enabled)
            .bind(account.created_at)
            .execute(conn),
        )
        .await?;

        Ok(())
    }

    /// 잔고 비교 후 교체 (읽은 값이 그대로일 때만 기록)
    pub async fn swap_balance(
        tx: &mut LedgerTx,
        user_id: &str,
        expected: &str,
        new_balance: &str,
    ) -> Result<()> {
        let (limit, conn) = tx.parts()?;
        let result = timed(
            limit,
            sqlx::query(
                "UPDATE accounts
                 SET withdrawable_balance = ?
                 WHERE id = ? AND withdrawable_balance = ?",
            )
            .bind(new_balance)
            .bind(user_id)
            .bind(expected)
            .execute(conn),
        )
        .await?;

        expect_one(result, "account balance")
    }

    /// 일일 수령 허용 여부 변경, 계정이 없으면 false
    pub async fn set_daily_claim_enabled(
        tx: &mut LedgerTx,
        user_id: &str,
        enabled: bool,
    ) -> Result<bool> {
        let (limit, conn) = tx.parts()?;
        let result = timed(
            limit,
            sqlx::query("UPDATE accounts SET daily_claim_enabled = ? WHERE id = ?")
                .bind(enabled)
                .bind(user_id)
                .execute(conn),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn list(tx: &mut LedgerTx) -> Result<Vec<AccountRecord>> {
        let (limit, conn) = tx.parts()?;
        timed(
            limit,
            sqlx::query_as::<_, AccountRecord>(
                "SELECT id, withdrawable_balance, daily_claim_enabled, created_at
                 FROM accounts
                 ORDER BY created_at DESC, rowid DESC",
            )
            .fetch_all(conn),
        )
        .await
    }

    pub async fn delete(tx: &mut LedgerTx, user_id: &str) -> Result<()> {
        let (limit, conn) = tx.parts()?;
        let result = timed(
            limit,
            sqlx::query("DELETE FROM accounts WHERE id = ?")
                .bind(user_id)
                .execute(conn),
        )
        .await?;

        expect_one(result, "account")
    }
}

/// 보너스 저장소
pub struct BonusRepository;

impl BonusRepository {
    pub async fn insert(tx: &mut LedgerTx, bonus: &BonusRecord) -> Result<()> {
        let (limit, conn) = tx.parts()?;
        timed(
            limit,
            sqlx::query(
                "INSERT INTO bonus_entries (id, user_id, bonus_type, amount, source_user_id, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&bonus.id)
            .bind(&bonus.user_id)
            .bind(&bonus.bonus_type)
            .bind(&bonus.amount)
            .bind(&bonus.source_user_id)
            .bind(bonus.created_at)
            .execute(conn),
        )
        .await?;

        Ok(())
    }

    /// 사용자/종류별 보너스 조회 (오래된 순)
    pub async fn find_fifo(
        tx: &mut LedgerTx,
        user_id: &str,
        bonus_type: &str,
    ) -> Result<Vec<BonusRecord>> {
        let (limit, conn) = tx.parts()?;
        timed(
            limit,
            sqlx::query_as::<_, BonusRecord>(
                "SELECT id, user_id, bonus_type, amount, source_user_id, created_at
                 FROM bonus_entries
                 WHERE user_id = ? AND bonus_type = ?
                 ORDER BY created_at ASC, rowid ASC",
            )
            .bind(user_id)
            .bind(bonus_type)
            .fetch_all(conn),
        )
        .await
    }

    pub async fn find_by_user(tx: &mut LedgerTx, user_id: &str) -> Result<Vec<BonusRecord>> {
        let (limit, conn) = tx.parts()?;
        timed(
            limit,
            sqlx::query_as::<_, BonusRecord>(
                "SELECT id, user_id, bonus_type, amount, source_user_id, created_at
                 FROM bonus_entries
                 WHERE user_id = ?
                 ORDER BY created_at ASC, rowid ASC",
            )
            .bind(user_id)
            .fetch_all(conn),
        )
        .await
    }

    /// 전체 보너스 항목 (최신순)
    pub async fn list_all(tx: &mut LedgerTx) -> Result<Vec<BonusRecord>> {
        let (limit, conn) = tx.parts()?;
        timed(
            limit,
            sqlx::query_as::<_, BonusRecord>(
                "SELECT id, user_id, bonus_type, amount, source_user_id, created_at
                 FROM bonus_entries
                 ORDER BY created_at DESC, rowid DESC",
            )
            .fetch_all(conn),
        )
        .await
    }

    /// 보너스 금액 차감 (비교 후 교체)
    pub async fn swap_amount(
        tx: &mut LedgerTx,
        bonus_id: &str,
        expected: &str,
        new_amount: &str,
    ) -> Result<()> {
        let (limit, conn) = tx.parts()?;
        let result = timed(
            limit,
            sqlx::query("UPDATE bonus_entries SET amount = ? WHERE id = ? AND amount = ?")
                .bind(new_amount)
                .bind(bonus_id)
                .bind(expected)
                .execute(conn),
        )
        .await?;

        expect_one(result, "bonus entry")
    }

    pub async fn delete(tx: &mut LedgerTx, bonus_id: &str) -> Result<()> {
        let (limit, conn) = tx.parts()?;
        let result = timed(
            limit,
            sqlx::query("DELETE FROM bonus_entries WHERE id = ?")
                .bind(bonus_id)
                .execute(conn),
        )
        .await?;

        expect_one(result, "bonus entry")
    }

    pub async fn delete_by_user(tx: &mut LedgerTx, user_id: &str) -> Result<u64> {
        let (limit, conn) = tx.parts()?;
        let result = timed(
            limit,
            sqlx::query("DELETE FROM bonus_entries WHERE user_id = ?")
                .bind(user_id)
                .execute(conn),
        )
        .await?;

        Ok(result.rows_affected())
    }
}

/// 투자 상품 저장소
pub struct ProductRepository;

impl ProductRepository {
    pub async fn insert(tx: &mut LedgerTx, product: &ProductRecord, created_at: i64) -> Result<()> {
        let (limit, conn) = tx.parts()?;
        timed(
            limit,
            sqlx::query(
                "INSERT INTO investment_plans (id, name, daily_income, created_at)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&product.id)
            .bind(&product.name)
            .bind(&product.daily_income)
            .bind(created_at)
            .execute(conn),
        )
        .await?;

        Ok(())
    }

    pub async fn find(tx: &mut LedgerTx, product_id: &str) -> Result<Option<ProductRecord>> {
        let (limit, conn) = tx.parts()?;
        timed(
            limit,
            sqlx::query_as::<_, ProductRecord>(
                "SELECT id, name, daily_income FROM investment_plans WHERE id = ?",
            )
            .bind(product_id)
            .fetch_optional(conn),
        )
        .await
    }
}

/// 입금 저장소
pub struct DepositRepository;

impl DepositRepository {
    pub async fn insert(tx: &mut LedgerTx, deposit: &DepositRecord) -> Result<()> {
        let (limit, conn) = tx.parts()?;
        timed(
            limit,
            sqlx::query(
                "INSERT INTO deposits (id, user_id, amount, product_id, status, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&deposit.id)
            .bind(&deposit.user_id)
            .bind(&deposit.amount)
            .bind(&deposit.product_id)
            .bind(&deposit.status)
            .bind(deposit.created_at)
            .execute(conn),
        )
        .await?;

        Ok(())
    }

    pub async fn find(tx: &mut LedgerTx, deposit_id: &str) -> Result<Option<DepositRecord>> {
        let (limit, conn) = tx.parts()?;
        timed(
            limit,
            sqlx::query_as::<_, DepositRecord>(
                "SELECT id, user_id, amount, product_id, status, created_at
                 FROM deposits
                 WHERE id = ?",
            )
            .bind(deposit_id)
            .fetch_optional(conn),
        )
        .await
    }

    /// 상태 전이 (현재 상태가 `from`일 때만)
    pub async fn transition(
        tx: &mut LedgerTx,
        deposit_id: &str,
        from: &str,
        to: &str,
        confirmed_at: i64,
    ) -> Result<()> {
        let (limit, conn) = tx.parts()?;
        let result = timed(
            limit,
            sqlx::query("UPDATE deposits SET status = ?, confirmed_at = ? WHERE id = ? AND status = ?")
                .bind(to)
                .bind(confirmed_at)
                .bind(deposit_id)
                .bind(from)
                .execute(conn),
        )
        .await?;

        expect_one(result, "deposit")
    }

    pub async fn delete_by_user(tx: &mut LedgerTx, user_id: &str) -> Result<u64> {
        let (limit, conn) = tx.parts()?;
        let result = timed(
            limit,
            sqlx::query("DELETE FROM deposits WHERE user_id = ?")
                .bind(user_id)
                .execute(conn),
        )
        .await?;

        Ok(result.rows_affected())
    }
}

/// 플랜 저장소
pub struct PlanRepository;

impl PlanRepository {
    pub async fn insert(tx: &mut LedgerTx, plan: &PlanRecord) -> Result<()> {
        let (limit, conn) = tx.parts()?;
        timed(
            limit,
            sqlx::query(
                "INSERT INTO plans
                 (id, user_id, deposit_id, daily_income, status, activated_at, next_claimable_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&plan.id)
            .bind(&plan.user_id)
            .bind(&plan.deposit_id)
            .bind(&plan.daily_income)
            .bind(&plan.status)
            .bind(plan.activated_at)
            .bind(plan.next_claimable_at)
            .execute(conn),
        )
        .await?;

        Ok(())
    }

    pub async fn find(tx: &mut LedgerTx, plan_id: &str) -> Result<Option<PlanRecord>> {
        let (limit, conn) = tx.parts()?;
        timed(
            limit,
            sqlx::query_as::<_, PlanRecord>(
                "SELECT id, user_id, deposit_id, daily_income, status, activated_at, next_claimable_at
                 FROM plans
                 WHERE id = ?",
            )
            .bind(plan_id)
            .fetch_optional(conn),
        )
        .await
    }

    pub async fn find_by_user(tx: &mut LedgerTx, user_id: &str) -> Result<Vec<PlanRecord>> {
        let (limit, conn) = tx.parts()?;
        timed(
            limit,
            sqlx::query_as::<_, PlanRecord>(
                "SELECT id, user_id, deposit_id, daily_income, status, activated_at, next_claimable_at
                 FROM plans
                 WHERE user_id = ?
                 ORDER BY activated_at ASC, rowid ASC",
            )
            .bind(user_id)
            .fetch_all(conn),
        )
        .await
    }

    /// 다음 수령 시각 잠금 (이전 값이 그대로일 때만)
    pub async fn lock_next_claim(
        tx: &mut LedgerTx,
        plan_id: &str,
        expected: Option<i64>,
        next_claimable_at: i64,
    ) -> Result<()> {
        let (limit, conn) = tx.parts()?;
        let result = timed(
            limit,
            sqlx::query(
                "UPDATE plans
                 SET next_claimable_at = ?
                 WHERE id = ? AND status = 'active' AND next_claimable_at IS ?",
            )
            .bind(next_claimable_at)
            .bind(plan_id)
            .bind(expected)
            .execute(conn),
        )
        .await?;

        expect_one(result, "plan")
    }

    pub async fn transition(tx: &mut LedgerTx, plan_id: &str, from: &str, to: &str) -> Result<()> {
        let (limit, conn) = tx.parts()?;
        let result = timed(
            limit,
            sqlx::query("UPDATE plans SET status = ? WHERE id = ? AND status = ?")
                .bind(to)
                .bind(plan_id)
                .bind(from)
                .execute(conn),
        )
        .await?;

        expect_one(result, "plan")
    }

    pub async fn delete_by_user(tx: &mut LedgerTx, user_id: &str) -> Result<u64> {
        let (limit, conn) = tx.parts()?;
        let result = timed(
            limit,
            sqlx::query("DELETE FROM plans WHERE user_id = ?")
                .bind(user_id)
                .execute(conn),
        )
        .await?;

        Ok(result.rows_affected())
    }
}

/// 출금 요청 저장소
pub struct WithdrawalRepository;

impl WithdrawalRepository {
    pub async fn insert(tx: &mut LedgerTx, request: &WithdrawalRecord) -> Result<()> {
        let (limit, conn) = tx.parts()?;
        timed(
            limit,
            sqlx::query(
                "INSERT INTO withdrawal_requests
                 (id, user_id, amount, currency, network, wallet_address, status, created_at, processed_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&request.id)
            .bind(&request.user_id)
            .bind(&request.amount)
            .bind(&request.currency)
            .bind(&request.network)
            .bind(&request.wallet_address)
            .bind(&request.status)
            .bind(request.created_at)
            .bind(request.processed_at)
            .execute(conn),
        )
        .await?;

        Ok(())
    }

    pub async fn find(tx: &mut LedgerTx, withdrawal_id: &str) -> Result<Option<WithdrawalRecord>> {
        let (limit, conn) = tx.parts()?;
        timed(
            limit,
            sqlx::query_as::<_, WithdrawalRecord>(
                "SELECT id, user_id, amount, currency, network, wallet_address, status, created_at, processed_at
                 FROM withdrawal_requests
                 WHERE id = ?",
            )
            .bind(withdrawal_id)
            .fetch_optional(conn),
        )
        .await
    }

    /// 출금 요청 목록 (최신순, 상태 필터 선택)
    pub async fn list(tx: &mut LedgerTx, status: Option<&str>) -> Result<Vec<WithdrawalRecord>> {
        let (limit, conn) = tx.parts()?;
        timed(
            limit,
            sqlx::query_as::<_, WithdrawalRecord>(
                "SELECT id, user_id, amount, currency, network, wallet_address, status, created_at, processed_at
                 FROM withdrawal_requests
                 WHERE (? IS NULL OR status = ?)
                 ORDER BY created_at DESC, rowid DESC",
            )
            .bind(status)
            .bind(status)
            .fetch_all(conn),
        )
        .await
    }

    pub async fn count_pending(tx: &mut LedgerTx, user_id: &str) -> Result<i64> {
        let (limit, conn) = tx.parts()?;
        timed(
            limit,
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM withdrawal_requests WHERE user_id = ? AND status = 'pending'",
            )
            .bind(user_id)
            .fetch_one(conn),
        )
        .await
    }

    /// 상태 전이 (현재 상태가 `from`일 때만)
    pub async fn transition(
        tx: &mut LedgerTx,
        withdrawal_id: &str,
        from: &str,
        to: &str,
        processed_at: i64,
    ) -> Result<()> {
        let (limit, conn) = tx.parts()?;
        let result = timed(
            limit,
            sqlx::query(
                "UPDATE withdrawal_requests
                 SET status = ?, processed_at = ?
                 WHERE id = ? AND status = ?",
            )
            .bind(to)
            .bind(processed_at)
            .bind(withdrawal_id)
            .bind(from)
            .execute(conn),
        )
        .await?;

        expect_one(result, "withdrawal request")
    }

    pub async fn delete_by_user(tx: &mut LedgerTx, user_id: &str) -> Result<u64> {
        let (limit, conn) = tx.parts()?;
        let result = timed(
            limit,
            sqlx::query("DELETE FROM withdrawal_requests WHERE user_id = ?")
                .bind(user_id)
                .execute(conn),
        )
        .await?;

        Ok(result.rows_affected())
    }
}

/// 원장 항목 저장소
pub struct LedgerEntryRepository;

impl LedgerEntryRepository {
    pub async fn append(tx: &mut LedgerTx, entry: &LedgerEntryRecord) -> Result<()> {
        let (limit, conn) = tx.parts()?;
        timed(
            limit,
            sqlx::query(
                "INSERT INTO ledger_entries (id, user_id, amount, entry_type, source, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&entry.id)
            .bind(&entry.user_id)
            .bind(&entry.amount)
            .bind(&entry.entry_type)
            .bind(&entry.source)
            .bind(entry.created_at)
            .execute(conn),
        )
        .await?;

        Ok(())
    }

    /// 사용자별 원장 항목 (오래된 순)
    pub async fn find_by_user(tx: &mut LedgerTx, user_id: &str) -> Result<Vec<LedgerEntryRecord>> {
        let (limit, conn) = tx.parts()?;
        timed(
            limit,
            sqlx::query_as::<_, LedgerEntryRecord>(
                "SELECT id, user_id, amount, entry_type, source, created_at
                 FROM ledger_entries
                 WHERE user_id = ?
                 ORDER BY created_at ASC, rowid ASC",
            )
            .bind(user_id)
            .fetch_all(conn),
        )
        .await
    }
}
