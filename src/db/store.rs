//! 원장 저장소
//!
//! 프로세스 전역 연결 풀과 트랜잭션 경계를 제공합니다.
//! - 풀은 시작 시 한 번 생성되어 컴포넌트에 주입되고, 종료 시 닫힙니다.
//! - 쓰기 트랜잭션은 `BEGIN IMMEDIATE`로 열어 같은 DB의 다른 쓰기와 직렬화됩니다.
//! - 모든 호출은 제한 시간을 가지며 초과 시 `StoreUnavailable`로 실패합니다.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use log::{debug, info, warn};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{
    Sqlite, SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool,
    SqlitePoolOptions,
};

use crate::config::StoreConfig;
use crate::error::{LedgerError, Result};

/// 제한 시간 안에 저장소 호출 실행
pub(crate) async fn timed<T, F>(limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(LedgerError::from),
        Err(_) => Err(LedgerError::StoreUnavailable(format!(
            "store call exceeded {}ms",
            limit.as_millis()
        ))),
    }
}

/// 공유 원장 저장소 핸들
#[derive(Clone)]
pub struct LedgerStore {
    pool: SqlitePool,
    op_timeout: Duration,
}

impl LedgerStore {
    /// 연결 풀 생성
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| LedgerError::Validation(format!("invalid DATABASE_URL: {}", e)))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.op_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.op_timeout)
            .connect_with(options)
            .await?;

        info!(
            "원장 저장소 연결 완료 (최대 연결: {}, 제한 시간: {}ms)",
            config.max_connections,
            config.op_timeout.as_millis()
        );

        Ok(Self {
            pool,
            op_timeout: config.op_timeout,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn op_timeout(&self) -> Duration {
        self.op_timeout
    }

    /// 쓰기 트랜잭션 시작 (`BEGIN IMMEDIATE`)
    pub async fn begin(&self) -> Result<LedgerTx> {
        self.begin_with("BEGIN IMMEDIATE").await
    }

    /// 읽기 전용 스냅샷 트랜잭션 시작
    pub async fn begin_read(&self) -> Result<LedgerTx> {
        self.begin_with("BEGIN").await
    }

    async fn begin_with(&self, statement: &'static str) -> Result<LedgerTx> {
        let mut conn = timed(self.op_timeout, self.pool.acquire()).await?;

        if let Err(err) = timed(self.op_timeout, sqlx::query(statement).execute(&mut *conn)).await {
            // 상태를 알 수 없는 연결은 풀에 돌려주지 않음
            drop(conn.detach());
            return Err(err);
        }

        Ok(LedgerTx {
            conn: Some(conn),
            op_timeout: self.op_timeout,
        })
    }

    /// 풀 종료
    pub async fn close(&self) {
        self.pool.close().await;
        info!("원장 저장소 연결 종료");
    }
}

/// 열린 원장 트랜잭션
///
/// `commit` 없이 드롭되면 연결을 폐기하여 SQLite가 트랜잭션을 롤백하게 합니다.
pub struct LedgerTx {
    conn: Option<PoolConnection<Sqlite>>,
    op_timeout: Duration,
}

impl LedgerTx {
    /// 제한 시간과 연결을 함께 빌려옴
    pub(crate) fn parts(&mut self) -> Result<(Duration, &mut SqliteConnection)> {
        let limit = self.op_timeout;
        match self.conn.as_deref_mut() {
            Some(conn) => Ok((limit, conn)),
            None => Err(LedgerError::StoreUnavailable("transaction already finished".into())),
        }
    }

    pub async fn commit(mut self) -> Result<()> {
        let mut conn = self.take_conn()?;
        match timed(self.op_timeout, sqlx::query("COMMIT").execute(&mut *conn)).await {
            Ok(_) => Ok(()),
            Err(err) => {
                drop(conn.detach());
                Err(err)
            }
        }
    }

    pub async fn rollback(mut self) -> Result<()> {
        let mut conn = self.take_conn()?;
        match timed(self.op_timeout, sqlx::query("ROLLBACK").execute(&mut *conn)).await {
            Ok(_) => Ok(()),
            Err(err) => {
                drop(conn.detach());
                Err(err)
            }
        }
    }

    /// 결과에 따라 커밋 또는 롤백
    ///
    /// 실패 결과는 롤백 오류보다 우선해서 반환됩니다.
    pub async fn finish<T>(self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback().await {
                    warn!("롤백 실패: {} (원인: {})", rollback_err, err);
                }
                Err(err)
            }
        }
    }

    fn take_conn(&mut self) -> Result<PoolConnection<Sqlite>> {
        self.conn
            .take()
            .ok_or_else(|| LedgerError::StoreUnavailable("transaction already finished".into()))
    }
}

impl Drop for LedgerTx {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            debug!("완료되지 않은 트랜잭션 폐기");
            drop(conn.detach());
        }
    }
}
