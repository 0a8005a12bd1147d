//! 환경 변수 기반 설정
//!
//! `.env` 파일은 `main`에서 `dotenv`로 먼저 읽어 들입니다.
//! 비밀 값(`JWT_SECRET`, `ADMIN_SECRET`)을 제외한 모든 항목은 기본값이 있습니다.

use std::env;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::error::{LedgerError, Result};

/// 저장소 설정
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// 모든 저장소 호출의 제한 시간
    pub op_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://yield_ledger.db".to_string(),
            max_connections: 5,
            op_timeout: Duration::from_millis(5_000),
        }
    }
}

/// 원장 정책 상수
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// 최소 출금 금액
    pub minimum_withdrawal: Decimal,
    /// 일일 수령 간격
    pub claim_interval: chrono::Duration,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            minimum_withdrawal: Decimal::TWO,
            claim_interval: chrono::Duration::hours(24),
        }
    }
}

/// 서버 설정
#[derive(Debug, Clone)]
pub struct Config {
    pub rest_port: u16,
    pub store: StoreConfig,
    pub policy: PolicyConfig,
    pub jwt_secret: String,
    pub admin_secret: String,
}

impl Config {
    /// 환경 변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        let defaults = StoreConfig::default();
        let policy = PolicyConfig::default();

        let store = StoreConfig {
            database_url: non_empty_var("DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: parse_var("DB_MAX_CONNECTIONS")?.unwrap_or(defaults.max_connections),
            op_timeout: parse_var::<u64>("STORE_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.op_timeout),
        };

        let policy = PolicyConfig {
            minimum_withdrawal: parse_var("MIN_WITHDRAWAL")?.unwrap_or(policy.minimum_withdrawal),
            claim_interval: match parse_var::<i64>("CLAIM_INTERVAL_HOURS")? {
                Some(hours) => claim_interval_hours(hours)?,
                None => policy.claim_interval,
            },
        };

        if policy.minimum_withdrawal <= Decimal::ZERO {
            return Err(LedgerError::Validation("MIN_WITHDRAWAL must be positive".into()));
        }
        if policy.claim_interval <= chrono::Duration::zero() {
            return Err(LedgerError::Validation("CLAIM_INTERVAL_HOURS must be positive".into()));
        }

        Ok(Self {
            rest_port: parse_var("REST_PORT")?.unwrap_or(7000),
            store,
            policy,
            jwt_secret: required_var("JWT_SECRET")?,
            admin_secret: required_var("ADMIN_SECRET")?,
        })
    }
}

/// 수령 간격(시간)을 `chrono::Duration`으로 변환
fn claim_interval_hours(hours: i64) -> Result<chrono::Duration> {
    chrono::Duration::try_hours(hours)
        .ok_or_else(|| LedgerError::Validation("CLAIM_INTERVAL_HOURS is out of range".into()))
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required_var(key: &str) -> Result<String> {
    non_empty_var(key).ok_or_else(|| LedgerError::Validation(format!("{} must be set", key)))
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match non_empty_var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| LedgerError::Validation(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_defaults() {
        let policy = PolicyConfig::default();
        assert_eq!(policy.minimum_withdrawal, Decimal::TWO);
        assert_eq!(policy.claim_interval, chrono::Duration::hours(24));
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        env::set_var("YIELD_LEDGER_TEST_PORT", "not-a-port");
        let parsed = parse_var::<u16>("YIELD_LEDGER_TEST_PORT");
        assert!(matches!(parsed, Err(LedgerError::Validation(_))));
        env::remove_var("YIELD_LEDGER_TEST_PORT");
    }

    #[test]
    fn test_claim_interval_out_of_range() {
        assert_eq!(claim_interval_hours(12).unwrap(), chrono::Duration::hours(12));
        assert!(matches!(
            claim_interval_hours(i64::MAX),
            Err(LedgerError::Validation(_))
        ));
    }
}
