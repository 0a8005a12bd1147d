//! 수익 원장 서비스
//!
//! 출금 가능 잔고, 보너스 풀, 일일 수익 적립, 출금 상태 머신과
//! 감사 원장을 SQLite 위에서 트랜잭션으로 관리합니다.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod server;

pub use error::{ErrorKind, LedgerError, Result};
