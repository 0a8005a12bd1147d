use std::sync::Arc;

use anyhow::Context;
use log::info;

use yield_ledger::auth::JwtAuthenticator;
use yield_ledger::config::Config;
use yield_ledger::db::init_database;
use yield_ledger::ledger::{Ledger, SystemClock};
use yield_ledger::server::{start_server, ServerState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("🚀 yield-ledger 서버 시작 중...");

    let config = Config::from_env().context("설정 로드 실패")?;
    info!(
        "설정: 포트 {}, DB {}, 최대 연결 {}",
        config.rest_port, config.store.database_url, config.store.max_connections
    );

    let store = init_database(&config.store)
        .await
        .context("데이터베이스 초기화 실패")?;

    let ledger = Ledger::new(store, &config.policy, Arc::new(SystemClock));
    let auth = Arc::new(JwtAuthenticator::new(config.jwt_secret.clone()));
    let state = ServerState::new(ledger, auth, config.admin_secret.clone());

    start_server(state, config.rest_port)
        .await
        .context("REST 서버 실행 실패")?;

    Ok(())
}
