use std::sync::Arc;

use axum::Router;
use log::info;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::create_api_router;
use crate::auth::Authenticator;
use crate::ledger::Ledger;

/// 서버 상태
#[derive(Clone)]
pub struct ServerState {
    pub ledger: Ledger,
    pub auth: Arc<dyn Authenticator>,
    pub admin_secret: Arc<String>,
}

impl ServerState {
    pub fn new(ledger: Ledger, auth: Arc<dyn Authenticator>, admin_secret: impl Into<String>) -> Self {
        Self {
            ledger,
            auth,
            admin_secret: Arc::new(admin_secret.into()),
        }
    }
}

/// CORS와 요청 추적 계층이 적용된 라우터
pub fn build_router(state: ServerState) -> Router {
    create_api_router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 서버 시작 (Ctrl-C 수신 시 정상 종료 후 풀 닫기)
pub async fn start_server(state: ServerState, rest_port: u16) -> std::io::Result<()> {
    let store = state.ledger.store.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", rest_port)).await?;

    info!("✅ 서버가 성공적으로 시작되었습니다!");
    info!("🌐 REST API: http://localhost:{}", rest_port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await;
    info!("서버 종료");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("종료 신호 대기 실패: {}", e);
    }
    info!("종료 신호 수신, 진행 중인 요청 마무리 중...");
}
