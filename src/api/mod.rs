use anyhow::Result;
use axum::Router;
use tower_http::trace::TraceLayer;
use std::sync::Arc;
use std::net::SocketAddr;
use crate::admin::IpGuard;
use crate::config::Config;
use crate::db;
use crate::guard::GuardState;
use crate::store::{RuleStore, SqliteRuleStore};

pub mod router;
pub mod middleware;
pub mod handlers;

pub struct AppState {
    pub guard: Arc<GuardState>,
    /// Administration over the store the guard reads from.
    pub admin: IpGuard,
    pub static_dir: String,
}

impl AppState {
    pub fn new(guard: Arc<GuardState>, static_dir: impl Into<String>) -> Self {
        let admin = IpGuard::new(guard.rules.primary().clone());
        Self {
            guard,
            admin,
            static_dir: static_dir.into(),
        }
    }
}

/// Open the rule database if configured. A database that cannot be opened
/// leaves the configured lists in charge.
pub async fn open_store(cfg: &Config) -> Option<Arc<dyn RuleStore>> {
    if !cfg.guard.use_database {
        return None;
    }
    match db::init(cfg).await {
        Ok(pool) => Some(Arc::new(SqliteRuleStore::new(pool))),
        Err(e) => {
            tracing::warn!("Rule database unavailable, using configured lists: {}", e);
            None
        }
    }
}

pub async fn serve(cfg: Config) -> Result<()> {
    let bind_addr = format!("{}:{}", cfg.server.bind, cfg.server.port);

    let store = open_store(&cfg).await;
    let guard = Arc::new(GuardState::from_config(&cfg.guard, store));
    let state = Arc::new(AppState::new(guard, cfg.server.static_dir.clone()));
    let app = build_app(state);

    // The guard needs the TCP peer address
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{} (static files from {})", bind_addr, cfg.server.static_dir);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    ).await?;
    Ok(())
}

pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(router::routes(state))
        .layer(TraceLayer::new_for_http())
}
