use crate::catalog::Catalog;
use crate::config::Config;
use crate::reconcile::{MatchPolicy, PerformerQueryResult, Reconciler, WorkQueryResult};
use crate::tmdb::{TmdbApi, TmdbClient};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub reconciler: Arc<Reconciler>,
}

pub async fn run_server(config: Config) -> Result<()> {
    // DataNotFound here is fatal: no partial operation without the catalog.
    let catalog = Arc::new(Catalog::load(&config.works_csv, &config.performers_csv)?);

    let tmdb: Option<Arc<dyn TmdbApi>> = match config.tmdb_api_key.clone() {
        Some(key) => match TmdbClient::new(key, config.tmdb_language.clone()) {
            Ok(client) => Some(Arc::new(client)),
            Err(err) => {
                warn!("{} - serving local data only", err);
                None
            }
        },
        None => {
            warn!("TMDB_API_KEY not set - serving local data only");
            None
        }
    };
    if !config.allowed_companies.is_empty() {
        info!(
            "Filtering remote matches to companies {:?} (scan budget {})",
            config.allowed_companies, config.scan_budget
        );
    }

    let reconciler = Arc::new(Reconciler::new(
        tmdb,
        MatchPolicy {
            allowed_companies: config.allowed_companies.clone(),
            scan_budget: config.scan_budget,
        },
    ));

    let state = AppState {
        catalog,
        reconciler,
    };
    let app = build_router(state);

    info!("Listening on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search/works", get(search_works))
        .route("/search/performers", get(search_performers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
}

async fn search_works(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<WorkQueryResult> {
    info!("Work search for '{}'", params.q.trim());
    Json(state.reconciler.work_query(&state.catalog, &params.q).await)
}

async fn search_performers(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<PerformerQueryResult> {
    info!("Performer search for '{}'", params.q.trim());
    Json(
        state
            .reconciler
            .performer_query(&state.catalog, &params.q)
            .await,
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
