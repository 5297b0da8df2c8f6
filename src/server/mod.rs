use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use crate::config::ServerConfig;
use crate::storage::RecordStore;
use crate::ui::Icons;

pub mod pages;
pub mod routes;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Server state
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
}

pub type SharedState = Arc<AppState>;

/// Build the application router over any record store
pub fn router(store: Arc<dyn RecordStore>, static_dir: &Path) -> Router {
    let state: SharedState = Arc::new(AppState { store });

    let api = Router::new()
        .route(
            "/students",
            get(routes::list_students)
                .post(routes::create_student)
                .fallback(routes::method_not_allowed),
        )
        .route(
            "/students/{id}",
            get(routes::get_student)
                .put(routes::update_student)
                .delete(routes::delete_student)
                .fallback(routes::method_not_allowed),
        )
        .fallback(routes::no_route);

    Router::new()
        .route("/", get(pages::index))
        .route("/students", get(pages::students))
        .nest("/api", api)
        .route("/health", get(routes::health))
        .nest_service("/static", ServeDir::new(static_dir))
        .fallback(pages::not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: &ServerConfig, store: Arc<dyn RecordStore>) -> anyhow::Result<()> {
    let app = router(store, &config.static_dir);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    let addr = listener.local_addr()?;
    tracing::info!("Starting server on {}", addr);
    println!("{} Server running at http://{}", Icons::GLOBE, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
