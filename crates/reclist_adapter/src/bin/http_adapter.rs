#![forbid(unsafe_code)]

use std::{env, net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use reclist_adapter::line_item::LineItem;
use reclist_adapter::{
    AdapterError, AdapterErrorResponse, AdapterHealthResponse, AdapterRuntime,
    LineItemFormResponse,
};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

type FormResult = Result<
    (StatusCode, Json<LineItemFormResponse>),
    (StatusCode, Json<AdapterErrorResponse>),
>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let bind = env::var("RECLIST_HTTP_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    let addr: SocketAddr = bind.parse()?;
    let runtime = Arc::new(AdapterRuntime::default_from_env()?);

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/line-items/form", post(submit_line_item_form))
        .route("/v1/line-items/form/seed", post(seed_line_item_form))
        .with_state(runtime);

    info!(%addr, "reclist_adapter_http listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("reclist_adapter_http shutting down");
    }
}

async fn healthz(
    State(runtime): State<Arc<AdapterRuntime>>,
) -> (StatusCode, Json<AdapterHealthResponse>) {
    (StatusCode::OK, Json(runtime.health_report()))
}

async fn submit_line_item_form(
    State(runtime): State<Arc<AdapterRuntime>>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> FormResult {
    runtime
        .run_line_item_submission(pairs)
        .map(|response| (StatusCode::OK, Json(response)))
        .map_err(rejected)
}

async fn seed_line_item_form(
    State(runtime): State<Arc<AdapterRuntime>>,
    Json(records): Json<Vec<LineItem>>,
) -> FormResult {
    runtime
        .seed_line_item_form(&records)
        .map(|response| (StatusCode::OK, Json(response)))
        .map_err(rejected)
}

fn rejected(err: AdapterError) -> (StatusCode, Json<AdapterErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(AdapterErrorResponse::rejected(err.to_string())),
    )
}
