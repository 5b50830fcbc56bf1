use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spendcast_core::domain::result::{PredictionFailure, TrainingFailure};
use spendcast_core::service::{self, Reply};
use spendcast_core::storage::{FileModelRegistry, ModelStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = spendcast_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let registry = FileModelRegistry::new(settings.model_dir.clone());
    registry.init()?;

    let state = AppState {
        store: Arc::new(registry),
    };

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port));
    tracing::info!(%addr, model_dir = %settings.model_dir.display(), "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[derive(Clone)]
struct AppState {
    store: Arc<dyn ModelStore>,
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/train", post(train))
        .route("/predict", post(predict))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> {
    Json(service::health())
}

async fn train(State(state): State<AppState>, body: Bytes) -> (StatusCode, Json<Value>) {
    let store = state.store.clone();
    let joined =
        tokio::task::spawn_blocking(move || service::train_payload(&body, store.as_ref())).await;

    match joined {
        Ok(reply) => respond(reply),
        Err(e) => {
            let err = anyhow::Error::new(e).context("training task failed");
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "training task failed");
            internal_error(&TrainingFailure::new(format!("{err:#}"), 0.0))
        }
    }
}

async fn predict(State(state): State<AppState>, body: Bytes) -> (StatusCode, Json<Value>) {
    let store = state.store.clone();
    let joined =
        tokio::task::spawn_blocking(move || service::predict_payload(&body, None, store.as_ref()))
            .await;

    match joined {
        Ok(reply) => respond(reply),
        Err(e) => {
            let err = anyhow::Error::new(e).context("prediction task failed");
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "prediction task failed");
            internal_error(&PredictionFailure::new(format!("{err:#}"), 0.0))
        }
    }
}

fn respond(reply: Reply) -> (StatusCode, Json<Value>) {
    match reply.error {
        None => (StatusCode::OK, Json(reply.body)),
        Some(e) => {
            sentry_anyhow::capture_anyhow(&anyhow::Error::new(e));
            (StatusCode::INTERNAL_SERVER_ERROR, Json(reply.body))
        }
    }
}

fn internal_error<T: serde::Serialize>(shape: &T) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::to_value(shape).unwrap_or(Value::Null)),
    )
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &spendcast_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
