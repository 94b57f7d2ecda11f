use axum::{
    extract::{ConnectInfo, State},
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod bookings;
pub mod error;
pub mod items;
pub mod metrics;
pub mod payments;
pub mod state;
pub mod stream;
pub mod worker;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::USER_AGENT]);

    Router::new()
        .merge(bookings::routes())
        .merge(items::routes())
        .merge(payments::routes())
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
        .with_state(state)
}

async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<impl IntoResponse, impl IntoResponse> {
    let (Some(redis), Some(ConnectInfo(addr))) = (
        state.redis.as_ref(),
        req.extensions().get::<ConnectInfo<SocketAddr>>().cloned(),
    ) else {
        return Ok(next.run(req).await);
    };

    let key = eventeq_store::redis_repo::rate_limit_key("api", &addr.ip().to_string());
    match redis
        .check_rate_limit(&key, state.rate_limit.requests, state.rate_limit.window_seconds)
        .await
    {
        Ok(true) => Ok(next.run(req).await),
        Ok(false) => Err((StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded")),
        Err(e) => {
            // Fail open
            tracing::warn!("Rate limiter unavailable: {}", e);
            Ok(next.run(req).await)
        }
    }
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.db {
        Some(db) => match db.ping().await {
            Ok(()) => "ok",
            Err(e) => {
                tracing::error!("Health check: database unreachable: {}", e);
                "down"
            }
        },
        None => "disabled",
    };
    let redis = match &state.redis {
        Some(redis) => match redis.ping().await {
            Ok(()) => "ok",
            Err(e) => {
                tracing::warn!("Health check: redis unreachable: {}", e);
                "down"
            }
        },
        None => "disabled",
    };

    let (status, overall) = if database == "down" {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    } else {
        (StatusCode::OK, "ok")
    };
    let body = json!({
        "status": overall,
        "database": database,
        "redis": redis,
        "streams": state.registry.connection_count().await,
    });
    (status, Json(body))
}

async fn metrics_text(State(state): State<AppState>) -> Result<impl IntoResponse, error::AppError> {
    let text = state
        .metrics
        .render()
        .map_err(|e| error::AppError::Internal(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], text))
}
