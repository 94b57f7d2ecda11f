use axum::{
    extract::{FromRequest, Path, Query, Request, State},
    http::header,
    routing::{get, post, put},
    Form, Json, Router,
};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

/// Query string the gateway appends when it sends the payer back.
#[derive(Debug, Default, Deserialize)]
pub struct PaymentRedirect {
    pub status_id: Option<String>,
    pub billcode: Option<String>,
    pub order_id: Option<String>,
    pub msg: Option<String>,
}

/// Body of the gateway's server-to-server notification. Arrives either
/// form-encoded or as JSON; numeric JSON values are read as their text.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PaymentCallback {
    #[serde(deserialize_with = "text")]
    pub refno: String,
    #[serde(deserialize_with = "text")]
    pub status: String,
    #[serde(deserialize_with = "text")]
    pub reason: String,
    #[serde(deserialize_with = "text")]
    pub billcode: String,
    #[serde(deserialize_with = "text")]
    pub order_id: String,
    #[serde(deserialize_with = "text")]
    pub amount: String,
    #[serde(deserialize_with = "text")]
    pub transaction_time: String,
}

fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

impl<S> FromRequest<S> for PaymentCallback
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim_start().to_ascii_lowercase().starts_with("application/json"));

        if is_json {
            let Json(callback) = Json::<PaymentCallback>::from_request(req, state)
                .await
                .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
            Ok(callback)
        } else {
            let Form(callback) = Form::<PaymentCallback>::from_request(req, state)
                .await
                .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
            Ok(callback)
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payment/redirect", get(payment_redirect))
        .route("/payment/callback", post(payment_callback))
        .route("/payment/reconcile/{bill_code}", put(reconcile_payment))
}

fn acknowledged() -> Json<Value> {
    Json(json!({ "status": "success" }))
}

/// GET /payment/redirect
/// Informational only. The callback is what moves the booking.
pub async fn payment_redirect(Query(params): Query<PaymentRedirect>) -> Json<Value> {
    tracing::info!(
        bill_code = params.billcode.as_deref().unwrap_or(""),
        order_id = params.order_id.as_deref().unwrap_or(""),
        status_id = params.status_id.as_deref().unwrap_or(""),
        "Payer redirected back: {}",
        params.msg.as_deref().unwrap_or("")
    );
    acknowledged()
}

/// POST /payment/callback
/// Always acknowledged unless the store itself failed, so the gateway only
/// redelivers when the outcome could not be recorded.
pub async fn payment_callback(
    State(state): State<AppState>,
    callback: PaymentCallback,
) -> Result<Json<Value>, AppError> {
    tracing::info!(
        bill_code = %callback.billcode,
        refno = %callback.refno,
        status = %callback.status,
        amount = %callback.amount,
        transaction_time = %callback.transaction_time,
        "Payment callback received"
    );

    if callback.billcode.trim().is_empty() {
        tracing::warn!(order_id = %callback.order_id, reason = %callback.reason, "Payment callback without bill code ignored");
        state.metrics.record_payment("callback", "unknown_bill");
        return Ok(acknowledged());
    }

    let outcome = state
        .service
        .handle_payment_callback(callback.billcode.trim(), &callback.status)
        .await?;
    state.metrics.record_payment("callback", outcome.as_str());
    Ok(acknowledged())
}

/// PUT /payment/reconcile/{billCode}
pub async fn reconcile_payment(
    State(state): State<AppState>,
    Path(bill_code): Path<String>,
) -> Result<Json<Value>, AppError> {
    let outcome = state.service.reconcile_payment(bill_code.trim()).await?;
    state.metrics.record_payment("reconcile", outcome.as_str());
    Ok(Json(json!({
        "status": "success",
        "bill_code": bill_code.trim(),
        "outcome": outcome.as_str(),
    })))
}
