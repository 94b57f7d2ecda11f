use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::{BoxError, CoreError};

/// Outcome codes reported by the gateway: "1" success, "2" pending, "3" failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Success,
    Pending,
    Failed,
}

impl BillStatus {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1" => Some(BillStatus::Success),
            "2" => Some(BillStatus::Pending),
            "3" => Some(BillStatus::Failed),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            BillStatus::Success => "1",
            BillStatus::Pending => "2",
            BillStatus::Failed => "3",
        }
    }
}

/// Everything the gateway needs to open a bill for one booking.
#[derive(Debug, Clone, Serialize)]
pub struct BillRequest {
    pub booking_id: Uuid,
    /// Amount in minor currency units (cents).
    pub amount_minor: i64,
    pub description: String,
    pub payer_name: String,
    pub payer_email: String,
    pub payer_phone: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a bill and return the gateway's bill code.
    async fn create_bill(&self, request: &BillRequest) -> Result<String, BoxError>;

    /// Query the latest payment outcome for a bill. `None` when the gateway
    /// has no transaction recorded yet.
    async fn bill_status(&self, bill_code: &str) -> Result<Option<BillStatus>, BoxError>;
}

/// In-process gateway used by tests and local runs without credentials.
#[derive(Default)]
pub struct MockPaymentGateway {
    inner: Mutex<MockGatewayState>,
}

#[derive(Default)]
struct MockGatewayState {
    issued: Vec<BillRequest>,
    statuses: HashMap<String, BillStatus>,
    reject_bills: bool,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `create_bill` calls fail.
    pub fn reject_bills(&self, reject: bool) {
        if let Ok(mut state) = self.inner.lock() {
            state.reject_bills = reject;
        }
    }

    pub fn set_status(&self, bill_code: &str, status: BillStatus) {
        if let Ok(mut state) = self.inner.lock() {
            state.statuses.insert(bill_code.to_string(), status);
        }
    }

    pub fn issued(&self) -> Vec<BillRequest> {
        self.inner.lock().map(|s| s.issued.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_bill(&self, request: &BillRequest) -> Result<String, BoxError> {
        let mut state = self
            .inner
            .lock()
            .map_err(|_| CoreError::GatewayResponse("mock gateway poisoned".into()))?;
        if state.reject_bills {
            return Err(Box::new(CoreError::GatewayRejected("bill creation disabled".into())));
        }
        state.issued.push(request.clone());
        let code = format!("mock{:04}", state.issued.len());
        tracing::info!(booking_id = %request.booking_id, bill_code = %code, "Mock bill issued");
        Ok(code)
    }

    async fn bill_status(&self, bill_code: &str) -> Result<Option<BillStatus>, BoxError> {
        let state = self
            .inner
            .lock()
            .map_err(|_| CoreError::GatewayResponse("mock gateway poisoned".into()))?;
        Ok(state.statuses.get(bill_code).copied())
    }
}
