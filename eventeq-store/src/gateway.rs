//! HTTP client for the bill-payment gateway (ToyyibPay-style form API).
//!
//! Bills are opened with a form POST to `createBill`, which answers with
//! `[{"BillCode": "..."}]`. Payment outcomes are looked up with
//! `getBillTransactions`, whose entries carry `billpaymentStatus`.

use async_trait::async_trait;
use eventeq_core::payment::{BillRequest, BillStatus, PaymentGateway};
use eventeq_core::BoxError;
use serde::Deserialize;
use std::time::Duration;

use crate::app_config::PaymentConfig;

const CREATE_BILL_PATH: &str = "/index.php/api/createBill";
const BILL_TRANSACTIONS_PATH: &str = "/index.php/api/getBillTransactions";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Gateway returned HTTP {0}")]
    HttpStatus(u16),

    #[error("Unexpected gateway response: {0}")]
    Decode(String),
}

#[derive(Debug, Deserialize)]
struct CreatedBill {
    #[serde(rename = "BillCode")]
    bill_code: String,
}

#[derive(Debug, Deserialize)]
struct BillTransaction {
    #[serde(rename = "billpaymentStatus")]
    status: String,
}

pub struct ToyyibPayGateway {
    client: reqwest::Client,
    config: PaymentConfig,
}

impl ToyyibPayGateway {
    pub fn new(config: PaymentConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn bill_form(&self, request: &BillRequest) -> Vec<(&'static str, String)> {
        let reference = request.booking_id.to_string();
        vec![
            ("userSecretKey", self.config.secret_key.clone()),
            ("categoryCode", self.config.category_code.clone()),
            ("billName", self.config.bill_name.clone()),
            ("billDescription", request.description.clone()),
            ("billPriceSetting", "1".into()),
            ("billPayorInfo", "1".into()),
            ("billAmount", request.amount_minor.to_string()),
            ("billReturnUrl", self.config.return_url.clone()),
            ("billCallbackUrl", self.config.callback_url.clone()),
            ("billExternalReferenceNo", reference),
            ("billTo", request.payer_name.clone()),
            ("billEmail", request.payer_email.clone()),
            ("billPhone", request.payer_phone.clone()),
            ("billSplitPayment", "0".into()),
            ("billPaymentChannel", "0".into()),
            ("billChargeToCustomer", "1".into()),
        ]
    }

    async fn post_form(&self, path: &str, form: &[(&'static str, String)]) -> Result<String, GatewayError> {
        let response = self.client.post(self.url(path)).form(form).send().await?;
        if !response.status().is_success() {
            return Err(GatewayError::HttpStatus(response.status().as_u16()));
        }
        Ok(response.text().await?)
    }
}

fn parse_created_bill(body: &str) -> Result<String, GatewayError> {
    let bills: Vec<CreatedBill> =
        serde_json::from_str(body.trim()).map_err(|e| GatewayError::Decode(format!("{}: {}", e, body)))?;
    bills
        .into_iter()
        .map(|b| b.bill_code)
        .find(|code| !code.is_empty())
        .ok_or_else(|| GatewayError::Decode(format!("no bill code in {}", body)))
}

/// Any successful transaction wins; otherwise the latest entry decides.
fn parse_transactions(body: &str) -> Result<Option<BillStatus>, GatewayError> {
    let body = body.trim();
    if !body.starts_with('[') {
        // The gateway answers with plain text when a bill has no transactions.
        return Ok(None);
    }
    let transactions: Vec<BillTransaction> =
        serde_json::from_str(body).map_err(|e| GatewayError::Decode(e.to_string()))?;
    let statuses: Vec<BillStatus> = transactions
        .iter()
        .filter_map(|t| BillStatus::from_code(&t.status))
        .collect();
    if statuses.contains(&BillStatus::Success) {
        return Ok(Some(BillStatus::Success));
    }
    Ok(statuses.last().copied())
}

#[async_trait]
impl PaymentGateway for ToyyibPayGateway {
    async fn create_bill(&self, request: &BillRequest) -> Result<String, BoxError> {
        let body = self.post_form(CREATE_BILL_PATH, &self.bill_form(request)).await?;
        let bill_code = parse_created_bill(&body)?;
        tracing::debug!(booking_id = %request.booking_id, bill_code = %bill_code, "Gateway bill created");
        Ok(bill_code)
    }

    async fn bill_status(&self, bill_code: &str) -> Result<Option<BillStatus>, BoxError> {
        let form = [("billCode", bill_code.to_string())];
        let body = self.post_form(BILL_TRANSACTIONS_PATH, &form).await?;
        Ok(parse_transactions(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> PaymentConfig {
        PaymentConfig {
            base_url,
            secret_key: "secret".into(),
            category_code: "cat01".into(),
            bill_name: "EventEQ Payment".into(),
            return_url: "https://app.example.com/payment/redirect".into(),
            callback_url: "https://api.example.com/payment/callback".into(),
            timeout_seconds: 5,
        }
    }

    fn bill() -> BillRequest {
        BillRequest {
            booking_id: Uuid::new_v4(),
            amount_minor: 13_200,
            description: "Booking".into(),
            payer_name: "Jane Doe".into(),
            payer_email: "jane@example.com".into(),
            payer_phone: "0123".into(),
        }
    }

    #[test]
    fn parses_bill_code_array() {
        assert_eq!(parse_created_bill(r#"[{"BillCode":"gcbhict9"}]"#).unwrap(), "gcbhict9");
        assert!(parse_created_bill("[]").is_err());
        assert!(parse_created_bill("[FALSE]").is_err());
    }

    #[test]
    fn transaction_status_resolution() {
        assert_eq!(parse_transactions("No data found!").unwrap(), None);
        assert_eq!(
            parse_transactions(r#"[{"billpaymentStatus":"3"},{"billpaymentStatus":"1"}]"#).unwrap(),
            Some(BillStatus::Success)
        );
        assert_eq!(
            parse_transactions(r#"[{"billpaymentStatus":"3"},{"billpaymentStatus":"2"}]"#).unwrap(),
            Some(BillStatus::Pending)
        );
    }

    #[tokio::test]
    async fn create_bill_posts_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CREATE_BILL_PATH))
            .and(body_string_contains("billAmount=13200"))
            .and(body_string_contains("categoryCode=cat01"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"BillCode":"abc123"}]"#))
            .mount(&server)
            .await;

        let gateway = ToyyibPayGateway::new(config(server.uri())).unwrap();
        assert_eq!(gateway.create_bill(&bill()).await.unwrap(), "abc123");
    }

    #[tokio::test]
    async fn http_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CREATE_BILL_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let gateway = ToyyibPayGateway::new(config(server.uri())).unwrap();
        let err = gateway.create_bill(&bill()).await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn bill_status_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(BILL_TRANSACTIONS_PATH))
            .and(body_string_contains("billCode=abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"billpaymentStatus":"1"}]"#))
            .mount(&server)
            .await;

        let gateway = ToyyibPayGateway::new(config(format!("{}/", server.uri()))).unwrap();
        assert_eq!(gateway.bill_status("abc123").await.unwrap(), Some(BillStatus::Success));
    }
}
