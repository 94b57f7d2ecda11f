#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, NaiveDate, Utc};
use eventeq_api::metrics::Metrics;
use eventeq_api::stream::ConnectionRegistry;
use eventeq_api::{app, AppState};
use eventeq_booking::dates;
use eventeq_booking::{BookingService, InMemoryBookingRepository, ManualClock, ServiceConfig};
use eventeq_core::catalog::{CatalogItem, ItemStatus, MockItemCatalog};
use eventeq_core::identity::{MockUserDirectory, UserProfile};
use eventeq_core::notify::FanoutNotifier;
use eventeq_core::payment::MockPaymentGateway;
use eventeq_shared::Masked;
use eventeq_store::app_config::RateLimitConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<InMemoryBookingRepository>,
    pub gateway: Arc<MockPaymentGateway>,
    pub catalog: Arc<MockItemCatalog>,
    pub clock: Arc<ManualClock>,
    pub registry: Arc<ConnectionRegistry>,
    pub requester: Uuid,
    pub owner: Uuid,
    pub item: Uuid,
}

pub fn date(d: u32, m: u32, y: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Region midnight of the given day, as a UTC instant.
pub fn local_midnight(d: u32, m: u32, y: i32) -> DateTime<Utc> {
    dates::start_instant(date(d, m, y))
}

pub fn test_app() -> TestApp {
    let repo = Arc::new(InMemoryBookingRepository::new());
    let gateway = Arc::new(MockPaymentGateway::new());
    let users = Arc::new(MockUserDirectory::new());
    let catalog = Arc::new(MockItemCatalog::new());
    let clock = Arc::new(ManualClock::new(local_midnight(20, 5, 2025)));
    let registry = Arc::new(ConnectionRegistry::new());
    let metrics = Arc::new(Metrics::new().unwrap());

    let requester = Uuid::new_v4();
    let owner = Uuid::new_v4();
    let item = Uuid::new_v4();
    users.insert(UserProfile {
        id: requester,
        first_name: "Aisyah".into(),
        last_name: "Rahman".into(),
        email: Masked::new("aisyah@example.com".into()),
        phone: Some(Masked::new("0123456789".into())),
    });
    catalog.insert(CatalogItem {
        id: item,
        owner_id: owner,
        name: "Canopy tent 3x3".into(),
        price: 60.0,
        status: ItemStatus::Available,
        images: vec!["canopy-front.jpg".into(), "canopy-side.jpg".into()],
    });

    let notifier = FanoutNotifier::new()
        .with(registry.clone())
        .with(metrics.clone());
    let service = Arc::new(BookingService::new(
        repo.clone(),
        gateway.clone(),
        users,
        catalog.clone(),
        Arc::new(notifier),
        clock.clone(),
        ServiceConfig {
            read_retry_backoff: vec![Duration::from_millis(1)],
            ..ServiceConfig::default()
        },
    ));

    let state = AppState {
        service,
        db: None,
        redis: None,
        registry: registry.clone(),
        metrics,
        rate_limit: RateLimitConfig::default(),
    };

    TestApp {
        router: app(state),
        repo,
        gateway,
        catalog,
        clock,
        registry,
        requester,
        owner,
        item,
    }
}

impl TestApp {
    pub fn booking_body(&self, start: &str, end: &str) -> Value {
        json!({
            "user_id": self.requester,
            "owner_id": self.owner,
            "start_date": start,
            "end_date": end,
            "sub_total": 180.0,
            "service_fee": 18.0,
            "grand_total": 198.0,
            "items": [{ "id": self.item, "quantity": 1 }],
        })
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn put(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().method(Method::PUT).uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn send_json(&self, method: Method, uri: &str, body: &Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn send_form(&self, uri: &str, form: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Create a 01/06/2025 - 03/06/2025 booking and return (id, bill code).
    pub async fn create_booking(&self) -> (Uuid, String) {
        let body = self.booking_body("01/06/2025", "03/06/2025");
        let (status, created) = self.send_json(Method::POST, "/booking/create", &body).await;
        assert_eq!(status, StatusCode::CREATED, "{}", created);
        let id = Uuid::parse_str(created["booking_id"].as_str().unwrap()).unwrap();
        (id, created["bill_code"].as_str().unwrap().to_string())
    }

    pub async fn pay(&self, bill_code: &str) -> (StatusCode, Value) {
        let form = format!(
            "refno=TP123&status=1&reason=Approved&billcode={}&order_id=ORD1&amount=19800&transaction_time=2025-05-20+10%3A00%3A00",
            bill_code
        );
        self.send_form("/payment/callback", &form).await
    }
}

pub fn ids(listing: &Value) -> Vec<String> {
    listing
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_str().unwrap().to_string())
        .collect()
}
