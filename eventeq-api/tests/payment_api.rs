mod common;

use axum::http::{Method, StatusCode};
use common::test_app;
use eventeq_booking::{BookingRepository, BookingStatus};
use eventeq_core::payment::BillStatus;
use serde_json::json;

#[tokio::test]
async fn duplicate_success_callback_confirms_once() {
    let app = test_app();
    let (id, bill) = app.create_booking().await;

    let (first_status, first) = app.pay(&bill).await;
    let (second_status, second) = app.pay(&bill).await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first, json!({ "status": "success" }));
    assert_eq!(second, json!({ "status": "success" }));

    let booking = app.repo.get(id).await.unwrap().unwrap();
    assert_eq!(booking.status, BookingStatus::Upcoming);
    let record = app.repo.get_payment(&bill).await.unwrap().unwrap();
    assert_eq!(record.status, BillStatus::Success);

    let (_, metrics) = app.get("/metrics").await;
    let text = metrics.as_str().unwrap();
    assert!(text.contains(r#"outcome="confirmed""#));
    assert!(text.contains(r#"outcome="duplicate""#));
    assert!(text.contains(r#"eventeq_booking_status_changes_total{to="upcoming"} 1"#));
}

#[tokio::test]
async fn failed_payment_keeps_booking_unpaid() {
    let app = test_app();
    let (id, bill) = app.create_booking().await;

    let form = format!("refno=TP9&status=3&reason=Card+declined&billcode={}&order_id=ORD1", bill);
    let (status, _) = app.send_form("/payment/callback", &form).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.repo.get(id).await.unwrap().unwrap().status, BookingStatus::Unpaid);
    let record = app.repo.get_payment(&bill).await.unwrap().unwrap();
    assert_eq!(record.status, BillStatus::Failed);
}

#[tokio::test]
async fn failure_after_success_keeps_booking_paid() {
    let app = test_app();
    let (id, bill) = app.create_booking().await;

    let (status, _) = app.pay(&bill).await;
    assert_eq!(status, StatusCode::OK);
    let form = format!("refno=TP9&status=3&reason=Timeout&billcode={}&order_id=ORD1", bill);
    let (status, body) = app.send_form("/payment/callback", &form).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    assert_eq!(app.repo.get(id).await.unwrap().unwrap().status, BookingStatus::Upcoming);
    let record = app.repo.get_payment(&bill).await.unwrap().unwrap();
    assert_eq!(record.status, BillStatus::Success);
}

#[tokio::test]
async fn json_callback_confirms_payment() {
    let app = test_app();
    let (id, bill) = app.create_booking().await;

    let callback = json!({
        "refno": "TP77",
        "status": 1,
        "reason": "Approved",
        "billcode": bill,
        "order_id": "ORD1",
        "amount": 19800,
        "transaction_time": "2025-05-20 10:00:00",
    });
    let (status, body) = app.send_json(Method::POST, "/payment/callback", &callback).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "success" }));
    assert_eq!(app.repo.get(id).await.unwrap().unwrap().status, BookingStatus::Upcoming);
    let record = app.repo.get_payment(&bill).await.unwrap().unwrap();
    assert_eq!(record.status, BillStatus::Success);

    let (status, _) = app
        .send_json(Method::POST, "/payment/callback", &json!({ "status": "1" }))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_or_missing_bill_is_acknowledged_without_changes() {
    let app = test_app();
    let (id, _) = app.create_booking().await;

    let (status, body) = app.pay("no-such-bill").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let (status, _) = app.send_form("/payment/callback", "status=1&refno=TP1").await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(app.repo.get(id).await.unwrap().unwrap().status, BookingStatus::Unpaid);
}

#[tokio::test]
async fn late_success_does_not_revive_cancelled_booking() {
    let app = test_app();
    let (id, bill) = app.create_booking().await;

    let (status, _) = app.put(&format!("/booking/cancel/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.pay(&bill).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(app.repo.get(id).await.unwrap().unwrap().status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn reconcile_applies_gateway_status() {
    let app = test_app();
    let (id, bill) = app.create_booking().await;

    let (status, pending) = app.put(&format!("/payment/reconcile/{}", bill)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending["outcome"], "pending");

    app.gateway.set_status(&bill, BillStatus::Success);
    let (status, confirmed) = app.put(&format!("/payment/reconcile/{}", bill)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["outcome"], "confirmed");
    assert_eq!(app.repo.get(id).await.unwrap().unwrap().status, BookingStatus::Upcoming);

    let (status, _) = app.put("/payment/reconcile/unknown").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn redirect_is_informational() {
    let app = test_app();
    let (_, bill) = app.create_booking().await;

    let (status, body) = app
        .get(&format!("/payment/redirect?status_id=1&billcode={}&order_id=ORD1&msg=ok", bill))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    let (status, _) = app.get("/payment/redirect").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn health_reports_disabled_dependencies() {
    let app = test_app();

    let (status, health) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["database"], "disabled");
    assert_eq!(health["redis"], "disabled");
    assert_eq!(health["streams"], 0);
}
