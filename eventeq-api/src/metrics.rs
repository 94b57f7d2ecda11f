//! Prometheus counters for the booking lifecycle, served on `/metrics`.

use async_trait::async_trait;
use eventeq_core::notify::NotificationSink;
use eventeq_core::BoxError;
use eventeq_shared::models::BookingEvent;
use prometheus::{opts, IntCounterVec, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    /// Labels: `kind` (booking_created, booking_paid, booking_status_changed)
    booking_events: IntCounterVec,
    /// Labels: `to` (target status name)
    status_changes: IntCounterVec,
    /// Labels: `source` (callback, reconcile), `outcome`
    payment_outcomes: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let booking_events = IntCounterVec::new(
            opts!("eventeq_booking_events_total", "Booking events published"),
            &["kind"],
        )?;
        let status_changes = IntCounterVec::new(
            opts!("eventeq_booking_status_changes_total", "Booking status transitions by target"),
            &["to"],
        )?;
        let payment_outcomes = IntCounterVec::new(
            opts!("eventeq_payment_outcomes_total", "Payment notifications by outcome"),
            &["source", "outcome"],
        )?;

        registry.register(Box::new(booking_events.clone()))?;
        registry.register(Box::new(status_changes.clone()))?;
        registry.register(Box::new(payment_outcomes.clone()))?;

        Ok(Self {
            registry,
            booking_events,
            status_changes,
            payment_outcomes,
        })
    }

    pub fn record_event(&self, event: &BookingEvent) {
        self.booking_events.with_label_values(&[event.kind().as_str()]).inc();
        if let BookingEvent::StatusChanged { to, .. } = event {
            self.status_changes.with_label_values(&[to.as_str()]).inc();
        }
    }

    pub fn record_payment(&self, source: &str, outcome: &str) {
        self.payment_outcomes.with_label_values(&[source, outcome]).inc();
    }

    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        encoder
            .encode_to_string(&self.registry.gather())
            .map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[async_trait]
impl NotificationSink for Metrics {
    fn name(&self) -> &'static str {
        "metrics"
    }

    async fn notify(&self, event: &BookingEvent) -> Result<(), BoxError> {
        self.record_event(event);
        Ok(())
    }
}
