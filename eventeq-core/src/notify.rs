use async_trait::async_trait;
use eventeq_shared::models::BookingEvent;
use std::sync::{Arc, Mutex};

use crate::BoxError;

/// A consumer of booking events: push streams, mail, message bus, metrics.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &'static str;

    async fn notify(&self, event: &BookingEvent) -> Result<(), BoxError>;
}

/// Delivers each event to every registered sink. A failing sink is logged
/// and never affects the caller or the remaining sinks.
#[derive(Default, Clone)]
pub struct FanoutNotifier {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl NotificationSink for FanoutNotifier {
    fn name(&self) -> &'static str {
        "fanout"
    }

    async fn notify(&self, event: &BookingEvent) -> Result<(), BoxError> {
        for sink in &self.sinks {
            if let Err(e) = sink.notify(event).await {
                tracing::warn!(
                    sink = sink.name(),
                    booking_id = %event.booking_id(),
                    "Notification delivery failed: {}",
                    e
                );
            }
        }
        Ok(())
    }
}

/// Keeps every event in memory. Handy in tests.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<BookingEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BookingEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn notify(&self, event: &BookingEvent) -> Result<(), BoxError> {
        self.events
            .lock()
            .map_err(|_| "recording notifier poisoned")?
            .push(event.clone());
        Ok(())
    }
}
