use async_trait::async_trait;
use eventeq_core::notify::NotificationSink;
use eventeq_core::BoxError;
use eventeq_shared::models::BookingEvent;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{error, info};

/// Publishes booking events to Kafka, keyed by booking id so one booking's
/// events stay ordered within a partition.
#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
    topic: String,
}

impl EventProducer {
    pub fn new(brokers: &str, topic: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self {
            producer,
            topic: topic.to_string(),
        })
    }

    pub async fn publish(&self, key: &str, payload: &str) -> Result<(), rdkafka::error::KafkaError> {
        let record = FutureRecord::to(&self.topic).key(key).payload(payload);

        match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
            Ok(delivery) => {
                info!(
                    "Sent booking event to {}/{}: partition {} offset {}",
                    self.topic, key, delivery.partition, delivery.offset
                );
                Ok(())
            }
            Err((e, _msg)) => {
                error!("Failed to send booking event to {}: {}", self.topic, e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl NotificationSink for EventProducer {
    fn name(&self) -> &'static str {
        "kafka"
    }

    async fn notify(&self, event: &BookingEvent) -> Result<(), BoxError> {
        let payload = serde_json::to_string(event)?;
        self.publish(&event.booking_id().to_string(), &payload).await?;
        Ok(())
    }
}
