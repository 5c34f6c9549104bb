use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tourline_core::audit::AuditSink;
use tourline_core::BoxError;
use tourline_shared::models::events::{PaymentAttemptedEvent, ReservationCreatedEvent};
use tracing::{debug, error};

pub const RESERVATION_TOPIC: &str = "reservation.created";

#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
    payment_topic: String,
}

impl EventProducer {
    pub fn new(brokers: &str, payment_topic: &str) -> Result<Self, rdkafka::error::KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self {
            producer,
            payment_topic: payment_topic.to_string(),
        })
    }

    pub async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), rdkafka::error::KafkaError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
            Ok(delivery) => {
                debug!(
                    "Sent message to {}/{}: partition {} offset {}",
                    topic, key, delivery.partition, delivery.offset
                );
                Ok(())
            }
            Err((e, _msg)) => {
                error!("Failed to send message to {}: {}", topic, e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl AuditSink for EventProducer {
    async fn reservation_created(&self, event: &ReservationCreatedEvent) -> Result<(), BoxError> {
        let payload = serde_json::to_string(event)?;
        self.publish(RESERVATION_TOPIC, &event.reservation_id.to_string(), &payload)
            .await?;
        Ok(())
    }

    // Keyed by reservation so all attempts for one booking stay ordered
    async fn payment_attempted(&self, event: &PaymentAttemptedEvent) -> Result<(), BoxError> {
        let payload = serde_json::to_string(event)?;
        self.publish(&self.payment_topic, &event.reservation_id.to_string(), &payload)
            .await?;
        Ok(())
    }
}
