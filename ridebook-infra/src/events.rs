use async_trait::async_trait;
use ridebook_core::NotificationDispatcher;
use ridebook_shared::models::events::{BookingConfirmedEvent, PaymentAnomalyEvent};
use ridebook_shared::Masked;
use tracing::{info, warn};

/// Writes notifications to the log. Used when no broker is configured.
#[derive(Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationDispatcher for LogNotifier {
    async fn booking_confirmed(
        &self,
        event: &BookingConfirmedEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        info!(
            booking_id = %event.booking_id,
            vehicle_id = %event.vehicle_id,
            pickup_at = %event.pickup_at,
            amount_paid = event.amount_paid,
            currency = %event.currency,
            email = ?Masked(&event.customer_email),
            "Booking confirmed notification"
        );
        Ok(())
    }

    async fn payment_anomaly(
        &self,
        event: &PaymentAnomalyEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        warn!(
            booking_id = %event.booking_id,
            kind = ?event.kind,
            session_ref = %event.session_ref,
            expected = ?event.expected,
            captured = ?event.captured,
            "Payment anomaly"
        );
        Ok(())
    }
}

#[cfg(feature = "kafka")]
pub use kafka::KafkaNotifier;

#[cfg(feature = "kafka")]
mod kafka {
    use super::*;
    use rdkafka::config::ClientConfig;
    use rdkafka::producer::{FutureProducer, FutureRecord};
    use rdkafka::util::Timeout;
    use std::time::Duration;
    use tracing::error;

    #[derive(Clone)]
    pub struct KafkaNotifier {
        producer: FutureProducer,
        topic: String,
    }

    impl KafkaNotifier {
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

        async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), rdkafka::error::KafkaError> {
            let record = FutureRecord::to(topic).key(key).payload(payload);

            match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
                Ok(delivery) => {
                    info!(
                        topic,
                        key,
                        partition = delivery.partition,
                        offset = delivery.offset,
                        "Published event"
                    );
                    Ok(())
                }
                Err((e, _msg)) => {
                    error!(topic, error = %e, "Failed to publish event");
                    Err(e)
                }
            }
        }
    }

    #[async_trait]
    impl NotificationDispatcher for KafkaNotifier {
        async fn booking_confirmed(
            &self,
            event: &BookingConfirmedEvent,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let payload = serde_json::to_string(event)?;
            self.publish(&self.topic, &event.booking_id.to_string(), &payload).await?;
            Ok(())
        }

        async fn payment_anomaly(
            &self,
            event: &PaymentAnomalyEvent,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let payload = serde_json::to_string(event)?;
            let topic = format!("{}.anomaly", self.topic);
            self.publish(&topic, &event.booking_id.to_string(), &payload).await?;
            Ok(())
        }
    }
}
