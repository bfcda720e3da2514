use pitch_shared::models::DomainEvent;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::RedisClient;

/// Fans domain events out to in-process subscribers (SSE) and, when
/// configured, to Redis pub/sub on the event's topic.
#[derive(Clone)]
pub struct EventProducer {
    tx: broadcast::Sender<DomainEvent>,
    redis: Option<Arc<RedisClient>>,
}

impl EventProducer {
    pub fn new(capacity: usize, redis: Option<Arc<RedisClient>>) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, redis }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }

    pub async fn publish(&self, event: DomainEvent) {
        // No live subscribers is not an error
        let _ = self.tx.send(event.clone());

        let Some(redis) = &self.redis else {
            return;
        };
        let payload = match serde_json::to_string(&event) {
            Ok(p) => p,
            Err(e) => {
                error!("Failed to serialize {} event: {}", event.name(), e);
                return;
            }
        };
        match redis.publish(event.topic(), &payload).await {
            Ok(()) => info!("Published {} to {}", event.name(), event.topic()),
            Err(e) => error!("Failed to publish {} to {}: {}", event.name(), event.topic(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitch_shared::models::events::PaymentRecordedEvent;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let producer = EventProducer::new(8, None);
        let mut rx = producer.subscribe();

        let reservation_id = Uuid::new_v4();
        producer
            .publish(DomainEvent::PaymentRecorded(PaymentRecordedEvent {
                payment_id: Uuid::new_v4(),
                reservation_id,
                tenant_id: Uuid::new_v4(),
                status: "PAID".to_string(),
                amount: 100,
                timestamp: 0,
            }))
            .await;

        match rx.recv().await.unwrap() {
            DomainEvent::PaymentRecorded(e) => assert_eq!(e.reservation_id, reservation_id),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let producer = EventProducer::new(8, None);
        producer
            .publish(DomainEvent::PaymentRecorded(PaymentRecordedEvent {
                payment_id: Uuid::new_v4(),
                reservation_id: Uuid::new_v4(),
                tenant_id: Uuid::new_v4(),
                status: "PENDING".to_string(),
                amount: 0,
                timestamp: 0,
            }))
            .await;
    }
}
