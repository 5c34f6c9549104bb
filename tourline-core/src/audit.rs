use async_trait::async_trait;
use tourline_shared::models::events::{PaymentAttemptedEvent, ReservationCreatedEvent};

/// Sink for audit events. Delivery is best-effort; callers log and move on
/// when it fails.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn reservation_created(&self, event: &ReservationCreatedEvent) -> Result<(), crate::BoxError>;

    async fn payment_attempted(&self, event: &PaymentAttemptedEvent) -> Result<(), crate::BoxError>;
}

/// Drops every event. Used when no broker is configured.
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn reservation_created(&self, _event: &ReservationCreatedEvent) -> Result<(), crate::BoxError> {
        Ok(())
    }

    async fn payment_attempted(&self, _event: &PaymentAttemptedEvent) -> Result<(), crate::BoxError> {
        Ok(())
    }
}
