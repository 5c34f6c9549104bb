use uuid::Uuid;

/// Audit record of one call to the payment gateway.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PaymentAttemptedEvent {
    pub reservation_id: Uuid,
    pub amount_minor: i64,
    pub currency: String,
    /// `SUCCEEDED`, `DECLINED`, `UNKNOWN` or `GATEWAY_ERROR`
    pub outcome: String,
    pub gateway_reference: Option<String>,
    pub reason: Option<String>,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ReservationCreatedEvent {
    pub reservation_id: Uuid,
    pub reservation_type: Option<String>,
    pub total_minor: i64,
    pub currency: String,
    pub timestamp: i64,
}
