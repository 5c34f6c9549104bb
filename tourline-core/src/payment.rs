use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tourline_shared::{Masked, Money};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDetails {
    pub holder_name: String,
    pub number: Masked<String>,
    pub expire_month: u8,
    pub expire_year: u16,
    pub cvc: Masked<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyerInfo {
    pub full_name: String,
    pub email: Masked<String>,
    pub phone: Option<String>,
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingAddress {
    pub contact_name: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub zip_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasketItem {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: Money,
}

/// What the customer submits to pay for a reservation. The amount is never
/// part of it: the orchestrator charges the reservation's stored total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub card: CardDetails,
    pub buyer: Option<BuyerInfo>,
    pub billing_address: Option<BillingAddress>,
}

/// One charge submitted to the gateway.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeRequest {
    pub reservation_id: Uuid,
    pub amount: Money,
    pub card: CardDetails,
    pub buyer: BuyerInfo,
    pub billing_address: BillingAddress,
    pub basket_items: Vec<BasketItem>,
}

/// The gateway's own success indicator, independent of transport success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayStatus {
    Success,
    Failure,
    Unknown,
}

impl GatewayStatus {
    /// Only an explicit `success` maps to `Success`; anything unrecognised
    /// is `Unknown`.
    pub fn from_indicator(indicator: &str) -> Self {
        match indicator.trim().to_ascii_lowercase().as_str() {
            "success" => GatewayStatus::Success,
            "failure" | "failed" | "declined" => GatewayStatus::Failure,
            _ => GatewayStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub status: GatewayStatus,
    pub reference: Option<String>,
    pub error_message: Option<String>,
    pub raw: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Payment gateway timed out")]
    Timeout,
    #[error("Payment gateway unreachable: {0}")]
    Transport(String),
    #[error("Payment gateway rejected the request: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Submit a single charge. Exactly one call per charge attempt.
    async fn submit(&self, request: &ChargeRequest) -> Result<GatewayResponse, GatewayError>;
}
