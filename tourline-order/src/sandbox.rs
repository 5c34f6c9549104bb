use async_trait::async_trait;
use tourline_core::payment::{ChargeRequest, GatewayError, GatewayResponse, GatewayStatus, PaymentGateway};
use tourline_shared::pii::card_last4;
use uuid::Uuid;

/// Offline gateway for local runs. The outcome is picked by the card's last
/// four digits:
///
/// | last4  | outcome                        |
/// |--------|--------------------------------|
/// | `0002` | explicit decline               |
/// | `0036` | response without a status      |
/// | `0119` | timeout before processing      |
/// | `0259` | transport failure              |
/// | other  | success                        |
pub struct SandboxGateway;

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn submit(&self, request: &ChargeRequest) -> Result<GatewayResponse, GatewayError> {
        let last4 = card_last4(request.card.number.expose());
        let basket_total: i64 = request.basket_items.iter().map(|i| i.price.amount_minor).sum();
        if basket_total != request.amount.amount_minor {
            return Err(GatewayError::Rejected(format!(
                "basket total {} does not match amount {}",
                basket_total, request.amount.amount_minor
            )));
        }

        match last4.as_str() {
            "0119" => Err(GatewayError::Timeout),
            "0259" => Err(GatewayError::Transport("connection reset by peer".to_string())),
            "0002" => Ok(GatewayResponse {
                status: GatewayStatus::Failure,
                reference: None,
                error_message: Some("Card declined".to_string()),
                raw: serde_json::json!({ "status": "failure", "errorCode": "10051" }),
            }),
            "0036" => Ok(GatewayResponse {
                status: GatewayStatus::Unknown,
                reference: None,
                error_message: None,
                raw: serde_json::json!({}),
            }),
            _ => {
                let reference = format!("sbx_{}", Uuid::new_v4().simple());
                Ok(GatewayResponse {
                    status: GatewayStatus::Success,
                    reference: Some(reference.clone()),
                    error_message: None,
                    raw: serde_json::json!({
                        "status": "success",
                        "paymentId": reference,
                        "conversationId": request.reservation_id,
                        "paidPrice": request.amount.as_major(),
                        "currency": request.amount.currency,
                    }),
                })
            }
        }
    }
}
