use crate::notification::NotificationDispatcher;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tourline_core::audit::AuditSink;
use tourline_core::payment::{
    BasketItem, BillingAddress, BuyerInfo, ChargeRequest, GatewayStatus, PaymentDetails, PaymentGateway,
};
use tourline_core::repository::ReservationRepository;
use tourline_core::reservation::{PaymentStatus, Reservation};
use tourline_core::{CoreError, CoreResult};
use tourline_shared::models::events::PaymentAttemptedEvent;
use tourline_shared::Money;
use tracing::{error, info, warn};
use uuid::Uuid;

/// What the caller learns about a charge
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChargeResult {
    pub reservation_id: Uuid,
    pub success: bool,
    pub status: PaymentStatus,
    pub gateway_reference: Option<String>,
    pub message: Option<String>,
    /// True when the reservation was already terminal and no gateway call
    /// was made.
    pub already_settled: bool,
}

impl ChargeResult {
    fn settled(reservation: &Reservation) -> Self {
        Self {
            reservation_id: reservation.id,
            success: reservation.payment_status == PaymentStatus::Paid,
            status: reservation.payment_status,
            gateway_reference: reservation.payment_reference.clone(),
            message: Some(format!("reservation already {}", reservation.payment_status)),
            already_settled: true,
        }
    }
}

/// Charges a reservation through the payment gateway and records the result.
///
/// PENDING -> PAID | FAILED, exactly once. A charge is never retried here; a
/// new attempt needs a new explicit request from the customer, and it is
/// refused once the reservation is terminal.
///
/// Charges for the same reservation are serialized: a second call arriving
/// while the first is in flight waits for it, then sees the terminal status
/// and returns without touching the gateway.
#[derive(Clone)]
pub struct PaymentOrchestrator {
    gateway: Arc<dyn PaymentGateway>,
    store: Arc<dyn ReservationRepository>,
    notifier: NotificationDispatcher,
    audit: Arc<dyn AuditSink>,
    in_flight: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl PaymentOrchestrator {
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        store: Arc<dyn ReservationRepository>,
        notifier: NotificationDispatcher,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            gateway,
            store,
            notifier,
            audit,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Charge the stored total of `reservation_id`.
    ///
    /// Settlement runs on its own task: if the caller's future is dropped
    /// (client disconnect) the charge and its reconciliation still complete.
    pub async fn charge(
        &self,
        reservation_id: Uuid,
        details: PaymentDetails,
    ) -> CoreResult<ChargeResult> {
        let this = self.clone();
        tokio::spawn(async move { this.settle(reservation_id, details).await })
            .await
            .map_err(|e| CoreError::internal(format!("charge task for {} aborted: {}", reservation_id, e)))?
    }

    async fn settle(&self, reservation_id: Uuid, details: PaymentDetails) -> CoreResult<ChargeResult> {
        let claim = self.claim(reservation_id).await;
        let result = self.settle_claimed(reservation_id, details).await;
        self.release(reservation_id, claim).await;
        result
    }

    // Held from the status read until the terminal status is written.
    async fn claim(&self, reservation_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight.entry(reservation_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    async fn release(&self, reservation_id: Uuid, claim: OwnedMutexGuard<()>) {
        let mut in_flight = self.in_flight.lock().await;
        drop(claim);
        // Only the map still holds it: nobody is waiting
        if in_flight
            .get(&reservation_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            in_flight.remove(&reservation_id);
        }
    }

    async fn settle_claimed(&self, reservation_id: Uuid, details: PaymentDetails) -> CoreResult<ChargeResult> {
        // 1. Load and check precondition
        let reservation = self
            .store
            .get_reservation(reservation_id)
            .await
            .map_err(CoreError::internal)?
            .ok_or_else(|| CoreError::not_found("reservation", reservation_id))?;

        if reservation.is_settled() {
            info!(
                "Reservation {} already {}, skipping gateway call",
                reservation_id, reservation.payment_status
            );
            return Ok(ChargeResult::settled(&reservation));
        }

        // 2. Submit to gateway
        let request = build_charge_request(&reservation, details)?;
        info!(
            "Submitting charge of {} for reservation {}",
            request.amount, reservation_id
        );

        let response = match self.gateway.submit(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Gateway error for reservation {}: {}", reservation_id, e);
                self.mark_failed(reservation_id).await;
                self.record_attempt(&request, "GATEWAY_ERROR", None, Some(e.to_string()));
                return Ok(ChargeResult {
                    reservation_id,
                    success: false,
                    status: PaymentStatus::Failed,
                    gateway_reference: None,
                    message: Some(e.to_string()),
                    already_settled: false,
                });
            }
        };

        // 3. Reconcile on the gateway's own indicator. Status first, audit after.
        match response.status {
            GatewayStatus::Success => {
                self.mark_paid(reservation, response.reference.clone()).await;
                self.record_attempt(&request, "SUCCEEDED", response.reference.clone(), None);
                Ok(ChargeResult {
                    reservation_id,
                    success: true,
                    status: PaymentStatus::Paid,
                    gateway_reference: response.reference,
                    message: None,
                    already_settled: false,
                })
            }
            status => {
                let outcome = if status == GatewayStatus::Failure { "DECLINED" } else { "UNKNOWN" };
                let message = response
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "payment was not confirmed by the gateway".to_string());
                info!(
                    "Charge for reservation {} not successful ({}): {}",
                    reservation_id, outcome, message
                );
                self.mark_failed(reservation_id).await;
                self.record_attempt(&request, outcome, response.reference.clone(), Some(message.clone()));
                Ok(ChargeResult {
                    reservation_id,
                    success: false,
                    status: PaymentStatus::Failed,
                    gateway_reference: response.reference,
                    message: Some(message),
                    already_settled: false,
                })
            }
        }
    }

    // Money has moved. A failed write here is logged for manual
    // reconciliation and never turns into a retry.
    async fn mark_paid(&self, mut reservation: Reservation, reference: Option<String>) {
        let id = reservation.id;
        match self
            .store
            .transition_payment_status(id, PaymentStatus::Paid, reference.as_deref())
            .await
        {
            Ok(true) => {
                info!("Reservation {} marked PAID", id);
                reservation.payment_status = PaymentStatus::Paid;
                reservation.payment_reference = reference;
                self.notifier.dispatch(reservation);
            }
            Ok(false) => {
                error!(
                    reconciliation_required = true,
                    reservation_id = %id,
                    gateway_reference = ?reference,
                    "Charge succeeded but reservation was no longer PENDING"
                );
            }
            Err(e) => {
                error!(
                    reconciliation_required = true,
                    reservation_id = %id,
                    gateway_reference = ?reference,
                    "Charge succeeded but PAID status could not be written: {}",
                    e
                );
            }
        }
    }

    async fn mark_failed(&self, id: Uuid) {
        match self
            .store
            .transition_payment_status(id, PaymentStatus::Failed, None)
            .await
        {
            Ok(true) => info!("Reservation {} marked FAILED", id),
            Ok(false) => warn!("Reservation {} was no longer PENDING, FAILED not recorded", id),
            Err(e) => error!("Could not mark reservation {} FAILED: {}", id, e),
        }
    }

    // Published on a detached task so a slow broker never holds up a charge.
    fn record_attempt(
        &self,
        request: &ChargeRequest,
        outcome: &str,
        gateway_reference: Option<String>,
        reason: Option<String>,
    ) {
        let event = PaymentAttemptedEvent {
            reservation_id: request.reservation_id,
            amount_minor: request.amount.amount_minor,
            currency: request.amount.currency.clone(),
            outcome: outcome.to_string(),
            gateway_reference,
            reason,
            timestamp: chrono::Utc::now().timestamp(),
        };
        let audit = self.audit.clone();
        tokio::spawn(async move {
            if let Err(e) = audit.payment_attempted(&event).await {
                warn!(
                    "Failed to record payment attempt for {}: {}",
                    event.reservation_id, e
                );
            }
        });
    }
}

/// Gateway request for a reservation. The amount is always the stored total;
/// the basket splits it into the service fare and the add-on lines.
pub fn build_charge_request(
    reservation: &Reservation,
    details: PaymentDetails,
) -> CoreResult<ChargeRequest> {
    if reservation.total_price.amount_minor <= 0 {
        return Err(CoreError::validation("reservation total must be positive to charge"));
    }

    let fare_minor = reservation.total_price.amount_minor - reservation.add_ons_total();
    let currency = reservation.total_price.currency.clone();
    let category = reservation
        .reservation_type
        .map(|t| t.as_str())
        .unwrap_or("booking")
        .to_string();

    let mut basket_items = Vec::with_capacity(reservation.add_ons.len() + 1);
    if fare_minor > 0 {
        basket_items.push(BasketItem {
            id: reservation.id.to_string(),
            name: format!("{} {}", category, reservation.pickup_location),
            category: category.clone(),
            price: Money::new(fare_minor, currency.clone()),
        });
    }
    for add_on in reservation.add_ons.iter().filter(|a| a.line_total.amount_minor > 0) {
        basket_items.push(BasketItem {
            id: add_on.add_on_id.to_string(),
            name: add_on.name.clone(),
            category: "add-on".to_string(),
            price: add_on.line_total.clone(),
        });
    }

    let buyer = details.buyer.unwrap_or_else(|| BuyerInfo {
        full_name: reservation.customer.full_name.clone(),
        email: reservation.customer.email.clone(),
        phone: reservation.customer.phone.clone(),
        ip_address: None,
    });

    let billing_address = details.billing_address.unwrap_or_else(|| BillingAddress {
        contact_name: details.card.holder_name.clone(),
        address: reservation.pickup_location.clone(),
        city: String::new(),
        country: String::new(),
        zip_code: None,
    });

    Ok(ChargeRequest {
        reservation_id: reservation.id,
        amount: reservation.total_price.clone(),
        card: details.card,
        buyer,
        billing_address,
        basket_items,
    })
}
