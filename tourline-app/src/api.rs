use crate::error::AppError;
use std::sync::Arc;
use tourline_core::payment::PaymentDetails;
use tourline_core::reservation::Reservation;
use tourline_order::{
    ChargeResult, CreateReservationRequest, PaymentOrchestrator, ReservationQuote, ReservationService,
};
use tracing::info;
use uuid::Uuid;

/// Outward face of the booking core.
#[derive(Clone)]
pub struct BookingApi {
    reservations: Arc<ReservationService>,
    payments: PaymentOrchestrator,
}

impl BookingApi {
    pub fn new(reservations: Arc<ReservationService>, payments: PaymentOrchestrator) -> Self {
        Self {
            reservations,
            payments,
        }
    }

    /// Validate, price and store a new reservation in PENDING.
    pub async fn create_reservation(&self, request: CreateReservationRequest) -> Result<Reservation, AppError> {
        Ok(self.reservations.create_reservation(request).await?)
    }

    /// Charge a reservation's stored total. A declined or failed charge is a
    /// normal `Ok` result with `success == false`.
    pub async fn charge_reservation(
        &self,
        reservation_id: Uuid,
        details: PaymentDetails,
    ) -> Result<ChargeResult, AppError> {
        let result = self.payments.charge(reservation_id, details).await?;
        info!(
            "Charge for {} finished: success={} status={}",
            reservation_id, result.success, result.status
        );
        Ok(result)
    }

    pub async fn get_reservation(&self, id: Uuid) -> Result<Reservation, AppError> {
        Ok(self.reservations.get_reservation(id).await?)
    }

    pub async fn quote(&self, request: &CreateReservationRequest) -> Result<ReservationQuote, AppError> {
        Ok(self.reservations.quote(request).await?)
    }
}
