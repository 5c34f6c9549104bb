use async_trait::async_trait;
use uuid::Uuid;
use crate::catalog::{AddOnRate, TourRate, VehicleRate};
use crate::reservation::{PaymentStatus, Reservation};
use crate::BoxError;

/// Repository trait for the reservation aggregate
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Persist header, passengers and add-on lines atomically.
    async fn create_reservation(
        &self,
        reservation: &Reservation,
    ) -> Result<Uuid, BoxError>;

    async fn get_reservation(
        &self,
        id: Uuid,
    ) -> Result<Option<Reservation>, BoxError>;

    /// Move a `Pending` reservation to `status`.
    ///
    /// Returns `Ok(false)` without writing when the reservation is unknown or
    /// no longer pending, so a terminal status is never overwritten.
    async fn transition_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        payment_reference: Option<&str>,
    ) -> Result<bool, BoxError>;
}

/// Read-only access to catalog rates used for pricing
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn get_vehicle_rate(
        &self,
        id: Uuid,
    ) -> Result<Option<VehicleRate>, BoxError>;

    async fn get_tour_rate(
        &self,
        id: Uuid,
    ) -> Result<Option<TourRate>, BoxError>;

    async fn get_add_on(
        &self,
        id: Uuid,
    ) -> Result<Option<AddOnRate>, BoxError>;
}
