use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tourline_core::repository::ReservationRepository;
use tourline_core::reservation::{PaymentStatus, Reservation};
use tourline_core::BoxError;
use uuid::Uuid;

/// In-process reservation store for local runs and tests
#[derive(Default)]
pub struct InMemoryReservationStore {
    reservations: RwLock<HashMap<Uuid, Reservation>>,
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: Uuid) -> Option<Reservation> {
        self.reservations.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.reservations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.reservations.read().await.is_empty()
    }
}

#[async_trait]
impl ReservationRepository for InMemoryReservationStore {
    async fn create_reservation(&self, reservation: &Reservation) -> Result<Uuid, BoxError> {
        let mut reservations = self.reservations.write().await;
        if reservations.contains_key(&reservation.id) {
            return Err(format!("reservation {} already exists", reservation.id).into());
        }
        reservations.insert(reservation.id, reservation.clone());
        Ok(reservation.id)
    }

    async fn get_reservation(&self, id: Uuid) -> Result<Option<Reservation>, BoxError> {
        Ok(self.get(id).await)
    }

    async fn transition_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        payment_reference: Option<&str>,
    ) -> Result<bool, BoxError> {
        let mut reservations = self.reservations.write().await;
        let Some(reservation) = reservations.get_mut(&id) else {
            return Ok(false);
        };
        if !reservation.payment_status.can_transition_to(status) {
            return Ok(false);
        }
        reservation.payment_status = status;
        if let Some(reference) = payment_reference {
            reservation.payment_reference = Some(reference.to_string());
        }
        reservation.updated_at = Utc::now();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourline_core::reservation::CustomerContact;
    use tourline_shared::{Masked, Money};

    fn reservation() -> Reservation {
        Reservation::new(
            CustomerContact {
                full_name: "Jane Doe".to_string(),
                email: Masked("jane@example.com".to_string()),
                phone: None,
            },
            None,
            Some(Uuid::new_v4()),
            None,
            "Hotel".to_string(),
            "Harbour".to_string(),
            Utc::now(),
            1,
            Money::new(7500, "EUR"),
        )
    }

    #[tokio::test]
    async fn test_terminal_status_is_never_overwritten() {
        let store = InMemoryReservationStore::new();
        let r = reservation();
        store.create_reservation(&r).await.unwrap();

        assert!(store
            .transition_payment_status(r.id, PaymentStatus::Paid, Some("ref-1"))
            .await
            .unwrap());
        assert!(!store
            .transition_payment_status(r.id, PaymentStatus::Failed, None)
            .await
            .unwrap());

        let stored = store.get(r.id).await.unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
        assert_eq!(stored.payment_reference.as_deref(), Some("ref-1"));
    }

    #[tokio::test]
    async fn test_unknown_reservation_transition_is_noop() {
        let store = InMemoryReservationStore::new();
        assert!(!store
            .transition_payment_status(Uuid::new_v4(), PaymentStatus::Paid, None)
            .await
            .unwrap());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = InMemoryReservationStore::new();
        let r = reservation();
        store.create_reservation(&r).await.unwrap();
        assert!(store.create_reservation(&r).await.is_err());
    }
}
