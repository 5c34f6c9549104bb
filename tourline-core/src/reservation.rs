use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tourline_shared::{Masked, Money};
use uuid::Uuid;

/// Payment status of a reservation.
///
/// `Pending` is the only non-terminal state. A reservation moves exactly once
/// to `Paid` or `Failed` and never leaves a terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
        }
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        self == PaymentStatus::Pending && next.is_terminal()
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            "FAILED" => Ok(PaymentStatus::Failed),
            other => Err(format!("unknown payment status: {}", other)),
        }
    }
}

/// Reporting tag. Pricing never branches on it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ReservationType {
    Transfer,
    Chauffeur,
    Tour,
    FeaturedTransfer,
}

impl ReservationType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReservationType::Transfer => "transfer",
            ReservationType::Chauffeur => "chauffeur",
            ReservationType::Tour => "tour",
            ReservationType::FeaturedTransfer => "featured-transfer",
        }
    }
}

impl FromStr for ReservationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transfer" => Ok(ReservationType::Transfer),
            "chauffeur" => Ok(ReservationType::Chauffeur),
            "tour" => Ok(ReservationType::Tour),
            "featured-transfer" => Ok(ReservationType::FeaturedTransfer),
            other => Err(format!("unknown reservation type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerContact {
    pub full_name: String,
    pub email: Masked<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdditionalPassenger {
    pub first_name: String,
    pub last_name: String,
}

/// Add-on line captured at booking time. Later catalog price changes do not
/// affect it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReservationAddOn {
    pub add_on_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

/// The booking aggregate: who, what service, when, and at what price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub customer: CustomerContact,
    pub vehicle_id: Option<Uuid>,
    pub tour_id: Option<Uuid>,
    pub reservation_type: Option<ReservationType>,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub pickup_at: DateTime<Utc>,
    pub passengers: u32,
    pub additional_passengers: Vec<AdditionalPassenger>,
    pub add_ons: Vec<ReservationAddOn>,
    pub total_price: Money,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// A fresh reservation in `Pending` with a server-assigned id and timestamps.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        customer: CustomerContact,
        vehicle_id: Option<Uuid>,
        tour_id: Option<Uuid>,
        reservation_type: Option<ReservationType>,
        pickup_location: String,
        dropoff_location: String,
        pickup_at: DateTime<Utc>,
        passengers: u32,
        total_price: Money,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            customer,
            vehicle_id,
            tour_id,
            reservation_type,
            pickup_location,
            dropoff_location,
            pickup_at,
            passengers,
            additional_passengers: Vec::new(),
            add_ons: Vec::new(),
            total_price,
            payment_status: PaymentStatus::Pending,
            payment_reference: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.payment_status.is_terminal()
    }

    pub fn add_ons_total(&self) -> i64 {
        self.add_ons.iter().map(|a| a.line_total.amount_minor).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Paid));
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Failed));
        assert!(!PaymentStatus::Paid.can_transition_to(PaymentStatus::Failed));
        assert!(!PaymentStatus::Failed.can_transition_to(PaymentStatus::Paid));
        assert!(!PaymentStatus::Pending.can_transition_to(PaymentStatus::Pending));
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [PaymentStatus::Pending, PaymentStatus::Paid, PaymentStatus::Failed] {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
        assert!("REFUNDED".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_new_reservation_is_pending() {
        let reservation = Reservation::new(
            CustomerContact {
                full_name: "Jane Doe".to_string(),
                email: Masked("jane@example.com".to_string()),
                phone: None,
            },
            Some(Uuid::new_v4()),
            None,
            Some(ReservationType::Transfer),
            "Airport".to_string(),
            "Old Town".to_string(),
            Utc::now(),
            1,
            Money::new(10000, "EUR"),
        );
        assert_eq!(reservation.payment_status, PaymentStatus::Pending);
        assert!(!reservation.is_settled());
        assert_eq!(reservation.created_at, reservation.updated_at);
        assert!(format!("{:?}", reservation).contains("********"));
    }
}
