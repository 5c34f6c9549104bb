use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tourline_core::reservation::{AdditionalPassenger, ReservationType};
use tourline_core::routing::Coordinate;
use uuid::Uuid;

/// The priced service. Exactly one of vehicle or tour is referenced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServiceRequest {
    Transfer {
        vehicle_id: Uuid,
        from: Coordinate,
        to: Coordinate,
        #[serde(default)]
        round_trip: bool,
    },
    Chauffeur {
        vehicle_id: Uuid,
        duration_hours: f64,
    },
    Tour {
        tour_id: Uuid,
    },
}

impl ServiceRequest {
    pub fn vehicle_id(&self) -> Option<Uuid> {
        match self {
            ServiceRequest::Transfer { vehicle_id, .. } | ServiceRequest::Chauffeur { vehicle_id, .. } => {
                Some(*vehicle_id)
            }
            ServiceRequest::Tour { .. } => None,
        }
    }

    pub fn tour_id(&self) -> Option<Uuid> {
        match self {
            ServiceRequest::Tour { tour_id } => Some(*tour_id),
            _ => None,
        }
    }

    pub fn default_type(&self) -> ReservationType {
        match self {
            ServiceRequest::Transfer { .. } => ReservationType::Transfer,
            ServiceRequest::Chauffeur { .. } => ReservationType::Chauffeur,
            ServiceRequest::Tour { .. } => ReservationType::Tour,
        }
    }

    /// Whether a client-supplied type tag fits this service. Only a
    /// transfer may be booked as featured.
    pub fn accepts_type(&self, tag: ReservationType) -> bool {
        tag == self.default_type()
            || (tag == ReservationType::FeaturedTransfer && matches!(self, ServiceRequest::Transfer { .. }))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddOnSelection {
    pub add_on_id: Uuid,
    pub quantity: i64,
}

/// Inbound booking request, as submitted by the customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReservationRequest {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub service: ServiceRequest,
    pub reservation_type: Option<ReservationType>,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub pickup_at: DateTime<Utc>,
    pub passengers: i64,
    #[serde(default)]
    pub additional_passengers: Vec<AdditionalPassenger>,
    #[serde(default)]
    pub add_ons: Vec<AddOnSelection>,
    /// Client-side total in major units. Checked and then replaced by the
    /// server figure.
    pub total_price: Option<f64>,
    pub notes: Option<String>,
}
