use serde::{Deserialize, Serialize};
use tourline_shared::Money;
use uuid::Uuid;

/// Authoritative vehicle rates. `base_price` is informational only and is
/// never part of a transfer quote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VehicleRate {
    pub vehicle_id: Uuid,
    pub name: String,
    pub base_price: Money,
    pub per_km: Money,
    pub hourly: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TourRate {
    pub tour_id: Uuid,
    pub name: String,
    pub per_person: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddOnRate {
    pub add_on_id: Uuid,
    pub name: String,
    pub unit_price: Money,
}
