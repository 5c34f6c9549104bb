use serde::{Deserialize, Serialize};
use tourline_core::catalog::{TourRate, VehicleRate};
use tourline_core::CoreError;
use tourline_shared::Money;
use uuid::Uuid;

/// Inputs that produced a quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuoteBasis {
    Transfer {
        vehicle_id: Uuid,
        distance_km: f64,
        round_trip: bool,
    },
    Chauffeur {
        vehicle_id: Uuid,
        duration_hours: f64,
    },
    Tour {
        tour_id: Uuid,
        persons: u32,
    },
}

/// Server-computed price for a requested service. Transient: its effect is
/// captured by the reservation total, it is never stored on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub amount: Money,
    pub basis: QuoteBasis,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuoteError {
    #[error("{field} must be a finite number greater than zero (got {value})")]
    InvalidInput { field: &'static str, value: f64 },

    #[error("number of persons must be at least 1")]
    NoPersons,

    #[error("{0} rate must be greater than zero")]
    InvalidRate(&'static str),

    #[error("quoted amount is out of range")]
    Overflow,
}

impl From<QuoteError> for CoreError {
    fn from(err: QuoteError) -> Self {
        CoreError::ValidationError(err.to_string())
    }
}

/// Turns a service request plus authoritative catalog rates into an amount.
///
/// Every operation is pure and deterministic. Rates must come from the
/// catalog store, never from the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceQuoteEngine;

impl PriceQuoteEngine {
    pub fn new() -> Self {
        Self
    }

    /// `distance_km * per_km`, doubled for a round trip. The vehicle's base
    /// price is deliberately not part of a transfer quote.
    pub fn quote_transfer(
        &self,
        rate: &VehicleRate,
        distance_km: f64,
        round_trip: bool,
    ) -> Result<PriceQuote, QuoteError> {
        require_positive("distance_km", distance_km)?;
        require_positive_rate("per-km", &rate.per_km)?;

        let legs = if round_trip { 2.0 } else { 1.0 };
        let amount = scale(&rate.per_km, distance_km * legs)?;

        Ok(PriceQuote {
            amount,
            basis: QuoteBasis::Transfer {
                vehicle_id: rate.vehicle_id,
                distance_km,
                round_trip,
            },
        })
    }

    /// `hourly * duration_hours`. Callers clamp the duration to the
    /// supported buckets first.
    pub fn quote_chauffeur(
        &self,
        rate: &VehicleRate,
        duration_hours: f64,
    ) -> Result<PriceQuote, QuoteError> {
        require_positive("duration_hours", duration_hours)?;
        require_positive_rate("hourly", &rate.hourly)?;

        let amount = scale(&rate.hourly, duration_hours)?;

        Ok(PriceQuote {
            amount,
            basis: QuoteBasis::Chauffeur {
                vehicle_id: rate.vehicle_id,
                duration_hours,
            },
        })
    }

    /// `per_person * persons`, persons >= 1.
    pub fn quote_tour(&self, rate: &TourRate, persons: u32) -> Result<PriceQuote, QuoteError> {
        if persons == 0 {
            return Err(QuoteError::NoPersons);
        }
        require_positive_rate("per-person", &rate.per_person)?;

        let amount = rate
            .per_person
            .amount_minor
            .checked_mul(i64::from(persons))
            .ok_or(QuoteError::Overflow)?;

        Ok(PriceQuote {
            amount: Money::new(amount, rate.per_person.currency.clone()),
            basis: QuoteBasis::Tour {
                tour_id: rate.tour_id,
                persons,
            },
        })
    }
}

fn require_positive(field: &'static str, value: f64) -> Result<(), QuoteError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(QuoteError::InvalidInput { field, value })
    }
}

fn require_positive_rate(name: &'static str, rate: &Money) -> Result<(), QuoteError> {
    if rate.amount_minor > 0 {
        Ok(())
    } else {
        Err(QuoteError::InvalidRate(name))
    }
}

// Multiply a unit rate by a real-valued quantity, rounding to the nearest cent.
fn scale(rate: &Money, quantity: f64) -> Result<Money, QuoteError> {
    let raw = (rate.amount_minor as f64 * quantity).round();
    if !raw.is_finite() || raw >= i64::MAX as f64 {
        return Err(QuoteError::Overflow);
    }
    Ok(Money::new(raw as i64, rate.currency.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle(per_km: i64, hourly: i64) -> VehicleRate {
        VehicleRate {
            vehicle_id: Uuid::new_v4(),
            name: "Mercedes Vito".to_string(),
            base_price: Money::new(9900, "EUR"),
            per_km: Money::new(per_km, "EUR"),
            hourly: Money::new(hourly, "EUR"),
        }
    }

    fn tour(per_person: i64) -> TourRate {
        TourRate {
            tour_id: Uuid::new_v4(),
            name: "Old City Walk".to_string(),
            per_person: Money::new(per_person, "EUR"),
        }
    }

    #[test]
    fn test_transfer_one_way_and_round_trip() {
        let engine = PriceQuoteEngine::new();
        let rate = vehicle(250, 5000);

        let one_way = engine.quote_transfer(&rate, 40.0, false).unwrap();
        assert_eq!(one_way.amount, Money::new(10000, "EUR"));

        let round_trip = engine.quote_transfer(&rate, 40.0, true).unwrap();
        assert_eq!(round_trip.amount, Money::new(20000, "EUR"));
    }

    #[test]
    fn test_transfer_ignores_base_price() {
        let engine = PriceQuoteEngine::new();
        for distance in [0.5, 1.0, 12.3, 87.9, 400.0] {
            let rate = vehicle(180, 4000);
            let quote = engine.quote_transfer(&rate, distance, false).unwrap();
            let expected = (distance * 180.0).round() as i64;
            assert_eq!(quote.amount.amount_minor, expected);
        }
    }

    #[test]
    fn test_chauffeur_hourly() {
        let engine = PriceQuoteEngine::new();
        let quote = engine.quote_chauffeur(&vehicle(250, 5000), 6.0).unwrap();
        assert_eq!(quote.amount, Money::new(30000, "EUR"));
    }

    #[test]
    fn test_tour_per_person() {
        let engine = PriceQuoteEngine::new();
        let quote = engine.quote_tour(&tour(7500), 3).unwrap();
        assert_eq!(quote.amount, Money::new(22500, "EUR"));
        assert_eq!(engine.quote_tour(&tour(7500), 0), Err(QuoteError::NoPersons));
    }

    #[test]
    fn test_rejects_non_finite_and_non_positive_inputs() {
        let engine = PriceQuoteEngine::new();
        let rate = vehicle(250, 5000);

        for bad in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                engine.quote_transfer(&rate, bad, false),
                Err(QuoteError::InvalidInput { field: "distance_km", .. })
            ));
            assert!(matches!(
                engine.quote_chauffeur(&rate, bad),
                Err(QuoteError::InvalidInput { field: "duration_hours", .. })
            ));
        }

        assert_eq!(
            engine.quote_transfer(&vehicle(0, 5000), 10.0, false),
            Err(QuoteError::InvalidRate("per-km"))
        );
        assert_eq!(engine.quote_tour(&tour(-1), 2), Err(QuoteError::InvalidRate("per-person")));
    }
}
