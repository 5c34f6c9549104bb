use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteSource {
    Provider,
    Fallback,
}

/// Travel distance and time between two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEstimate {
    pub distance_km: f64,
    pub duration_min: u32,
    pub duration_in_traffic_min: u32,
    pub source: RouteSource,
}

/// Raw routing-provider answer, before rounding.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRoute {
    pub distance_meters: u64,
    pub duration_seconds: u64,
    pub duration_in_traffic_seconds: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("Routing provider credentials are not configured")]
    MissingCredentials,
    #[error("Routing provider rate limit exceeded")]
    RateLimited,
    #[error("Routing provider timed out")]
    Timeout,
    #[error("Routing provider returned status {0}")]
    Status(String),
    #[error("Routing provider request failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait RoutingProvider: Send + Sync {
    async fn distance_matrix(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<ProviderRoute, RoutingError>;
}

/// Best-effort route cache. Implementations absorb their own connection
/// errors: `get` reports a miss and `set` becomes a no-op.
#[async_trait]
pub trait RouteCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<RouteEstimate>;

    async fn set(&self, key: &str, value: &RouteEstimate, ttl: Duration);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_bounds() {
        assert!(Coordinate::new(41.0082, 28.9784).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, -180.5).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }
}
