use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tourline_core::routing::{
    Coordinate, ProviderRoute, RouteCache, RouteEstimate, RouteSource, RoutingError, RoutingProvider,
};
use tracing::{debug, info, warn};

const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Upper bound on a routing-provider call.
    pub provider_timeout: Duration,
    /// Upper bound on a single cache read or write.
    pub cache_timeout: Duration,
    /// TTL for provider answers; routes rarely change.
    pub provider_ttl: Duration,
    /// TTL for geometric estimates, short so the provider is retried soon.
    pub fallback_ttl: Duration,
    /// Speed used to turn a great-circle distance into a duration.
    pub average_speed_kmh: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(5),
            cache_timeout: Duration::from_millis(250),
            provider_ttl: Duration::from_secs(30 * 24 * 3600),
            fallback_ttl: Duration::from_secs(24 * 3600),
            average_speed_kmh: 50.0,
        }
    }
}

/// Resolves travel distance and ETA between two points.
///
/// Order of preference: cache, routing provider, haversine estimate. Provider
/// or cache trouble is never reported to the caller; a geometric estimate is
/// always produced.
pub struct RouteDistanceResolver {
    provider: Option<Arc<dyn RoutingProvider>>,
    cache: Arc<dyn RouteCache>,
    config: ResolverConfig,
}

impl RouteDistanceResolver {
    pub fn new(
        provider: Option<Arc<dyn RoutingProvider>>,
        cache: Arc<dyn RouteCache>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            provider,
            cache,
            config,
        }
    }

    pub async fn resolve(&self, from: Coordinate, to: Coordinate) -> RouteEstimate {
        let key = cache_key(from, to);

        // 1. Cache read (timeouts count as a miss)
        match tokio::time::timeout(self.config.cache_timeout, self.cache.get(&key)).await {
            Ok(Some(hit)) => {
                debug!("Route cache hit for {}", key);
                return hit;
            }
            Ok(None) => debug!("Route cache miss for {}", key),
            Err(_) => warn!("Route cache read timed out for {}, treating as miss", key),
        }

        // 2. Provider, bounded
        match self.call_provider(from, to).await {
            Ok(route) => {
                let estimate = from_provider(&route);
                self.store(&key, &estimate, self.config.provider_ttl).await;
                estimate
            }
            Err(e) => {
                info!("Routing provider unavailable ({}), using great-circle estimate", e);
                let estimate = self.fallback(from, to);
                self.store(&key, &estimate, self.config.fallback_ttl).await;
                estimate
            }
        }
    }

    async fn call_provider(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<ProviderRoute, RoutingError> {
        let provider = self.provider.as_ref().ok_or(RoutingError::MissingCredentials)?;
        tokio::time::timeout(self.config.provider_timeout, provider.distance_matrix(from, to))
            .await
            .map_err(|_| RoutingError::Timeout)?
    }

    fn fallback(&self, from: Coordinate, to: Coordinate) -> RouteEstimate {
        let distance_km = round_tenth(haversine_km(from, to));
        let duration_min = if self.config.average_speed_kmh > 0.0 {
            (distance_km / self.config.average_speed_kmh * 60.0).round() as u32
        } else {
            0
        };
        RouteEstimate {
            distance_km,
            duration_min,
            duration_in_traffic_min: duration_min,
            source: RouteSource::Fallback,
        }
    }

    async fn store(&self, key: &str, estimate: &RouteEstimate, ttl: Duration) {
        if tokio::time::timeout(self.config.cache_timeout, self.cache.set(key, estimate, ttl))
            .await
            .is_err()
        {
            warn!("Route cache write timed out for {}", key);
        }
    }
}

/// Stable key for a coordinate pair, rounded to ~1 m.
pub fn cache_key(from: Coordinate, to: Coordinate) -> String {
    format!(
        "route:{:.5},{:.5}:{:.5},{:.5}",
        from.lat, from.lng, to.lat, to.lng
    )
}

/// Great-circle distance in kilometres.
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

fn from_provider(route: &ProviderRoute) -> RouteEstimate {
    let duration_min = seconds_to_minutes(route.duration_seconds);
    RouteEstimate {
        distance_km: round_tenth(route.distance_meters as f64 / 1000.0),
        duration_min,
        duration_in_traffic_min: route
            .duration_in_traffic_seconds
            .map(seconds_to_minutes)
            .unwrap_or(duration_min),
        source: RouteSource::Provider,
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn seconds_to_minutes(seconds: u64) -> u32 {
    (seconds as f64 / 60.0).round() as u32
}

/// In-process route cache with per-entry expiry, used when Redis is not
/// configured.
#[derive(Default)]
pub struct MemoryRouteCache {
    entries: RwLock<HashMap<String, (RouteEstimate, Instant)>>,
}

impl MemoryRouteCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RouteCache for MemoryRouteCache {
    async fn get(&self, key: &str) -> Option<RouteEstimate> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(estimate, _)| estimate.clone())
    }

    async fn set(&self, key: &str, value: &RouteEstimate, ttl: Duration) {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        entries.insert(key.to_string(), (value.clone(), now + ttl));
    }
}
