use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tourline_core::routing::{Coordinate, ProviderRoute, RoutingError, RoutingProvider};
use tracing::debug;

/// Client for a Distance Matrix style JSON API (one origin, one destination).
pub struct DistanceMatrixClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl DistanceMatrixClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, RoutingError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RoutingError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    status: String,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    distance: Option<Measure>,
    duration: Option<Measure>,
    duration_in_traffic: Option<Measure>,
}

#[derive(Debug, Deserialize)]
struct Measure {
    value: u64,
}

fn interpret(body: MatrixResponse) -> Result<ProviderRoute, RoutingError> {
    match body.status.as_str() {
        "OK" => {}
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => return Err(RoutingError::RateLimited),
        "REQUEST_DENIED" => return Err(RoutingError::MissingCredentials),
        other => return Err(RoutingError::Status(other.to_string())),
    }

    let element = body
        .rows
        .into_iter()
        .next()
        .and_then(|row| row.elements.into_iter().next())
        .ok_or_else(|| RoutingError::Status("EMPTY_RESPONSE".to_string()))?;

    if element.status != "OK" {
        return Err(RoutingError::Status(element.status));
    }

    match (element.distance, element.duration) {
        (Some(distance), Some(duration)) => Ok(ProviderRoute {
            distance_meters: distance.value,
            duration_seconds: duration.value,
            duration_in_traffic_seconds: element.duration_in_traffic.map(|d| d.value),
        }),
        _ => Err(RoutingError::Status("INCOMPLETE_ELEMENT".to_string())),
    }
}

#[async_trait]
impl RoutingProvider for DistanceMatrixClient {
    async fn distance_matrix(&self, from: Coordinate, to: Coordinate) -> Result<ProviderRoute, RoutingError> {
        if self.api_key.is_empty() {
            return Err(RoutingError::MissingCredentials);
        }

        let origins = format!("{},{}", from.lat, from.lng);
        let destinations = format!("{},{}", to.lat, to.lng);

        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("origins", origins.as_str()),
                ("destinations", destinations.as_str()),
                ("departure_time", "now"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RoutingError::Timeout
                } else {
                    RoutingError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(RoutingError::RateLimited);
        }
        if !status.is_success() {
            return Err(RoutingError::Status(status.to_string()));
        }

        let body: MatrixResponse = response
            .json()
            .await
            .map_err(|e| RoutingError::Transport(e.to_string()))?;
        debug!("Distance matrix answered with status {}", body.status);

        interpret(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<ProviderRoute, RoutingError> {
        interpret(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_ok_response() {
        let route = parse(json!({
            "status": "OK",
            "rows": [{"elements": [{
                "status": "OK",
                "distance": {"value": 40123, "text": "40.1 km"},
                "duration": {"value": 2700, "text": "45 mins"},
                "duration_in_traffic": {"value": 3300, "text": "55 mins"}
            }]}]
        }))
        .unwrap();

        assert_eq!(route.distance_meters, 40123);
        assert_eq!(route.duration_seconds, 2700);
        assert_eq!(route.duration_in_traffic_seconds, Some(3300));
    }

    #[test]
    fn test_quota_exceeded_is_rate_limited() {
        let err = parse(json!({"status": "OVER_QUERY_LIMIT", "rows": []})).unwrap_err();
        assert!(matches!(err, RoutingError::RateLimited));
    }

    #[test]
    fn test_unroutable_element() {
        let err = parse(json!({
            "status": "OK",
            "rows": [{"elements": [{"status": "ZERO_RESULTS"}]}]
        }))
        .unwrap_err();
        assert!(matches!(err, RoutingError::Status(s) if s == "ZERO_RESULTS"));
    }

    #[tokio::test]
    async fn test_missing_key_never_calls_out() {
        let client = DistanceMatrixClient::new("http://127.0.0.1:9", "", Duration::from_secs(1)).unwrap();
        let err = client
            .distance_matrix(Coordinate::new(41.0, 29.0), Coordinate::new(41.1, 29.1))
            .await
            .unwrap_err();
        assert!(matches!(err, RoutingError::MissingCredentials));
    }
}
