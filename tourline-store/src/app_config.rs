use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub kafka: KafkaConfig,
    pub routing: RoutingConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    pub business_rules: BusinessRules,
    pub smtp: SmtpConfig,
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub payment: PaymentConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    pub currency: String,
    #[serde(default = "default_min_hours")]
    pub min_chauffeur_hours: f64,
    #[serde(default = "default_max_hours")]
    pub max_chauffeur_hours: f64,
}

fn default_min_hours() -> f64 { 4.0 }
fn default_max_hours() -> f64 { 24.0 }

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    #[serde(default = "default_payment_topic")]
    pub payment_topic: String,
}

fn default_payment_topic() -> String { "payment.attempts".to_string() }

#[derive(Debug, Deserialize, Clone)]
pub struct RoutingConfig {
    /// Without a key every route falls back to the haversine estimate.
    pub api_key: Option<String>,
    pub base_url: String,
    #[serde(default = "default_routing_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_speed")]
    pub average_speed_kmh: f64,
}

fn default_routing_timeout() -> u64 { 5000 }
fn default_speed() -> f64 { 50.0 }

impl RoutingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub timeout_ms: u64,
    pub provider_ttl_secs: u64,
    pub fallback_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 250,
            provider_ttl_secs: 30 * 24 * 3600,
            fallback_ttl_secs: 24 * 3600,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationSettings {
    pub from_email: String,
    pub from_name: String,
    pub admin_email: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentConfig {
    pub gateway: String,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            gateway: "sandbox".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Never checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `TOURLINE__ROUTING__API_KEY=...` sets `routing.api_key`
            .add_source(config::Environment::with_prefix("TOURLINE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
