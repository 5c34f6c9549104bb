use crate::app_config::BusinessRules;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Overlay rows of the `business_rules` table on the configured defaults.
    pub async fn fetch_business_rules(&self, defaults: BusinessRules) -> Result<BusinessRules, sqlx::Error> {
        let rows: Vec<(String, Value)> =
            sqlx::query_as("SELECT rule_key, rule_value FROM business_rules")
                .fetch_all(&self.pool)
                .await?;

        let mut rules = defaults;
        for (key, value) in rows {
            apply_rule(&mut rules, &key, &value);
        }

        if rules.min_chauffeur_hours > rules.max_chauffeur_hours {
            warn!(
                "Chauffeur hour bounds inverted ({} > {}), swapping",
                rules.min_chauffeur_hours, rules.max_chauffeur_hours
            );
            std::mem::swap(&mut rules.min_chauffeur_hours, &mut rules.max_chauffeur_hours);
        }

        Ok(rules)
    }
}

// Expected format: {"value": <number/string>}
fn apply_rule(rules: &mut BusinessRules, key: &str, raw: &Value) {
    let Some(v) = raw.get("value") else {
        warn!("Business rule {} has no value field, ignoring", key);
        return;
    };

    match key {
        "currency" => {
            if let Some(s) = v.as_str() {
                rules.currency = s.to_uppercase();
            }
        }
        "min_chauffeur_hours" => {
            if let Some(f) = v.as_f64().filter(|f| f.is_finite() && *f > 0.0) {
                rules.min_chauffeur_hours = f;
            }
        }
        "max_chauffeur_hours" => {
            if let Some(f) = v.as_f64().filter(|f| f.is_finite() && *f > 0.0) {
                rules.max_chauffeur_hours = f;
            }
        }
        _ => {}
    }
}
