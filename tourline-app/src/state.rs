use crate::api::BookingApi;
use anyhow::{bail, Context};
use std::sync::Arc;
use std::time::Duration;
use tourline_catalog::{ResolverConfig, RouteDistanceResolver};
use tourline_core::audit::AuditSink;
use tourline_core::payment::PaymentGateway;
use tourline_core::routing::RoutingProvider;
use tourline_order::{
    NotificationConfig, NotificationDispatcher, PaymentOrchestrator, ReservationRules, ReservationService,
    SandboxGateway,
};
use tourline_store::app_config::{BusinessRules, Config};
use tourline_store::{
    DbClient, DistanceMatrixClient, EventProducer, RedisRouteCache, SmtpMailer, StoreCatalogRepository,
    StoreReservationRepository,
};
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbClient>,
    pub api: BookingApi,
    pub business_rules: BusinessRules,
}

impl AppState {
    /// Connect every adapter named in `config` and wire the services.
    pub async fn bootstrap(config: &Config) -> anyhow::Result<Self> {
        // Database
        let db = DbClient::new(&config.database.url)
            .await
            .context("Failed to connect to Postgres")?;
        db.migrate().await.context("Failed to run migrations")?;

        let business_rules = match db.fetch_business_rules(config.business_rules.clone()).await {
            Ok(rules) => rules,
            Err(e) => {
                warn!("Could not load business rules from database, using config: {}", e);
                config.business_rules.clone()
            }
        };

        // Route cache and provider
        let cache = RedisRouteCache::new(&config.redis.url).context("Invalid Redis URL")?;
        let provider: Option<Arc<dyn RoutingProvider>> = match config.routing.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Some(Arc::new(
                DistanceMatrixClient::new(&config.routing.base_url, key, config.routing.timeout())
                    .context("Failed to build routing client")?,
            )),
            _ => {
                warn!("No routing API key configured, distances use the great-circle estimate");
                None
            }
        };
        let resolver = Arc::new(RouteDistanceResolver::new(
            provider,
            Arc::new(cache),
            resolver_config(config),
        ));

        // Kafka
        let audit: Arc<dyn AuditSink> = Arc::new(
            EventProducer::new(&config.kafka.brokers, &config.kafka.payment_topic)
                .context("Failed to create Kafka producer")?,
        );

        // Mail
        let mailer = SmtpMailer::new(
            &config.smtp.server,
            config.smtp.port,
            config.smtp.username.clone(),
            config.smtp.password.clone(),
            &config.notifications.from_email,
            &config.notifications.from_name,
        )
        .context("Failed to configure SMTP")?;
        let notifier = NotificationDispatcher::new(
            Arc::new(mailer),
            NotificationConfig {
                company_name: config.notifications.from_name.clone(),
                admin_email: config.notifications.admin_email.clone(),
            },
        );

        let gateway: Arc<dyn PaymentGateway> = match config.payment.gateway.as_str() {
            "sandbox" => Arc::new(SandboxGateway),
            other => bail!("Unsupported payment gateway '{}'", other),
        };

        let store = Arc::new(StoreReservationRepository::new(db.pool.clone()));
        let catalog = Arc::new(StoreCatalogRepository::new(db.pool.clone()));

        let reservations = Arc::new(ReservationService::new(
            store.clone(),
            catalog,
            resolver,
            audit.clone(),
            ReservationRules {
                currency: business_rules.currency.clone(),
                min_chauffeur_hours: business_rules.min_chauffeur_hours,
                max_chauffeur_hours: business_rules.max_chauffeur_hours,
            },
        ));
        let payments = PaymentOrchestrator::new(gateway, store, notifier, audit);

        info!("Booking core ready (gateway: {})", config.payment.gateway);

        Ok(Self {
            db: Arc::new(db),
            api: BookingApi::new(reservations, payments),
            business_rules,
        })
    }
}

fn resolver_config(config: &Config) -> ResolverConfig {
    ResolverConfig {
        provider_timeout: config.routing.timeout(),
        cache_timeout: Duration::from_millis(config.cache.timeout_ms),
        provider_ttl: Duration::from_secs(config.cache.provider_ttl_secs),
        fallback_ttl: Duration::from_secs(config.cache.fallback_ttl_secs),
        average_speed_kmh: config.routing.average_speed_kmh,
    }
}
