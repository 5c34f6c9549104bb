use crate::request::{AddOnSelection, CreateReservationRequest, ServiceRequest};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;
use tourline_catalog::{PriceQuote, PriceQuoteEngine, QuoteError, RouteDistanceResolver};
use tourline_core::audit::AuditSink;
use tourline_core::repository::{CatalogRepository, ReservationRepository};
use tourline_core::reservation::{AdditionalPassenger, CustomerContact, Reservation, ReservationAddOn};
use tourline_core::routing::RouteEstimate;
use tourline_core::{CoreError, CoreResult};
use tourline_shared::models::events::ReservationCreatedEvent;
use tourline_shared::pii::mask_email;
use tourline_shared::{Masked, Money};
use tracing::{debug, info, warn};
use uuid::Uuid;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern is valid")
});

pub const PASSENGER_DETAILS_REQUIRED: &str = "passenger details required";

/// Limits applied before pricing
#[derive(Debug, Clone)]
pub struct ReservationRules {
    /// Currency every catalog rate must be priced in.
    pub currency: String,
    pub min_chauffeur_hours: f64,
    pub max_chauffeur_hours: f64,
}

impl Default for ReservationRules {
    fn default() -> Self {
        Self {
            currency: "EUR".to_string(),
            min_chauffeur_hours: 4.0,
            max_chauffeur_hours: 24.0,
        }
    }
}

/// Server-side price breakdown for a request
#[derive(Debug, Clone, Serialize)]
pub struct ReservationQuote {
    pub service: PriceQuote,
    pub route: Option<RouteEstimate>,
    pub add_ons: Vec<ReservationAddOn>,
    pub total: Money,
}

/// Validates booking requests, prices them and creates reservations
pub struct ReservationService {
    store: Arc<dyn ReservationRepository>,
    catalog: Arc<dyn CatalogRepository>,
    resolver: Arc<RouteDistanceResolver>,
    audit: Arc<dyn AuditSink>,
    engine: PriceQuoteEngine,
    rules: ReservationRules,
}

impl ReservationService {
    pub fn new(
        store: Arc<dyn ReservationRepository>,
        catalog: Arc<dyn CatalogRepository>,
        resolver: Arc<RouteDistanceResolver>,
        audit: Arc<dyn AuditSink>,
        rules: ReservationRules,
    ) -> Self {
        Self {
            store,
            catalog,
            resolver,
            audit,
            engine: PriceQuoteEngine::new(),
            rules,
        }
    }

    /// Validate, price and persist a reservation in `Pending`.
    pub async fn create_reservation(
        &self,
        request: CreateReservationRequest,
    ) -> CoreResult<Reservation> {
        // 1. Validate request shape
        let passengers = validate_request(&request)?;

        // 2. Price authoritatively from catalog rates
        let quote = self.price(&request, passengers).await?;

        if let Some(client_total) = request.total_price {
            let client_minor = (client_total * 100.0).round() as i64;
            if client_minor != quote.total.amount_minor {
                warn!(
                    "Client total {:.2} differs from server total {}; using server total",
                    client_total, quote.total
                );
            }
        }

        // 3. Build aggregate
        let reservation_type = request
            .reservation_type
            .or_else(|| Some(request.service.default_type()));

        let mut reservation = Reservation::new(
            CustomerContact {
                full_name: request.full_name.trim().to_string(),
                email: Masked(request.email.trim().to_string()),
                phone: request.phone.filter(|p| !p.trim().is_empty()),
            },
            request.service.vehicle_id(),
            request.service.tour_id(),
            reservation_type,
            request.pickup_location,
            request.dropoff_location,
            request.pickup_at,
            passengers,
            quote.total.clone(),
        );
        reservation.additional_passengers = request
            .additional_passengers
            .into_iter()
            .map(|p| AdditionalPassenger {
                first_name: p.first_name.trim().to_string(),
                last_name: p.last_name.trim().to_string(),
            })
            .collect();
        reservation.add_ons = quote.add_ons;
        reservation.notes = request.notes.filter(|n| !n.trim().is_empty());

        // 4. Persist
        let id = self
            .store
            .create_reservation(&reservation)
            .await
            .map_err(CoreError::internal)?;
        reservation.id = id;

        info!(
            "Reservation {} created for {} ({}), total {}",
            reservation.id,
            mask_email(reservation.customer.email.expose()),
            reservation_type.map(|t| t.as_str()).unwrap_or("untyped"),
            reservation.total_price
        );

        let event = ReservationCreatedEvent {
            reservation_id: reservation.id,
            reservation_type: reservation_type.map(|t| t.as_str().to_string()),
            total_minor: reservation.total_price.amount_minor,
            currency: reservation.total_price.currency.clone(),
            timestamp: reservation.created_at.timestamp(),
        };
        // The reservation is stored; the broker is not on the request path.
        let audit = self.audit.clone();
        tokio::spawn(async move {
            if let Err(e) = audit.reservation_created(&event).await {
                warn!("Failed to publish reservation.created for {}: {}", event.reservation_id, e);
            }
        });

        Ok(reservation)
    }

    /// Price a request without persisting anything.
    pub async fn quote(&self, request: &CreateReservationRequest) -> CoreResult<ReservationQuote> {
        let passengers = validate_request(request)?;
        self.price(request, passengers).await
    }

    pub async fn get_reservation(&self, id: Uuid) -> CoreResult<Reservation> {
        self.store
            .get_reservation(id)
            .await
            .map_err(CoreError::internal)?
            .ok_or_else(|| CoreError::not_found("reservation", id))
    }

    async fn price(
        &self,
        request: &CreateReservationRequest,
        passengers: u32,
    ) -> CoreResult<ReservationQuote> {
        let (service, route) = self.quote_service(&request.service, passengers).await?;
        if service.amount.currency != self.rules.currency {
            return Err(CoreError::internal(format!(
                "catalog rate priced in {}, expected {}",
                service.amount.currency, self.rules.currency
            )));
        }
        let add_ons = self.resolve_add_ons(&request.add_ons, &service.amount.currency).await?;

        let mut total = service.amount.clone();
        for line in &add_ons {
            total = total.checked_add(&line.line_total).ok_or_else(|| {
                CoreError::internal(format!(
                    "add-on {} priced in {} cannot be added to a {} total",
                    line.add_on_id, line.line_total.currency, total.currency
                ))
            })?;
        }

        Ok(ReservationQuote {
            service,
            route,
            add_ons,
            total,
        })
    }

    async fn quote_service(
        &self,
        service: &ServiceRequest,
        passengers: u32,
    ) -> CoreResult<(PriceQuote, Option<RouteEstimate>)> {
        match service {
            ServiceRequest::Transfer {
                vehicle_id,
                from,
                to,
                round_trip,
            } => {
                if !from.is_valid() || !to.is_valid() {
                    return Err(CoreError::validation("pickup and dropoff coordinates are invalid"));
                }
                let rate = self
                    .catalog
                    .get_vehicle_rate(*vehicle_id)
                    .await
                    .map_err(CoreError::internal)?
                    .ok_or_else(|| CoreError::not_found("vehicle", vehicle_id))?;
                let route = self.resolver.resolve(*from, *to).await;
                let quote = self.engine.quote_transfer(&rate, route.distance_km, *round_trip)?;
                Ok((quote, Some(route)))
            }
            ServiceRequest::Chauffeur {
                vehicle_id,
                duration_hours,
            } => {
                if !duration_hours.is_finite() || *duration_hours <= 0.0 {
                    return Err(QuoteError::InvalidInput {
                        field: "duration_hours",
                        value: *duration_hours,
                    }
                    .into());
                }
                let hours = duration_hours
                    .clamp(self.rules.min_chauffeur_hours, self.rules.max_chauffeur_hours);
                let rate = self
                    .catalog
                    .get_vehicle_rate(*vehicle_id)
                    .await
                    .map_err(CoreError::internal)?
                    .ok_or_else(|| CoreError::not_found("vehicle", vehicle_id))?;
                Ok((self.engine.quote_chauffeur(&rate, hours)?, None))
            }
            ServiceRequest::Tour { tour_id } => {
                let rate = self
                    .catalog
                    .get_tour_rate(*tour_id)
                    .await
                    .map_err(CoreError::internal)?
                    .ok_or_else(|| CoreError::not_found("tour", tour_id))?;
                Ok((self.engine.quote_tour(&rate, passengers)?, None))
            }
        }
    }

    // Unknown ids and non-positive quantities are dropped, not rejected.
    async fn resolve_add_ons(
        &self,
        selections: &[AddOnSelection],
        currency: &str,
    ) -> CoreResult<Vec<ReservationAddOn>> {
        let mut lines = Vec::with_capacity(selections.len());

        for selection in selections {
            let quantity = match u32::try_from(selection.quantity) {
                Ok(q) if q > 0 => q,
                _ => {
                    debug!(
                        "Dropping add-on {} with quantity {}",
                        selection.add_on_id, selection.quantity
                    );
                    continue;
                }
            };

            let Some(rate) = self
                .catalog
                .get_add_on(selection.add_on_id)
                .await
                .map_err(CoreError::internal)?
            else {
                debug!("Dropping unknown add-on {}", selection.add_on_id);
                continue;
            };

            if rate.unit_price.currency != currency {
                return Err(CoreError::internal(format!(
                    "add-on {} is priced in {}, expected {}",
                    rate.add_on_id, rate.unit_price.currency, currency
                )));
            }

            // Repeated selections of one add-on collapse into a single line
            let quantity = match lines.iter().position(|l: &ReservationAddOn| l.add_on_id == rate.add_on_id) {
                Some(i) => {
                    let previous = lines.remove(i);
                    previous
                        .quantity
                        .checked_add(quantity)
                        .ok_or_else(|| CoreError::validation("add-on quantity is out of range"))?
                }
                None => quantity,
            };

            let line_minor = rate
                .unit_price
                .amount_minor
                .checked_mul(i64::from(quantity))
                .ok_or_else(|| CoreError::validation("add-on quantity is out of range"))?;

            lines.push(ReservationAddOn {
                add_on_id: rate.add_on_id,
                name: rate.name,
                quantity,
                line_total: Money::new(line_minor, rate.unit_price.currency.clone()),
                unit_price: rate.unit_price,
            });
        }

        Ok(lines)
    }
}

/// Checks run before any catalog lookup, in order: contact, passenger count,
/// passenger manifest, client total. Returns the passenger count.
pub fn validate_request(request: &CreateReservationRequest) -> CoreResult<u32> {
    let email = request.email.trim();
    if email.is_empty() {
        return Err(CoreError::validation("email is required"));
    }
    if !EMAIL_PATTERN.is_match(email) {
        return Err(CoreError::validation("email address is invalid"));
    }
    if request.full_name.trim().is_empty() {
        return Err(CoreError::validation("full name is required"));
    }

    if let Some(tag) = request.reservation_type {
        if !request.service.accepts_type(tag) {
            return Err(CoreError::validation(
                "reservation type does not match the requested service",
            ));
        }
    }

    let passengers = match u32::try_from(request.passengers) {
        Ok(p) if p >= 1 => p,
        _ => return Err(CoreError::validation("passengers must be at least 1")),
    };

    if passengers > 1 {
        let expected = (passengers - 1) as usize;
        let complete = request.additional_passengers.len() == expected
            && request
                .additional_passengers
                .iter()
                .all(|p| !p.first_name.trim().is_empty() && !p.last_name.trim().is_empty());
        if !complete {
            return Err(CoreError::validation(PASSENGER_DETAILS_REQUIRED));
        }
    }

    if let Some(total) = request.total_price {
        if !total.is_finite() || total < 0.0 {
            return Err(CoreError::validation("total price must be a non-negative number"));
        }
    }

    Ok(passengers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryReservationStore;
    use chrono::Utc;
    use tourline_catalog::{MemoryRouteCache, ResolverConfig, StaticCatalog};
    use tourline_core::audit::NoopAuditSink;
    use tourline_core::catalog::{AddOnRate, TourRate, VehicleRate};
    use tourline_core::reservation::{PaymentStatus, ReservationType};
    use tourline_core::routing::Coordinate;
    use tourline_core::BoxError;
    use tourline_shared::models::events::PaymentAttemptedEvent;
    use std::time::Duration;

    struct StalledAuditSink;

    #[async_trait::async_trait]
    impl AuditSink for StalledAuditSink {
        async fn reservation_created(&self, _event: &ReservationCreatedEvent) -> Result<(), BoxError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }

        async fn payment_attempted(&self, _event: &PaymentAttemptedEvent) -> Result<(), BoxError> {
            Ok(())
        }
    }

    struct Fixture {
        service: ReservationService,
        store: Arc<InMemoryReservationStore>,
        vehicle_id: Uuid,
        tour_id: Uuid,
        child_seat_id: Uuid,
    }

    fn fixture() -> Fixture {
        fixture_with_audit(Arc::new(NoopAuditSink))
    }

    fn fixture_with_audit(audit: Arc<dyn AuditSink>) -> Fixture {
        let vehicle_id = Uuid::new_v4();
        let tour_id = Uuid::new_v4();
        let child_seat_id = Uuid::new_v4();
        let catalog = StaticCatalog::new()
            .with_vehicle(VehicleRate {
                vehicle_id,
                name: "Mercedes Vito".to_string(),
                base_price: Money::new(9900, "EUR"),
                per_km: Money::new(250, "EUR"),
                hourly: Money::new(5000, "EUR"),
            })
            .with_tour(TourRate {
                tour_id,
                name: "Bosphorus Cruise".to_string(),
                per_person: Money::new(7500, "EUR"),
            })
            .with_add_on(AddOnRate {
                add_on_id: child_seat_id,
                name: "Child seat".to_string(),
                unit_price: Money::new(1000, "EUR"),
            });
        let store = Arc::new(InMemoryReservationStore::new());
        let resolver = Arc::new(RouteDistanceResolver::new(
            None,
            Arc::new(MemoryRouteCache::new()),
            ResolverConfig::default(),
        ));
        let service = ReservationService::new(
            store.clone(),
            Arc::new(catalog),
            resolver,
            audit,
            ReservationRules::default(),
        );
        Fixture {
            service,
            store,
            vehicle_id,
            tour_id,
            child_seat_id,
        }
    }

    fn request(service: ServiceRequest) -> CreateReservationRequest {
        CreateReservationRequest {
            full_name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            phone: None,
            service,
            reservation_type: None,
            pickup_location: "Hotel Pera".to_string(),
            dropoff_location: "Topkapi Palace".to_string(),
            pickup_at: Utc::now(),
            passengers: 1,
            additional_passengers: vec![],
            add_ons: vec![],
            total_price: None,
            notes: None,
        }
    }

    fn passenger(first: &str, last: &str) -> AdditionalPassenger {
        AdditionalPassenger {
            first_name: first.to_string(),
            last_name: last.to_string(),
        }
    }

    #[tokio::test]
    async fn test_chauffeur_reservation_is_priced_and_pending() {
        let f = fixture();
        let reservation = f
            .service
            .create_reservation(request(ServiceRequest::Chauffeur {
                vehicle_id: f.vehicle_id,
                duration_hours: 6.0,
            }))
            .await
            .unwrap();

        assert_eq!(reservation.total_price, Money::new(30000, "EUR"));
        assert_eq!(reservation.payment_status, PaymentStatus::Pending);
        assert_eq!(reservation.reservation_type, Some(ReservationType::Chauffeur));
        assert_eq!(reservation.vehicle_id, Some(f.vehicle_id));
        assert!(reservation.tour_id.is_none());

        let stored = f.store.get(reservation.id).await.unwrap();
        assert_eq!(stored.total_price, reservation.total_price);
    }

    #[tokio::test]
    async fn test_chauffeur_duration_is_clamped_to_buckets() {
        let f = fixture();
        let short = f
            .service
            .quote(&request(ServiceRequest::Chauffeur {
                vehicle_id: f.vehicle_id,
                duration_hours: 1.0,
            }))
            .await
            .unwrap();
        assert_eq!(short.total, Money::new(20000, "EUR"));

        let long = f
            .service
            .quote(&request(ServiceRequest::Chauffeur {
                vehicle_id: f.vehicle_id,
                duration_hours: 30.0,
            }))
            .await
            .unwrap();
        assert_eq!(long.total, Money::new(120000, "EUR"));
    }

    #[tokio::test]
    async fn test_tour_uses_passenger_count_and_add_ons() {
        let f = fixture();
        let mut req = request(ServiceRequest::Tour { tour_id: f.tour_id });
        req.passengers = 3;
        req.additional_passengers = vec![passenger("John", "Doe"), passenger("Ada", "Doe")];
        req.add_ons = vec![
            AddOnSelection { add_on_id: f.child_seat_id, quantity: 2 },
            AddOnSelection { add_on_id: Uuid::new_v4(), quantity: 1 },
            AddOnSelection { add_on_id: f.child_seat_id, quantity: 0 },
            AddOnSelection { add_on_id: f.child_seat_id, quantity: -4 },
        ];

        let reservation = f.service.create_reservation(req).await.unwrap();

        assert_eq!(reservation.add_ons.len(), 1);
        assert_eq!(reservation.add_ons[0].quantity, 2);
        assert_eq!(reservation.add_ons[0].line_total, Money::new(2000, "EUR"));
        assert_eq!(reservation.total_price, Money::new(22500 + 2000, "EUR"));
        assert_eq!(reservation.additional_passengers.len(), 2);
    }

    #[tokio::test]
    async fn test_repeated_add_on_selections_are_merged() {
        let f = fixture();
        let mut req = request(ServiceRequest::Tour { tour_id: f.tour_id });
        req.add_ons = vec![
            AddOnSelection { add_on_id: f.child_seat_id, quantity: 1 },
            AddOnSelection { add_on_id: f.child_seat_id, quantity: 2 },
        ];

        let quote = f.service.quote(&req).await.unwrap();

        assert_eq!(quote.add_ons.len(), 1);
        assert_eq!(quote.add_ons[0].quantity, 3);
        assert_eq!(quote.total, Money::new(7500 + 3000, "EUR"));
    }

    #[tokio::test]
    async fn test_missing_passenger_details_rejected() {
        let f = fixture();
        let mut req = request(ServiceRequest::Tour { tour_id: f.tour_id });
        req.passengers = 3;
        req.additional_passengers = vec![passenger("John", "Doe")];

        let err = f.service.create_reservation(req).await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(ref m) if m == PASSENGER_DETAILS_REQUIRED));
        assert_eq!(f.store.len().await, 0);
    }

    #[tokio::test]
    async fn test_blank_passenger_name_rejected() {
        let f = fixture();
        let mut req = request(ServiceRequest::Tour { tour_id: f.tour_id });
        req.passengers = 2;
        req.additional_passengers = vec![passenger("John", "  ")];

        let err = f.service.create_reservation(req).await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(ref m) if m == PASSENGER_DETAILS_REQUIRED));
    }

    #[tokio::test]
    async fn test_client_total_is_overridden() {
        let f = fixture();
        let mut req = request(ServiceRequest::Chauffeur {
            vehicle_id: f.vehicle_id,
            duration_hours: 6.0,
        });
        req.total_price = Some(1.0);

        let reservation = f.service.create_reservation(req).await.unwrap();
        assert_eq!(reservation.total_price, Money::new(30000, "EUR"));
    }

    #[tokio::test]
    async fn test_validation_order_and_messages() {
        let f = fixture();
        let base = request(ServiceRequest::Tour { tour_id: f.tour_id });

        let mut bad_email = base.clone();
        bad_email.email = "not-an-email".to_string();
        bad_email.passengers = 0;
        let err = f.service.create_reservation(bad_email).await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(ref m) if m.contains("email")));

        let mut no_passengers = base.clone();
        no_passengers.passengers = 0;
        let err = f.service.create_reservation(no_passengers).await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(ref m) if m.contains("passengers")));

        let mut negative_total = base.clone();
        negative_total.total_price = Some(-10.0);
        let err = f.service.create_reservation(negative_total).await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));

        let mut nan_total = base;
        nan_total.total_price = Some(f64::NAN);
        let err = f.service.create_reservation(nan_total).await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_stalled_audit_sink_does_not_delay_create() {
        let f = fixture_with_audit(Arc::new(StalledAuditSink));
        let reservation = tokio::time::timeout(
            Duration::from_secs(1),
            f.service.create_reservation(request(ServiceRequest::Tour { tour_id: f.tour_id })),
        )
        .await
        .expect("create waited on the audit sink")
        .unwrap();

        let stored = f.store.get(reservation.id).await.unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_reservation_type_must_fit_service() {
        let f = fixture();
        let transfer = ServiceRequest::Transfer {
            vehicle_id: f.vehicle_id,
            from: Coordinate::new(41.2753, 28.7519),
            to: Coordinate::new(41.0054, 28.9768),
            round_trip: false,
        };

        let mut featured = request(transfer);
        featured.reservation_type = Some(ReservationType::FeaturedTransfer);
        let reservation = f.service.create_reservation(featured).await.unwrap();
        assert_eq!(reservation.reservation_type, Some(ReservationType::FeaturedTransfer));

        let mut tour_as_chauffeur = request(ServiceRequest::Tour { tour_id: f.tour_id });
        tour_as_chauffeur.reservation_type = Some(ReservationType::Chauffeur);
        let err = f.service.create_reservation(tour_as_chauffeur).await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(ref m) if m.contains("reservation type")));

        let mut featured_tour = request(ServiceRequest::Tour { tour_id: f.tour_id });
        featured_tour.reservation_type = Some(ReservationType::FeaturedTransfer);
        let err = f.service.quote(&featured_tour).await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
        assert_eq!(f.store.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_vehicle_is_not_found() {
        let f = fixture();
        let err = f
            .service
            .create_reservation(request(ServiceRequest::Chauffeur {
                vehicle_id: Uuid::new_v4(),
                duration_hours: 5.0,
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_transfer_uses_resolved_distance() {
        let f = fixture();
        let from = Coordinate::new(41.2753, 28.7519);
        let to = Coordinate::new(41.0054, 28.9768);
        let quote = f
            .service
            .quote(&request(ServiceRequest::Transfer {
                vehicle_id: f.vehicle_id,
                from,
                to,
                round_trip: true,
            }))
            .await
            .unwrap();

        let route = quote.route.expect("transfer quotes carry a route");
        let expected = (route.distance_km * 250.0 * 2.0).round() as i64;
        assert_eq!(quote.total.amount_minor, expected);
    }

    #[tokio::test]
    async fn test_invalid_coordinates_rejected() {
        let f = fixture();
        let err = f
            .service
            .quote(&request(ServiceRequest::Transfer {
                vehicle_id: f.vehicle_id,
                from: Coordinate::new(123.0, 0.0),
                to: Coordinate::new(41.0, 29.0),
                round_trip: false,
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }

    #[test]
    fn test_email_pattern() {
        assert!(EMAIL_PATTERN.is_match("jane.doe+tours@mail.example.co.uk"));
        assert!(!EMAIL_PATTERN.is_match("jane@"));
        assert!(!EMAIL_PATTERN.is_match("@example.com"));
        assert!(!EMAIL_PATTERN.is_match("jane doe@example.com"));
    }
}
