use async_trait::async_trait;
use sqlx::PgPool;
use tourline_core::catalog::{AddOnRate, TourRate, VehicleRate};
use tourline_core::repository::CatalogRepository;
use tourline_core::BoxError;
use tourline_shared::Money;
use uuid::Uuid;

/// Rates are read fresh on every quote so catalog edits apply immediately.
pub struct StoreCatalogRepository {
    pool: PgPool,
}

impl StoreCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct VehicleRow {
    id: Uuid,
    name: String,
    base_price_minor: i64,
    per_km_minor: i64,
    hourly_minor: i64,
    currency: String,
}

#[derive(sqlx::FromRow)]
struct TourRow {
    id: Uuid,
    name: String,
    per_person_minor: i64,
    currency: String,
}

#[derive(sqlx::FromRow)]
struct AddOnRow {
    id: Uuid,
    name: String,
    price_minor: i64,
    currency: String,
}

#[async_trait]
impl CatalogRepository for StoreCatalogRepository {
    async fn get_vehicle_rate(&self, id: Uuid) -> Result<Option<VehicleRate>, BoxError> {
        let row = sqlx::query_as::<_, VehicleRow>(
            r#"
            SELECT id, name, base_price_minor, per_km_minor, hourly_minor, currency
            FROM vehicles WHERE id = $1 AND is_active
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| VehicleRate {
            vehicle_id: r.id,
            name: r.name,
            base_price: Money::new(r.base_price_minor, r.currency.clone()),
            per_km: Money::new(r.per_km_minor, r.currency.clone()),
            hourly: Money::new(r.hourly_minor, r.currency),
        }))
    }

    async fn get_tour_rate(&self, id: Uuid) -> Result<Option<TourRate>, BoxError> {
        let row = sqlx::query_as::<_, TourRow>(
            "SELECT id, name, per_person_minor, currency FROM tours WHERE id = $1 AND is_active",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| TourRate {
            tour_id: r.id,
            name: r.name,
            per_person: Money::new(r.per_person_minor, r.currency),
        }))
    }

    async fn get_add_on(&self, id: Uuid) -> Result<Option<AddOnRate>, BoxError> {
        let row = sqlx::query_as::<_, AddOnRow>(
            "SELECT id, name, price_minor, currency FROM add_ons WHERE id = $1 AND is_active",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| AddOnRate {
            add_on_id: r.id,
            name: r.name,
            unit_price: Money::new(r.price_minor, r.currency),
        }))
    }
}
