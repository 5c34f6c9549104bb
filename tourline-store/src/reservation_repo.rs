use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tourline_core::repository::ReservationRepository;
use tourline_core::reservation::{
    AdditionalPassenger, CustomerContact, PaymentStatus, Reservation, ReservationAddOn, ReservationType,
};
use tourline_core::BoxError;
use tourline_shared::{Masked, Money};
use tracing::debug;
use uuid::Uuid;

pub struct StoreReservationRepository {
    pool: PgPool,
}

impl StoreReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    full_name: String,
    email: String,
    phone: Option<String>,
    vehicle_id: Option<Uuid>,
    tour_id: Option<Uuid>,
    reservation_type: Option<String>,
    pickup_location: String,
    dropoff_location: String,
    pickup_at: DateTime<Utc>,
    passengers: i32,
    total_minor: i64,
    currency: String,
    payment_status: String,
    payment_reference: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct PassengerRow {
    first_name: String,
    last_name: String,
}

#[derive(sqlx::FromRow)]
struct AddOnRow {
    add_on_id: Uuid,
    name: String,
    quantity: i32,
    unit_price_minor: i64,
    line_total_minor: i64,
    currency: String,
}

impl ReservationRow {
    fn into_reservation(
        self,
        passengers: Vec<PassengerRow>,
        add_ons: Vec<AddOnRow>,
    ) -> Result<Reservation, BoxError> {
        let reservation_type = self
            .reservation_type
            .as_deref()
            .map(str::parse::<ReservationType>)
            .transpose()?;
        let payment_status: PaymentStatus = self.payment_status.parse()?;

        Ok(Reservation {
            id: self.id,
            customer: CustomerContact {
                full_name: self.full_name,
                email: Masked(self.email),
                phone: self.phone,
            },
            vehicle_id: self.vehicle_id,
            tour_id: self.tour_id,
            reservation_type,
            pickup_location: self.pickup_location,
            dropoff_location: self.dropoff_location,
            pickup_at: self.pickup_at,
            passengers: u32::try_from(self.passengers)?,
            additional_passengers: passengers
                .into_iter()
                .map(|p| AdditionalPassenger {
                    first_name: p.first_name,
                    last_name: p.last_name,
                })
                .collect(),
            add_ons: add_ons
                .into_iter()
                .map(|a| {
                    Ok(ReservationAddOn {
                        add_on_id: a.add_on_id,
                        name: a.name,
                        quantity: u32::try_from(a.quantity)?,
                        unit_price: Money::new(a.unit_price_minor, a.currency.clone()),
                        line_total: Money::new(a.line_total_minor, a.currency),
                    })
                })
                .collect::<Result<Vec<_>, BoxError>>()?,
            total_price: Money::new(self.total_minor, self.currency),
            payment_status,
            payment_reference: self.payment_reference,
            notes: self.notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl ReservationRepository for StoreReservationRepository {
    async fn create_reservation(&self, reservation: &Reservation) -> Result<Uuid, BoxError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO reservations (id, full_name, email, phone, vehicle_id, tour_id, reservation_type,
                pickup_location, dropoff_location, pickup_at, passengers, total_minor, currency,
                payment_status, payment_reference, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(reservation.id)
        .bind(&reservation.customer.full_name)
        .bind(reservation.customer.email.expose())
        .bind(&reservation.customer.phone)
        .bind(reservation.vehicle_id)
        .bind(reservation.tour_id)
        .bind(reservation.reservation_type.map(|t| t.as_str()))
        .bind(&reservation.pickup_location)
        .bind(&reservation.dropoff_location)
        .bind(reservation.pickup_at)
        .bind(i32::try_from(reservation.passengers)?)
        .bind(reservation.total_price.amount_minor)
        .bind(&reservation.total_price.currency)
        .bind(reservation.payment_status.as_str())
        .bind(&reservation.payment_reference)
        .bind(&reservation.notes)
        .bind(reservation.created_at)
        .bind(reservation.updated_at)
        .execute(&mut *tx)
        .await?;

        for (position, passenger) in reservation.additional_passengers.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO reservation_passengers (reservation_id, position, first_name, last_name)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(reservation.id)
            .bind(i32::try_from(position)?)
            .bind(&passenger.first_name)
            .bind(&passenger.last_name)
            .execute(&mut *tx)
            .await?;
        }

        for add_on in &reservation.add_ons {
            sqlx::query(
                r#"
                INSERT INTO reservation_add_ons (reservation_id, add_on_id, name, quantity, unit_price_minor, line_total_minor, currency)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(reservation.id)
            .bind(add_on.add_on_id)
            .bind(&add_on.name)
            .bind(i32::try_from(add_on.quantity)?)
            .bind(add_on.unit_price.amount_minor)
            .bind(add_on.line_total.amount_minor)
            .bind(&add_on.line_total.currency)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("Reservation {} persisted", reservation.id);
        Ok(reservation.id)
    }

    async fn get_reservation(&self, id: Uuid) -> Result<Option<Reservation>, BoxError> {
        let row = sqlx::query_as::<_, ReservationRow>(
            r#"
            SELECT id, full_name, email, phone, vehicle_id, tour_id, reservation_type,
                pickup_location, dropoff_location, pickup_at, passengers, total_minor, currency,
                payment_status, payment_reference, notes, created_at, updated_at
            FROM reservations WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let passengers = sqlx::query_as::<_, PassengerRow>(
            "SELECT first_name, last_name FROM reservation_passengers WHERE reservation_id = $1 ORDER BY position",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let add_ons = sqlx::query_as::<_, AddOnRow>(
            r#"
            SELECT add_on_id, name, quantity, unit_price_minor, line_total_minor, currency
            FROM reservation_add_ons WHERE reservation_id = $1 ORDER BY name
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        row.into_reservation(passengers, add_ons).map(Some)
    }

    async fn transition_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        payment_reference: Option<&str>,
    ) -> Result<bool, BoxError> {
        if !PaymentStatus::Pending.can_transition_to(status) {
            return Err(format!("invalid payment status transition to {}", status).into());
        }

        // Guarded on PENDING so a terminal status is never overwritten
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET payment_status = $2,
                payment_reference = COALESCE($3, payment_reference),
                updated_at = NOW()
            WHERE id = $1 AND payment_status = 'PENDING'
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(payment_reference)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
