use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ridebook_catalog::{Quote, TripRequest};
use ridebook_core::{
    Booking, BookingRepository, Customer, LedgerEntry, PaymentChange, PaymentSession, PaymentStatus,
    StoreError,
};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

const BOOKING_COLUMNS: &str = "id, vehicle_id, vehicle_name, customer_name, customer_email, customer_phone, \
    trip, quote, status, payment_status, session, session_generation, amount_paid, \
    payment_method_summary, amount_mismatch, paid_at, created_at, updated_at";

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    vehicle_id: String,
    vehicle_name: String,
    customer_name: String,
    customer_email: String,
    customer_phone: String,
    trip: Json<TripRequest>,
    quote: Json<Quote>,
    status: String,
    payment_status: String,
    session: Option<Json<PaymentSession>>,
    session_generation: i32,
    amount_paid: i64,
    payment_method_summary: Option<String>,
    amount_mismatch: bool,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            vehicle_id: row.vehicle_id,
            vehicle_name: row.vehicle_name,
            customer: Customer {
                name: row.customer_name,
                email: row.customer_email,
                phone: row.customer_phone,
            },
            trip: row.trip.0,
            quote: row.quote.0,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            payment_status: row.payment_status.parse().map_err(StoreError::Corrupt)?,
            session: row.session.map(|s| s.0),
            session_generation: u32::try_from(row.session_generation)
                .map_err(|_| StoreError::Corrupt(format!("negative session generation on {}", row.id)))?,
            amount_paid: row.amount_paid,
            payment_method_summary: row.payment_method_summary,
            amount_mismatch: row.amount_mismatch,
            paid_at: row.paid_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct LedgerRow {
    id: Uuid,
    booking_id: Uuid,
    ledger_key: String,
    event_id: Option<String>,
    amount: i64,
    currency: String,
    created_at: DateTime<Utc>,
}

impl From<LedgerRow> for LedgerEntry {
    fn from(row: LedgerRow) -> Self {
        LedgerEntry {
            id: row.id,
            booking_id: row.booking_id,
            ledger_key: row.ledger_key,
            event_id: row.event_id,
            amount: row.amount,
            currency: row.currency,
            created_at: row.created_at,
        }
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// The column is a Postgres INTEGER.
fn generation_column(id: Uuid, generation: u32) -> Result<i32, StoreError> {
    i32::try_from(generation)
        .map_err(|_| StoreError::Corrupt(format!("session generation {} out of range on {}", generation, id)))
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        let generation = generation_column(booking.id, booking.session_generation)?;
        sqlx::query(
            r#"
            INSERT INTO bookings (id, vehicle_id, vehicle_name, customer_name, customer_email, customer_phone,
                                  trip, quote, status, payment_status, session_generation, amount_paid,
                                  amount_mismatch, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(booking.id)
        .bind(&booking.vehicle_id)
        .bind(&booking.vehicle_name)
        .bind(&booking.customer.name)
        .bind(&booking.customer.email)
        .bind(&booking.customer.phone)
        .bind(Json(&booking.trip))
        .bind(Json(&booking.quote))
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(generation)
        .bind(booking.amount_paid)
        .bind(booking.amount_mismatch)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return StoreError::Duplicate(booking.id);
                }
            }
            backend(e)
        })?;

        Ok(())
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(Booking::try_from).transpose()
    }

    async fn find_by_session_ref(&self, session_ref: &str) -> Result<Option<Booking>, StoreError> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {} FROM bookings WHERE session_ref = $1",
            BOOKING_COLUMNS
        ))
        .bind(session_ref)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(Booking::try_from).transpose()
    }

    async fn attach_session(
        &self,
        id: Uuid,
        expected_generation: u32,
        session: &PaymentSession,
    ) -> Result<Option<Booking>, StoreError> {
        let expected_generation = generation_column(id, expected_generation)?;
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            UPDATE bookings
            SET session = $3, session_ref = $4, session_generation = session_generation + 1, updated_at = NOW()
            WHERE id = $1 AND session_generation = $2
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(id)
        .bind(expected_generation)
        .bind(Json(session))
        .bind(&session.session_ref)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(Booking::try_from).transpose()
    }

    async fn update_payment(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        change: &PaymentChange,
    ) -> Result<Option<Booking>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let row = sqlx::query_as::<_, BookingRow>(&format!(
            r#"
            UPDATE bookings
            SET status = $3,
                payment_status = $4,
                amount_paid = $5,
                payment_method_summary = COALESCE($6, payment_method_summary),
                amount_mismatch = $7,
                paid_at = COALESCE($8, paid_at),
                updated_at = NOW()
            WHERE id = $1 AND payment_status = $2
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        ))
        .bind(id)
        .bind(expected.as_str())
        .bind(change.status.as_str())
        .bind(change.payment_status.as_str())
        .bind(change.amount_paid)
        .bind(change.payment_method_summary.as_deref())
        .bind(change.amount_mismatch)
        .bind(change.paid_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?;

        let Some(row) = row else {
            tx.rollback().await.map_err(backend)?;
            return Ok(None);
        };

        if let Some(entry) = &change.ledger_entry {
            sqlx::query(
                r#"
                INSERT INTO payment_ledger (id, booking_id, ledger_key, event_id, amount, currency, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (booking_id, ledger_key) DO NOTHING
                "#,
            )
            .bind(entry.id)
            .bind(entry.booking_id)
            .bind(&entry.ledger_key)
            .bind(entry.event_id.as_deref())
            .bind(entry.amount)
            .bind(&entry.currency)
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)?;

        Booking::try_from(row).map(Some)
    }

    async fn ledger_entries(&self, booking_id: Uuid) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows = sqlx::query_as::<_, LedgerRow>(
            "SELECT id, booking_id, ledger_key, event_id, amount, currency, created_at FROM payment_ledger WHERE booking_id = $1 ORDER BY created_at",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows.into_iter().map(LedgerEntry::from).collect())
    }
}
