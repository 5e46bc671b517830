use async_trait::async_trait;
use ridebook_catalog::VehicleRateRecord;
use ridebook_core::{StoreError, VehicleCatalog};
use sqlx::PgPool;
use tracing::info;

pub struct PgVehicleCatalog {
    pool: PgPool,
}

impl PgVehicleCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts vehicles that are not in the table yet. Existing rows win.
    pub async fn seed(&self, vehicles: &[VehicleRateRecord]) -> Result<u64, StoreError> {
        let mut inserted = 0;
        for v in vehicles {
            let result = sqlx::query(
                r#"
                INSERT INTO vehicles (id, name, airport_transfer_price, trip_price, six_hour_price, twelve_hour_price, per_hour_rate)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (id) DO NOTHING
                "#,
            )
            .bind(&v.vehicle_id)
            .bind(&v.name)
            .bind(v.airport_transfer_price)
            .bind(v.trip_price)
            .bind(v.six_hour_price)
            .bind(v.twelve_hour_price)
            .bind(v.per_hour_rate)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
            inserted += result.rows_affected();
        }
        info!(inserted, "Seeded vehicle catalog");
        Ok(inserted)
    }
}

#[derive(sqlx::FromRow)]
struct VehicleRow {
    id: String,
    name: String,
    airport_transfer_price: Option<i64>,
    trip_price: Option<i64>,
    six_hour_price: Option<i64>,
    twelve_hour_price: Option<i64>,
    per_hour_rate: Option<i64>,
}

#[async_trait]
impl VehicleCatalog for PgVehicleCatalog {
    async fn vehicle_rate_record(&self, vehicle_id: &str) -> Result<Option<VehicleRateRecord>, StoreError> {
        let row = sqlx::query_as::<_, VehicleRow>(
            "SELECT id, name, airport_transfer_price, trip_price, six_hour_price, twelve_hour_price, per_hour_rate \
             FROM vehicles WHERE id = $1 AND is_active",
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(row.map(|r| VehicleRateRecord {
            vehicle_id: r.id,
            name: r.name,
            airport_transfer_price: r.airport_transfer_price,
            trip_price: r.trip_price,
            six_hour_price: r.six_hour_price,
            twelve_hour_price: r.twelve_hour_price,
            per_hour_rate: r.per_hour_rate,
        }))
    }
}
