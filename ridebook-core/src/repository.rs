use async_trait::async_trait;
use ridebook_catalog::VehicleRateRecord;
use uuid::Uuid;

use crate::booking::{Booking, LedgerEntry, PaymentChange, PaymentSession, PaymentStatus};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Booking already exists: {0}")]
    Duplicate(Uuid),

    #[error("Stored record is unreadable: {0}")]
    Corrupt(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Read access to the fleet catalog. The catalog owns vehicles; the pricing core only reads them.
#[async_trait]
pub trait VehicleCatalog: Send + Sync {
    async fn vehicle_rate_record(
        &self,
        vehicle_id: &str,
    ) -> Result<Option<VehicleRateRecord>, StoreError>;
}

/// Persistence for bookings.
///
/// The two conditional writes are the only way payment state changes, and
/// they are the per-booking serialization point: an implementation must
/// check the expected value and apply the change as one atomic step.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError>;

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    async fn find_by_session_ref(&self, session_ref: &str) -> Result<Option<Booking>, StoreError>;

    /// Attach `session` if the booking's session generation is still
    /// `expected_generation`. `None` means another caller attached first.
    async fn attach_session(
        &self,
        id: Uuid,
        expected_generation: u32,
        session: &PaymentSession,
    ) -> Result<Option<Booking>, StoreError>;

    /// Apply `change` if payment status is still `expected`, writing its ledger
    /// entry in the same step. `None` means the status moved underneath us.
    async fn update_payment(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        change: &PaymentChange,
    ) -> Result<Option<Booking>, StoreError>;

    async fn ledger_entries(&self, booking_id: Uuid) -> Result<Vec<LedgerEntry>, StoreError>;
}
