//! In-process stores for development and tests.
//!
//! Each booking and its ledger live in one `DashMap` entry, so the shard
//! write lock taken by `get_mut` covers the whole check-and-mutate.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ridebook_catalog::VehicleRateRecord;
use ridebook_core::{
    Booking, BookingRepository, LedgerEntry, PaymentChange, PaymentSession, PaymentStatus, StoreError,
    VehicleCatalog,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

struct BookingRecord {
    booking: Booking,
    ledger: Vec<LedgerEntry>,
}

#[derive(Clone, Default)]
pub struct InMemoryBookingStore {
    records: Arc<DashMap<Uuid, BookingRecord>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingStore {
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        match self.records.entry(booking.id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(booking.id)),
            Entry::Vacant(slot) => {
                slot.insert(BookingRecord {
                    booking: booking.clone(),
                    ledger: Vec::new(),
                });
                Ok(())
            }
        }
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        Ok(self.records.get(&id).map(|r| r.booking.clone()))
    }

    async fn find_by_session_ref(&self, session_ref: &str) -> Result<Option<Booking>, StoreError> {
        Ok(self
            .records
            .iter()
            .find(|r| r.booking.session_ref() == Some(session_ref))
            .map(|r| r.booking.clone()))
    }

    async fn attach_session(
        &self,
        id: Uuid,
        expected_generation: u32,
        session: &PaymentSession,
    ) -> Result<Option<Booking>, StoreError> {
        let Some(mut record) = self.records.get_mut(&id) else {
            return Ok(None);
        };
        if record.booking.session_generation != expected_generation {
            return Ok(None);
        }
        record.booking.attach_session(session.clone());
        Ok(Some(record.booking.clone()))
    }

    async fn update_payment(
        &self,
        id: Uuid,
        expected: PaymentStatus,
        change: &PaymentChange,
    ) -> Result<Option<Booking>, StoreError> {
        let Some(mut record) = self.records.get_mut(&id) else {
            return Ok(None);
        };
        if record.booking.payment_status != expected {
            return Ok(None);
        }

        record.booking.apply_change(change);
        if let Some(entry) = &change.ledger_entry {
            if !record.ledger.iter().any(|e| e.ledger_key == entry.ledger_key) {
                record.ledger.push(entry.clone());
            }
        }
        Ok(Some(record.booking.clone()))
    }

    async fn ledger_entries(&self, booking_id: Uuid) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self
            .records
            .get(&booking_id)
            .map(|r| r.ledger.clone())
            .unwrap_or_default())
    }
}

/// Fixed fleet loaded from configuration.
#[derive(Clone, Default)]
pub struct StaticCatalog {
    vehicles: Arc<HashMap<String, VehicleRateRecord>>,
}

impl StaticCatalog {
    pub fn new(vehicles: impl IntoIterator<Item = VehicleRateRecord>) -> Self {
        Self {
            vehicles: Arc::new(vehicles.into_iter().map(|v| (v.vehicle_id.clone(), v)).collect()),
        }
    }
}

#[async_trait]
impl VehicleCatalog for StaticCatalog {
    async fn vehicle_rate_record(&self, vehicle_id: &str) -> Result<Option<VehicleRateRecord>, StoreError> {
        Ok(self.vehicles.get(vehicle_id).cloned())
    }
}
