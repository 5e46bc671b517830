#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use ridebook_catalog::{PricingConfig, QuoteCalculator, TripRequest, TripType, VehicleRateRecord};
use ridebook_core::{BookingRepository, Customer, LedgerEntry, NotificationDispatcher};
use ridebook_infra::{InMemoryBookingStore, SandboxProcessor, StaticCatalog};
use ridebook_order::{BookingOrchestrator, PaymentReconciler, PaymentSessionBridge, ReceiptAssembler};
use ridebook_shared::models::events::{BookingConfirmedEvent, PaymentAnomalyEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug)]
pub enum Notice {
    Confirmed(BookingConfirmedEvent),
    Anomaly(PaymentAnomalyEvent),
}

/// Forwards every notification to a channel the test can drain.
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notice>,
}

#[async_trait]
impl NotificationDispatcher for ChannelNotifier {
    async fn booking_confirmed(
        &self,
        event: &BookingConfirmedEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.tx.send(Notice::Confirmed(event.clone()))?;
        Ok(())
    }

    async fn payment_anomaly(
        &self,
        event: &PaymentAnomalyEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.tx.send(Notice::Anomaly(event.clone()))?;
        Ok(())
    }
}

/// Always fails; confirmations must still stick.
pub struct BrokenNotifier;

#[async_trait]
impl NotificationDispatcher for BrokenNotifier {
    async fn booking_confirmed(
        &self,
        _event: &BookingConfirmedEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err("broker down".into())
    }

    async fn payment_anomaly(
        &self,
        _event: &PaymentAnomalyEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err("broker down".into())
    }
}

pub struct Harness {
    pub store: InMemoryBookingStore,
    pub sandbox: SandboxProcessor,
    pub bookings: BookingOrchestrator,
    pub sessions: PaymentSessionBridge,
    pub reconciler: Arc<PaymentReconciler>,
    pub receipts: ReceiptAssembler,
    pub notices: mpsc::UnboundedReceiver<Notice>,
}

pub fn fleet() -> Vec<VehicleRateRecord> {
    vec![
        VehicleRateRecord {
            vehicle_id: "alphard".to_string(),
            name: "Toyota Alphard".to_string(),
            airport_transfer_price: Some(80),
            trip_price: Some(65),
            six_hour_price: Some(300),
            twelve_hour_price: Some(550),
            per_hour_rate: Some(55),
        },
        VehicleRateRecord {
            vehicle_id: "hiace".to_string(),
            name: "Toyota HiAce".to_string(),
            airport_transfer_price: Some(90),
            trip_price: Some(75),
            six_hour_price: None,
            twelve_hour_price: None,
            per_hour_rate: None,
        },
    ]
}

pub fn pricing() -> PricingConfig {
    PricingConfig {
        midnight_surcharge: 10,
        ..PricingConfig::default()
    }
}

pub fn harness() -> Harness {
    harness_with(None)
}

pub fn harness_with(notifier: Option<Arc<dyn NotificationDispatcher>>) -> Harness {
    let store = InMemoryBookingStore::new();
    let sandbox = SandboxProcessor::new("http://localhost:3000/sandbox/checkout", "whsec_test");
    let repo: Arc<dyn BookingRepository> = Arc::new(store.clone());
    let (tx, notices) = mpsc::unbounded_channel();
    let notifier = notifier.unwrap_or_else(|| -> Arc<dyn NotificationDispatcher> { Arc::new(ChannelNotifier { tx }) });

    Harness {
        bookings: BookingOrchestrator::new(
            Arc::new(StaticCatalog::new(fleet())),
            repo.clone(),
            QuoteCalculator::new(pricing()),
        ),
        sessions: PaymentSessionBridge::new(repo.clone(), Arc::new(sandbox.clone())),
        reconciler: Arc::new(
            PaymentReconciler::new(repo.clone(), Arc::new(sandbox.clone())).with_notifier(notifier),
        ),
        receipts: ReceiptAssembler::new(repo),
        store,
        sandbox,
        notices,
    }
}

pub fn customer() -> Customer {
    Customer {
        name: "Jane Tan".to_string(),
        email: "jane.tan@example.com".to_string(),
        phone: "+65 9123 4567".to_string(),
    }
}

pub fn airport_trip(hour: u32) -> TripRequest {
    TripRequest {
        trip_type: TripType::OneWay,
        pickup_location: "Changi Airport T3".to_string(),
        dropoff_location: "1 Raffles Place".to_string(),
        pickup_date: NaiveDate::from_ymd_opt(2026, 5, 2).unwrap(),
        pickup_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
        requested_hours: None,
    }
}

pub fn rental_trip(hours: i64) -> TripRequest {
    TripRequest {
        trip_type: TripType::RoundTrip,
        pickup_location: "Marina Bay Sands".to_string(),
        dropoff_location: String::new(),
        pickup_date: NaiveDate::from_ymd_opt(2026, 7, 10).unwrap(),
        pickup_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        requested_hours: Some(hours),
    }
}

impl Harness {
    /// Quote and book an airport transfer at 14:00 (total 80).
    pub async fn book(&self) -> Uuid {
        let trip = airport_trip(14);
        let quote = self.bookings.compute_quote("alphard", &trip).await.unwrap();
        self.bookings
            .create_booking(customer(), "alphard", trip, quote)
            .await
            .unwrap()
    }

    pub async fn ledger(&self, booking_id: Uuid) -> Vec<LedgerEntry> {
        self.store.ledger_entries(booking_id).await.unwrap()
    }
}
