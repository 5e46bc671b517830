use chrono::{DateTime, Utc};
use ridebook_catalog::{Quote, TripRequest};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::payment::AmountPolicy;

/// Booking lifecycle. The pricing core only ever moves PENDING -> CONFIRMED;
/// CANCELLED and COMPLETED are administrative.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Completed => "COMPLETED",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            "COMPLETED" => Ok(BookingStatus::Completed),
            other => Err(format!("unknown booking status {}", other)),
        }
    }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            "FAILED" => Ok(PaymentStatus::Failed),
            other => Err(format!("unknown payment status {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// A hosted checkout session handed out for a booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentSession {
    pub session_ref: String,
    pub redirect_url: String,
    pub amount_requested: i64,
    pub policy: AmountPolicy,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// The aggregate of record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub vehicle_id: String,
    pub vehicle_name: String,
    pub customer: Customer,
    pub trip: TripRequest,
    /// Frozen at creation. Never re-derived from the rate card.
    pub quote: Quote,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub session: Option<PaymentSession>,
    /// How many sessions have ever been attached; the compare-and-set token for attaching.
    pub session_generation: u32,
    pub amount_paid: i64,
    pub payment_method_summary: Option<String>,
    /// Internal only: the processor captured something other than what was requested.
    pub amount_mismatch: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        vehicle_id: String,
        vehicle_name: String,
        customer: Customer,
        trip: TripRequest,
        quote: Quote,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            vehicle_id,
            vehicle_name,
            customer,
            trip,
            quote,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            session: None,
            session_generation: 0,
            amount_paid: 0,
            payment_method_summary: None,
            amount_mismatch: false,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn session_ref(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.session_ref.as_str())
    }

    /// What the processor was asked to collect; the quote total when no session was recorded.
    pub fn expected_capture(&self) -> i64 {
        self.session
            .as_ref()
            .map(|s| s.amount_requested)
            .unwrap_or(self.quote.total)
    }

    pub fn balance_due(&self) -> i64 {
        (self.quote.total - self.amount_paid).max(0)
    }

    pub fn attach_session(&mut self, session: PaymentSession) {
        self.session = Some(session);
        self.session_generation += 1;
        self.updated_at = Utc::now();
    }

    pub fn apply_change(&mut self, change: &PaymentChange) {
        self.status = change.status;
        self.payment_status = change.payment_status;
        self.amount_paid = change.amount_paid;
        if change.payment_method_summary.is_some() {
            self.payment_method_summary = change.payment_method_summary.clone();
        }
        self.amount_mismatch = change.amount_mismatch;
        if change.paid_at.is_some() {
            self.paid_at = change.paid_at;
        }
        self.updated_at = Utc::now();
    }
}

/// A field-group update written atomically with the compare-and-set on payment status.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentChange {
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub amount_paid: i64,
    pub payment_method_summary: Option<String>,
    pub amount_mismatch: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub ledger_entry: Option<LedgerEntry>,
}

/// One captured payment. Unique per (booking_id, ledger_key).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub ledger_key: String,
    pub event_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(booking_id: Uuid, ledger_key: String, event_id: Option<String>, amount: i64, currency: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            ledger_key,
            event_id,
            amount,
            currency,
            created_at: Utc::now(),
        }
    }
}
