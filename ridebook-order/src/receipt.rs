use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use ridebook_catalog::{BillingCategory, TripType};
use ridebook_core::{Booking, BookingRepository, PaymentStatus};
use ridebook_shared::{mask_email, mask_payment_method};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::BookingError;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Receipt {
    pub booking_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub vehicle_id: String,
    pub vehicle_name: String,
    pub category: BillingCategory,
    pub trip_type: TripType,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub pickup_date: NaiveDate,
    pub pickup_time: NaiveTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_hours: Option<i64>,
    pub subtotal: i64,
    pub midnight_surcharge: i64,
    pub total: i64,
    pub amount_paid: i64,
    pub balance_due: i64,
    pub currency: String,
    pub payment_method: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Builds the customer-facing receipt from what was stored at booking and payment time.
pub fn assemble(booking: &Booking) -> Result<Receipt, BookingError> {
    if booking.payment_status != PaymentStatus::Paid {
        return Err(BookingError::NotYetPaid {
            booking_id: booking.id,
            payment_status: booking.payment_status,
        });
    }

    let quote = &booking.quote;
    let requested_hours = match quote.category {
        BillingCategory::Rental => booking.trip.requested_hours,
        _ => None,
    };

    Ok(Receipt {
        booking_id: booking.id,
        customer_name: booking.customer.name.clone(),
        customer_email: mask_email(&booking.customer.email),
        vehicle_id: booking.vehicle_id.clone(),
        vehicle_name: booking.vehicle_name.clone(),
        category: quote.category,
        trip_type: booking.trip.trip_type,
        pickup_location: booking.trip.pickup_location.clone(),
        dropoff_location: booking.trip.dropoff_location.clone(),
        pickup_date: booking.trip.pickup_date,
        pickup_time: booking.trip.pickup_time,
        requested_hours,
        subtotal: quote.subtotal,
        midnight_surcharge: quote.midnight_surcharge,
        total: quote.total,
        amount_paid: booking.amount_paid,
        balance_due: booking.balance_due(),
        currency: quote.currency.clone(),
        payment_method: booking.payment_method_summary.as_deref().map(mask_payment_method),
        paid_at: booking.paid_at,
    })
}

pub struct ReceiptAssembler {
    repo: Arc<dyn BookingRepository>,
}

impl ReceiptAssembler {
    pub fn new(repo: Arc<dyn BookingRepository>) -> Self {
        Self { repo }
    }

    pub async fn get_receipt(&self, booking_id: Uuid) -> Result<Receipt, BookingError> {
        let booking = self
            .repo
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(booking_id.to_string()))?;
        assemble(&booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridebook_catalog::{Quote, TripRequest};
    use ridebook_core::{BookingStatus, Customer};

    fn rental_booking() -> Booking {
        Booking::new(
            "v-2".to_string(),
            "Mercedes V-Class".to_string(),
            Customer {
                name: "Ahmad Rahman".to_string(),
                email: "ahmad.rahman@example.com".to_string(),
                phone: "+60 12 345 6789".to_string(),
            },
            TripRequest {
                trip_type: TripType::RoundTrip,
                pickup_location: "Marina Bay Sands".to_string(),
                dropoff_location: String::new(),
                pickup_date: NaiveDate::from_ymd_opt(2026, 7, 10).unwrap(),
                pickup_time: NaiveTime::from_hms_opt(23, 30, 0).unwrap(),
                requested_hours: Some(8),
            },
            Quote {
                category: BillingCategory::Rental,
                subtotal: 340,
                midnight_surcharge: 10,
                total: 350,
                currency: "SGD".to_string(),
            },
        )
    }

    #[test]
    fn test_unpaid_booking_has_no_receipt() {
        let b = rental_booking();
        match assemble(&b) {
            Err(BookingError::NotYetPaid { payment_status, .. }) => {
                assert_eq!(payment_status, PaymentStatus::Pending)
            }
            other => panic!("expected NotYetPaid, got {:?}", other),
        }
    }

    #[test]
    fn test_receipt_masks_and_balances() {
        let mut b = rental_booking();
        b.status = BookingStatus::Confirmed;
        b.payment_status = PaymentStatus::Paid;
        b.amount_paid = 105;
        b.payment_method_summary = Some("visa 4242 4242 4242 4242".to_string());
        b.paid_at = Some(Utc::now());

        let r = assemble(&b).unwrap();
        assert_eq!(r.customer_email, "a***********@example.com");
        assert_eq!(r.payment_method.as_deref(), Some("visa •••• •••• •••• 4242"));
        assert_eq!(r.requested_hours, Some(8));
        assert_eq!(r.total, 350);
        assert_eq!(r.midnight_surcharge, 10);
        assert_eq!(r.balance_due, 245);
    }

    #[test]
    fn test_overpaid_balance_is_zero() {
        let mut b = rental_booking();
        b.payment_status = PaymentStatus::Paid;
        b.amount_paid = 400;
        assert_eq!(assemble(&b).unwrap().balance_due, 0);
    }
}
