use ridebook_catalog::{Quote, QuoteCalculator, RateCard, TripRequest};
use ridebook_core::{Booking, BookingRepository, Customer, VehicleCatalog};
use ridebook_shared::Masked;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::BookingError;
use crate::validation::{validate_customer, validate_trip};

/// Quotes trips and records bookings. Never touches payments.
pub struct BookingOrchestrator {
    catalog: Arc<dyn VehicleCatalog>,
    repo: Arc<dyn BookingRepository>,
    calculator: QuoteCalculator,
}

impl BookingOrchestrator {
    pub fn new(
        catalog: Arc<dyn VehicleCatalog>,
        repo: Arc<dyn BookingRepository>,
        calculator: QuoteCalculator,
    ) -> Self {
        Self {
            catalog,
            repo,
            calculator,
        }
    }

    /// Rate card lookup: the only path from a vehicle id to prices.
    pub async fn rate_card(&self, vehicle_id: &str) -> Result<RateCard, BookingError> {
        let record = self
            .catalog
            .vehicle_rate_record(vehicle_id)
            .await?
            .ok_or_else(|| BookingError::Catalog(format!("unknown vehicle {}", vehicle_id)))?;

        RateCard::try_from(record).map_err(|e| {
            warn!(vehicle_id, error = %e, "Catalog returned an unusable rate card");
            BookingError::Catalog(e.to_string())
        })
    }

    pub async fn compute_quote(&self, vehicle_id: &str, trip: &TripRequest) -> Result<Quote, BookingError> {
        let card = self.rate_card(vehicle_id).await?;
        Ok(self.calculator.quote_trip(&card, trip)?)
    }

    /// Persist a PENDING booking carrying `quote` by value.
    ///
    /// The quote must be exactly what the current rate card produces for this
    /// trip; anything else is stale or was edited on the way in.
    pub async fn create_booking(
        &self,
        customer: Customer,
        vehicle_id: &str,
        trip: TripRequest,
        quote: Quote,
    ) -> Result<Uuid, BookingError> {
        let customer = validate_customer(&customer)?;
        validate_trip(&trip)?;

        let card = self.rate_card(vehicle_id).await?;
        let current = self.calculator.quote_trip(&card, &trip)?;
        if current != quote {
            info!(
                vehicle_id,
                quoted_total = quote.total,
                current_total = current.total,
                "Rejecting booking with a stale quote"
            );
            return Err(BookingError::validation(
                "quote",
                "quote no longer matches the current price; request a new quote",
            ));
        }

        let booking = Booking::new(card.vehicle_id, card.vehicle_name, customer, trip, quote);
        self.repo.insert_booking(&booking).await?;

        info!(
            booking_id = %booking.id,
            vehicle_id = %booking.vehicle_id,
            category = %booking.quote.category,
            total = booking.quote.total,
            email = ?Masked(&booking.customer.email),
            "Booking created"
        );

        Ok(booking.id)
    }

    pub async fn get_booking(&self, id: Uuid) -> Result<Booking, BookingError> {
        self.repo
            .get_booking(id)
            .await?
            .ok_or_else(|| BookingError::NotFound(id.to_string()))
    }
}
