use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::classifier::{classify, BillingCategory};
use crate::error::PricingError;
use crate::rate_card::{RateCard, RentalPackages, Tariff};
use crate::trip::TripRequest;

const SIX_HOUR_PACKAGE: i64 = 6;
const TWELVE_HOUR_PACKAGE: i64 = 12;

/// Local-time window in which pickups pay the midnight surcharge.
///
/// `start` is inclusive and `end` exclusive; a window whose start is later than
/// its end wraps past midnight. Equal bounds mean no night window at all.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NightWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl NightWindow {
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start == self.end {
            false
        } else if self.start < self.end {
            time >= self.start && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }
}

impl Default for NightWindow {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(23, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(6, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PricingConfig {
    pub currency: String,
    /// Flat amount in minor units, added once when the pickup is inside `night_window`.
    pub midnight_surcharge: i64,
    pub night_window: NightWindow,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: "SGD".to_string(),
            midnight_surcharge: 1000,
            night_window: NightWindow::default(),
        }
    }
}

/// The price a customer is shown, and later charged. Immutable once attached to a booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quote {
    pub category: BillingCategory,
    pub subtotal: i64,
    pub midnight_surcharge: i64,
    pub total: i64,
    pub currency: String,
}

/// Deterministic pricing: no clocks, no randomness, no I/O.
#[derive(Debug, Clone)]
pub struct QuoteCalculator {
    config: PricingConfig,
}

impl QuoteCalculator {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    /// Classify the trip, then price it.
    pub fn quote_trip(&self, card: &RateCard, trip: &TripRequest) -> Result<Quote, PricingError> {
        let category = classify(trip.trip_type, &trip.pickup_location, &trip.dropoff_location);
        self.quote(card, category, trip.requested_hours, trip.pickup_at())
    }

    pub fn quote(
        &self,
        card: &RateCard,
        category: BillingCategory,
        requested_hours: Option<i64>,
        pickup_at: NaiveDateTime,
    ) -> Result<Quote, PricingError> {
        let subtotal = match card.tariff(category)? {
            Tariff::AirportTransfer { flat } | Tariff::Trip { flat } => flat,
            Tariff::Rental(packages) => rental_price(&packages, requested_hours)?,
        };

        let midnight_surcharge = if self.config.night_window.contains(pickup_at.time()) {
            self.config.midnight_surcharge
        } else {
            0
        };

        let total = subtotal
            .checked_add(midnight_surcharge)
            .ok_or_else(|| PricingError::AmountOverflow {
                vehicle_id: card.vehicle_id.clone(),
            })?;

        Ok(Quote {
            category,
            subtotal,
            midnight_surcharge,
            total,
            currency: self.config.currency.clone(),
        })
    }
}

/// Tiered rental pricing. Past twelve hours the twelve-hour package is
/// extrapolated linearly, rounded half-up to the minor unit, so the price
/// never drops or jumps at the package boundary.
fn rental_price(packages: &RentalPackages, requested_hours: Option<i64>) -> Result<i64, PricingError> {
    let hours = match requested_hours {
        Some(h) if h > 0 => h,
        other => return Err(PricingError::InvalidDuration(other)),
    };

    if hours <= SIX_HOUR_PACKAGE {
        return Ok(packages.six_hour);
    }
    if hours <= TWELVE_HOUR_PACKAGE {
        return Ok(packages.twelve_hour);
    }

    let scaled = i128::from(packages.twelve_hour) * i128::from(hours) * 2 + i128::from(TWELVE_HOUR_PACKAGE);
    let rounded = scaled / (i128::from(TWELVE_HOUR_PACKAGE) * 2);
    i64::try_from(rounded).map_err(|_| PricingError::InvalidDuration(Some(hours)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trip::TripType;
    use chrono::NaiveDate;

    fn card() -> RateCard {
        RateCard {
            vehicle_id: "v-1".to_string(),
            vehicle_name: "Mercedes V-Class".to_string(),
            airport_transfer: Some(80),
            trip: Some(60),
            rental: Some(RentalPackages {
                six_hour: 360,
                twelve_hour: 720,
                per_hour: None,
            }),
        }
    }

    fn calculator() -> QuoteCalculator {
        QuoteCalculator::new(PricingConfig {
            currency: "SGD".to_string(),
            midnight_surcharge: 10,
            night_window: NightWindow::default(),
        })
    }

    fn trip(trip_type: TripType, pickup: &str, dropoff: &str, time: (u32, u32), hours: Option<i64>) -> TripRequest {
        TripRequest {
            trip_type,
            pickup_location: pickup.to_string(),
            dropoff_location: dropoff.to_string(),
            pickup_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            pickup_time: NaiveTime::from_hms_opt(time.0, time.1, 0).unwrap(),
            requested_hours: hours,
        }
    }

    #[test]
    fn test_airport_transfer_daytime() {
        let quote = calculator()
            .quote_trip(&card(), &trip(TripType::OneWay, "Changi Airport", "123 Orchard Rd", (14, 0), None))
            .unwrap();

        assert_eq!(quote.category, BillingCategory::AirportTransfer);
        assert_eq!(quote.subtotal, 80);
        assert_eq!(quote.midnight_surcharge, 0);
        assert_eq!(quote.total, 80);
        assert_eq!(quote.currency, "SGD");
    }

    #[test]
    fn test_trip_inside_night_window() {
        let quote = calculator()
            .quote_trip(&card(), &trip(TripType::OneWay, "123 Orchard Rd", "456 Raffles Pl", (23, 30), None))
            .unwrap();

        assert_eq!(quote.category, BillingCategory::Trip);
        assert_eq!(quote.subtotal, 60);
        assert_eq!(quote.midnight_surcharge, 10);
        assert_eq!(quote.total, 70);
    }

    #[test]
    fn test_long_rental_extrapolates_twelve_hour_package() {
        let quote = calculator()
            .quote_trip(&card(), &trip(TripType::RoundTrip, "Hotel", "Hotel", (9, 0), Some(15)))
            .unwrap();

        assert_eq!(quote.category, BillingCategory::Rental);
        assert_eq!(quote.subtotal, 900);
        assert_eq!(quote.total, 900);
    }

    #[test]
    fn test_rental_tiers() {
        let calc = calculator();
        let price = |h| {
            calc.quote(&card(), BillingCategory::Rental, Some(h), trip(TripType::RoundTrip, "", "", (10, 0), None).pickup_at())
                .unwrap()
                .subtotal
        };

        assert_eq!(price(1), 360);
        assert_eq!(price(6), 360);
        assert_eq!(price(7), 720);
        assert_eq!(price(12), 720);
        assert_eq!(price(13), 780);
        assert!(price(13) > price(12) && price(12) > price(6));
    }

    #[test]
    fn test_rental_rounds_half_up() {
        let mut c = card();
        c.rental = Some(RentalPackages { six_hour: 100, twelve_hour: 125, per_hour: None });
        let pickup = trip(TripType::RoundTrip, "", "", (10, 0), None).pickup_at();

        // 125 / 12 * 13 = 135.41..
        assert_eq!(calculator().quote(&c, BillingCategory::Rental, Some(13), pickup).unwrap().subtotal, 135);
        // 125 / 12 * 18 = 187.5
        assert_eq!(calculator().quote(&c, BillingCategory::Rental, Some(18), pickup).unwrap().subtotal, 188);
    }

    #[test]
    fn test_invalid_rental_duration() {
        let calc = calculator();
        for hours in [None, Some(0), Some(-3)] {
            let err = calc
                .quote_trip(&card(), &trip(TripType::RoundTrip, "A", "B", (10, 0), hours))
                .unwrap_err();
            assert_eq!(err, PricingError::InvalidDuration(hours));
        }
    }

    #[test]
    fn test_surcharge_applies_once_for_long_night_rental() {
        let quote = calculator()
            .quote_trip(&card(), &trip(TripType::RoundTrip, "A", "B", (5, 59), Some(24)))
            .unwrap();

        assert_eq!(quote.midnight_surcharge, 10);
        assert_eq!(quote.total, quote.subtotal + 10);
    }

    #[test]
    fn test_night_window_bounds() {
        let window = NightWindow::default();
        let at = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();

        assert!(window.contains(at(23, 0)));
        assert!(window.contains(at(0, 0)));
        assert!(window.contains(at(5, 59)));
        assert!(!window.contains(at(6, 0)));
        assert!(!window.contains(at(22, 59)));

        let day = NightWindow { start: at(1, 0), end: at(4, 0) };
        assert!(day.contains(at(2, 30)));
        assert!(!day.contains(at(4, 0)));

        let none = NightWindow { start: at(1, 0), end: at(1, 0) };
        assert!(!none.contains(at(1, 0)));
    }

    #[test]
    fn test_incomplete_rate_card() {
        let mut c = card();
        c.airport_transfer = None;
        let err = calculator()
            .quote_trip(&c, &trip(TripType::OneWay, "Changi Airport", "Home", (12, 0), None))
            .unwrap_err();

        assert!(matches!(err, PricingError::IncompleteRateCard { category: BillingCategory::AirportTransfer, .. }));
    }

    #[test]
    fn test_total_out_of_range() {
        let mut c = card();
        c.trip = Some(i64::MAX);
        let err = calculator()
            .quote_trip(&c, &trip(TripType::OneWay, "123 Orchard Rd", "456 Raffles Pl", (23, 30), None))
            .unwrap_err();

        assert_eq!(err, PricingError::AmountOverflow { vehicle_id: "v-1".to_string() });
    }
}
