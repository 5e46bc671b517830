use serde::{Deserialize, Serialize};

use crate::classifier::BillingCategory;
use crate::error::{PricingError, RateCardError};

/// A vehicle's pricing row as the fleet catalog stores it. Every price is optional there.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VehicleRateRecord {
    pub vehicle_id: String,
    pub name: String,
    pub airport_transfer_price: Option<i64>,
    pub trip_price: Option<i64>,
    pub six_hour_price: Option<i64>,
    pub twelve_hour_price: Option<i64>,
    pub per_hour_rate: Option<i64>,
}

/// Hourly rental packages. Both tiers are present or the vehicle is not rentable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RentalPackages {
    pub six_hour: i64,
    pub twelve_hour: i64,
    /// Published for display only; rentals past twelve hours extrapolate from `twelve_hour`.
    pub per_hour: Option<i64>,
}

/// Validated, immutable snapshot of a vehicle's tariffs at quote time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateCard {
    pub vehicle_id: String,
    pub vehicle_name: String,
    pub airport_transfer: Option<i64>,
    pub trip: Option<i64>,
    pub rental: Option<RentalPackages>,
}

/// The single price source a billing category resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tariff {
    AirportTransfer { flat: i64 },
    Trip { flat: i64 },
    Rental(RentalPackages),
}

impl RateCard {
    /// Resolve the tariff for `category`, or say exactly which field is missing.
    pub fn tariff(&self, category: BillingCategory) -> Result<Tariff, PricingError> {
        let missing = |field| PricingError::IncompleteRateCard {
            vehicle_id: self.vehicle_id.clone(),
            category,
            field,
        };

        match category {
            BillingCategory::AirportTransfer => self
                .airport_transfer
                .map(|flat| Tariff::AirportTransfer { flat })
                .ok_or_else(|| missing("airport_transfer_price")),
            BillingCategory::Trip => self
                .trip
                .map(|flat| Tariff::Trip { flat })
                .ok_or_else(|| missing("trip_price")),
            BillingCategory::Rental => self
                .rental
                .map(Tariff::Rental)
                .ok_or_else(|| missing("six_hour_price/twelve_hour_price")),
        }
    }
}

impl TryFrom<VehicleRateRecord> for RateCard {
    type Error = RateCardError;

    fn try_from(record: VehicleRateRecord) -> Result<Self, Self::Error> {
        let vehicle_id = record.vehicle_id;
        let non_negative = |value: Option<i64>, field: &'static str| match value {
            Some(v) if v < 0 => Err(RateCardError::NegativePrice {
                vehicle_id: vehicle_id.clone(),
                field,
            }),
            other => Ok(other),
        };

        let airport_transfer = non_negative(record.airport_transfer_price, "airport_transfer_price")?;
        let trip = non_negative(record.trip_price, "trip_price")?;
        let six_hour = non_negative(record.six_hour_price, "six_hour_price")?;
        let twelve_hour = non_negative(record.twelve_hour_price, "twelve_hour_price")?;
        let per_hour = non_negative(record.per_hour_rate, "per_hour_rate")?;

        let rental = match (six_hour, twelve_hour) {
            (Some(six_hour), Some(twelve_hour)) => Some(RentalPackages {
                six_hour,
                twelve_hour,
                per_hour,
            }),
            (None, None) => None,
            _ => return Err(RateCardError::PartialRentalTiers { vehicle_id }),
        };

        Ok(RateCard {
            vehicle_id,
            vehicle_name: record.name,
            airport_transfer,
            trip,
            rental,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> VehicleRateRecord {
        VehicleRateRecord {
            vehicle_id: "alphard-01".to_string(),
            name: "Toyota Alphard".to_string(),
            airport_transfer_price: Some(8000),
            trip_price: Some(6000),
            six_hour_price: Some(36000),
            twelve_hour_price: Some(72000),
            per_hour_rate: None,
        }
    }

    #[test]
    fn test_full_record_resolves_every_category() {
        let card = RateCard::try_from(record()).unwrap();

        assert_eq!(
            card.tariff(BillingCategory::AirportTransfer).unwrap(),
            Tariff::AirportTransfer { flat: 8000 }
        );
        assert_eq!(card.tariff(BillingCategory::Trip).unwrap(), Tariff::Trip { flat: 6000 });
        match card.tariff(BillingCategory::Rental).unwrap() {
            Tariff::Rental(p) => {
                assert_eq!(p.six_hour, 36000);
                assert_eq!(p.twelve_hour, 72000);
            }
            other => panic!("unexpected tariff {:?}", other),
        }
    }

    #[test]
    fn test_missing_field_is_incomplete_not_zero() {
        let mut r = record();
        r.trip_price = None;
        r.six_hour_price = None;
        r.twelve_hour_price = None;
        let card = RateCard::try_from(r).unwrap();

        let err = card.tariff(BillingCategory::Trip).unwrap_err();
        assert!(matches!(
            err,
            PricingError::IncompleteRateCard { field: "trip_price", .. }
        ));
        assert!(card.tariff(BillingCategory::Rental).is_err());
    }

    #[test]
    fn test_ingestion_rejects_half_rental_tiers() {
        let mut r = record();
        r.twelve_hour_price = None;
        assert_eq!(
            RateCard::try_from(r).unwrap_err(),
            RateCardError::PartialRentalTiers {
                vehicle_id: "alphard-01".to_string()
            }
        );
    }

    #[test]
    fn test_ingestion_rejects_negative_prices() {
        let mut r = record();
        r.airport_transfer_price = Some(-1);
        assert!(matches!(
            RateCard::try_from(r),
            Err(RateCardError::NegativePrice { field: "airport_transfer_price", .. })
        ));
    }
}
