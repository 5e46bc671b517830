use serde::{Deserialize, Serialize};
use std::fmt;

use crate::trip::TripType;

/// Which rate-card field prices a trip.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingCategory {
    AirportTransfer,
    Trip,
    Rental,
}

impl fmt::Display for BillingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BillingCategory::AirportTransfer => "AIRPORT_TRANSFER",
            BillingCategory::Trip => "TRIP",
            BillingCategory::Rental => "RENTAL",
        };
        f.write_str(s)
    }
}

/// Lower-case fragments that mark a location as an airport.
pub const AIRPORT_KEYWORDS: &[&str] = &[
    "airport",
    "terminal",
    "changi",
    "seletar",
    "senai",
    "klia",
    "hang nadim",
    "kuala lumpur international",
];

/// Decide the billing category for a trip.
///
/// Round trips are always hourly rentals, whatever the locations say. One-way
/// trips touching an airport on either end are airport transfers; anything
/// else, including empty or garbled text, is a plain trip.
pub fn classify(trip_type: TripType, pickup: &str, dropoff: &str) -> BillingCategory {
    match trip_type {
        TripType::RoundTrip => BillingCategory::Rental,
        TripType::OneWay => {
            if mentions_airport(pickup) || mentions_airport(dropoff) {
                BillingCategory::AirportTransfer
            } else {
                BillingCategory::Trip
            }
        }
    }
}

fn mentions_airport(location: &str) -> bool {
    let location = location.to_lowercase();
    AIRPORT_KEYWORDS.iter().any(|keyword| location.contains(keyword))
}
