use crate::classifier::BillingCategory;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error("Rate card for vehicle {vehicle_id} has no {field} required for {category}")]
    IncompleteRateCard {
        vehicle_id: String,
        category: BillingCategory,
        field: &'static str,
    },

    #[error("Rental duration must be a positive number of hours, got {0:?}")]
    InvalidDuration(Option<i64>),

    #[error("Quote total for vehicle {vehicle_id} is out of range")]
    AmountOverflow { vehicle_id: String },
}

/// Raised when a catalog row cannot be turned into a usable rate card.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateCardError {
    #[error("Vehicle {vehicle_id}: {field} must not be negative")]
    NegativePrice {
        vehicle_id: String,
        field: &'static str,
    },

    #[error("Vehicle {vehicle_id}: rental tiers need both six and twelve hour prices")]
    PartialRentalTiers { vehicle_id: String },
}
