pub mod classifier;
pub mod error;
pub mod quote;
pub mod rate_card;
pub mod trip;

pub use classifier::{classify, BillingCategory, AIRPORT_KEYWORDS};
pub use error::{PricingError, RateCardError};
pub use quote::{NightWindow, PricingConfig, Quote, QuoteCalculator};
pub use rate_card::{RateCard, RentalPackages, Tariff, VehicleRateRecord};
pub use trip::{TripRequest, TripType};
