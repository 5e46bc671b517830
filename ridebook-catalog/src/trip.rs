use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripType {
    OneWay,
    RoundTrip,
}

/// What the customer asked for. Transient: supplied with every quote request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TripRequest {
    pub trip_type: TripType,
    #[serde(default)]
    pub pickup_location: String,
    #[serde(default)]
    pub dropoff_location: String,
    pub pickup_date: NaiveDate,
    pub pickup_time: NaiveTime,
    /// Only meaningful for round trips (hourly rental).
    #[serde(default)]
    pub requested_hours: Option<i64>,
}

impl TripRequest {
    pub fn pickup_at(&self) -> NaiveDateTime {
        self.pickup_date.and_time(self.pickup_time)
    }
}
