use ridebook_catalog::{TripRequest, TripType};
use ridebook_core::Customer;

use crate::error::BookingError;

const MAX_NAME_LEN: usize = 120;
const MAX_EMAIL_LEN: usize = 254;
const MAX_LOCATION_LEN: usize = 500;

/// Last-line checks on contact details; returns a trimmed copy.
pub fn validate_customer(customer: &Customer) -> Result<Customer, BookingError> {
    let name = customer.name.trim();
    if name.is_empty() {
        return Err(BookingError::validation("customer.name", "name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(BookingError::validation("customer.name", "name is too long"));
    }

    let email = customer.email.trim();
    if !plausible_email(email) {
        return Err(BookingError::validation("customer.email", "email address looks invalid"));
    }

    let phone = customer.phone.trim();
    if !plausible_phone(phone) {
        return Err(BookingError::validation("customer.phone", "phone number looks invalid"));
    }

    Ok(Customer {
        name: name.to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
    })
}

pub fn validate_trip(trip: &TripRequest) -> Result<(), BookingError> {
    if trip.pickup_location.trim().is_empty() {
        return Err(BookingError::validation("trip.pickup_location", "pickup location is required"));
    }
    if trip.trip_type == TripType::OneWay && trip.dropoff_location.trim().is_empty() {
        return Err(BookingError::validation("trip.dropoff_location", "drop-off location is required"));
    }
    if trip.pickup_location.len() > MAX_LOCATION_LEN || trip.dropoff_location.len() > MAX_LOCATION_LEN {
        return Err(BookingError::validation("trip", "location text is too long"));
    }
    Ok(())
}

fn plausible_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

fn plausible_phone(phone: &str) -> bool {
    let len = phone.chars().count();
    if !(6..=20).contains(&len) {
        return false;
    }
    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'))
    {
        return false;
    }
    if phone.chars().skip(1).any(|c| c == '+') {
        return false;
    }
    phone.chars().filter(|c| c.is_ascii_digit()).count() >= 6
}
