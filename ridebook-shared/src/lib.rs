pub mod pii;
pub mod models {
    pub mod events;
}

pub use pii::{mask_email, mask_payment_method, Masked};
