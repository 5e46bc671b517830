use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps customer data so it never shows up verbatim in `Debug`/`Display` output.
///
/// Serialization passes the real value through: API responses need it, log lines don't.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct Masked<T>(pub T);

impl<T: fmt::Display> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: fmt::Display> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

/// `jane.doe@example.com` -> `j*******@example.com`
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let mut chars = local.chars();
            match chars.next() {
                Some(first) => {
                    let hidden = chars.count();
                    format!("{}{}@{}", first, "*".repeat(hidden), domain)
                }
                None => format!("@{}", domain),
            }
        }
        None => "*".repeat(email.chars().count()),
    }
}

/// Hides every digit of a payment method summary except the last four.
///
/// `"4242 4242 4242 4242"` -> `"•••• •••• •••• 4242"`, `"visa 4242"` is left as is.
pub fn mask_payment_method(summary: &str) -> String {
    let digits = summary.chars().filter(|c| c.is_ascii_digit()).count();
    let mut to_hide = digits.saturating_sub(4);

    summary
        .chars()
        .map(|c| {
            if c.is_ascii_digit() && to_hide > 0 {
                to_hide -= 1;
                '•'
            } else {
                c
            }
        })
        .collect()
}
