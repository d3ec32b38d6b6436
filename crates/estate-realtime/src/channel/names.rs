//! Per-resource channel names.

use std::fmt::Display;

/// Events for one company (tenant).
pub fn company(id: impl Display) -> String {
    format!("company_{id}")
}

/// Events for one user.
pub fn user(id: impl Display) -> String {
    format!("user_{id}")
}

/// Events for one property allocation.
pub fn allocation(id: impl Display) -> String {
    format!("allocation_{id}")
}

/// Events for one payment.
pub fn payment(id: impl Display) -> String {
    format!("payment_{id}")
}
