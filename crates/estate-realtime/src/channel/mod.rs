//! Channel names and the subscription set.

pub mod names;
pub mod subscription;

pub use subscription::SubscriptionSet;
