//! Domain models for the on-ramp service.

pub mod amount;
pub mod balance;
pub mod notification;
pub mod onramp;

pub use amount::Amount;
pub use balance::{Balance, UserId};
pub use notification::{CreditOutcome, PaymentNotification};
pub use onramp::{NewOnRampTransaction, OnRampStatus, OnRampToken, OnRampTransaction};
