//! # On-Ramp Types
//!
//! Domain types and port traits for the on-ramp webhook service.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (Amount, Balance, OnRampTransaction)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain and application error types
//! - `security/` - Payload signing and key hashing helpers

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;
pub mod security;

// Re-export commonly used types
pub use domain::{
    Amount, Balance, CreditOutcome, NewOnRampTransaction, OnRampStatus, OnRampToken,
    OnRampTransaction, PaymentNotification, UserId,
};
pub use dto::*;
pub use error::{AppError, DomainError, RepoError};
pub use ports::LedgerStore;
