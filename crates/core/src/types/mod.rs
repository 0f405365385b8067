//! Core types for Driftwood.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod delivery;
pub mod email;
pub mod id;
pub mod money;
pub mod phone;
pub mod postal;
pub mod status;

pub use address::MailingAddress;
pub use delivery::{DeliveryMethod, DeliveryMethodError};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{CurrencyCode, Money, MoneyError};
pub use phone::{PhoneNumber, PhoneNumberError};
pub use postal::{PostalCode, PostalCodeError};
pub use status::*;
