//! Shared type definitions.
//!
//! - [`id`] - Newtype wrappers for entity IDs
//! - [`price`] - Decimal-backed monetary amounts
//! - [`status`] - Status and category enums mirroring the API wire format

pub mod id;
pub mod price;
pub mod status;

pub use id::*;
pub use price::Price;
pub use status::*;
