//! Shared domain model for the fulfillment platform
//!
//! Entity types exchanged between the engine and its embedders:
//! carts, orders, delivery personnel, restaurants, and customers,
//! plus timestamp and ID utilities.

pub mod models;
pub mod types;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
pub use types::{GeoPoint, Timestamp};
