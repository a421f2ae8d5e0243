//! Courier account operations
//!
//! Location tracking, availability flags, delivery history with derived
//! stats, and the earnings buckets with their scheduled resets.

mod service;

pub use service::{CourierService, DeliveryInput};
