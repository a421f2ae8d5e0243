//! Courier dispatch
//!
//! Ranks eligible couriers around a pickup point. The matcher only
//! proposes; picking one and calling `assign_delivery_person` is the
//! caller's dispatch policy.

mod matcher;

pub use matcher::{CourierCandidate, DeliveryMatcher};
