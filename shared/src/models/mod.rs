//! Data models
//!
//! Entity documents shared between the engine and its embedders.
//! All IDs are opaque `String`s assigned by the store; every mutable
//! document carries a `version` counter for compare-and-swap saves.

pub mod cart;
pub mod customer;
pub mod delivery_person;
pub mod order;
pub mod restaurant;

// Re-exports
pub use cart::*;
pub use customer::*;
pub use delivery_person::*;
pub use order::*;
pub use restaurant::*;
