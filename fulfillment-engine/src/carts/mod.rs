//! Cart consolidation
//!
//! Merging of equivalent line items, quantity updates, restaurant binding,
//! and the abandonment sweep. Line-item equivalence is content-addressed:
//! see [`line_fingerprint`].

mod fingerprint;
mod service;

pub use fingerprint::line_fingerprint;
pub use service::{AddItemInput, CartService};
