//! Order lifecycle
//!
//! Conversion of a finalized cart into an order and the forward-only
//! status machine that drives it to Delivered or Cancelled, with an
//! append-only timeline recording every step.

mod service;

pub use service::{OrderCharges, OrderService, RatingInput};
