//! Price calculation
//!
//! Pure, deterministic monetary arithmetic. Uses rust_decimal internally,
//! stores as f64.

mod calculator;

pub use calculator::{
    cart_subtotal, customization_total, line_total, order_total,
};
pub(crate) use calculator::{to_decimal, to_f64};
