//! Engine error types
//!
//! Every error here is recoverable by the caller; nothing terminates the
//! process. Store I/O failures pass through unmodified inside
//! [`StoreError`].

use crate::store::StoreError;
use shared::models::OrderStatus;
use thiserror::Error;

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid pricing input: {0}")]
    InvalidPricingInput(String),

    #[error("Cart not found: {0}")]
    CartNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Item not found in cart: {0}")]
    ItemNotFound(String),

    #[error("Review not found: {0}")]
    ReviewNotFound(String),

    #[error("Delivery person not found: {0}")]
    CourierNotFound(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Restaurant not found: {0}")]
    RestaurantNotFound(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
    },

    #[error("Cart is bound to restaurant {cart_restaurant}, item targets {item_restaurant}")]
    RestaurantMismatch {
        cart_restaurant: String,
        item_restaurant: String,
    },

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),

    #[error("Insufficient loyalty balance: have {available}, need {requested}")]
    InsufficientBalance { available: i64, requested: i64 },
}

pub type EngineResult<T> = Result<T, EngineError>;
