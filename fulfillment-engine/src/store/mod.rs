//! Persistence boundary
//!
//! The engine never talks to a database directly; it consumes this store
//! trait. Saves are compare-and-swap on each document's `version` counter
//! so concurrent writers cannot silently overwrite one another. Backend
//! failures pass through inside [`StoreError`] and are never swallowed.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use shared::models::{Cart, Customer, DeliveryPerson, Order, Restaurant};
use shared::types::{GeoPoint, Timestamp};
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// CAS failure: the document changed since it was loaded
    #[error("Version conflict on {kind} {id}")]
    VersionConflict { kind: &'static str, id: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    /// Backend I/O failure, passed through unmodified
    #[error("Store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Abstract document store consumed by the engine services
///
/// `save_*` methods succeed only when the stored version matches the
/// document's `version` field, then bump it; a mismatch returns
/// [`StoreError::VersionConflict`] and the caller reloads and retries.
#[async_trait]
pub trait Store: Send + Sync {
    // ========== Carts ==========
    async fn get_cart(&self, id: &str) -> StoreResult<Option<Cart>>;
    /// The customer's single Active cart, if any
    async fn find_active_cart(&self, customer_id: &str) -> StoreResult<Option<Cart>>;
    async fn insert_cart(&self, cart: &Cart) -> StoreResult<()>;
    async fn save_cart(&self, cart: &mut Cart) -> StoreResult<()>;
    /// Active carts whose `last_updated` is strictly before `cutoff`
    async fn stale_active_carts(&self, cutoff: Timestamp) -> StoreResult<Vec<Cart>>;

    // ========== Orders ==========
    async fn get_order(&self, id: &str) -> StoreResult<Option<Order>>;
    async fn insert_order(&self, order: &Order) -> StoreResult<()>;
    async fn save_order(&self, order: &mut Order) -> StoreResult<()>;

    // ========== Delivery personnel ==========
    async fn get_courier(&self, id: &str) -> StoreResult<Option<DeliveryPerson>>;
    async fn insert_courier(&self, courier: &DeliveryPerson) -> StoreResult<()>;
    async fn save_courier(&self, courier: &mut DeliveryPerson) -> StoreResult<()>;
    async fn list_couriers(&self) -> StoreResult<Vec<DeliveryPerson>>;
    /// Couriers within `max_distance_meters` of `center`, nearest first
    async fn couriers_near(
        &self,
        center: GeoPoint,
        max_distance_meters: f64,
    ) -> StoreResult<Vec<DeliveryPerson>>;

    // ========== Restaurants ==========
    async fn get_restaurant(&self, id: &str) -> StoreResult<Option<Restaurant>>;
    async fn insert_restaurant(&self, restaurant: &Restaurant) -> StoreResult<()>;
    async fn save_restaurant(&self, restaurant: &mut Restaurant) -> StoreResult<()>;

    // ========== Customers ==========
    async fn get_customer(&self, id: &str) -> StoreResult<Option<Customer>>;
    async fn insert_customer(&self, customer: &Customer) -> StoreResult<()>;
    async fn save_customer(&self, customer: &mut Customer) -> StoreResult<()>;
}
