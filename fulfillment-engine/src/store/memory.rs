//! In-memory store
//!
//! DashMap-backed reference implementation of [`Store`]. Serves the test
//! suites and small embedded deployments; the geospatial query is a
//! haversine scan.

use super::{Store, StoreError, StoreResult};
use crate::geo::haversine_meters;
use async_trait::async_trait;
use dashmap::DashMap;
use shared::models::{Cart, CartStatus, Customer, DeliveryPerson, Order, Restaurant};
use shared::types::{GeoPoint, Timestamp};

/// Document with an id and a CAS version counter
trait Versioned: Clone {
    const KIND: &'static str;
    fn id(&self) -> &str;
    fn version(&self) -> u64;
    fn set_version(&mut self, version: u64);
}

macro_rules! impl_versioned {
    ($ty:ty, $kind:literal) => {
        impl Versioned for $ty {
            const KIND: &'static str = $kind;
            fn id(&self) -> &str {
                &self.id
            }
            fn version(&self) -> u64 {
                self.version
            }
            fn set_version(&mut self, version: u64) {
                self.version = version;
            }
        }
    };
}

impl_versioned!(Cart, "cart");
impl_versioned!(Order, "order");
impl_versioned!(DeliveryPerson, "delivery person");
impl_versioned!(Restaurant, "restaurant");
impl_versioned!(Customer, "customer");

fn insert_doc<T: Versioned>(map: &DashMap<String, T>, doc: &T) -> StoreResult<()> {
    use dashmap::mapref::entry::Entry;
    match map.entry(doc.id().to_string()) {
        Entry::Occupied(_) => Err(StoreError::DuplicateId {
            kind: T::KIND,
            id: doc.id().to_string(),
        }),
        Entry::Vacant(slot) => {
            slot.insert(doc.clone());
            Ok(())
        }
    }
}

/// Compare-and-swap save: the stored version must match the caller's copy
fn save_doc<T: Versioned>(map: &DashMap<String, T>, doc: &mut T) -> StoreResult<()> {
    let mut entry = map.get_mut(doc.id()).ok_or_else(|| StoreError::NotFound {
        kind: T::KIND,
        id: doc.id().to_string(),
    })?;
    if entry.version() != doc.version() {
        return Err(StoreError::VersionConflict {
            kind: T::KIND,
            id: doc.id().to_string(),
        });
    }
    doc.set_version(doc.version() + 1);
    *entry = doc.clone();
    Ok(())
}

fn get_doc<T: Versioned>(map: &DashMap<String, T>, id: &str) -> Option<T> {
    map.get(id).map(|d| d.value().clone())
}

/// In-memory [`Store`] implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    carts: DashMap<String, Cart>,
    orders: DashMap<String, Order>,
    couriers: DashMap<String, DeliveryPerson>,
    restaurants: DashMap<String, Restaurant>,
    customers: DashMap<String, Customer>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    // ========== Carts ==========

    async fn get_cart(&self, id: &str) -> StoreResult<Option<Cart>> {
        Ok(get_doc(&self.carts, id))
    }

    async fn find_active_cart(&self, customer_id: &str) -> StoreResult<Option<Cart>> {
        Ok(self
            .carts
            .iter()
            .find(|c| c.customer_id == customer_id && c.status == CartStatus::Active)
            .map(|c| c.value().clone()))
    }

    async fn insert_cart(&self, cart: &Cart) -> StoreResult<()> {
        insert_doc(&self.carts, cart)
    }

    async fn save_cart(&self, cart: &mut Cart) -> StoreResult<()> {
        save_doc(&self.carts, cart)
    }

    async fn stale_active_carts(&self, cutoff: Timestamp) -> StoreResult<Vec<Cart>> {
        Ok(self
            .carts
            .iter()
            .filter(|c| c.status == CartStatus::Active && c.last_updated < cutoff)
            .map(|c| c.value().clone())
            .collect())
    }

    // ========== Orders ==========

    async fn get_order(&self, id: &str) -> StoreResult<Option<Order>> {
        Ok(get_doc(&self.orders, id))
    }

    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        insert_doc(&self.orders, order)
    }

    async fn save_order(&self, order: &mut Order) -> StoreResult<()> {
        save_doc(&self.orders, order)
    }

    // ========== Delivery personnel ==========

    async fn get_courier(&self, id: &str) -> StoreResult<Option<DeliveryPerson>> {
        Ok(get_doc(&self.couriers, id))
    }

    async fn insert_courier(&self, courier: &DeliveryPerson) -> StoreResult<()> {
        insert_doc(&self.couriers, courier)
    }

    async fn save_courier(&self, courier: &mut DeliveryPerson) -> StoreResult<()> {
        save_doc(&self.couriers, courier)
    }

    async fn list_couriers(&self) -> StoreResult<Vec<DeliveryPerson>> {
        Ok(self.couriers.iter().map(|c| c.value().clone()).collect())
    }

    async fn couriers_near(
        &self,
        center: GeoPoint,
        max_distance_meters: f64,
    ) -> StoreResult<Vec<DeliveryPerson>> {
        let mut nearby: Vec<(f64, DeliveryPerson)> = self
            .couriers
            .iter()
            .filter_map(|c| {
                let distance = haversine_meters(center, c.location.point());
                (distance <= max_distance_meters).then(|| (distance, c.value().clone()))
            })
            .collect();
        nearby.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(nearby.into_iter().map(|(_, c)| c).collect())
    }

    // ========== Restaurants ==========

    async fn get_restaurant(&self, id: &str) -> StoreResult<Option<Restaurant>> {
        Ok(get_doc(&self.restaurants, id))
    }

    async fn insert_restaurant(&self, restaurant: &Restaurant) -> StoreResult<()> {
        insert_doc(&self.restaurants, restaurant)
    }

    async fn save_restaurant(&self, restaurant: &mut Restaurant) -> StoreResult<()> {
        save_doc(&self.restaurants, restaurant)
    }

    // ========== Customers ==========

    async fn get_customer(&self, id: &str) -> StoreResult<Option<Customer>> {
        Ok(get_doc(&self.customers, id))
    }

    async fn insert_customer(&self, customer: &Customer) -> StoreResult<()> {
        insert_doc(&self.customers, customer)
    }

    async fn save_customer(&self, customer: &mut Customer) -> StoreResult<()> {
        save_doc(&self.customers, customer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_get_cart() {
        let store = MemoryStore::new();
        let cart = Cart::new("cust-1", "rest-1", 1_000);
        store.insert_cart(&cart).await.unwrap();

        let loaded = store.get_cart(&cart.id).await.unwrap().unwrap();
        assert_eq!(loaded.customer_id, "cust-1");
        assert!(store.get_cart("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = MemoryStore::new();
        let cart = Cart::new("cust-1", "rest-1", 1_000);
        store.insert_cart(&cart).await.unwrap();
        assert!(matches!(
            store.insert_cart(&cart).await,
            Err(StoreError::DuplicateId { .. })
        ));
    }

    #[tokio::test]
    async fn test_save_bumps_version() {
        let store = MemoryStore::new();
        let mut cart = Cart::new("cust-1", "rest-1", 1_000);
        store.insert_cart(&cart).await.unwrap();

        cart.subtotal = 10.0;
        store.save_cart(&mut cart).await.unwrap();
        assert_eq!(cart.version, 1);

        let loaded = store.get_cart(&cart.id).await.unwrap().unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.subtotal, 10.0);
    }

    #[tokio::test]
    async fn test_stale_save_conflicts() {
        let store = MemoryStore::new();
        let cart = Cart::new("cust-1", "rest-1", 1_000);
        store.insert_cart(&cart).await.unwrap();

        // Two copies loaded at the same version
        let mut first = store.get_cart(&cart.id).await.unwrap().unwrap();
        let mut second = store.get_cart(&cart.id).await.unwrap().unwrap();

        first.subtotal = 10.0;
        store.save_cart(&mut first).await.unwrap();

        second.subtotal = 99.0;
        assert!(matches!(
            store.save_cart(&mut second).await,
            Err(StoreError::VersionConflict { .. })
        ));

        // The first write survived
        let loaded = store.get_cart(&cart.id).await.unwrap().unwrap();
        assert_eq!(loaded.subtotal, 10.0);
    }

    #[tokio::test]
    async fn test_find_active_cart_ignores_other_statuses() {
        let store = MemoryStore::new();
        let mut done = Cart::new("cust-1", "rest-1", 1_000);
        done.status = CartStatus::Completed;
        store.insert_cart(&done).await.unwrap();
        assert!(store.find_active_cart("cust-1").await.unwrap().is_none());

        let active = Cart::new("cust-1", "rest-2", 2_000);
        store.insert_cart(&active).await.unwrap();
        let found = store.find_active_cart("cust-1").await.unwrap().unwrap();
        assert_eq!(found.id, active.id);
    }

    #[tokio::test]
    async fn test_stale_active_carts_cutoff_is_exclusive() {
        let store = MemoryStore::new();
        let old = Cart::new("cust-1", "rest-1", 500);
        let fresh = Cart::new("cust-2", "rest-1", 2_000);
        store.insert_cart(&old).await.unwrap();
        store.insert_cart(&fresh).await.unwrap();

        let stale = store.stale_active_carts(1_000).await.unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, old.id);

        // A cart updated exactly at the cutoff is not stale
        let at_cutoff = store.stale_active_carts(500).await.unwrap();
        assert!(at_cutoff.is_empty());
    }

    #[tokio::test]
    async fn test_couriers_near_filters_and_sorts_by_distance() {
        let store = MemoryStore::new();
        // Center of Madrid and two couriers at increasing distance
        let mut close = DeliveryPerson::new("Close", -3.7040, 40.4170, 0);
        let mut far = DeliveryPerson::new("Far", -3.7200, 40.4300, 0);
        let remote = DeliveryPerson::new("Remote", 2.1700, 41.3870, 0);
        close.id = "close".to_string();
        far.id = "far".to_string();
        store.insert_courier(&close).await.unwrap();
        store.insert_courier(&far).await.unwrap();
        store.insert_courier(&remote).await.unwrap();

        let center = GeoPoint::new(-3.7038, 40.4168);
        let nearby = store.couriers_near(center, 5_000.0).await.unwrap();
        assert_eq!(nearby.len(), 2);
        assert_eq!(nearby[0].id, "close");
        assert_eq!(nearby[1].id, "far");
    }
}
