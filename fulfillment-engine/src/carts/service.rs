//! Cart service
//!
//! All cart mutations funnel through here. Each operation reloads the
//! cart, applies the change, and saves with compare-and-swap; conflicts
//! retry up to the configured budget before surfacing as
//! `ConcurrentModification`. The subtotal is recomputed after every
//! mutation so `subtotal == Σ line_total` holds at rest.

use super::fingerprint::line_fingerprint;
use crate::clock::Clock;
use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::pricing;
use crate::store::{Store, StoreError};
use serde::{Deserialize, Serialize};
use shared::models::{Cart, CartLineItem, CartStatus, CustomizationGroup, MAX_SPECIAL_INSTRUCTIONS};
use shared::types::Timestamp;
use std::sync::Arc;
use tracing::{debug, info};

/// Item payload for add-to-cart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItemInput {
    pub restaurant_id: String,
    pub menu_item_id: String,
    pub name: String,
    pub unit_price: f64,
    pub quantity: i32,
    pub customizations: Vec<CustomizationGroup>,
    pub special_instructions: Option<String>,
}

/// Cart consolidation service
pub struct CartService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: Config,
}

impl<S: Store> CartService<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: Config) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Validate an add-to-cart payload before touching the cart
    fn validate_item(input: &AddItemInput) -> EngineResult<()> {
        if !input.unit_price.is_finite() || input.unit_price < 0.0 {
            return Err(EngineError::Validation(format!(
                "unit_price must be non-negative, got {}",
                input.unit_price
            )));
        }
        if input.quantity < 1 {
            return Err(EngineError::Validation(format!(
                "quantity must be at least 1, got {}",
                input.quantity
            )));
        }
        for group in &input.customizations {
            for option in &group.selected_options {
                if !option.price.is_finite() || option.price < 0.0 {
                    return Err(EngineError::Validation(format!(
                        "option price must be non-negative, got {} for {}",
                        option.price, option.name
                    )));
                }
            }
        }
        if let Some(instructions) = &input.special_instructions
            && instructions.chars().count() > MAX_SPECIAL_INSTRUCTIONS
        {
            return Err(EngineError::Validation(format!(
                "special instructions cannot exceed {} characters",
                MAX_SPECIAL_INSTRUCTIONS
            )));
        }
        Ok(())
    }

    /// Load-mutate-save with bounded CAS retries
    async fn mutate_cart<F>(&self, cart_id: &str, mut apply: F) -> EngineResult<Cart>
    where
        F: FnMut(&mut Cart, Timestamp) -> EngineResult<()>,
    {
        let mut attempts = 0;
        loop {
            let mut cart = self
                .store
                .get_cart(cart_id)
                .await?
                .ok_or_else(|| EngineError::CartNotFound(cart_id.to_string()))?;
            let now = self.clock.now_millis();
            apply(&mut cart, now)?;
            cart.last_updated = now;
            match self.store.save_cart(&mut cart).await {
                Ok(()) => return Ok(cart),
                Err(StoreError::VersionConflict { .. }) => {
                    attempts += 1;
                    if attempts > self.config.cas_retry_limit {
                        return Err(EngineError::ConcurrentModification(cart_id.to_string()));
                    }
                    debug!(cart_id, attempts, "cart save conflicted, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Return the customer's Active cart, rebinding it if it points at a
    /// different restaurant (prior contents are discarded), or create a
    /// fresh empty cart.
    pub async fn get_or_create_cart(
        &self,
        customer_id: &str,
        restaurant_id: &str,
    ) -> EngineResult<Cart> {
        let mut attempts = 0;
        loop {
            match self.store.find_active_cart(customer_id).await? {
                Some(mut cart) => {
                    if cart.restaurant_id == restaurant_id {
                        return Ok(cart);
                    }
                    // Restaurant switch: last writer wins, old items go
                    cart.items.clear();
                    cart.subtotal = 0.0;
                    cart.restaurant_id = restaurant_id.to_string();
                    cart.last_updated = self.clock.now_millis();
                    match self.store.save_cart(&mut cart).await {
                        Ok(()) => {
                            info!(
                                cart_id = %cart.id,
                                restaurant_id,
                                "cart rebound to new restaurant"
                            );
                            return Ok(cart);
                        }
                        Err(StoreError::VersionConflict { .. }) => {
                            attempts += 1;
                            if attempts > self.config.cas_retry_limit {
                                return Err(EngineError::ConcurrentModification(cart.id));
                            }
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                None => {
                    let cart = Cart::new(customer_id, restaurant_id, self.clock.now_millis());
                    self.store.insert_cart(&cart).await?;
                    debug!(cart_id = %cart.id, customer_id, "created new cart");
                    return Ok(cart);
                }
            }
        }
    }

    /// Add an item to the customer's Active cart, merging with an
    /// equivalent line (same menu item, same customization set) when one
    /// exists.
    ///
    /// Fails with `RestaurantMismatch` if the Active cart belongs to a
    /// different restaurant; the caller must clear or rebind explicitly.
    pub async fn add_item(&self, customer_id: &str, input: AddItemInput) -> EngineResult<Cart> {
        Self::validate_item(&input)?;
        let customization_total = pricing::customization_total(&input.customizations)?;
        let key = line_fingerprint(&input.menu_item_id, &input.customizations);

        let mut attempts = 0;
        loop {
            let now = self.clock.now_millis();
            let (mut cart, fresh) = match self.store.find_active_cart(customer_id).await? {
                Some(cart) => (cart, false),
                None => (Cart::new(customer_id, &input.restaurant_id, now), true),
            };

            if cart.restaurant_id != input.restaurant_id {
                return Err(EngineError::RestaurantMismatch {
                    cart_restaurant: cart.restaurant_id,
                    item_restaurant: input.restaurant_id,
                });
            }

            let existing = cart.items.iter_mut().find(|line| {
                line.menu_item_id == input.menu_item_id
                    && line_fingerprint(&line.menu_item_id, &line.customizations) == key
            });
            match existing {
                Some(line) => {
                    // Equivalent configuration: bump quantity, keep the
                    // price the line was first added at
                    line.quantity += input.quantity;
                    line.line_total =
                        pricing::line_total(line.unit_price, customization_total, line.quantity)?;
                    debug!(
                        cart_id = %cart.id,
                        line_id = %line.line_id,
                        quantity = line.quantity,
                        "merged equivalent line item"
                    );
                }
                None => {
                    let line_total =
                        pricing::line_total(input.unit_price, customization_total, input.quantity)?;
                    cart.items.push(CartLineItem {
                        line_id: shared::util::new_id(),
                        menu_item_id: input.menu_item_id.clone(),
                        name: input.name.clone(),
                        unit_price: input.unit_price,
                        quantity: input.quantity,
                        customizations: input.customizations.clone(),
                        special_instructions: input.special_instructions.clone(),
                        line_total,
                    });
                }
            }
            cart.subtotal = pricing::cart_subtotal(&cart.items);
            cart.last_updated = now;

            let saved = if fresh {
                self.store.insert_cart(&cart).await
            } else {
                self.store.save_cart(&mut cart).await
            };
            match saved {
                Ok(()) => return Ok(cart),
                Err(StoreError::VersionConflict { .. }) | Err(StoreError::DuplicateId { .. }) => {
                    attempts += 1;
                    if attempts > self.config.cas_retry_limit {
                        return Err(EngineError::ConcurrentModification(cart.id));
                    }
                    debug!(customer_id, attempts, "add_item raced, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Set a line's quantity; zero or less removes the line
    pub async fn update_quantity(
        &self,
        cart_id: &str,
        line_id: &str,
        quantity: i32,
    ) -> EngineResult<Cart> {
        if quantity <= 0 {
            return self.remove_item(cart_id, line_id).await;
        }
        self.mutate_cart(cart_id, |cart, _now| {
            {
                let line = cart
                    .items
                    .iter_mut()
                    .find(|l| l.line_id == line_id)
                    .ok_or_else(|| EngineError::ItemNotFound(line_id.to_string()))?;
                let customization_total = pricing::customization_total(&line.customizations)?;
                line.quantity = quantity;
                line.line_total =
                    pricing::line_total(line.unit_price, customization_total, quantity)?;
            }
            cart.subtotal = pricing::cart_subtotal(&cart.items);
            Ok(())
        })
        .await
    }

    /// Remove a line from the cart (no error if it is already gone)
    pub async fn remove_item(&self, cart_id: &str, line_id: &str) -> EngineResult<Cart> {
        self.mutate_cart(cart_id, |cart, _now| {
            cart.items.retain(|l| l.line_id != line_id);
            cart.subtotal = pricing::cart_subtotal(&cart.items);
            Ok(())
        })
        .await
    }

    /// Empty the cart
    pub async fn clear_cart(&self, cart_id: &str) -> EngineResult<Cart> {
        self.mutate_cart(cart_id, |cart, _now| {
            cart.items.clear();
            cart.subtotal = 0.0;
            Ok(())
        })
        .await
    }

    /// Mark Active carts idle past the configured threshold as Abandoned.
    ///
    /// Idempotent; carts touched concurrently are skipped and picked up by
    /// the next sweep. Returns the number of carts abandoned.
    pub async fn sweep_abandoned(&self) -> EngineResult<usize> {
        let now = self.clock.now_millis();
        let cutoff = now - self.config.cart_abandon_threshold_ms();
        let stale = self.store.stale_active_carts(cutoff).await?;

        let mut swept = 0;
        for mut cart in stale {
            cart.status = CartStatus::Abandoned;
            cart.last_updated = now;
            match self.store.save_cart(&mut cart).await {
                Ok(()) => swept += 1,
                Err(StoreError::VersionConflict { .. }) => {
                    debug!(cart_id = %cart.id, "cart changed during sweep, skipping");
                }
                Err(e) => return Err(e.into()),
            }
        }
        if swept > 0 {
            info!(swept, "abandoned stale carts");
        }
        Ok(swept)
    }
}
