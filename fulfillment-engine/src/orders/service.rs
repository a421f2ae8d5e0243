//! Order service
//!
//! Orders are advanced by independent actors (customer app, restaurant
//! app, courier app, backend jobs) issuing sequential transition requests.
//! Every update is a compare-and-swap conditioned on the document version,
//! so two concurrent transitions can never silently drop a timeline entry;
//! the loser reloads, revalidates against the new status, and either
//! retries or fails with `InvalidTransition`.

use crate::clock::Clock;
use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::pricing;
use crate::ratings;
use crate::store::{Store, StoreError};
use serde::{Deserialize, Serialize};
use shared::models::{
    CourierRating, CustomerRating, DeliveryAddress, Order, OrderItem, OrderPricing, OrderStatus,
    PaymentInfo, PaymentMethod, PaymentStatus, TimelineEntry,
};
use shared::types::Timestamp;
use std::sync::Arc;
use tracing::{debug, info};

/// Charges added on top of the cart subtotal at checkout
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OrderCharges {
    pub delivery_fee: f64,
    pub tax: f64,
    pub discount: f64,
    pub tip: f64,
}

/// Customer rating payload (all values 1-5)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingInput {
    pub restaurant: i32,
    pub delivery: i32,
    pub food: i32,
    pub comment: Option<String>,
}

/// Order lifecycle service
pub struct OrderService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: Config,
}

impl<S: Store> OrderService<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: Config) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Load-mutate-save with bounded CAS retries
    async fn mutate_order<F>(&self, order_id: &str, mut apply: F) -> EngineResult<Order>
    where
        F: FnMut(&mut Order, Timestamp) -> EngineResult<()>,
    {
        let mut attempts = 0;
        loop {
            let mut order = self
                .store
                .get_order(order_id)
                .await?
                .ok_or_else(|| EngineError::OrderNotFound(order_id.to_string()))?;
            apply(&mut order, self.clock.now_millis())?;
            match self.store.save_order(&mut order).await {
                Ok(()) => return Ok(order),
                Err(StoreError::VersionConflict { .. }) => {
                    attempts += 1;
                    if attempts > self.config.cas_retry_limit {
                        return Err(EngineError::ConcurrentModification(order_id.to_string()));
                    }
                    debug!(order_id, attempts, "order save conflicted, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Convert the cart into a Pending order, snapshotting items and
    /// prices, and drive the cart Checkout -> Completed.
    pub async fn create_from_cart(
        &self,
        cart_id: &str,
        delivery_address: DeliveryAddress,
        payment_method: PaymentMethod,
        charges: OrderCharges,
    ) -> EngineResult<Order> {
        let mut cart = self
            .store
            .get_cart(cart_id)
            .await?
            .ok_or_else(|| EngineError::CartNotFound(cart_id.to_string()))?;
        if !cart.is_active() {
            return Err(EngineError::Validation(format!(
                "cart {} is not active",
                cart_id
            )));
        }
        if cart.items.is_empty() {
            return Err(EngineError::Validation(format!("cart {} is empty", cart_id)));
        }

        let total = pricing::order_total(
            cart.subtotal,
            charges.delivery_fee,
            charges.tax,
            charges.discount,
            charges.tip,
        )?;

        let now = self.clock.now_millis();
        let order = Order {
            id: shared::util::new_id(),
            order_number: format!("ORD-{}", shared::util::snowflake_id()),
            customer_id: cart.customer_id.clone(),
            restaurant_id: cart.restaurant_id.clone(),
            delivery_person_id: None,
            // Copied, not referenced: the order owns its item snapshots
            items: cart
                .items
                .iter()
                .map(|line| OrderItem {
                    menu_item_id: line.menu_item_id.clone(),
                    name: line.name.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    customizations: line.customizations.clone(),
                    special_instructions: line.special_instructions.clone(),
                    line_total: line.line_total,
                })
                .collect(),
            delivery_address,
            pricing: OrderPricing {
                subtotal: cart.subtotal,
                delivery_fee: charges.delivery_fee,
                tax: charges.tax,
                discount: charges.discount,
                tip: charges.tip,
                total,
            },
            payment: PaymentInfo::new(payment_method),
            status: OrderStatus::Pending,
            timeline: vec![TimelineEntry {
                status: OrderStatus::Pending.to_string(),
                timestamp: now,
                note: Some("Order placed".to_string()),
            }],
            estimated_delivery_time: now + self.config.estimated_prep_minutes * 60_000,
            actual_delivery_time: None,
            cancellation_reason: None,
            customer_rating: None,
            created_at: now,
            version: 0,
        };

        // Checkout marks the cart as being converted; Completed seals it
        // once the order exists
        cart.status = shared::models::CartStatus::Checkout;
        cart.last_updated = now;
        self.save_cart_once(&mut cart).await?;

        self.store.insert_order(&order).await?;

        cart.status = shared::models::CartStatus::Completed;
        self.save_cart_once(&mut cart).await?;

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = order.pricing.total,
            "order created"
        );
        Ok(order)
    }

    /// Single CAS save of the cart; a conflict during conversion is a
    /// hard error, not a retry (the cart contents must not change under a
    /// checkout in progress)
    async fn save_cart_once(&self, cart: &mut shared::models::Cart) -> EngineResult<()> {
        match self.store.save_cart(cart).await {
            Ok(()) => Ok(()),
            Err(StoreError::VersionConflict { .. }) => {
                Err(EngineError::ConcurrentModification(cart.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply a status change plus its timeline entry to the loaded order
    fn apply_transition(
        order: &mut Order,
        new_status: OrderStatus,
        note: Option<String>,
        now: Timestamp,
    ) -> EngineResult<()> {
        if !order.status.can_transition_to(new_status) {
            return Err(EngineError::InvalidTransition {
                from: order.status,
                to: new_status,
            });
        }
        order.status = new_status;
        order.timeline.push(TimelineEntry {
            status: new_status.to_string(),
            timestamp: now,
            note: note
                .or_else(|| Some(format!("Order {}", new_status.to_string().to_lowercase()))),
        });
        if new_status == OrderStatus::Delivered {
            order.actual_delivery_time = Some(now);
            order.payment.status = PaymentStatus::Completed;
            order.payment.paid_at = Some(now);
        }
        Ok(())
    }

    /// Advance the order to `new_status`.
    ///
    /// Only the adjacent forward step (or a legal cancellation) is
    /// accepted; anything else fails with `InvalidTransition`.
    pub async fn transition(
        &self,
        order_id: &str,
        new_status: OrderStatus,
        note: Option<String>,
    ) -> EngineResult<Order> {
        let order = self
            .mutate_order(order_id, |order, now| {
                Self::apply_transition(order, new_status, note.clone(), now)
            })
            .await?;
        info!(order_id, status = %order.status, "order transitioned");
        Ok(order)
    }

    /// Cancel the order, recording the reason.
    ///
    /// Only allowed while the restaurant still holds the order (Pending,
    /// Confirmed, Preparing).
    pub async fn cancel(&self, order_id: &str, reason: Option<String>) -> EngineResult<Order> {
        let order = self
            .mutate_order(order_id, |order, now| {
                Self::apply_transition(order, OrderStatus::Cancelled, reason.clone(), now)?;
                order.cancellation_reason = reason.clone();
                Ok(())
            })
            .await?;
        info!(order_id, "order cancelled");
        Ok(order)
    }

    /// Attach a courier to the order.
    ///
    /// Appends an "Assigned" audit entry; the order status itself does not
    /// change (dispatch policy decides when the courier picks up).
    pub async fn assign_delivery_person(
        &self,
        order_id: &str,
        courier_id: &str,
    ) -> EngineResult<Order> {
        self.store
            .get_courier(courier_id)
            .await?
            .ok_or_else(|| EngineError::CourierNotFound(courier_id.to_string()))?;

        let order = self
            .mutate_order(order_id, |order, now| {
                if order.status.is_terminal() {
                    return Err(EngineError::Validation(format!(
                        "cannot assign a courier to a {} order",
                        order.status
                    )));
                }
                order.delivery_person_id = Some(courier_id.to_string());
                order.timeline.push(TimelineEntry {
                    status: "Assigned".to_string(),
                    timestamp: now,
                    note: Some("Delivery person assigned".to_string()),
                });
                Ok(())
            })
            .await?;
        info!(order_id, courier_id, "delivery person assigned");
        Ok(order)
    }

    /// Record the customer's rating for a delivered order and propagate it
    /// to the restaurant review and the courier's rating list.
    ///
    /// Resubmission replaces the previous rating wholesale; no history is
    /// kept on the order.
    pub async fn add_rating(&self, order_id: &str, input: RatingInput) -> EngineResult<Order> {
        for (field, value) in [
            ("restaurant", input.restaurant),
            ("delivery", input.delivery),
            ("food", input.food),
        ] {
            if !(1..=5).contains(&value) {
                return Err(EngineError::Validation(format!(
                    "{} rating must be between 1 and 5, got {}",
                    field, value
                )));
            }
        }

        let order = self
            .mutate_order(order_id, |order, now| {
                if order.status != OrderStatus::Delivered {
                    return Err(EngineError::Validation(format!(
                        "order {} must be delivered before rating, currently {}",
                        order_id, order.status
                    )));
                }
                order.customer_rating = Some(CustomerRating {
                    restaurant: input.restaurant,
                    delivery: input.delivery,
                    food: input.food,
                    comment: input.comment.clone(),
                    rated_at: now,
                });
                Ok(())
            })
            .await?;

        self.propagate_rating(&order, &input).await?;
        info!(order_id, "customer rating recorded");
        Ok(order)
    }

    /// Push the rating into the restaurant review list and the courier's
    /// rating list, recomputing both aggregates from their full
    /// collections.
    async fn propagate_rating(&self, order: &Order, input: &RatingInput) -> EngineResult<()> {
        let mut attempts = 0;
        loop {
            let mut restaurant = self
                .store
                .get_restaurant(&order.restaurant_id)
                .await?
                .ok_or_else(|| EngineError::RestaurantNotFound(order.restaurant_id.clone()))?;
            ratings::upsert_review(
                &mut restaurant,
                ratings::ReviewInput {
                    customer_id: order.customer_id.clone(),
                    rating: input.restaurant,
                    comment: input.comment.clone().unwrap_or_default(),
                    images: Vec::new(),
                },
                self.clock.now_millis(),
            );
            match self.store.save_restaurant(&mut restaurant).await {
                Ok(()) => break,
                Err(StoreError::VersionConflict { .. }) => {
                    attempts += 1;
                    if attempts > self.config.cas_retry_limit {
                        return Err(EngineError::ConcurrentModification(
                            order.restaurant_id.clone(),
                        ));
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        let Some(courier_id) = &order.delivery_person_id else {
            return Ok(());
        };
        let mut attempts = 0;
        loop {
            let mut courier = self
                .store
                .get_courier(courier_id)
                .await?
                .ok_or_else(|| EngineError::CourierNotFound(courier_id.clone()))?;
            ratings::record_courier_rating(
                &mut courier,
                CourierRating {
                    order_id: order.id.clone(),
                    customer_id: order.customer_id.clone(),
                    rating: input.delivery,
                    comment: input.comment.clone(),
                    created_at: self.clock.now_millis(),
                },
            );
            match self.store.save_courier(&mut courier).await {
                Ok(()) => return Ok(()),
                Err(StoreError::VersionConflict { .. }) => {
                    attempts += 1;
                    if attempts > self.config.cas_retry_limit {
                        return Err(EngineError::ConcurrentModification(courier_id.clone()));
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
