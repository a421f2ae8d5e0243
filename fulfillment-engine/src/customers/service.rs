//! Customer service
//!
//! Loyalty balance bookkeeping. Deductions are checked against the
//! balance; the balance can never go negative.

use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::store::{Store, StoreError};
use shared::models::Customer;
use std::sync::Arc;
use tracing::debug;

/// Customer account service
pub struct CustomerService<S> {
    store: Arc<S>,
    config: Config,
}

impl<S: Store> CustomerService<S> {
    pub fn new(store: Arc<S>, config: Config) -> Self {
        Self { store, config }
    }

    async fn mutate_customer<F>(&self, customer_id: &str, mut apply: F) -> EngineResult<Customer>
    where
        F: FnMut(&mut Customer) -> EngineResult<()>,
    {
        let mut attempts = 0;
        loop {
            let mut customer = self
                .store
                .get_customer(customer_id)
                .await?
                .ok_or_else(|| EngineError::CustomerNotFound(customer_id.to_string()))?;
            apply(&mut customer)?;
            match self.store.save_customer(&mut customer).await {
                Ok(()) => return Ok(customer),
                Err(StoreError::VersionConflict { .. }) => {
                    attempts += 1;
                    if attempts > self.config.cas_retry_limit {
                        return Err(EngineError::ConcurrentModification(customer_id.to_string()));
                    }
                    debug!(customer_id, attempts, "customer save conflicted, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Credit loyalty points
    pub async fn add_points(&self, customer_id: &str, points: i64) -> EngineResult<Customer> {
        if points <= 0 {
            return Err(EngineError::Validation(format!(
                "points to add must be positive, got {}",
                points
            )));
        }
        self.mutate_customer(customer_id, |customer| {
            customer.loyalty_points += points;
            Ok(())
        })
        .await
    }

    /// Spend loyalty points; fails when the balance is too small
    pub async fn deduct_points(&self, customer_id: &str, points: i64) -> EngineResult<Customer> {
        if points <= 0 {
            return Err(EngineError::Validation(format!(
                "points to deduct must be positive, got {}",
                points
            )));
        }
        self.mutate_customer(customer_id, |customer| {
            if customer.loyalty_points < points {
                return Err(EngineError::InsufficientBalance {
                    available: customer.loyalty_points,
                    requested: points,
                });
            }
            customer.loyalty_points -= points;
            Ok(())
        })
        .await
    }
}
