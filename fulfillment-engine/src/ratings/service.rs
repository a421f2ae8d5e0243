//! Persisted review operations
//!
//! Thin store-backed wrapper over the review helpers, for reviews that
//! arrive outside the order-rating flow (e.g. a customer editing their
//! review, a restaurant replying).

use super::{respond_to_review, upsert_review, ReviewInput};
use crate::clock::Clock;
use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::store::{Store, StoreError};
use shared::models::Restaurant;
use std::sync::Arc;
use tracing::{debug, info};

/// Review service
pub struct RatingService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: Config,
}

impl<S: Store> RatingService<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: Config) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    async fn mutate_restaurant<F>(&self, restaurant_id: &str, mut apply: F) -> EngineResult<Restaurant>
    where
        F: FnMut(&mut Restaurant, shared::types::Timestamp) -> EngineResult<()>,
    {
        let mut attempts = 0;
        loop {
            let mut restaurant = self
                .store
                .get_restaurant(restaurant_id)
                .await?
                .ok_or_else(|| EngineError::RestaurantNotFound(restaurant_id.to_string()))?;
            apply(&mut restaurant, self.clock.now_millis())?;
            match self.store.save_restaurant(&mut restaurant).await {
                Ok(()) => return Ok(restaurant),
                Err(StoreError::VersionConflict { .. }) => {
                    attempts += 1;
                    if attempts > self.config.cas_retry_limit {
                        return Err(EngineError::ConcurrentModification(
                            restaurant_id.to_string(),
                        ));
                    }
                    debug!(restaurant_id, attempts, "restaurant save conflicted, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Submit or resubmit a customer review (one review per customer)
    pub async fn submit_review(
        &self,
        restaurant_id: &str,
        input: ReviewInput,
    ) -> EngineResult<Restaurant> {
        if !(1..=5).contains(&input.rating) {
            return Err(EngineError::Validation(format!(
                "rating must be between 1 and 5, got {}",
                input.rating
            )));
        }
        let restaurant = self
            .mutate_restaurant(restaurant_id, |restaurant, now| {
                upsert_review(restaurant, input.clone(), now);
                Ok(())
            })
            .await?;
        info!(
            restaurant_id,
            average = restaurant.average_rating,
            reviews = restaurant.total_reviews,
            "review recorded"
        );
        Ok(restaurant)
    }

    /// Record the restaurant's reply to a review
    pub async fn respond(
        &self,
        restaurant_id: &str,
        review_id: &str,
        response: &str,
    ) -> EngineResult<Restaurant> {
        self.mutate_restaurant(restaurant_id, |restaurant, now| {
            respond_to_review(restaurant, review_id, response, now)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::MemoryStore;

    fn setup() -> (RatingService<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(1_700_000_000_000));
        let config = Config {
            cart_abandon_days: 7,
            max_match_distance_meters: 5_000.0,
            cas_retry_limit: 3,
            estimated_prep_minutes: 30,
        };
        (RatingService::new(store.clone(), clock, config), store)
    }

    fn review(customer: &str, rating: i32) -> ReviewInput {
        ReviewInput {
            customer_id: customer.to_string(),
            rating,
            comment: "ok".to_string(),
            images: vec![],
        }
    }

    #[tokio::test]
    async fn test_submit_review_persists_aggregate() {
        let (service, store) = setup();
        let restaurant = Restaurant::new("Trattoria");
        store.insert_restaurant(&restaurant).await.unwrap();

        service.submit_review(&restaurant.id, review("cust-1", 5)).await.unwrap();
        let updated = service.submit_review(&restaurant.id, review("cust-2", 4)).await.unwrap();
        assert_eq!(updated.average_rating, 4.5);
        assert_eq!(updated.total_reviews, 2);

        let loaded = store.get_restaurant(&restaurant.id).await.unwrap().unwrap();
        assert_eq!(loaded.average_rating, 4.5);
    }

    #[tokio::test]
    async fn test_submit_review_validates_range() {
        let (service, store) = setup();
        let restaurant = Restaurant::new("Trattoria");
        store.insert_restaurant(&restaurant).await.unwrap();

        let err = service.submit_review(&restaurant.id, review("cust-1", 0)).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_respond_unknown_review() {
        let (service, store) = setup();
        let restaurant = Restaurant::new("Trattoria");
        store.insert_restaurant(&restaurant).await.unwrap();

        let err = service.respond(&restaurant.id, "missing", "hi").await.unwrap_err();
        assert!(matches!(err, EngineError::ReviewNotFound(_)));
    }

    #[tokio::test]
    async fn test_respond_attaches_reply() {
        let (service, store) = setup();
        let restaurant = Restaurant::new("Trattoria");
        store.insert_restaurant(&restaurant).await.unwrap();

        let updated = service.submit_review(&restaurant.id, review("cust-1", 4)).await.unwrap();
        let review_id = updated.reviews[0].id.clone();
        let updated = service
            .respond(&restaurant.id, &review_id, "Thanks for coming!")
            .await
            .unwrap();
        assert_eq!(
            updated.reviews[0].response.as_deref(),
            Some("Thanks for coming!")
        );
    }

    #[tokio::test]
    async fn test_unknown_restaurant() {
        let (service, _) = setup();
        let err = service.submit_review("ghost", review("cust-1", 4)).await.unwrap_err();
        assert!(matches!(err, EngineError::RestaurantNotFound(_)));
    }
}
