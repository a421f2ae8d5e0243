//! Rating aggregation and reviews
//!
//! Aggregates are always recomputed from the full rating collection, never
//! accumulated incrementally, so edits to an existing review keep the
//! average correct. The same 1-decimal mean applies to restaurants and
//! delivery personnel.
//!
//! The mutation helpers here are free functions over the value-typed
//! entities; persistence stays with the calling service.

mod service;

pub use service::RatingService;

use crate::error::{EngineError, EngineResult};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use shared::models::{CourierRating, DeliveryPerson, Restaurant, Review};
use shared::types::Timestamp;

/// Recomputed aggregate for a rating collection
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RatingStats {
    /// Mean rating rounded to 1 decimal; 0 for an empty collection
    pub average: f64,
    pub count: i32,
}

/// Review payload for submission or resubmission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewInput {
    pub customer_id: String,
    pub rating: i32,
    pub comment: String,
    pub images: Vec<String>,
}

/// Recompute the aggregate from the full collection of rating values
pub fn recompute<I>(ratings: I) -> RatingStats
where
    I: IntoIterator<Item = i32>,
{
    let values: Vec<i32> = ratings.into_iter().collect();
    if values.is_empty() {
        return RatingStats::default();
    }
    let sum: i64 = values.iter().map(|&v| v as i64).sum();
    let mean = Decimal::from(sum) / Decimal::from(values.len() as i64);
    RatingStats {
        average: mean
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
            .to_f64()
            .unwrap_or_default(),
        count: values.len() as i32,
    }
}

/// Insert the customer's review, or update their existing one in place
/// (one review per customer), then refresh the aggregate.
pub fn upsert_review(restaurant: &mut Restaurant, input: ReviewInput, now: Timestamp) {
    match restaurant
        .reviews
        .iter_mut()
        .find(|r| r.customer_id == input.customer_id)
    {
        Some(review) => {
            review.rating = input.rating;
            review.comment = input.comment;
            review.images = input.images;
            review.updated_at = now;
        }
        None => restaurant.reviews.push(Review {
            id: shared::util::new_id(),
            customer_id: input.customer_id,
            rating: input.rating,
            comment: input.comment,
            response: None,
            images: input.images,
            created_at: now,
            updated_at: now,
        }),
    }
    recompute_restaurant(restaurant);
}

/// Attach the restaurant's reply to one of its reviews
pub fn respond_to_review(
    restaurant: &mut Restaurant,
    review_id: &str,
    response: &str,
    now: Timestamp,
) -> EngineResult<()> {
    let review = restaurant
        .reviews
        .iter_mut()
        .find(|r| r.id == review_id)
        .ok_or_else(|| EngineError::ReviewNotFound(review_id.to_string()))?;
    review.response = Some(response.to_string());
    review.updated_at = now;
    Ok(())
}

/// Refresh `average_rating` / `total_reviews` from the review list
pub fn recompute_restaurant(restaurant: &mut Restaurant) {
    let stats = recompute(restaurant.reviews.iter().map(|r| r.rating));
    restaurant.average_rating = stats.average;
    restaurant.total_reviews = stats.count;
}

/// Record a courier rating, replacing a previous rating for the same
/// order (a customer re-rating an order must not count twice), then
/// refresh the aggregate.
pub fn record_courier_rating(courier: &mut DeliveryPerson, rating: CourierRating) {
    match courier
        .ratings
        .iter_mut()
        .find(|r| r.order_id == rating.order_id)
    {
        Some(existing) => *existing = rating,
        None => courier.ratings.push(rating),
    }
    recompute_courier(courier);
}

/// Refresh the courier's rating aggregate from the full list
pub fn recompute_courier(courier: &mut DeliveryPerson) {
    let stats = recompute(courier.ratings.iter().map(|r| r.rating));
    courier.stats.average_rating = stats.average;
    courier.stats.total_ratings = stats.count;
}
