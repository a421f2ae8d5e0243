//! Restaurant model (rating surface)
//!
//! Only the review/rating side of the restaurant lives in the fulfillment
//! core. One review per customer: resubmitting replaces the existing
//! review's content in place, never adds a second entry.

use crate::types::Timestamp;
use serde::{Deserialize, Serialize};

/// One customer review of a restaurant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub customer_id: String,
    pub rating: i32,
    pub comment: String,
    /// Restaurant's reply, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Restaurant document (fulfillment-relevant fields only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    /// Mean of all review ratings, rounded to 1 decimal; 0 when unreviewed
    pub average_rating: f64,
    pub total_reviews: i32,
    #[serde(default)]
    pub reviews: Vec<Review>,
    /// CAS counter, bumped by the store on each successful save
    #[serde(default)]
    pub version: u64,
}

impl Restaurant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: crate::util::new_id(),
            name: name.into(),
            average_rating: 0.0,
            total_reviews: 0,
            reviews: Vec::new(),
            version: 0,
        }
    }

    /// Existing review by this customer, if any
    pub fn review_by(&self, customer_id: &str) -> Option<&Review> {
        self.reviews.iter().find(|r| r.customer_id == customer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_lookup_by_customer() {
        let mut restaurant = Restaurant::new("Trattoria");
        assert!(restaurant.review_by("cust-1").is_none());
        restaurant.reviews.push(Review {
            id: "rev-1".to_string(),
            customer_id: "cust-1".to_string(),
            rating: 4,
            comment: "Good".to_string(),
            response: None,
            images: vec![],
            created_at: 1,
            updated_at: 1,
        });
        assert_eq!(restaurant.review_by("cust-1").unwrap().rating, 4);
        assert!(restaurant.review_by("cust-2").is_none());
    }
}
