//! Delivery person model
//!
//! Couriers carry a tracked location, dispatch eligibility flags, running
//! stats, earnings buckets, and two append-only lists: ratings and the
//! delivery history. Stats are derived from those lists and kept in sync
//! by the engine (`total_deliveries` always equals the history length).

use crate::types::{GeoPoint, Timestamp};
use serde::{Deserialize, Serialize};

/// Tracked courier position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub longitude: f64,
    pub latitude: f64,
    pub last_updated: Timestamp,
}

impl GeoLocation {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.longitude, self.latitude)
    }
}

/// Running delivery statistics, derived from the history and ratings lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryStats {
    pub total_deliveries: i32,
    pub completed_deliveries: i32,
    pub cancelled_deliveries: i32,
    /// Mean of all ratings, rounded to 1 decimal; 0 when unrated
    pub average_rating: f64,
    pub total_ratings: i32,
}

/// Earnings buckets; today/this_week/this_month are reset by scheduled sweeps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Earnings {
    pub total: f64,
    pub today: f64,
    pub this_week: f64,
    pub this_month: f64,
    pub pending: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_payout: Option<Timestamp>,
}

/// One customer rating of a courier, tied to the order it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourierRating {
    pub order_id: String,
    pub customer_id: String,
    pub rating: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: Timestamp,
}

/// Outcome of one delivery in the courier's history
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryRecordStatus {
    #[default]
    Assigned,
    PickedUp,
    OutForDelivery,
    Delivered,
    Cancelled,
}

/// One entry in the courier's delivery history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub order_id: String,
    pub restaurant_id: String,
    pub customer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_time: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_time: Option<Timestamp>,
    pub status: DeliveryRecordStatus,
    pub earnings: f64,
    pub distance_km: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i32>,
    pub created_at: Timestamp,
}

/// Delivery person document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryPerson {
    pub id: String,
    pub name: String,
    pub location: GeoLocation,
    pub is_available: bool,
    pub is_online: bool,
    pub is_active: bool,
    pub is_verified: bool,
    pub stats: DeliveryStats,
    pub earnings: Earnings,
    /// Append-only
    #[serde(default)]
    pub ratings: Vec<CourierRating>,
    /// Append-only
    #[serde(default)]
    pub delivery_history: Vec<DeliveryRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_active_at: Option<Timestamp>,
    /// CAS counter, bumped by the store on each successful save
    #[serde(default)]
    pub version: u64,
}

impl DeliveryPerson {
    /// Create a courier with default flags (available+active, offline, unverified)
    pub fn new(name: impl Into<String>, longitude: f64, latitude: f64, now: Timestamp) -> Self {
        Self {
            id: crate::util::new_id(),
            name: name.into(),
            location: GeoLocation {
                longitude,
                latitude,
                last_updated: now,
            },
            is_available: true,
            is_online: false,
            is_active: true,
            is_verified: false,
            stats: DeliveryStats::default(),
            earnings: Earnings::default(),
            ratings: Vec::new(),
            delivery_history: Vec::new(),
            last_active_at: None,
            version: 0,
        }
    }

    /// All four flags must hold for the matcher to propose this courier
    pub fn is_dispatchable(&self) -> bool {
        self.is_available && self.is_online && self.is_active && self.is_verified
    }

    /// Share of completed deliveries, in percent (100 when no history)
    pub fn completion_rate(&self) -> i32 {
        if self.stats.total_deliveries == 0 {
            return 100;
        }
        ((self.stats.completed_deliveries as f64 / self.stats.total_deliveries as f64) * 100.0)
            .round() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_courier_is_not_dispatchable_until_verified_and_online() {
        let mut courier = DeliveryPerson::new("Sam", -3.70, 40.42, 1_000);
        assert!(!courier.is_dispatchable());
        courier.is_online = true;
        assert!(!courier.is_dispatchable());
        courier.is_verified = true;
        assert!(courier.is_dispatchable());
        courier.is_available = false;
        assert!(!courier.is_dispatchable());
    }

    #[test]
    fn test_completion_rate() {
        let mut courier = DeliveryPerson::new("Sam", 0.0, 0.0, 0);
        assert_eq!(courier.completion_rate(), 100);
        courier.stats.total_deliveries = 4;
        courier.stats.completed_deliveries = 3;
        assert_eq!(courier.completion_rate(), 75);
    }
}
