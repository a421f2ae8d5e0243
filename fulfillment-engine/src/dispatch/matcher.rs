//! Delivery matcher
//!
//! Eligibility is the conjunction of all four courier flags plus the
//! radius check; ranking is best average rating first, experience (total
//! deliveries) breaking ties. An empty result is a normal outcome, not an
//! error.

use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::geo::haversine_meters;
use crate::store::Store;
use shared::models::DeliveryPerson;
use shared::types::GeoPoint;
use std::sync::Arc;
use tracing::debug;

/// One ranked dispatch proposal
#[derive(Debug, Clone)]
pub struct CourierCandidate {
    pub courier: DeliveryPerson,
    pub distance_meters: f64,
}

/// Courier matcher
pub struct DeliveryMatcher<S> {
    store: Arc<S>,
    config: Config,
}

impl<S: Store> DeliveryMatcher<S> {
    pub fn new(store: Arc<S>, config: Config) -> Self {
        Self { store, config }
    }

    /// Rank dispatchable couriers within `max_distance_meters` of the
    /// pickup point: highest average rating first, more total deliveries
    /// breaking ties.
    pub async fn find_candidates(
        &self,
        pickup: GeoPoint,
        max_distance_meters: f64,
    ) -> EngineResult<Vec<CourierCandidate>> {
        if !pickup.is_valid() {
            return Err(EngineError::Validation(format!(
                "invalid pickup coordinates ({}, {})",
                pickup.longitude, pickup.latitude
            )));
        }
        if !(max_distance_meters.is_finite() && max_distance_meters > 0.0) {
            return Err(EngineError::Validation(format!(
                "max distance must be positive, got {}",
                max_distance_meters
            )));
        }

        let nearby = self.store.couriers_near(pickup, max_distance_meters).await?;
        let considered = nearby.len();

        let mut candidates: Vec<CourierCandidate> = nearby
            .into_iter()
            .filter(|courier| courier.is_dispatchable())
            .map(|courier| {
                let distance_meters = haversine_meters(pickup, courier.location.point());
                CourierCandidate {
                    courier,
                    distance_meters,
                }
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.courier
                .stats
                .average_rating
                .total_cmp(&a.courier.stats.average_rating)
                .then(b.courier.stats.total_deliveries.cmp(&a.courier.stats.total_deliveries))
        });

        debug!(
            considered,
            eligible = candidates.len(),
            max_distance_meters,
            "ranked dispatch candidates"
        );
        Ok(candidates)
    }

    /// Same ranking with the configured default radius
    pub async fn find_candidates_nearby(
        &self,
        pickup: GeoPoint,
    ) -> EngineResult<Vec<CourierCandidate>> {
        self.find_candidates(pickup, self.config.max_match_distance_meters)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const PICKUP: GeoPoint = GeoPoint {
        longitude: -3.7038,
        latitude: 40.4168,
    };

    fn test_config() -> Config {
        Config {
            cart_abandon_days: 7,
            max_match_distance_meters: 5_000.0,
            cas_retry_limit: 3,
            estimated_prep_minutes: 30,
        }
    }

    fn courier(id: &str, rating: f64, deliveries: i32) -> DeliveryPerson {
        // All couriers sit a few hundred meters from the pickup point
        let mut courier = DeliveryPerson::new(id, -3.7040, 40.4180, 0);
        courier.id = id.to_string();
        courier.is_online = true;
        courier.is_verified = true;
        courier.stats.average_rating = rating;
        courier.stats.total_deliveries = deliveries;
        courier
    }

    async fn setup(couriers: Vec<DeliveryPerson>) -> DeliveryMatcher<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for c in &couriers {
            store.insert_courier(c).await.unwrap();
        }
        DeliveryMatcher::new(store, test_config())
    }

    #[tokio::test]
    async fn test_ranks_by_rating_desc() {
        let matcher = setup(vec![courier("a", 4.5, 100), courier("b", 4.9, 10)]).await;
        let candidates = matcher.find_candidates(PICKUP, 5_000.0).await.unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].courier.id, "b");
        assert_eq!(candidates[1].courier.id, "a");
    }

    #[tokio::test]
    async fn test_experience_breaks_rating_ties() {
        let matcher = setup(vec![courier("rookie", 4.5, 12), courier("veteran", 4.5, 480)]).await;
        let candidates = matcher.find_candidates(PICKUP, 5_000.0).await.unwrap();
        assert_eq!(candidates[0].courier.id, "veteran");
    }

    #[tokio::test]
    async fn test_filters_every_eligibility_flag() {
        let mut offline = courier("offline", 5.0, 50);
        offline.is_online = false;
        let mut busy = courier("busy", 5.0, 50);
        busy.is_available = false;
        let mut suspended = courier("suspended", 5.0, 50);
        suspended.is_active = false;
        let mut unverified = courier("unverified", 5.0, 50);
        unverified.is_verified = false;

        let matcher = setup(vec![offline, busy, suspended, unverified, courier("ok", 4.0, 5)]).await;
        let candidates = matcher.find_candidates(PICKUP, 5_000.0).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].courier.id, "ok");
    }

    #[tokio::test]
    async fn test_radius_excludes_distant_couriers() {
        let mut distant = courier("distant", 5.0, 50);
        distant.location.longitude = 2.1700; // Barcelona
        distant.location.latitude = 41.3870;

        let matcher = setup(vec![distant, courier("near", 4.0, 5)]).await;
        let candidates = matcher.find_candidates(PICKUP, 5_000.0).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].courier.id, "near");
        assert!(candidates[0].distance_meters < 5_000.0);
    }

    #[tokio::test]
    async fn test_no_candidates_is_empty_not_error() {
        let matcher = setup(vec![]).await;
        let candidates = matcher.find_candidates(PICKUP, 5_000.0).await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_bad_inputs() {
        let matcher = setup(vec![]).await;
        let err = matcher
            .find_candidates(GeoPoint::new(200.0, 0.0), 5_000.0)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let err = matcher.find_candidates(PICKUP, 0.0).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_default_radius_helper() {
        let matcher = setup(vec![courier("a", 4.0, 1)]).await;
        let candidates = matcher.find_candidates_nearby(PICKUP).await.unwrap();
        assert_eq!(candidates.len(), 1);
    }
}
