//! Courier service
//!
//! Stats are derived data: after every history append the counters are
//! recomputed from the list itself, so `total_deliveries` can never drift
//! from `delivery_history.len()`.

use crate::clock::Clock;
use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::pricing::{to_decimal, to_f64};
use crate::store::{Store, StoreError};
use serde::{Deserialize, Serialize};
use shared::models::{DeliveryPerson, DeliveryRecord, DeliveryRecordStatus};
use shared::types::{GeoPoint, Timestamp};
use std::sync::Arc;
use tracing::{debug, info};

/// Completed-dispatch payload appended to the courier's history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryInput {
    pub order_id: String,
    pub restaurant_id: String,
    pub customer_id: String,
    pub pickup_time: Option<Timestamp>,
    pub delivery_time: Option<Timestamp>,
    pub status: DeliveryRecordStatus,
    pub earnings: f64,
    pub distance_km: f64,
    pub duration_minutes: Option<i32>,
}

/// Courier account service
pub struct CourierService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: Config,
}

impl<S: Store> CourierService<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: Config) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Load-mutate-save with bounded CAS retries
    async fn mutate_courier<F>(&self, courier_id: &str, mut apply: F) -> EngineResult<DeliveryPerson>
    where
        F: FnMut(&mut DeliveryPerson, Timestamp) -> EngineResult<()>,
    {
        let mut attempts = 0;
        loop {
            let mut courier = self
                .store
                .get_courier(courier_id)
                .await?
                .ok_or_else(|| EngineError::CourierNotFound(courier_id.to_string()))?;
            apply(&mut courier, self.clock.now_millis())?;
            match self.store.save_courier(&mut courier).await {
                Ok(()) => return Ok(courier),
                Err(StoreError::VersionConflict { .. }) => {
                    attempts += 1;
                    if attempts > self.config.cas_retry_limit {
                        return Err(EngineError::ConcurrentModification(courier_id.to_string()));
                    }
                    debug!(courier_id, attempts, "courier save conflicted, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Update the tracked position and activity stamp
    pub async fn update_location(
        &self,
        courier_id: &str,
        longitude: f64,
        latitude: f64,
    ) -> EngineResult<DeliveryPerson> {
        if !GeoPoint::new(longitude, latitude).is_valid() {
            return Err(EngineError::Validation(format!(
                "invalid coordinates ({}, {})",
                longitude, latitude
            )));
        }
        self.mutate_courier(courier_id, |courier, now| {
            courier.location.longitude = longitude;
            courier.location.latitude = latitude;
            courier.location.last_updated = now;
            courier.last_active_at = Some(now);
            Ok(())
        })
        .await
    }

    pub async fn set_availability(
        &self,
        courier_id: &str,
        is_available: bool,
    ) -> EngineResult<DeliveryPerson> {
        self.mutate_courier(courier_id, |courier, now| {
            courier.is_available = is_available;
            courier.last_active_at = Some(now);
            Ok(())
        })
        .await
    }

    pub async fn set_online(&self, courier_id: &str, is_online: bool) -> EngineResult<DeliveryPerson> {
        self.mutate_courier(courier_id, |courier, now| {
            courier.is_online = is_online;
            courier.last_active_at = Some(now);
            Ok(())
        })
        .await
    }

    /// Append a delivery to the history and resync the derived counters
    pub async fn record_delivery(
        &self,
        courier_id: &str,
        input: DeliveryInput,
    ) -> EngineResult<DeliveryPerson> {
        if !input.earnings.is_finite() || input.earnings < 0.0 {
            return Err(EngineError::Validation(format!(
                "earnings must be non-negative, got {}",
                input.earnings
            )));
        }
        if !input.distance_km.is_finite() || input.distance_km < 0.0 {
            return Err(EngineError::Validation(format!(
                "distance must be non-negative, got {}",
                input.distance_km
            )));
        }

        let courier = self
            .mutate_courier(courier_id, |courier, now| {
                courier.delivery_history.push(DeliveryRecord {
                    order_id: input.order_id.clone(),
                    restaurant_id: input.restaurant_id.clone(),
                    customer_id: input.customer_id.clone(),
                    pickup_time: input.pickup_time,
                    delivery_time: input.delivery_time,
                    status: input.status,
                    earnings: input.earnings,
                    distance_km: input.distance_km,
                    duration_minutes: input.duration_minutes,
                    created_at: now,
                });
                sync_stats(courier);
                Ok(())
            })
            .await?;
        debug!(
            courier_id,
            total = courier.stats.total_deliveries,
            "delivery recorded"
        );
        Ok(courier)
    }

    /// Add an amount to every earnings bucket
    pub async fn update_earnings(
        &self,
        courier_id: &str,
        amount: f64,
    ) -> EngineResult<DeliveryPerson> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(EngineError::Validation(format!(
                "earnings amount must be positive, got {}",
                amount
            )));
        }
        self.mutate_courier(courier_id, |courier, _now| {
            let add = to_decimal(amount);
            courier.earnings.total = to_f64(to_decimal(courier.earnings.total) + add);
            courier.earnings.today = to_f64(to_decimal(courier.earnings.today) + add);
            courier.earnings.this_week = to_f64(to_decimal(courier.earnings.this_week) + add);
            courier.earnings.this_month = to_f64(to_decimal(courier.earnings.this_month) + add);
            courier.earnings.pending = to_f64(to_decimal(courier.earnings.pending) + add);
            Ok(())
        })
        .await
    }

    /// Zero the daily bucket for every courier (scheduled sweep)
    pub async fn reset_daily_earnings(&self) -> EngineResult<usize> {
        self.reset_earnings("daily", |courier| courier.earnings.today = 0.0)
            .await
    }

    /// Zero the weekly bucket for every courier (scheduled sweep)
    pub async fn reset_weekly_earnings(&self) -> EngineResult<usize> {
        self.reset_earnings("weekly", |courier| courier.earnings.this_week = 0.0)
            .await
    }

    /// Zero the monthly bucket for every courier (scheduled sweep)
    pub async fn reset_monthly_earnings(&self) -> EngineResult<usize> {
        self.reset_earnings("monthly", |courier| courier.earnings.this_month = 0.0)
            .await
    }

    async fn reset_earnings<F>(&self, period: &str, reset: F) -> EngineResult<usize>
    where
        F: Fn(&mut DeliveryPerson),
    {
        let couriers = self.store.list_couriers().await?;
        let mut updated = 0;
        for mut courier in couriers {
            reset(&mut courier);
            match self.store.save_courier(&mut courier).await {
                Ok(()) => updated += 1,
                Err(StoreError::VersionConflict { .. }) => {
                    // A concurrent write landed first; the next sweep run
                    // picks this courier up
                    debug!(courier_id = %courier.id, "courier changed during reset, skipping");
                }
                Err(e) => return Err(e.into()),
            }
        }
        info!(period, updated, "earnings reset");
        Ok(updated)
    }
}

/// Resync the derived counters from the history list
fn sync_stats(courier: &mut DeliveryPerson) {
    courier.stats.total_deliveries = courier.delivery_history.len() as i32;
    courier.stats.completed_deliveries = courier
        .delivery_history
        .iter()
        .filter(|d| d.status == DeliveryRecordStatus::Delivered)
        .count() as i32;
    courier.stats.cancelled_deliveries = courier
        .delivery_history
        .iter()
        .filter(|d| d.status == DeliveryRecordStatus::Cancelled)
        .count() as i32;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::MemoryStore;

    const T0: i64 = 1_700_000_000_000;

    fn test_config() -> Config {
        Config {
            cart_abandon_days: 7,
            max_match_distance_meters: 5_000.0,
            cas_retry_limit: 3,
            estimated_prep_minutes: 30,
        }
    }

    async fn setup() -> (CourierService<MemoryStore>, Arc<MemoryStore>, String) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock::new(T0));
        let courier = DeliveryPerson::new("Sam", -3.70, 40.42, T0);
        store.insert_courier(&courier).await.unwrap();
        (
            CourierService::new(store.clone(), clock, test_config()),
            store,
            courier.id,
        )
    }

    fn delivery(order: &str, status: DeliveryRecordStatus) -> DeliveryInput {
        DeliveryInput {
            order_id: order.to_string(),
            restaurant_id: "rest-1".to_string(),
            customer_id: "cust-1".to_string(),
            pickup_time: Some(T0),
            delivery_time: Some(T0 + 20 * 60_000),
            status,
            earnings: 6.5,
            distance_km: 3.2,
            duration_minutes: Some(20),
        }
    }

    #[tokio::test]
    async fn test_update_location() {
        let (service, _, id) = setup().await;
        let courier = service.update_location(&id, -3.69, 40.41).await.unwrap();
        assert_eq!(courier.location.longitude, -3.69);
        assert_eq!(courier.location.latitude, 40.41);
        assert_eq!(courier.location.last_updated, T0);
        assert_eq!(courier.last_active_at, Some(T0));
    }

    #[tokio::test]
    async fn test_update_location_rejects_bad_coordinates() {
        let (service, _, id) = setup().await;
        let err = service.update_location(&id, -200.0, 40.41).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_history_keeps_stats_in_sync() {
        let (service, _, id) = setup().await;
        service
            .record_delivery(&id, delivery("order-1", DeliveryRecordStatus::Delivered))
            .await
            .unwrap();
        service
            .record_delivery(&id, delivery("order-2", DeliveryRecordStatus::Delivered))
            .await
            .unwrap();
        let courier = service
            .record_delivery(&id, delivery("order-3", DeliveryRecordStatus::Cancelled))
            .await
            .unwrap();

        assert_eq!(courier.delivery_history.len(), 3);
        assert_eq!(
            courier.stats.total_deliveries,
            courier.delivery_history.len() as i32
        );
        assert_eq!(courier.stats.completed_deliveries, 2);
        assert_eq!(courier.stats.cancelled_deliveries, 1);
        assert_eq!(courier.completion_rate(), 67);
    }

    #[tokio::test]
    async fn test_record_delivery_validates_money_and_distance() {
        let (service, _, id) = setup().await;
        let mut input = delivery("order-1", DeliveryRecordStatus::Delivered);
        input.earnings = -1.0;
        assert!(matches!(
            service.record_delivery(&id, input.clone()).await,
            Err(EngineError::Validation(_))
        ));
        input.earnings = 5.0;
        input.distance_km = f64::NAN;
        assert!(matches!(
            service.record_delivery(&id, input).await,
            Err(EngineError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_earnings_touches_every_bucket() {
        let (service, _, id) = setup().await;
        service.update_earnings(&id, 6.5).await.unwrap();
        let courier = service.update_earnings(&id, 3.5).await.unwrap();
        assert_eq!(courier.earnings.total, 10.0);
        assert_eq!(courier.earnings.today, 10.0);
        assert_eq!(courier.earnings.this_week, 10.0);
        assert_eq!(courier.earnings.this_month, 10.0);
        assert_eq!(courier.earnings.pending, 10.0);
    }

    #[tokio::test]
    async fn test_resets_zero_only_their_bucket() {
        let (service, store, id) = setup().await;
        service.update_earnings(&id, 12.0).await.unwrap();

        assert_eq!(service.reset_daily_earnings().await.unwrap(), 1);
        let courier = store.get_courier(&id).await.unwrap().unwrap();
        assert_eq!(courier.earnings.today, 0.0);
        assert_eq!(courier.earnings.this_week, 12.0);
        assert_eq!(courier.earnings.this_month, 12.0);
        assert_eq!(courier.earnings.total, 12.0);

        service.reset_weekly_earnings().await.unwrap();
        service.reset_monthly_earnings().await.unwrap();
        let courier = store.get_courier(&id).await.unwrap().unwrap();
        assert_eq!(courier.earnings.this_week, 0.0);
        assert_eq!(courier.earnings.this_month, 0.0);
        assert_eq!(courier.earnings.total, 12.0);

        // Idempotent
        assert_eq!(service.reset_daily_earnings().await.unwrap(), 1);
        let courier = store.get_courier(&id).await.unwrap().unwrap();
        assert_eq!(courier.earnings.today, 0.0);
    }

    #[tokio::test]
    async fn test_availability_flags() {
        let (service, _, id) = setup().await;
        let courier = service.set_online(&id, true).await.unwrap();
        assert!(courier.is_online);
        let courier = service.set_availability(&id, false).await.unwrap();
        assert!(!courier.is_available);
        assert!(!courier.is_dispatchable());
    }

    #[tokio::test]
    async fn test_unknown_courier() {
        let (service, _, _) = setup().await;
        let err = service.set_online("ghost", true).await.unwrap_err();
        assert!(matches!(err, EngineError::CourierNotFound(_)));
    }
}
