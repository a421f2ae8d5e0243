//! Engine configuration

/// Engine tunables, read from the environment with sane defaults
#[derive(Debug, Clone)]
pub struct Config {
    /// Days of inactivity before the sweep abandons an Active cart
    pub cart_abandon_days: i64,
    /// Default courier search radius for dispatch
    pub max_match_distance_meters: f64,
    /// Bounded retries on compare-and-swap conflicts before surfacing one
    pub cas_retry_limit: u32,
    /// Preparation estimate used for the initial delivery ETA
    pub estimated_prep_minutes: i64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            cart_abandon_days: std::env::var("CART_ABANDON_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(7),
            max_match_distance_meters: std::env::var("MAX_MATCH_DISTANCE_METERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5_000.0),
            cas_retry_limit: std::env::var("CAS_RETRY_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            estimated_prep_minutes: std::env::var("ESTIMATED_PREP_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }

    /// Abandonment threshold in milliseconds
    pub fn cart_abandon_threshold_ms(&self) -> i64 {
        self.cart_abandon_days * 24 * 60 * 60 * 1000
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abandon_threshold() {
        let config = Config {
            cart_abandon_days: 7,
            max_match_distance_meters: 5_000.0,
            cas_retry_limit: 3,
            estimated_prep_minutes: 30,
        };
        assert_eq!(config.cart_abandon_threshold_ms(), 604_800_000);
    }
}
