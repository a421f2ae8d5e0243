//! Customer model
//!
//! Credentials and profile live outside the fulfillment core; only the
//! loyalty balance is needed here.

use serde::{Deserialize, Serialize};

/// Customer document (fulfillment-relevant fields only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub loyalty_points: i64,
    /// CAS counter, bumped by the store on each successful save
    #[serde(default)]
    pub version: u64,
}

impl Customer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: crate::util::new_id(),
            name: name.into(),
            loyalty_points: 0,
            version: 0,
        }
    }
}
