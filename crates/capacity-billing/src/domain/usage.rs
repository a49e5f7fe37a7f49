use crate::domain::catalog::Unit;
use crate::domain::types::SubscriptionId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Quantity observed for a unit on a given day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUsageRecord {
    pub subscription_id: SubscriptionId,
    pub date: NaiveDate,
    pub unit: Unit,
    pub quantity: u64,
}

impl RawUsageRecord {
    pub fn new(
        subscription_id: SubscriptionId,
        date: NaiveDate,
        unit: impl Into<String>,
        quantity: u64,
    ) -> Self {
        Self {
            subscription_id,
            date,
            unit: Unit::new(unit),
            quantity,
        }
    }
}

/// Total quantity of one unit over a sub-interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolledUpUnit {
    pub unit: Unit,
    pub quantity: u64,
}

impl RolledUpUnit {
    pub fn new(unit: impl Into<String>, quantity: u64) -> Self {
        Self {
            unit: Unit::new(unit),
            quantity,
        }
    }
}
