//! Capacity usage catalog: units, per-unit limits, priced tiers.

use crate::domain::types::BillingPeriod;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Measured dimension, identified by name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Unit(String);

impl Unit {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Unit {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Bound on one unit within a tier. A missing `max` means unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limit {
    pub unit: Unit,
    /// Ignored when resolving tiers: tiers are contiguous, only `max` matters.
    #[serde(default)]
    pub min: Option<u64>,
    #[serde(default)]
    pub max: Option<u64>,
}

impl Limit {
    pub fn bounded(unit: Unit, max: u64) -> Self {
        Self {
            unit,
            min: None,
            max: Some(max),
        }
    }

    pub fn unbounded(unit: Unit) -> Self {
        Self {
            unit,
            min: None,
            max: None,
        }
    }

    /// Inclusive upper-bound check
    pub fn admits(&self, quantity: u64) -> bool {
        self.max.map_or(true, |max| quantity <= max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub price: Decimal,
    pub limits: Vec<Limit>,
}

impl Tier {
    pub fn new(price: Decimal, limits: Vec<Limit>) -> Self {
        Self { price, limits }
    }
}

/// Capacity-in-arrear usage section of a plan. Tiers are ranked by position, starting at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub name: String,
    pub billing_period: BillingPeriod,
    pub tiers: Vec<Tier>,
}

impl Usage {
    pub fn new(name: impl Into<String>, billing_period: BillingPeriod, tiers: Vec<Tier>) -> Self {
        Self {
            name: name.into(),
            billing_period,
            tiers,
        }
    }
}
