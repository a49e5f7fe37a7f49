//! Capacity tier resolution.
//!
//! Each unit lands on the smallest tier whose limit admits its quantity; the
//! interval is charged the flat price of the highest tier any unit reached,
//! exactly once.

use crate::domain::catalog::{Limit, Unit, Usage};
use crate::domain::invoice::UsageInArrearDetail;
use crate::domain::usage::RolledUpUnit;
use crate::error::{BillingError, Result};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::warn;

/// Charge for one sub-interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedUsage {
    /// Highest tier reached by any unit; `None` when nothing was used.
    pub tier: Option<u32>,
    pub amount: Decimal,
    pub details: Vec<UsageInArrearDetail>,
}

impl PricedUsage {
    pub fn nothing() -> Self {
        Self {
            tier: None,
            amount: Decimal::ZERO,
            details: Vec::new(),
        }
    }
}

/// Per-usage tier table, built once and reused for every sub-interval
#[derive(Debug, Clone)]
pub struct CapacityPricer {
    usage_name: String,
    prices: Vec<Decimal>,
    /// Limit of each tier, indexed by rank - 1; `None` where the tier omits the unit.
    limits: HashMap<Unit, Vec<Option<Limit>>>,
}

impl CapacityPricer {
    pub fn new(usage: &Usage) -> Result<Self> {
        if usage.tiers.is_empty() {
            return Err(BillingError::EmptyCatalog {
                usage: usage.name.clone(),
            });
        }

        let tier_count = usage.tiers.len();
        let mut limits: HashMap<Unit, Vec<Option<Limit>>> = HashMap::new();
        for (index, tier) in usage.tiers.iter().enumerate() {
            for limit in &tier.limits {
                limits
                    .entry(limit.unit.clone())
                    .or_insert_with(|| vec![None; tier_count])[index] = Some(limit.clone());
            }
        }

        Ok(Self {
            usage_name: usage.name.clone(),
            prices: usage.tiers.iter().map(|tier| tier.price).collect(),
            limits,
        })
    }

    /// Smallest tier (1-based) whose limit for `unit` admits `quantity`
    pub fn resolve_tier(&self, unit: &str, quantity: u64) -> Result<u32> {
        let missing = |tier: usize| BillingError::MissingTierLimit {
            usage: self.usage_name.clone(),
            unit: unit.to_string(),
            tier: tier as u32 + 1,
        };

        let per_tier = self.limits.get(unit).ok_or_else(|| missing(0))?;
        if let Some(tier) = per_tier.iter().position(Option::is_none) {
            warn!(
                "Usage {} tier {} has no limit for unit {}",
                self.usage_name,
                tier + 1,
                unit
            );
            return Err(missing(tier));
        }

        per_tier
            .iter()
            .flatten()
            .position(|limit| limit.admits(quantity))
            .map(|index| index as u32 + 1)
            .ok_or_else(|| {
                warn!(
                    "Usage {} has no tier admitting {} {}",
                    self.usage_name, quantity, unit
                );
                BillingError::NoTierAdmitsQuantity {
                    usage: self.usage_name.clone(),
                    unit: unit.to_string(),
                    quantity,
                }
            })
    }

    /// Price one sub-interval's rolled-up usage
    pub fn price(&self, rolled_up: &[RolledUpUnit]) -> Result<PricedUsage> {
        let mut details = Vec::with_capacity(rolled_up.len());
        for unit in rolled_up {
            let tier = self.resolve_tier(unit.unit.as_str(), unit.quantity)?;
            let tier_price = self.prices[tier as usize - 1];
            details.push(UsageInArrearDetail::new(
                tier,
                unit.unit.clone(),
                tier_price,
                unit.quantity,
            ));
        }

        let Some(tier) = details.iter().map(|detail| detail.tier).max() else {
            return Ok(PricedUsage::nothing());
        };

        details.sort_by(|a, b| {
            b.quantity
                .cmp(&a.quantity)
                .then_with(|| a.tier_unit.cmp(&b.tier_unit))
        });

        Ok(PricedUsage {
            tier: Some(tier),
            amount: self.prices[tier as usize - 1],
            details,
        })
    }
}

/// Amount owed for a set of details: the highest tier price among them, once.
pub fn to_be_billed(details: &[UsageInArrearDetail]) -> Decimal {
    details
        .iter()
        .map(|detail| detail.tier_price)
        .max()
        .unwrap_or(Decimal::ZERO)
}
