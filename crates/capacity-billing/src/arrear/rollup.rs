use crate::domain::catalog::Unit;
use crate::domain::types::{DateRange, SubscriptionId};
use crate::domain::usage::{RawUsageRecord, RolledUpUnit};
use crate::error::{BillingError, Result};
use std::collections::BTreeMap;

/// Sum the subscription's records dated inside `range`, per unit.
///
/// Units without any record in the range are left out rather than reported
/// as zero.
pub fn rollup(
    records: &[RawUsageRecord],
    subscription_id: SubscriptionId,
    range: &DateRange,
) -> Result<Vec<RolledUpUnit>> {
    let mut totals: BTreeMap<&Unit, u64> = BTreeMap::new();

    for record in records
        .iter()
        .filter(|r| r.subscription_id == subscription_id && range.contains(r.date))
    {
        let total = totals.entry(&record.unit).or_insert(0);
        *total = total
            .checked_add(record.quantity)
            .ok_or_else(|| BillingError::QuantityOverflow {
                unit: record.unit.to_string(),
            })?;
    }

    Ok(totals
        .into_iter()
        .map(|(unit, quantity)| RolledUpUnit {
            unit: unit.clone(),
            quantity,
        })
        .collect())
}
