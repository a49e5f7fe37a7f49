//! One pass of capacity-in-arrear billing for a single usage section of a
//! subscription: segment, roll up, price, reconcile, schedule.

use crate::arrear::pricer::CapacityPricer;
use crate::arrear::reconciler::{ComputedInterval, Reconciler};
use crate::arrear::rollup::rollup;
use crate::arrear::scheduler::next_notification_date;
use crate::arrear::segmenter::BillingTimeline;
use crate::config::InvoiceConfig;
use crate::domain::catalog::Usage;
use crate::domain::events::BillingEvent;
use crate::domain::invoice::{InvoiceItem, InvoicingContext};
use crate::domain::usage::RawUsageRecord;
use crate::error::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// New items owed and when to come back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageInArrearResult {
    pub invoice_items: Vec<InvoiceItem>,
    pub next_notification_date: Option<NaiveDate>,
}

impl UsageInArrearResult {
    pub fn total_amount(&self) -> Decimal {
        self.invoice_items.iter().map(|item| item.amount).sum()
    }
}

/// Everything one evaluation needs, as read by the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub usage: Usage,
    pub context: InvoicingContext,
    pub events: Vec<BillingEvent>,
    #[serde(default)]
    pub raw_usage: Vec<RawUsageRecord>,
    #[serde(default)]
    pub existing_items: Vec<InvoiceItem>,
    pub target_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct CapacityInArrearEvaluator {
    usage: Usage,
    pricer: CapacityPricer,
    config: InvoiceConfig,
}

impl CapacityInArrearEvaluator {
    pub fn new(usage: &Usage, config: InvoiceConfig) -> Result<Self> {
        Ok(Self {
            pricer: CapacityPricer::new(usage)?,
            usage: usage.clone(),
            config,
        })
    }

    /// Compute the items owed for `[first event, target_date)` on top of
    /// `existing`, and the next date this has to run again.
    ///
    /// Either every item is returned or an error is; nothing partial.
    pub fn evaluate(
        &self,
        context: &InvoicingContext,
        events: &[BillingEvent],
        raw_usage: &[RawUsageRecord],
        existing: &[InvoiceItem],
        target_date: NaiveDate,
    ) -> Result<UsageInArrearResult> {
        let timeline = BillingTimeline::new(events, self.usage.billing_period, target_date)?;

        let mut computed = Vec::new();
        for interval in timeline.sub_intervals()? {
            if interval.open && !self.config.bill_open_period {
                debug!("Skipping open interval {}", interval.range);
                continue;
            }

            let rolled_up = rollup(raw_usage, context.subscription_id, &interval.range)?;
            let priced = self.pricer.price(&rolled_up)?;
            debug!(
                "Interval {} ({}/{}): {} units, tier {:?}, amount {}",
                interval.range,
                interval.plan_name,
                interval.phase_name,
                rolled_up.len(),
                priced.tier,
                priced.amount
            );

            computed.push(ComputedInterval {
                interval,
                amount: priced.amount,
                details: priced.details,
            });
        }

        let reconciler = Reconciler::new(context, &self.usage.name, self.config.usage_detail_mode);
        let invoice_items = reconciler.missing_items(&computed, existing)?;
        let next_notification_date = next_notification_date(&timeline)?;

        let result = UsageInArrearResult {
            invoice_items,
            next_notification_date,
        };

        info!(
            subscription_id = %context.subscription_id,
            usage = %self.usage.name,
            "Evaluated {} intervals up to {}: {} new items totalling {}, next notification {:?}",
            computed.len(),
            target_date,
            result.invoice_items.len(),
            result.total_amount(),
            result.next_notification_date
        );

        Ok(result)
    }

    pub fn evaluate_request(&self, request: &EvaluationRequest) -> Result<UsageInArrearResult> {
        self.evaluate(
            &request.context,
            &request.events,
            &request.raw_usage,
            &request.existing_items,
            request.target_date,
        )
    }
}
