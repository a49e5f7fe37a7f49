use crate::domain::catalog::Unit;
use crate::domain::types::{
    AccountId, BundleId, Currency, DateRange, InvoiceId, InvoiceItemId, SubscriptionId,
};
use crate::error::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceItemKind {
    Usage,
    Recurring,
    Fixed,
    ItemAdjustment,
}

impl fmt::Display for InvoiceItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceItemKind::Usage => write!(f, "usage"),
            InvoiceItemKind::Recurring => write!(f, "recurring"),
            InvoiceItemKind::Fixed => write!(f, "fixed"),
            InvoiceItemKind::ItemAdjustment => write!(f, "item_adjustment"),
        }
    }
}

/// Who and what is being invoiced. Existing items only count as billed when
/// they were produced for the same context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicingContext {
    pub account_id: AccountId,
    pub bundle_id: BundleId,
    pub subscription_id: SubscriptionId,
    #[serde(default)]
    pub invoice_id: Option<InvoiceId>,
    pub currency: Currency,
}

/// Audit entry for one unit within one sub-interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageInArrearDetail {
    pub tier: u32,
    pub tier_unit: Unit,
    pub tier_price: Decimal,
    pub quantity: u64,
}

impl UsageInArrearDetail {
    pub fn new(tier: u32, tier_unit: Unit, tier_price: Decimal, quantity: u64) -> Self {
        Self {
            tier,
            tier_unit,
            tier_price,
            quantity,
        }
    }
}

/// Serialize a detail list into the opaque string persisted with an item
pub fn serialize_details(details: &[UsageInArrearDetail]) -> Result<String> {
    Ok(serde_json::to_string(details)?)
}

pub fn parse_details(raw: &str) -> Result<Vec<UsageInArrearDetail>> {
    Ok(serde_json::from_str(raw)?)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: InvoiceItemId,
    pub kind: InvoiceItemKind,
    #[serde(default)]
    pub invoice_id: Option<InvoiceId>,
    pub account_id: AccountId,
    pub bundle_id: BundleId,
    pub subscription_id: SubscriptionId,
    pub plan_name: String,
    pub phase_name: String,
    #[serde(default)]
    pub usage_name: Option<String>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub amount: Decimal,
    pub currency: Currency,
    #[serde(default)]
    pub item_details: Option<String>,
}

impl InvoiceItem {
    /// New usage item for `context` covering `range`
    #[allow(clippy::too_many_arguments)]
    pub fn usage(
        context: &InvoicingContext,
        plan_name: &str,
        phase_name: &str,
        usage_name: &str,
        range: DateRange,
        amount: Decimal,
        item_details: Option<String>,
    ) -> Self {
        Self {
            id: InvoiceItemId::new(),
            kind: InvoiceItemKind::Usage,
            invoice_id: context.invoice_id,
            account_id: context.account_id,
            bundle_id: context.bundle_id,
            subscription_id: context.subscription_id,
            plan_name: plan_name.to_string(),
            phase_name: phase_name.to_string(),
            usage_name: Some(usage_name.to_string()),
            start_date: range.start,
            end_date: Some(range.end),
            amount,
            currency: context.currency.clone(),
            item_details,
        }
    }

    /// Date span for items that have one; fixed items only carry a start date.
    pub fn range(&self) -> Option<DateRange> {
        self.end_date
            .map(|end_date| DateRange::new(self.start_date, end_date))
    }

    pub fn details(&self) -> Result<Vec<UsageInArrearDetail>> {
        match &self.item_details {
            Some(raw) => parse_details(raw),
            None => Ok(Vec::new()),
        }
    }

    /// Usage item for this usage section, produced under `context`
    pub fn belongs_to(&self, context: &InvoicingContext, usage_name: &str) -> bool {
        self.kind == InvoiceItemKind::Usage
            && self.usage_name.as_deref() == Some(usage_name)
            && self.account_id == context.account_id
            && self.bundle_id == context.bundle_id
            && self.subscription_id == context.subscription_id
            && self.currency == context.currency
    }
}
