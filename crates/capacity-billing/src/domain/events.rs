use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription transitions that bound usage intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingEventKind {
    Start,
    PlanChange,
    BillCycleChange,
    Termination,
}

impl fmt::Display for BillingEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillingEventKind::Start => write!(f, "start"),
            BillingEventKind::PlanChange => write!(f, "plan_change"),
            BillingEventKind::BillCycleChange => write!(f, "bill_cycle_change"),
            BillingEventKind::Termination => write!(f, "termination"),
        }
    }
}

/// A subscription transition together with the plan, phase and bill-cycle
/// day that apply from its effective date on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingEvent {
    pub kind: BillingEventKind,
    pub effective_date: DateTime<Utc>,
    pub bill_cycle_day: u32,
    pub plan_name: String,
    pub phase_name: String,
}

impl BillingEvent {
    pub fn new(
        kind: BillingEventKind,
        effective_date: DateTime<Utc>,
        bill_cycle_day: u32,
        plan_name: impl Into<String>,
        phase_name: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            effective_date,
            bill_cycle_day,
            plan_name: plan_name.into(),
            phase_name: phase_name.into(),
        }
    }

    /// Effective day in UTC, the granularity intervals are built on
    pub fn effective_day(&self) -> NaiveDate {
        self.effective_date.date_naive()
    }

    pub fn is_termination(&self) -> bool {
        self.kind == BillingEventKind::Termination
    }
}
