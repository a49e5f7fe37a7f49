use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Account owning the subscription
    AccountId
);
uuid_id!(
    /// Bundle grouping the subscription
    BundleId
);
uuid_id!(
    /// Subscription whose usage is being billed
    SubscriptionId
);
uuid_id!(
    /// Invoice the computed items will be attached to
    InvoiceId
);
uuid_id!(InvoiceItemId);

/// ISO currency code, upper-cased however it was read. Amounts are never
/// converted, only compared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_ascii_uppercase())
    }

    pub fn usd() -> Self {
        Self::new("USD")
    }
}

impl From<String> for Currency {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Recurring cadence of a usage section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingPeriod {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Annual,
}

impl BillingPeriod {
    /// Month step for calendar-anchored periods; `None` for fixed-length ones.
    pub fn months(&self) -> Option<u32> {
        match self {
            BillingPeriod::Monthly => Some(1),
            BillingPeriod::Quarterly => Some(3),
            BillingPeriod::Annual => Some(12),
            BillingPeriod::Daily | BillingPeriod::Weekly => None,
        }
    }

    pub fn days(&self) -> Option<u64> {
        match self {
            BillingPeriod::Daily => Some(1),
            BillingPeriod::Weekly => Some(7),
            _ => None,
        }
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillingPeriod::Daily => write!(f, "daily"),
            BillingPeriod::Weekly => write!(f, "weekly"),
            BillingPeriod::Monthly => write!(f, "monthly"),
            BillingPeriod::Quarterly => write!(f, "quarterly"),
            BillingPeriod::Annual => write!(f, "annual"),
        }
    }
}

/// Half-open date range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

pub(crate) fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?
        .pred_opt()
        .map(|last| last.day())
}

/// Date in the given month carrying the anchor day, clamped to the month's length.
pub(crate) fn anchored_date(year: i32, month: u32, anchor_day: u32) -> Option<NaiveDate> {
    let last = days_in_month(year, month)?;
    NaiveDate::from_ymd_opt(year, month, anchor_day.clamp(1, last))
}

pub(crate) fn add_months(year: i32, month: u32, months: u32) -> (i32, u32) {
    let index = year as i64 * 12 + (month as i64 - 1) + months as i64;
    (index.div_euclid(12) as i32, index.rem_euclid(12) as u32 + 1)
}

pub(crate) fn add_days(date: NaiveDate, days: u64) -> Option<NaiveDate> {
    date.checked_add_days(Days::new(days))
}
