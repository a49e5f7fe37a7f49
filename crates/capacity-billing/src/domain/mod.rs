pub mod catalog;
pub mod events;
pub mod invoice;
pub mod types;
pub mod usage;

pub use catalog::{Limit, Tier, Unit, Usage};
pub use events::{BillingEvent, BillingEventKind};
pub use invoice::{InvoiceItem, InvoiceItemKind, InvoicingContext, UsageInArrearDetail};
pub use types::{
    AccountId, BillingPeriod, BundleId, Currency, DateRange, InvoiceId, InvoiceItemId,
    SubscriptionId,
};
pub use usage::{RawUsageRecord, RolledUpUnit};
