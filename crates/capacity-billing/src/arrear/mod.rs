//! Capacity-in-arrear billing pipeline

pub mod cycle;
pub mod evaluator;
pub mod pricer;
pub mod reconciler;
pub mod rollup;
pub mod scheduler;
pub mod segmenter;

pub use cycle::BillCycle;
pub use evaluator::{CapacityInArrearEvaluator, EvaluationRequest, UsageInArrearResult};
pub use pricer::{to_be_billed, CapacityPricer, PricedUsage};
pub use reconciler::{billed_amount, ComputedInterval, Reconciler};
pub use rollup::rollup;
pub use scheduler::next_notification_date;
pub use segmenter::{BillingTimeline, SubInterval};
