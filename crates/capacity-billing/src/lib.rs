pub mod arrear;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use arrear::{CapacityInArrearEvaluator, EvaluationRequest, UsageInArrearResult};
pub use config::{BillingConfig, InvoiceConfig, UsageDetailMode};
pub use error::{BillingError, Result};
