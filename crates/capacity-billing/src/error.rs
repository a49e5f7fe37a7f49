use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Usage {usage} has no tiers")]
    EmptyCatalog { usage: String },

    #[error("Tier {tier} of usage {usage} defines no limit for unit {unit}")]
    MissingTierLimit {
        usage: String,
        unit: String,
        tier: u32,
    },

    #[error("No tier of usage {usage} admits {quantity} {unit}")]
    NoTierAdmitsQuantity {
        usage: String,
        unit: String,
        quantity: u64,
    },

    #[error("Invalid billing events: {message}")]
    InvalidBillingEvents { message: String },

    #[error("Target date {target_date} is before the first billable date {start_date}")]
    TargetDateBeforeStart {
        target_date: NaiveDate,
        start_date: NaiveDate,
    },

    #[error("Quantity overflow while rolling up unit {unit}")]
    QuantityOverflow { unit: String },

    #[error("Date out of range computing bill cycle from {from}")]
    DateOutOfRange { from: NaiveDate },

    #[error("Validation error on {field}: {message}")]
    ValidationError { field: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),
}

impl BillingError {
    /// Catalog defects are surfaced rather than priced around.
    pub fn is_catalog_inconsistency(&self) -> bool {
        matches!(
            self,
            BillingError::EmptyCatalog { .. }
                | BillingError::MissingTierLimit { .. }
                | BillingError::NoTierAdmitsQuantity { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BillingError>;
