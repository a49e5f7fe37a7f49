use crate::error::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_FILE: &str = "capacity-billing.toml";
pub const ENV_PREFIX: &str = "CAPACITY_BILLING_";

/// How owed amounts are laid out on the invoice
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum UsageDetailMode {
    /// One item per usage section covering every interval that owes money
    #[default]
    Aggregate,
    /// One item per sub-interval
    Detail,
}

impl fmt::Display for UsageDetailMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsageDetailMode::Aggregate => write!(f, "aggregate"),
            UsageDetailMode::Detail => write!(f, "detail"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceConfig {
    pub usage_detail_mode: UsageDetailMode,
    /// Also bill the trailing interval that ends on the target date instead of
    /// a cycle date. A later run only bills what that interval has grown by.
    pub bill_open_period: bool,
}

impl Default for InvoiceConfig {
    fn default() -> Self {
        Self {
            usage_detail_mode: UsageDetailMode::Aggregate,
            bill_open_period: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: "capacity_billing=info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingConfig {
    #[serde(default)]
    pub invoice: InvoiceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BillingConfig {
    /// Defaults, then the TOML file, then `CAPACITY_BILLING_*` variables
    /// (`__` separates sections).
    pub fn load(path_override: Option<PathBuf>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(BillingConfig::default()));

        let path = path_override.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        if path.exists() {
            figment = figment.merge(Toml::file(&path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        Ok(figment.extract()?)
    }
}
