//! Logging setup for the `capacity-billing` binary
//!
//! Priority order:
//! 1. CLI flags (`-v/-q`)
//! 2. `RUST_LOG`
//! 3. `logging.default_filter` from the configuration

use anyhow::Result;
use clap_verbosity_flag::{LogLevel, Verbosity};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter the subscriber is built with
pub fn resolve_filter<L: LogLevel>(
    verbosity: &Verbosity<L>,
    default_filter: &str,
) -> Result<EnvFilter> {
    if verbosity.is_present() {
        let directive = match verbosity.log_level() {
            Some(level) => format!("capacity_billing={}", level),
            None => "off".to_string(),
        };
        return Ok(EnvFilter::try_new(directive)?);
    }

    Ok(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_filter))?)
}

/// Install the global subscriber. Logs go to stderr so stdout stays parseable JSON.
pub fn init_logging<L: LogLevel>(verbosity: &Verbosity<L>, default_filter: &str) -> Result<()> {
    let filter = resolve_filter(verbosity, default_filter)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap_verbosity_flag::InfoLevel;

    #[test]
    fn test_verbose_flag_overrides_default() {
        let verbosity = Verbosity::<InfoLevel>::new(1, 0);
        let filter = resolve_filter(&verbosity, "capacity_billing=warn").unwrap();
        assert_eq!(filter.to_string().to_lowercase(), "capacity_billing=debug");
    }

    #[test]
    fn test_quiet_flags_silence_everything() {
        let verbosity = Verbosity::<InfoLevel>::new(0, 4);
        let filter = resolve_filter(&verbosity, "capacity_billing=info").unwrap();
        assert_eq!(filter.to_string().to_lowercase(), "off");
    }
}
