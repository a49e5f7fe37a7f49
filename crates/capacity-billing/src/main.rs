use anyhow::{Context, Result};
use capacity_billing::config::{BillingConfig, UsageDetailMode};
use capacity_billing::logging::init_logging;
use capacity_billing::{CapacityInArrearEvaluator, EvaluationRequest};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "capacity-billing")]
#[command(about = "Capacity-tiered usage billing in arrear")]
struct Args {
    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,

    #[arg(short, long, global = true, help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Generate sample configuration file")]
    gen_config: bool,

    #[arg(long, help = "Dry run mode (validate config without evaluating)")]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate one usage section and print the owed items as JSON
    Evaluate {
        #[arg(short, long, help = "Path to the JSON evaluation request")]
        request: PathBuf,

        #[arg(long, value_enum, help = "Override invoice.usage_detail_mode")]
        detail_mode: Option<UsageDetailMode>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.gen_config {
        let config = BillingConfig::default();
        let toml = toml::to_string_pretty(&config)?;
        println!("{}", toml);
        return Ok(());
    }

    let mut config = BillingConfig::load(args.config)?;
    init_logging(&args.verbosity, &config.logging.default_filter)?;

    info!(
        "Usage detail mode: {}, bill open period: {}",
        config.invoice.usage_detail_mode, config.invoice.bill_open_period
    );

    if args.dry_run {
        info!("Configuration validated successfully (dry-run mode)");
        return Ok(());
    }

    match args.command {
        Some(Command::Evaluate {
            request,
            detail_mode,
        }) => {
            if let Some(mode) = detail_mode {
                config.invoice.usage_detail_mode = mode;
            }

            let raw = std::fs::read_to_string(&request)
                .with_context(|| format!("Failed to read request {}", request.display()))?;
            let request: EvaluationRequest =
                serde_json::from_str(&raw).context("Failed to parse evaluation request")?;

            let evaluator = CapacityInArrearEvaluator::new(&request.usage, config.invoice)?;
            let result = evaluator.evaluate_request(&request).map_err(|e| {
                if e.is_catalog_inconsistency() {
                    error!("Usage {} has an inconsistent catalog: {}", request.usage.name, e);
                }
                e
            })?;

            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        None => anyhow::bail!("No command given, try `capacity-billing evaluate --request <file>`"),
    }

    Ok(())
}
