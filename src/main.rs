//! Billing Batch CLI
//!
//! Runs the selected batch pipelines against the billing provider.
//!
//! # Usage
//!
//! ```bash
//! STRIPE_SECRET_KEY=sk_live_... REMOVE_SUBSCRIPTIONS=1 MATCH_PREFIX=💰 billing-batch
//! billing-batch --upload-coupons --data-dir ./exports
//! ```
//!
//! # Environment Variables
//!
//! - `STRIPE_SECRET_KEY`: billing secret, required
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity
//!
//! See `--help` for the rest; every option has an environment form.

use billing_batch::config::{self, Cli};
use billing_batch::{run_pipeline, BatchError, BatchMutator, Result, StripeClient};
use clap::Parser;
use log::{error, info};
use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let secret_key = config::secret_key_from_env()?;

    let pipelines = cli.pipelines();
    if pipelines.is_empty() {
        info!("No pipeline selected, nothing to do");
        return Ok(());
    }

    let options = cli.run_options();
    for pipeline in &pipelines {
        pipeline.selection(options.prefix.as_deref())?;
    }

    let client = StripeClient::new(secret_key, &cli.api_base, cli.timeout())?;
    let mut mutator = BatchMutator::new(cli.delay());

    let mut failed = 0;
    for pipeline in pipelines {
        if let Err(e) = run_pipeline(pipeline, &options, &client, &mut mutator) {
            error!("{}: {}", pipeline, e);
            failed += 1;
        }
    }

    if failed > 0 {
        return Err(BatchError::PipelinesFailed { failed });
    }
    Ok(())
}
