//! pdfstitch - compose PDF documents from the command line.

mod cli;

use anyhow::Context;
use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use pdfstitch::context::{CancellationToken, ExecutionContext};
use pdfstitch::error::StitchError;
use pdfstitch::merge::MergeOutcome;
use pdfstitch::output::{OutputFormatter, ProgressBar, ProgressStyle};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let formatter = OutputFormatter::new(cli.quiet || cli.json, cli.verbose);
    if let Err(err) = run(cli, formatter).await {
        let code = exit_code(&err);
        if code == StitchError::Cancelled.exit_code() {
            formatter.warning("Cancelled, no output was written");
        } else {
            formatter.error(&format!("{err:#}"));
        }
        process::exit(code);
    }
}

/// Log to stderr. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "pdfstitch=debug" } else { "error" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<StitchError>()
        .map_or(1, StitchError::exit_code)
}

fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });
}

fn progress_bar(formatter: OutputFormatter, message: &str, unit: &'static str) -> ProgressBar {
    if !formatter.should_print() {
        return ProgressBar::disabled();
    }
    let mut progress = ProgressBar::new(ProgressStyle::Bar).with_unit(unit);
    progress.set_message(message);
    progress
}

async fn run(cli: Cli, formatter: OutputFormatter) -> anyhow::Result<()> {
    let token = CancellationToken::new();
    cancel_on_ctrl_c(token.clone());

    if formatter.should_print() {
        formatter.section(&format!("{} v{}", pdfstitch::NAME, pdfstitch::VERSION));
        formatter.blank_line();
    }

    let outcome: MergeOutcome = match &cli.command {
        Command::Merge(args) => {
            let params = args.to_parameters().context("Invalid merge arguments")?;
            formatter.info(&format!("Merging {} inputs...", params.inputs.len()));
            for input in &params.inputs {
                formatter.detail("Input", &format!("{} [{}]", input.source(), input.selection()));
            }
            let mut ctx = ExecutionContext::new()
                .with_cancellation(token)
                .lenient(cli.lenient)
                .on_progress(progress_bar(formatter, "Merging", "inputs").into_callback());
            pdfstitch::merge::merge(&params, &mut ctx)
                .await
                .with_context(|| format!("Failed to merge into {}", params.output.path.display()))?
        }
        Command::Mix(args) => {
            let params = args.to_parameters().context("Invalid mix arguments")?;
            formatter.info(&format!("Mixing {} inputs...", params.inputs.len()));
            let mut ctx = ExecutionContext::new()
                .with_cancellation(token)
                .lenient(cli.lenient)
                .on_progress(progress_bar(formatter, "Mixing", "pages").into_callback());
            pdfstitch::merge::mix(&params, &mut ctx)
                .await
                .with_context(|| format!("Failed to mix into {}", params.output.path.display()))?
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        formatter.outcome(&outcome);
    }
    Ok(())
}
