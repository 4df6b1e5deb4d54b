#[macro_use]
extern crate log;

use anyhow::{ensure, Context, Result};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::{fs, time::Duration};
use structopt::StructOpt;
use tokio_util::sync::CancellationToken;

mod options;
mod stats;

use crate::options::{Config, FleetOptions, Format};
use crate::stats::{color_outcome, HealthReport};

use fleet_health::{Aggregator, ClientBuilder, DispatchConfig, Dispatcher, Input, Outcome};

/// A C-like enum that can be cast to `i32` and used as process exit code.
enum ExitCode {
    Success = 0,
    // NOTE: exit code 1 is used for any `Result::Err` bubbled up to `main()` using the `?` operator.
    // This includes an unreadable host list and invalid configuration.
    #[allow(unused)]
    UnexpectedFailure = 1,
    HostCheckFailure = 2,
}

fn main() -> Result<()> {
    env_logger::init();
    // std::process::exit doesn't guarantee that all destructors will be ran,
    // therefore we wrap "main" code in another function to guarantee that.
    let exit_code = run_main()?;
    std::process::exit(exit_code);
}

fn run_main() -> Result<i32> {
    let mut opts = FleetOptions::from_args();

    // Load a potentially existing config file and merge it into the config from the CLI
    if let Some(c) = Config::load_from_file(&opts.config_file)
        .with_context(|| format!("Cannot load configuration file {}", opts.config_file))?
    {
        opts.config.merge(c)
    }
    let cfg = &opts.config;
    ensure!(
        cfg.threads != Some(0),
        "Number of threads must be at least 1"
    );

    let runtime = match cfg.threads {
        Some(threads) => {
            // We define our own runtime instead of the `tokio::main` attribute
            // since we want to make the number of threads configurable
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(threads)
                .enable_all()
                .build()?
        }
        None => tokio::runtime::Runtime::new()?,
    };

    runtime.block_on(run(cfg, opts.input()))
}

fn show_progress(progress_bar: &Option<ProgressBar>, outcome: &Outcome, verbose: bool) {
    let out = color_outcome(outcome);
    if let Some(pb) = progress_bar {
        pb.inc(1);
        pb.set_message(out.clone());
        if verbose || !outcome.is_success() {
            pb.println(out);
        }
    } else {
        if outcome.is_success() && !verbose {
            return;
        }
        println!("{}", out);
    }
}

fn fmt(report: &HealthReport, format: Format) -> Result<String> {
    Ok(match format {
        Format::String => report.to_string(),
        Format::Json => serde_json::to_string_pretty(report)?,
    })
}

fn config_banner(config: &DispatchConfig) -> String {
    format!(
        "Running with configuration:\n- HTTP Timeout: {:?}\n- Request Delay: {:?}\n- Max Concurrency: {}",
        config.fetch_timeout, config.request_delay, config.max_concurrency
    )
}

// Verbose runs show these notes on stderr, others leave them to the logger
fn note(verbose: bool, message: &str) {
    if verbose {
        eprintln!("{}", message);
    } else {
        info!("{}", message);
    }
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let bar = ProgressBar::new(len as u64).with_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.red.bright} {pos}/{len:.dim} [{elapsed_precise}] {bar:25.magenta.bright/white} {wide_msg}",
            )?
            .progress_chars("██"),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    Ok(bar)
}

async fn run(cfg: &Config, input: Input) -> Result<i32> {
    let dispatch_config = cfg.dispatch_config();
    dispatch_config.validate()?;

    note(cfg.verbose, &config_banner(&dispatch_config));

    // An unreadable host list ends the run before anything is fetched
    let hosts = input.read_hosts().await?;
    info!("Read {} hosts from {}", hosts.len(), input);

    let client = ClientBuilder::default()
        .user_agent(cfg.user_agent.clone())
        .max_redirects(cfg.max_redirects)
        .build()?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling outstanding requests");
            interrupt.cancel();
        }
    });

    let pb = match cfg.no_progress {
        true => None,
        false => Some(progress_bar(hosts.len())?),
    };

    let mut outcomes = Dispatcher::new(client, dispatch_config)?
        .with_cancellation(cancel)
        .run(hosts);

    let mut aggregator = Aggregator::new();
    while let Some(outcome) = outcomes.next().await {
        show_progress(&pb, &outcome, cfg.verbose);
        aggregator.add(outcome);
    }

    // Note that print statements may interfere with the progress bar, so this
    // must go before printing the report
    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }

    let report = HealthReport::new(aggregator);

    let totals = serde_json::to_string_pretty(report.totals())?;
    fs::write(&cfg.output, totals).context("Cannot write report to file")?;

    if cfg.verbose && !report.is_empty() {
        // separate the report from the verbose list of hosts above
        println!();
    }
    println!("{}", fmt(&report, cfg.format)?);
    note(
        cfg.verbose,
        &format!("Report saved to {}", cfg.output.display()),
    );

    match report.is_success() {
        true => Ok(ExitCode::Success as i32),
        false => Ok(ExitCode::HostCheckFailure as i32),
    }
}
