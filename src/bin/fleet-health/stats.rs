use console::style;
use pad::{Alignment, PadStr};
use serde::Serialize;

use std::fmt::{self, Display};

use fleet_health::{AggregateTotals, Aggregator, HostAddress, Outcome, Totals};

// Maximum padding for each entry in the final statistics output
const MAX_PADDING: usize = 20;

pub(crate) fn color_outcome(outcome: &Outcome) -> String {
    let out = match outcome.result {
        Ok(_) => style(outcome).green().bright(),
        Err(ref e) if e.is_cancelled() => style(outcome).dim(),
        Err(_) => style(outcome).red().bright(),
    };
    out.to_string()
}

/// Percentage of successful requests, `None` if nothing was requested
pub(crate) fn success_rate(totals: &AggregateTotals) -> Option<f64> {
    if totals.total_requests == 0 {
        return None;
    }
    Some(totals.total_successes as f64 / totals.total_requests as f64 * 100.0)
}

fn format_rate(totals: &AggregateTotals) -> String {
    match success_rate(totals) {
        Some(rate) => format!("{:.2}%", rate),
        None => "no data".to_string(),
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct FailedHost {
    host: HostAddress,
    error: String,
}

/// Final report of a batch, handed the totals once aggregation is done
#[derive(Debug, Serialize)]
pub(crate) struct HealthReport {
    hosts: usize,
    healthy: usize,
    failed: Vec<FailedHost>,
    totals: Totals,
}

impl HealthReport {
    pub(crate) fn new(aggregator: Aggregator) -> Self {
        let hosts = aggregator.hosts();
        let healthy = aggregator.healthy();
        let failed = aggregator
            .failures()
            .iter()
            .map(|(host, e)| FailedHost {
                host: host.clone(),
                error: e.to_string(),
            })
            .collect();
        HealthReport {
            hosts,
            healthy,
            failed,
            totals: aggregator.into_totals(),
        }
    }

    pub(crate) fn totals(&self) -> &Totals {
        &self.totals
    }

    pub(crate) fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.hosts == 0
    }
}

fn write_stat(f: &mut fmt::Formatter, title: &str, stat: usize) -> fmt::Result {
    let fill = title.chars().count();
    f.write_str(title)?;
    f.write_str(
        &stat
            .to_string()
            .pad(MAX_PADDING - fill, '.', Alignment::Right, false),
    )?;
    f.write_str("\n")
}

impl Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = "-".repeat(MAX_PADDING + 1);

        writeln!(f, "📝 Health Report")?;
        writeln!(f, "{}", separator)?;
        for (application, versions) in &self.totals {
            for (version, totals) in versions {
                writeln!(
                    f,
                    "Application: {}, Version: {}, Success Rate: {}",
                    application,
                    version,
                    format_rate(totals)
                )?;
            }
        }
        if !self.totals.is_empty() {
            writeln!(f)?;
        }

        write_stat(f, "🔍 Hosts", self.hosts)?;
        write_stat(f, "✅ Healthy", self.healthy)?;
        write_stat(f, "🚫 Failed", self.failed.len())?;

        if !self.failed.is_empty() {
            writeln!(f)?;
            writeln!(f, "Failed hosts")?;
        }
        for failure in &self.failed {
            writeln!(
                f,
                "{}",
                style(format!("🚫 {} ({})", failure.host, failure.error))
                    .red()
                    .bright()
            )?;
        }
        Ok(())
    }
}
