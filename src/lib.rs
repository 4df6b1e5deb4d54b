/*!
* `fleet_health` polls the health-status endpoints of a fleet of hosts and
* sums up what they report per application and version.
*
* A [`Dispatcher`] runs one fetch per host, at most `max_concurrency` at a
* time, and streams back an [`Outcome`] for every host. The [`Aggregator`]
* folds that stream into [`AggregateTotals`]. Hosts that fail are reported
* next to the totals, never summed into them.
*
* ```no_run
* use fleet_health::{Aggregator, ClientBuilder, DispatchConfig, Dispatcher};
*
* #[tokio::main]
* async fn main() -> anyhow::Result<()> {
*   let client = ClientBuilder::default().build()?;
*   let dispatcher = Dispatcher::new(client, DispatchConfig::default())?;
*   let outcomes = dispatcher.run(vec!["server-0001.example.org"]);
*   let aggregator = Aggregator::consume(outcomes).await;
*   for (application, versions) in aggregator.totals() {
*     for (version, totals) in versions {
*       println!("{} {}: {}", application, version, totals.total_requests);
*     }
*   }
*   Ok(())
* }
* ```
*/

#[macro_use]
extern crate log;

mod client;
mod host;
mod limiter;
mod types;

pub mod aggregate;
pub mod collector;
pub mod dispatcher;

#[cfg(test)]
mod test_utils;

pub use aggregate::{AggregateTotals, Aggregator, Totals};
pub use client::{Client, ClientBuilder, StatusFetcher, DEFAULT_MAX_REDIRECTS, DEFAULT_USER_AGENT};
pub use collector::Input;
pub use dispatcher::{DispatchConfig, Dispatcher, OutcomeStream};
pub use host::{HostAddress, DEFAULT_SCHEME, STATUS_PATH};
pub use limiter::{ConcurrencyLimiter, Permit};
pub use types::{FetchError, Outcome, StatusRecord};
