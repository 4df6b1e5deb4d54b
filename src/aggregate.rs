use crate::{
    host::HostAddress,
    types::{FetchError, Outcome, StatusRecord},
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{btree_map::Entry, BTreeMap};

/// Request counters summed over all hosts running one application version
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateTotals {
    pub application: String,
    pub version: String,
    pub total_requests: u64,
    pub total_successes: u64,
}

impl AggregateTotals {
    fn new(application: &str, version: &str) -> Self {
        AggregateTotals {
            application: application.to_string(),
            version: version.to_string(),
            ..Default::default()
        }
    }

    fn add(&mut self, record: &StatusRecord) {
        self.total_requests = self.total_requests.saturating_add(record.request_count);
        self.total_successes = self.total_successes.saturating_add(record.success_count);
    }

    fn merge(&mut self, other: &AggregateTotals) {
        self.total_requests = self.total_requests.saturating_add(other.total_requests);
        self.total_successes = self.total_successes.saturating_add(other.total_successes);
    }
}

/// Totals grouped by application, then by version
pub type Totals = BTreeMap<String, BTreeMap<String, AggregateTotals>>;

/// Folds fetch outcomes into per application/version totals.
///
/// Failed hosts contribute nothing to the totals. They are kept aside so the
/// caller can report them, see [`Aggregator::failures`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Aggregator {
    totals: Totals,
    failures: Vec<(HostAddress, FetchError)>,
    hosts: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Aggregator::default()
    }

    pub fn add(&mut self, outcome: Outcome) {
        self.hosts += 1;
        match outcome.result {
            Ok(record) => {
                self.totals
                    .entry(record.application.clone())
                    .or_default()
                    .entry(record.version.clone())
                    .or_insert_with(|| AggregateTotals::new(&record.application, &record.version))
                    .add(&record);
            }
            Err(e) => self.failures.push((outcome.host, e)),
        }
    }

    /// Aggregate a finished set of outcomes
    pub fn aggregate<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = Outcome>,
    {
        let mut aggregator = Aggregator::new();
        for outcome in outcomes {
            aggregator.add(outcome);
        }
        aggregator
    }

    /// Drain an outcome stream until it ends
    pub async fn consume<S>(outcomes: S) -> Self
    where
        S: Stream<Item = Outcome>,
    {
        let mut aggregator = Aggregator::new();
        futures::pin_mut!(outcomes);
        while let Some(outcome) = outcomes.next().await {
            aggregator.add(outcome);
        }
        aggregator
    }

    /// Combine with the result of another, independent aggregation
    pub fn merge(&mut self, other: Aggregator) {
        self.hosts += other.hosts;
        self.failures.extend(other.failures);
        for (application, versions) in other.totals {
            let merged = self.totals.entry(application).or_default();
            for (version, totals) in versions {
                match merged.entry(version) {
                    Entry::Occupied(mut entry) => entry.get_mut().merge(&totals),
                    Entry::Vacant(entry) => {
                        entry.insert(totals);
                    }
                }
            }
        }
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn failures(&self) -> &[(HostAddress, FetchError)] {
        &self.failures
    }

    /// Number of outcomes seen, successful or not
    pub fn hosts(&self) -> usize {
        self.hosts
    }

    pub fn healthy(&self) -> usize {
        self.hosts - self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_totals(self) -> Totals {
        self.totals
    }
}

/// Sum the records of all successful outcomes per application and version
pub fn aggregate<I>(outcomes: I) -> Totals
where
    I: IntoIterator<Item = Outcome>,
{
    Aggregator::aggregate(outcomes).into_totals()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::record;
    use pretty_assertions::assert_eq;

    fn ok(host: &str, application: &str, version: &str, requests: u64, successes: u64) -> Outcome {
        Outcome::success(
            HostAddress::normalize(host),
            record(application, version, requests, successes),
        )
    }

    fn failed(host: &str) -> Outcome {
        Outcome::failure(
            HostAddress::normalize(host),
            FetchError::Status {
                status: 500,
                body: String::new(),
            },
        )
    }

    fn sample() -> Vec<Outcome> {
        vec![
            ok("a", "Memcache2", "1.0.1", 100, 90),
            ok("b", "Memcache2", "1.0.2", 50, 50),
            failed("c"),
            ok("d", "Cache2", "1.0.1", 7, 3),
            ok("e", "Memcache2", "1.0.1", 10, 1),
        ]
    }

    #[test]
    fn test_large_counts() {
        let totals = aggregate(vec![
            ok("a", "Memcache2", "1.0.1", 5_194_800_029, 4_151_986_778),
            ok("b", "Memcache2", "1.0.1", 1_000_000_000, 800_000_000),
        ]);

        let agg = &totals["Memcache2"]["1.0.1"];
        assert_eq!(agg.application, "Memcache2");
        assert_eq!(agg.version, "1.0.1");
        assert_eq!(agg.total_requests, 6_194_800_029);
        assert_eq!(agg.total_successes, 4_951_986_778);
    }

    #[test]
    fn test_saturating() {
        let totals = aggregate(vec![
            ok("a", "App", "1", u64::MAX - 1, u64::MAX - 1),
            ok("b", "App", "1", 10, 10),
        ]);
        assert_eq!(totals["App"]["1"].total_requests, u64::MAX);
        assert_eq!(totals["App"]["1"].total_successes, u64::MAX);
    }

    #[test]
    fn test_grouping() {
        let totals = aggregate(sample());

        assert_eq!(totals.len(), 2);
        assert_eq!(totals["Memcache2"].len(), 2);
        assert_eq!(totals["Memcache2"]["1.0.1"].total_requests, 110);
        assert_eq!(totals["Memcache2"]["1.0.1"].total_successes, 91);
        assert_eq!(totals["Memcache2"]["1.0.2"].total_requests, 50);
        assert_eq!(totals["Cache2"]["1.0.1"].total_successes, 3);
    }

    #[test]
    fn test_failures_are_tracked_not_summed() {
        let aggregator = Aggregator::aggregate(vec![failed("down.org"), failed("gone.org")]);

        assert!(aggregator.totals().is_empty());
        assert_eq!(aggregator.hosts(), 2);
        assert_eq!(aggregator.healthy(), 0);
        assert!(!aggregator.is_success());
        assert_eq!(
            aggregator.failures()[0].0,
            HostAddress::normalize("down.org")
        );
    }

    #[test]
    fn test_order_independent() {
        let forward = aggregate(sample());
        let mut reversed = sample();
        reversed.reverse();
        let mut rotated = sample();
        rotated.rotate_left(2);

        assert_eq!(forward, aggregate(reversed));
        assert_eq!(forward, aggregate(rotated));
    }

    #[test]
    fn test_merge_equals_concatenation() {
        let mut first = sample();
        let second = first.split_off(2);

        let mut merged = Aggregator::aggregate(first);
        merged.merge(Aggregator::aggregate(second));

        let whole = Aggregator::aggregate(sample());
        assert_eq!(merged.totals(), whole.totals());
        assert_eq!(merged.hosts(), whole.hosts());
        assert_eq!(merged.failures().len(), whole.failures().len());
    }

    #[test]
    fn test_empty() {
        let aggregator = Aggregator::aggregate(Vec::new());
        assert!(aggregator.totals().is_empty());
        assert!(aggregator.is_success());
        assert_eq!(aggregator.hosts(), 0);
    }

    #[tokio::test]
    async fn test_consume_stream() {
        let stream = futures::stream::iter(sample());
        let aggregator = Aggregator::consume(stream).await;
        assert_eq!(aggregator, Aggregator::aggregate(sample()));
    }

    #[test]
    fn test_serialize_totals() {
        let totals = aggregate(vec![ok("a", "App", "1.0", 10, 9)]);
        let json = serde_json::to_value(&totals).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "App": {
                    "1.0": {
                        "application": "App",
                        "version": "1.0",
                        "totalRequests": 10,
                        "totalSuccesses": 9
                    }
                }
            })
        );
    }
}
