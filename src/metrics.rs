use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::format::DisplayFormat;
use crate::models::{Collection, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    DonationsCount,
    DonationsAmount,
    DonationsApproved,
    DonationsPending,
    RequestsCount,
    RequestsApproved,
    RequestsPending,
    RequestsCompleted,
    ScholarshipsCount,
    ScholarshipsAmount,
    ScholarshipsApproved,
    ScholarshipsPending,
    EventsCount,
    EventsApproved,
    EventsPending,
}

impl MetricKey {
    pub const ALL: [MetricKey; 15] = [
        MetricKey::DonationsCount,
        MetricKey::DonationsAmount,
        MetricKey::DonationsApproved,
        MetricKey::DonationsPending,
        MetricKey::RequestsCount,
        MetricKey::RequestsApproved,
        MetricKey::RequestsPending,
        MetricKey::RequestsCompleted,
        MetricKey::ScholarshipsCount,
        MetricKey::ScholarshipsAmount,
        MetricKey::ScholarshipsApproved,
        MetricKey::ScholarshipsPending,
        MetricKey::EventsCount,
        MetricKey::EventsApproved,
        MetricKey::EventsPending,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKey::DonationsCount => "donations_count",
            MetricKey::DonationsAmount => "donations_amount",
            MetricKey::DonationsApproved => "donations_approved",
            MetricKey::DonationsPending => "donations_pending",
            MetricKey::RequestsCount => "requests_count",
            MetricKey::RequestsApproved => "requests_approved",
            MetricKey::RequestsPending => "requests_pending",
            MetricKey::RequestsCompleted => "requests_completed",
            MetricKey::ScholarshipsCount => "scholarships_count",
            MetricKey::ScholarshipsAmount => "scholarships_amount",
            MetricKey::ScholarshipsApproved => "scholarships_approved",
            MetricKey::ScholarshipsPending => "scholarships_pending",
            MetricKey::EventsCount => "events_count",
            MetricKey::EventsApproved => "events_approved",
            MetricKey::EventsPending => "events_pending",
        }
    }

    pub fn collection(self) -> Collection {
        match self {
            MetricKey::DonationsCount
            | MetricKey::DonationsAmount
            | MetricKey::DonationsApproved
            | MetricKey::DonationsPending => Collection::Donations,
            MetricKey::RequestsCount
            | MetricKey::RequestsApproved
            | MetricKey::RequestsPending
            | MetricKey::RequestsCompleted => Collection::Requests,
            MetricKey::ScholarshipsCount
            | MetricKey::ScholarshipsAmount
            | MetricKey::ScholarshipsApproved
            | MetricKey::ScholarshipsPending => Collection::Scholarships,
            MetricKey::EventsCount | MetricKey::EventsApproved | MetricKey::EventsPending => {
                Collection::Events
            }
        }
    }

    /// How reports render this metric when no widget says otherwise.
    pub fn display_format(self) -> DisplayFormat {
        match self {
            MetricKey::DonationsAmount | MetricKey::ScholarshipsAmount => DisplayFormat::Currency,
            _ => DisplayFormat::Number,
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric key `{0}`")]
pub struct UnknownMetricKey(pub String);

impl FromStr for MetricKey {
    type Err = UnknownMetricKey;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        MetricKey::ALL
            .into_iter()
            .find(|key| key.as_str() == value)
            .ok_or_else(|| UnknownMetricKey(value.to_string()))
    }
}

/// Metric values for one time window, with the raw records they came from.
///
/// Every key in [`MetricKey::ALL`] has a value; keys nothing populated read
/// as zero. Snapshots are built by the aggregator and not mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    metrics: BTreeMap<MetricKey, f64>,
    #[serde(rename = "rawData")]
    raw_data: BTreeMap<Collection, Vec<Record>>,
}

impl Default for MetricsSnapshot {
    fn default() -> Self {
        Self {
            metrics: MetricKey::ALL.into_iter().map(|key| (key, 0.0)).collect(),
            raw_data: BTreeMap::new(),
        }
    }
}

impl MetricsSnapshot {
    /// A snapshot where only the given keys carry values.
    pub fn partial(values: impl IntoIterator<Item = (MetricKey, f64)>) -> Self {
        values
            .into_iter()
            .fold(Self::default(), |snapshot, (key, value)| snapshot.with(key, value))
    }

    pub fn with(mut self, key: MetricKey, value: f64) -> Self {
        self.metrics.insert(key, value);
        self
    }

    pub fn with_raw(mut self, collection: Collection, records: Vec<Record>) -> Self {
        self.raw_data.insert(collection, records);
        self
    }

    pub fn get(&self, key: MetricKey) -> f64 {
        self.metrics.get(&key).copied().unwrap_or(0.0)
    }

    /// Looks a metric up by its string name. Names outside the fixed set
    /// resolve to zero rather than failing.
    pub fn lookup(&self, name: &str) -> f64 {
        match name.trim().parse::<MetricKey>() {
            Ok(key) => self.get(key),
            Err(_) => 0.0,
        }
    }

    pub fn values(&self) -> impl Iterator<Item = (MetricKey, f64)> + '_ {
        self.metrics.iter().map(|(key, value)| (*key, *value))
    }

    pub fn raw_data(&self) -> &BTreeMap<Collection, Vec<Record>> {
        &self.raw_data
    }

    pub fn raw_count(&self, collection: Collection) -> usize {
        self.raw_data.get(&collection).map(Vec::len).unwrap_or(0)
    }
}
