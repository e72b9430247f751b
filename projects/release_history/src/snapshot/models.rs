use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{de, Deserialize, Deserializer, Serialize};

/// Asset key holding the sum of every real asset of a release.
pub const TOTAL_ASSET_ID: &str = "total";
pub const TOTAL_ASSET_NAME: &str = "Total downloads";

/// Daily download counts. Sparse: a date only appears when the count moved.
pub type DownloadSeries = BTreeMap<NaiveDate, u64>;

// Field order is alphabetical so serialized keys come out sorted. Unknown
// keys are rejected: they could not be written back.

/// Everything persisted for one monitored repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    pub releases: BTreeMap<String, Release>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Release {
    pub assets: BTreeMap<String, Asset>,
    pub created_at: Timestamp,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Asset {
    pub created_at: Timestamp,
    pub downloads: DownloadSeries,
    pub name: String,
}

impl Asset {
    pub fn new(name: &str, created_at: impl Into<Timestamp>, day: NaiveDate, count: u64) -> Self {
        Self {
            created_at: created_at.into(),
            downloads: BTreeMap::from([(day, count)]),
            name: name.to_string(),
        }
    }

    /// Latest recorded date and its count.
    pub fn most_recent(&self) -> Option<(NaiveDate, u64)> {
        self.downloads
            .last_key_value()
            .map(|(day, count)| (*day, *count))
    }
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// An ISO-8601 creation time, kept in the exact text it was read with so a
/// stored value is written back unchanged. Fresh values are second-precision
/// without offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The instant in UTC. An explicit offset is folded in.
    pub fn to_naive_utc(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.0)
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(value: NaiveDateTime) -> Self {
        Self(value.format(TIMESTAMP_FORMAT).to_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match parse_timestamp(&raw) {
            Some(_) => Ok(Self(raw)),
            None => Err(de::Error::custom(format!("invalid timestamp {raw:?}"))),
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    raw.parse::<NaiveDateTime>().ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|with_offset| with_offset.naive_utc())
    })
}
