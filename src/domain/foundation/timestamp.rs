//! UTC instants recorded on payments and orders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point in time in UTC. Serializes as RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Seconds since the epoch, the unit of Stripe's signed `t=` field.
    pub fn as_unix_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Calendar date as `YYYYMMDD`, used in reference numbers.
    pub fn compact_date(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}
