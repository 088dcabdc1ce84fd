use std::fmt;
use thiserror::Error;

use crate::domain::{PeriodKind, ProviderRef, SensorId};

/// A query as received from the routing layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// `>= 0`: exact sequence id; `< 0`: position counted from the end
    Index(i64),
    IndexRange(i64, i64),
    Timestamp(i64),
    TimestampRange(i64, i64),
    /// Means over the calendar period containing the reference instant
    Period(PeriodKind),
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Index(id) => write!(f, "id {}", id),
            Selector::IndexRange(a, b) => write!(f, "ids [{}, {}]", a, b),
            Selector::Timestamp(t) => write!(f, "timestamp {}", t),
            Selector::TimestampRange(a, b) => write!(f, "timestamps [{}, {}]", a, b),
            Selector::Period(kind) => write!(f, "{} period", kind),
        }
    }
}

/// What a lookup failed to find
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Missing {
    #[error("no measures match {selector} for sensor {sensor_id}")]
    Readings { sensor_id: SensorId, selector: Selector },
    #[error("no provider matches {0}")]
    Provider(ProviderRef),
    #[error("no sensors found")]
    Sensors,
    #[error("no providers found")]
    Providers,
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    NotFound(#[from] Missing),

    #[error("invalid {selector} for sensor {sensor_id}: {reason}")]
    InvalidSelector {
        sensor_id: SensorId,
        selector: Selector,
        reason: String,
    },

    #[error("too many values requested by {selector} for sensor {sensor_id} (maximum is set to {limit})")]
    RequestTooLarge {
        sensor_id: SensorId,
        selector: Selector,
        limit: i64,
    },

    #[error("no matching provider found for {provider}")]
    Conversion { provider: ProviderRef },

    /// The backing store itself failed
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl QueryError {
    pub fn invalid(sensor_id: SensorId, selector: Selector, reason: impl Into<String>) -> Self {
        QueryError::InvalidSelector {
            sensor_id,
            selector,
            reason: reason.into(),
        }
    }

    pub fn readings_not_found(sensor_id: SensorId, selector: Selector) -> Self {
        QueryError::NotFound(Missing::Readings { sensor_id, selector })
    }
}
