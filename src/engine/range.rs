//! Selector resolution into bounded, ordered reading sets.

use std::sync::Arc;
use tracing::{debug, warn};

use super::{QueryError, Selector};
use crate::domain::{Reading, SensorId};
use crate::repo::ReadingStore;

/// Upper bound on the span of a range selector. Index ranges compare it
/// against the id difference, timestamp ranges against the duration in seconds.
pub const MAX_VALUES: i64 = 500;

/// How a validated selector reads from the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    Sequence(i64),
    SequenceRange { lo: i64, hi: i64 },
    FromEnd { skip: usize, take: usize },
    Timestamp(i64),
    TimestampRange { t1: i64, t2: i64 },
}

/// Check a selector's shape and size without touching the store.
pub fn plan(sensor: SensorId, selector: Selector) -> Result<Plan, QueryError> {
    let too_large = || QueryError::RequestTooLarge {
        sensor_id: sensor,
        selector,
        limit: MAX_VALUES,
    };

    match selector {
        Selector::Index(id) if id >= 0 => Ok(Plan::Sequence(id)),
        Selector::Index(id) => Ok(Plan::FromEnd {
            skip: (id.unsigned_abs() - 1) as usize,
            take: 1,
        }),
        Selector::IndexRange(id1, id2) => {
            let span = id2.saturating_sub(id1);
            let plan = if id2 >= id1 && id1 >= 0 {
                Plan::SequenceRange { lo: id1, hi: id2 }
            } else if id2 >= id1 && id2 <= 0 {
                Plan::FromEnd {
                    skip: id2.unsigned_abs() as usize,
                    take: span as usize,
                }
            } else {
                return Err(QueryError::invalid(
                    sensor,
                    selector,
                    "ids must share a sign and be ascending",
                ));
            };
            if span > MAX_VALUES {
                return Err(too_large());
            }
            Ok(plan)
        }
        Selector::Timestamp(t) if t < 0 => {
            Err(QueryError::invalid(sensor, selector, "timestamp must be non-negative"))
        }
        Selector::Timestamp(t) => Ok(Plan::Timestamp(t)),
        Selector::TimestampRange(t1, t2) => {
            if t1 < 0 || t2 < t1 {
                return Err(QueryError::invalid(
                    sensor,
                    selector,
                    "timestamps must be non-negative and ascending",
                ));
            }
            if t2 - t1 > MAX_VALUES {
                return Err(too_large());
            }
            Ok(Plan::TimestampRange { t1, t2 })
        }
        Selector::Period(_) => Err(QueryError::invalid(
            sensor,
            selector,
            "period selectors are answered by the aggregator",
        )),
    }
}

#[derive(Clone)]
pub struct RangeResolver {
    readings: Arc<dyn ReadingStore>,
}

impl RangeResolver {
    pub fn new(readings: Arc<dyn ReadingStore>) -> Self {
        Self { readings }
    }

    /// Readings matching `selector`, ascending by sequence id, never empty.
    /// Timestamp ranges are cut to the first `MAX_VALUES` matches.
    pub async fn resolve(
        &self,
        sensor: SensorId,
        selector: Selector,
    ) -> Result<Vec<Reading>, QueryError> {
        let plan = plan(sensor, selector)?;
        debug!(sensor_id = sensor, %selector, ?plan, "resolving range");

        let mut readings = match plan {
            Plan::Sequence(id) => self
                .readings
                .find_by_sequence(sensor, id)
                .await?
                .into_iter()
                .collect(),
            Plan::SequenceRange { lo, hi } => {
                self.readings.find_by_sequence_range(sensor, lo, hi).await?
            }
            Plan::FromEnd { skip, take } => {
                self.readings.last_readings(sensor, skip, take).await?
            }
            Plan::Timestamp(t) => self
                .readings
                .find_by_timestamp(sensor, t)
                .await?
                .into_iter()
                .collect(),
            Plan::TimestampRange { t1, t2 } => {
                self.readings.find_in_timestamp_range(sensor, t1, t2).await?
            }
        };

        if readings.is_empty() {
            return Err(QueryError::readings_not_found(sensor, selector));
        }
        // Index ranges are bounded by their span; timestamps may repeat.
        if matches!(plan, Plan::TimestampRange { .. }) && readings.len() > MAX_VALUES as usize {
            warn!(
                sensor_id = sensor,
                %selector,
                matched = readings.len(),
                "range matched more readings than allowed, truncating"
            );
            readings.truncate(MAX_VALUES as usize);
        }
        Ok(readings)
    }
}
