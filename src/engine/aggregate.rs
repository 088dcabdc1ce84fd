//! Per-bucket and whole-period means.

use chrono::{DateTime, TimeZone};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::sync::Arc;
use tracing::debug;

use super::period::{bucket_period, PeriodBuckets};
use super::{Pricing, QueryError, Selector, UnitConverter};
use crate::domain::{Energy, PeriodKind, Power, ProviderRef, SensorId, Unit};
use crate::repo::ReadingStore;

/// A mean, or the explicit absence of data. Serialized as `-1` when empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeanValue {
    Value(f64),
    NoData,
}

impl MeanValue {
    pub fn value(&self) -> Option<f64> {
        match self {
            MeanValue::Value(v) => Some(*v),
            MeanValue::NoData => None,
        }
    }

    fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            MeanValue::Value(v) => MeanValue::Value(f(v)),
            MeanValue::NoData => MeanValue::NoData,
        }
    }
}

impl From<Option<f64>> for MeanValue {
    fn from(v: Option<f64>) -> Self {
        v.map_or(MeanValue::NoData, MeanValue::Value)
    }
}

impl Serialize for MeanValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MeanValue::Value(v) => serializer.serialize_f64(*v),
            MeanValue::NoData => serializer.serialize_i32(-1),
        }
    }
}

/// Means for one period, in the requested unit
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateReport {
    pub kind: PeriodKind,
    pub unit: Unit,
    pub global: MeanValue,
    pub buckets: Vec<MeanValue>,
}

impl AggregateReport {
    pub fn label(&self) -> &'static str {
        self.kind.bucket_label()
    }
}

/// `{"global": .., "<hourly|daily>": [..]}`
impl Serialize for AggregateReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("global", &self.global)?;
        map.serialize_entry(self.label(), &self.buckets)?;
        map.end()
    }
}

#[derive(Clone)]
pub struct Aggregator {
    readings: Arc<dyn ReadingStore>,
    converter: UnitConverter,
}

impl Aggregator {
    pub fn new(readings: Arc<dyn ReadingStore>, converter: UnitConverter) -> Self {
        Self {
            readings,
            converter,
        }
    }

    /// Means over the period of `kind` containing `reference`.
    pub async fn compute_for<Tz: TimeZone>(
        &self,
        sensor: SensorId,
        kind: PeriodKind,
        reference: &DateTime<Tz>,
        unit: Unit,
        provider: ProviderRef,
    ) -> Result<AggregateReport, QueryError> {
        let periods = bucket_period(kind, reference)
            .map_err(|e| QueryError::invalid(sensor, Selector::Period(kind), e.to_string()))?;
        self.compute(sensor, &periods, unit, provider).await
    }

    /// Bucket means become energy over one step. The global mean is only
    /// multiplied by the span in seconds, with no kWh factor, before pricing.
    /// `NoData` is never converted.
    pub async fn compute(
        &self,
        sensor: SensorId,
        periods: &PeriodBuckets,
        unit: Unit,
        provider: ProviderRef,
    ) -> Result<AggregateReport, QueryError> {
        let pricing = if unit.is_energy_based() {
            Some(self.converter.pricing(unit, provider).await?)
        } else {
            None
        };

        let mut buckets = Vec::with_capacity(periods.bucket_count());
        for bucket in periods.buckets() {
            let mean = self
                .readings
                .mean_in_range(sensor, bucket.start, bucket.end)
                .await?;
            buckets.push(MeanValue::from(mean));
        }
        let global = MeanValue::from(
            self.readings
                .mean_in_range(sensor, periods.start(), periods.end())
                .await?,
        );

        debug!(
            sensor_id = sensor,
            kind = %periods.kind,
            buckets = buckets.len(),
            empty = buckets.iter().filter(|m| **m == MeanValue::NoData).count(),
            "computed period means"
        );

        let (global, buckets) = match &pricing {
            None => (global, buckets),
            Some(pricing) => {
                let span = periods.span_seconds();
                let step = periods.step_seconds;
                (
                    global.map(|watts| pricing.apply(Energy::kilowatt_hours(watts * span as f64))),
                    buckets
                        .into_iter()
                        .map(|m| m.map(|watts| to_unit(pricing, watts, step)))
                        .collect(),
                )
            }
        };

        Ok(AggregateReport {
            kind: periods.kind,
            unit,
            global,
            buckets,
        })
    }
}

fn to_unit(pricing: &Pricing, mean_watts: f64, seconds: i64) -> f64 {
    pricing.apply(Power::watts(mean_watts).over_seconds(seconds as f64))
}
