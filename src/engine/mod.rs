//! Range resolution, unit conversion, rate classification and aggregation
//! over the collaborator stores.

pub mod aggregate;
pub mod catalog;
pub mod convert;
pub mod error;
pub mod period;
pub mod range;
pub mod rate;

pub use aggregate::{AggregateReport, Aggregator, MeanValue};
pub use catalog::TariffCatalog;
pub use convert::{integrate, ConvertedSeries, Pricing, UnitConverter};
pub use error::{Missing, QueryError, Selector};
pub use period::{bucket_period, Bucket, PeriodBuckets, PeriodError};
pub use range::{RangeResolver, MAX_VALUES};
pub use rate::{classify_rate, time_of_day, RateClassifier, RatePeriod};

use chrono::{DateTime, TimeZone};
use std::sync::Arc;

use crate::domain::{
    Energy, PeriodKind, ProviderRef, Reading, Sensor, SensorId, TariffPlan, TimeOfDay, Unit,
};
use crate::repo::{Repositories, SensorStore};

/// Every query operation behind one handle shared by the HTTP layer.
#[derive(Clone)]
pub struct QueryEngine {
    resolver: RangeResolver,
    converter: UnitConverter,
    classifier: RateClassifier,
    aggregator: Aggregator,
    sensors: Arc<dyn SensorStore>,
}

impl QueryEngine {
    pub fn new(repos: Repositories) -> Self {
        let converter = UnitConverter::new(TariffCatalog::new(repos.tariffs));
        Self {
            resolver: RangeResolver::new(repos.readings.clone()),
            aggregator: Aggregator::new(repos.readings, converter.clone()),
            classifier: RateClassifier::new(repos.users),
            sensors: repos.sensors,
            converter,
        }
    }

    pub async fn resolve_range(
        &self,
        sensor: SensorId,
        selector: Selector,
    ) -> Result<Vec<Reading>, QueryError> {
        self.resolver.resolve(sensor, selector).await
    }

    pub async fn convert_units(
        &self,
        readings: Vec<Reading>,
        unit: Unit,
        provider: ProviderRef,
    ) -> Result<ConvertedSeries, QueryError> {
        self.converter.convert(readings, unit, provider).await
    }

    /// Resolve then convert in one go.
    pub async fn query(
        &self,
        sensor: SensorId,
        selector: Selector,
        unit: Unit,
        provider: ProviderRef,
    ) -> Result<ConvertedSeries, QueryError> {
        let readings = self.resolve_range(sensor, selector).await?;
        self.convert_units(readings, unit, provider).await
    }

    pub async fn classify_rate(&self, login: Option<&str>, now: TimeOfDay) -> RatePeriod {
        self.classifier.classify_for(login, now).await
    }

    pub async fn compute_aggregate<Tz: TimeZone>(
        &self,
        sensor: SensorId,
        kind: PeriodKind,
        reference: &DateTime<Tz>,
        unit: Unit,
        provider: ProviderRef,
    ) -> Result<AggregateReport, QueryError> {
        self.aggregator
            .compute_for(sensor, kind, reference, unit, provider)
            .await
    }

    pub async fn cost_of(&self, energy: Energy, provider: ProviderRef) -> Result<f64, QueryError> {
        self.converter.cost(energy, provider).await
    }

    pub async fn list_sensors(&self) -> Result<Vec<Sensor>, QueryError> {
        let sensors = self.sensors.list_sensors().await?;
        if sensors.is_empty() {
            return Err(Missing::Sensors.into());
        }
        Ok(sensors)
    }

    pub async fn plans(&self) -> Result<Vec<TariffPlan>, QueryError> {
        self.converter.catalog().list().await
    }

    pub async fn plan(&self, provider: ProviderRef) -> Result<TariffPlan, QueryError> {
        self.converter.catalog().get(provider).await
    }
}
