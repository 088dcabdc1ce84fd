//! Power samples to energy and cost.

use serde::Serialize;

use super::{QueryError, TariffCatalog};
use crate::domain::{Energy, ProviderRef, Reading, TariffPlan, Unit};

/// A converted series as handed back to the routing layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConvertedSeries {
    /// One raw power value per sample
    Power(Vec<Reading>),
    /// Energy integrated over the whole series
    Energy(Energy),
    /// Cost of the energy integrated over the whole series
    Cost(f64),
}

/// Maps an energy figure to the requested unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Pricing {
    Energy,
    Cost(TariffPlan),
}

impl Pricing {
    pub fn apply(&self, energy: Energy) -> f64 {
        match self {
            Pricing::Energy => energy.as_kilowatt_hours(),
            Pricing::Cost(plan) => plan.cost(energy),
        }
    }
}

/// Running-total energy of a series.
///
/// Each sample contributes its power over the time elapsed since the previous
/// sample; the first sample is measured from timestamp zero.
pub fn integrate(readings: &[Reading]) -> Energy {
    let mut energy = Energy::default();
    let mut previous = 0i64;
    for r in readings {
        energy = energy + r.power().over_seconds((r.timestamp - previous) as f64);
        previous = r.timestamp;
    }
    energy
}

#[derive(Clone)]
pub struct UnitConverter {
    catalog: TariffCatalog,
}

impl UnitConverter {
    pub fn new(catalog: TariffCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &TariffCatalog {
        &self.catalog
    }

    pub async fn convert(
        &self,
        readings: Vec<Reading>,
        unit: Unit,
        provider: ProviderRef,
    ) -> Result<ConvertedSeries, QueryError> {
        match unit {
            Unit::Watts => Ok(ConvertedSeries::Power(readings)),
            Unit::KilowattHours => Ok(ConvertedSeries::Energy(integrate(&readings))),
            Unit::Currency => {
                let energy = integrate(&readings);
                Ok(ConvertedSeries::Cost(self.cost(energy, provider).await?))
            }
        }
    }

    /// Linear cost of `energy` under the referenced plan.
    pub async fn cost(&self, energy: Energy, provider: ProviderRef) -> Result<f64, QueryError> {
        let plan = self.plan(provider).await?;
        Ok(plan.cost(energy))
    }

    /// Resolve once how energy figures turn into `unit` values. Only
    /// meaningful for energy-based units; `Watts` maps like `KilowattHours`.
    pub async fn pricing(&self, unit: Unit, provider: ProviderRef) -> Result<Pricing, QueryError> {
        match unit {
            Unit::Currency => Ok(Pricing::Cost(self.plan(provider).await?)),
            Unit::Watts | Unit::KilowattHours => Ok(Pricing::Energy),
        }
    }

    async fn plan(&self, provider: ProviderRef) -> Result<TariffPlan, QueryError> {
        self.catalog
            .resolve(provider)
            .await?
            .ok_or(QueryError::Conversion { provider })
    }
}
