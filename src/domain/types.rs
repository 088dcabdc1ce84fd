use serde::{Deserialize, Serialize};
use std::ops::Add;
use strum::{Display, EnumString};

// ============================================================================
// Physical Unit Newtypes
// ============================================================================

/// Instantaneous power in Watts (W)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, PartialOrd)]
pub struct Power(pub f64);

impl Power {
    pub fn watts(w: f64) -> Self {
        Self(w)
    }

    pub fn as_watts(&self) -> f64 {
        self.0
    }

    pub fn as_kilowatts(&self) -> f64 {
        self.0 / 1000.0
    }

    /// Energy drawn when this power is held for `seconds`.
    pub fn over_seconds(&self, seconds: f64) -> Energy {
        Energy::kilowatt_hours(self.as_kilowatts() * seconds / 3600.0)
    }
}

impl std::fmt::Display for Power {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.abs() >= 1000.0 {
            write!(f, "{:.2} kW", self.as_kilowatts())
        } else {
            write!(f, "{:.1} W", self.0)
        }
    }
}

/// Energy in kilowatt-hours (kWh)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, PartialOrd)]
pub struct Energy(pub f64);

impl Energy {
    pub fn kilowatt_hours(kwh: f64) -> Self {
        Self(kwh)
    }

    pub fn as_kilowatt_hours(&self) -> f64 {
        self.0
    }

    pub fn as_watt_hours(&self) -> f64 {
        self.0 * 1000.0
    }
}

impl std::fmt::Display for Energy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.abs() >= 1.0 {
            write!(f, "{:.2} kWh", self.0)
        } else {
            write!(f, "{:.1} Wh", self.as_watt_hours())
        }
    }
}

impl Add for Energy {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Representation requested for a series of readings.
///
/// The string forms are the path tokens used by the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Unit {
    /// Raw instantaneous power per sample
    Watts,
    /// Integrated energy
    #[strum(to_string = "kwatthours")]
    #[serde(rename = "kwatthours")]
    KilowattHours,
    /// Energy priced through a tariff plan
    #[strum(to_string = "euros")]
    #[serde(rename = "euros")]
    Currency,
}

impl Unit {
    /// Whether values in this unit are derived from integrated energy.
    pub fn is_energy_based(&self) -> bool {
        matches!(self, Unit::KilowattHours | Unit::Currency)
    }
}

/// Calendar period partitioned by the bucketer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PeriodKind {
    Daily,
    Weekly,
    Monthly,
}

impl PeriodKind {
    /// Fixed bucket width in seconds
    pub fn step_seconds(&self) -> i64 {
        match self {
            PeriodKind::Daily => 3600,
            PeriodKind::Weekly | PeriodKind::Monthly => 86_400,
        }
    }

    /// Presentation label for the bucket series
    pub fn bucket_label(&self) -> &'static str {
        match self {
            PeriodKind::Daily => "hourly",
            PeriodKind::Weekly | PeriodKind::Monthly => "daily",
        }
    }
}
