use chrono::Timelike;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::Energy;

/// Last valid second of a day
pub const LAST_SECOND_OF_DAY: u32 = 86_399;

/// A linear electricity tariff: `cost = slope * kWh + constant`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffPlan {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type_id")]
    pub measure_type_id: i64,
    /// Currency per kWh
    #[serde(rename = "slope_watt_euros")]
    pub slope: f64,
    /// Fixed currency offset
    #[serde(rename = "constant_watt_euros")]
    pub constant: f64,
    #[serde(rename = "current")]
    pub is_current: bool,
}

impl TariffPlan {
    pub fn cost(&self, energy: Energy) -> f64 {
        self.slope * energy.as_kilowatt_hours() + self.constant
    }
}

/// How a caller designates a tariff plan.
///
/// The integer `0` is reserved for "whichever plan is current".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderRef {
    Current,
    Id(i64),
}

impl From<i64> for ProviderRef {
    fn from(id: i64) -> Self {
        if id == 0 {
            ProviderRef::Current
        } else {
            ProviderRef::Id(id)
        }
    }
}

impl FromStr for ProviderRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("current") {
            return Ok(ProviderRef::Current);
        }
        s.parse::<i64>()
            .map(ProviderRef::from)
            .map_err(|_| format!("Invalid provider reference: {}", s))
    }
}

impl fmt::Display for ProviderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderRef::Current => write!(f, "current"),
            ProviderRef::Id(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeOfDayError {
    #[error("time of day must use the hh:mm format, got {0:?}")]
    Format(String),
    #[error("second of day {0} is outside 0..=86399")]
    OutOfRange(u32),
}

/// Seconds elapsed since local midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct TimeOfDay(u32);

impl TimeOfDay {
    pub fn from_seconds(seconds: u32) -> Result<Self, TimeOfDayError> {
        if seconds > LAST_SECOND_OF_DAY {
            return Err(TimeOfDayError::OutOfRange(seconds));
        }
        Ok(Self(seconds))
    }

    pub fn from_hm(hour: u32, minute: u32) -> Result<Self, TimeOfDayError> {
        if hour > 23 || minute > 59 {
            return Err(TimeOfDayError::Format(format!("{:02}:{:02}", hour, minute)));
        }
        Ok(Self(hour * 3600 + minute * 60))
    }

    /// Hours and minutes of `t`; seconds are dropped.
    pub fn from_time<T: Timelike>(t: &T) -> Self {
        Self(t.hour() * 3600 + t.minute() * 60)
    }

    pub fn seconds(&self) -> u32 {
        self.0
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeOfDayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || TimeOfDayError::Format(s.to_string());
        let (hour, minute) = s.trim().split_once(':').ok_or_else(bad)?;
        let hour: u32 = hour.parse().map_err(|_| bad())?;
        let minute: u32 = minute.parse().map_err(|_| bad())?;
        if hour > 23 || minute > 59 {
            return Err(bad());
        }
        Self::from_hm(hour, minute)
    }
}

impl TryFrom<u32> for TimeOfDay {
    type Error = TimeOfDayError;

    fn try_from(seconds: u32) -> Result<Self, Self::Error> {
        Self::from_seconds(seconds)
    }
}

impl From<TimeOfDay> for u32 {
    fn from(t: TimeOfDay) -> Self {
        t.0
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 3600, (self.0 % 3600) / 60)
    }
}

/// A user's night-rate window. `end` may precede `start` when the window
/// wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TariffWindow {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    /// Build a window from two `hh:mm` strings.
    pub fn parse(start: &str, end: &str) -> Result<Self, TimeOfDayError> {
        Ok(Self::new(start.parse()?, end.parse()?))
    }

    pub fn wraps_midnight(&self) -> bool {
        self.end <= self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(slope: f64, constant: f64) -> TariffPlan {
        TariffPlan {
            id: 1,
            name: "EDF".to_string(),
            measure_type_id: 1,
            slope,
            constant,
            is_current: true,
        }
    }

    #[test]
    fn test_linear_cost() {
        let p = plan(0.15, 2.0);
        assert!((p.cost(Energy::kilowatt_hours(10.0)) - 3.5).abs() < 1e-12);
        assert!((p.cost(Energy::default()) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_provider_ref_sentinel() {
        assert_eq!(ProviderRef::from(0), ProviderRef::Current);
        assert_eq!(ProviderRef::from(4), ProviderRef::Id(4));
        assert_eq!("current".parse::<ProviderRef>().unwrap(), ProviderRef::Current);
        assert_eq!("0".parse::<ProviderRef>().unwrap(), ProviderRef::Current);
        assert_eq!("12".parse::<ProviderRef>().unwrap(), ProviderRef::Id(12));
        assert!("abc".parse::<ProviderRef>().is_err());
    }

    #[test]
    fn test_time_of_day_parse() {
        assert_eq!("23:00".parse::<TimeOfDay>().unwrap().seconds(), 82_800);
        assert_eq!("06:30".parse::<TimeOfDay>().unwrap().seconds(), 23_400);
        assert_eq!("0:0".parse::<TimeOfDay>().unwrap().seconds(), 0);
        assert!("24:00".parse::<TimeOfDay>().is_err());
        assert!("12:60".parse::<TimeOfDay>().is_err());
        assert!("1200".parse::<TimeOfDay>().is_err());
        assert!("aa:bb".parse::<TimeOfDay>().is_err());
        assert_eq!(TimeOfDay::from_seconds(23_400).unwrap().to_string(), "06:30");
    }

    #[test]
    fn test_time_of_day_range() {
        assert!(TimeOfDay::from_seconds(LAST_SECOND_OF_DAY).is_ok());
        assert_eq!(
            TimeOfDay::from_seconds(86_400),
            Err(TimeOfDayError::OutOfRange(86_400))
        );
    }

    #[test]
    fn test_window_wrap() {
        assert!(TariffWindow::parse("23:00", "06:00").unwrap().wraps_midnight());
        assert!(!TariffWindow::parse("01:00", "06:00").unwrap().wraps_midnight());
        assert!(TariffWindow::parse("06:00", "06:00").unwrap().wraps_midnight());
    }

    #[test]
    fn test_plan_serializes_with_provider_field_names() {
        let json = serde_json::to_value(plan(0.1, 1.0)).unwrap();
        assert_eq!(json["slope_watt_euros"], 0.1);
        assert_eq!(json["constant_watt_euros"], 1.0);
        assert_eq!(json["current"], true);
    }
}
