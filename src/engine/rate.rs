use chrono::{DateTime, TimeZone};
use serde::{Serialize, Serializer};
use std::sync::Arc;
use tracing::warn;

use crate::domain::{TariffWindow, TimeOfDay};
use crate::repo::UserStore;

/// Tariff period active at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RatePeriod {
    Day,
    Night,
    /// No user or window could be resolved
    Unknown,
}

impl Serialize for RatePeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RatePeriod::Day => serializer.serialize_str("day"),
            RatePeriod::Night => serializer.serialize_str("night"),
            RatePeriod::Unknown => serializer.serialize_i32(-1),
        }
    }
}

/// Classify `now` against a night-rate window. Boundary instants are "day".
pub fn classify_rate(now: TimeOfDay, window: Option<&TariffWindow>) -> RatePeriod {
    let Some(window) = window else {
        return RatePeriod::Unknown;
    };
    let (s, e) = (window.start, window.end);

    let night = if e > s {
        s < now && now < e
    } else {
        now > s || now < e
    };

    if night {
        RatePeriod::Night
    } else {
        RatePeriod::Day
    }
}

/// Minute-resolution time of day, seconds dropped.
pub fn time_of_day<Tz: TimeZone>(instant: &DateTime<Tz>) -> TimeOfDay {
    TimeOfDay::from_time(instant)
}

#[derive(Clone)]
pub struct RateClassifier {
    users: Arc<dyn UserStore>,
}

impl RateClassifier {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Never fails: a missing login, user, window or a store error all
    /// degrade to [`RatePeriod::Unknown`].
    pub async fn classify_for(&self, login: Option<&str>, now: TimeOfDay) -> RatePeriod {
        let Some(login) = login else {
            return RatePeriod::Unknown;
        };
        match self.users.tariff_window(login).await {
            Ok(window) => classify_rate(now, window.as_ref()),
            Err(e) => {
                warn!(error = %e, login, "tariff window lookup failed");
                RatePeriod::Unknown
            }
        }
    }
}
