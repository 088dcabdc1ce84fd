//! In-process store backing every collaborator trait.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

use super::{ReadingStore, SensorStore, TariffStore, UserStore};
use crate::config::Config;
use crate::domain::{Reading, Sensor, SensorId, TariffPlan, TariffWindow};

/// Peak of the synthetic demo signal, in watts
const DEMO_MAX_POWER_W: f64 = 3500.0;

/// Provider entry as published in the providers JSON file
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderRecord {
    pub name: String,
    pub slope_watt_euros: f64,
    pub constant_watt_euros: f64,
    pub type_id: i64,
}

#[derive(Default)]
struct Inner {
    sensors: BTreeMap<SensorId, Sensor>,
    /// Per-sensor readings, ascending by sequence id
    readings: HashMap<SensorId, Vec<Reading>>,
    plans: Vec<TariffPlan>,
    windows: HashMap<String, TariffWindow>,
    next_plan_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store seeded from the `[store]` and `[[users]]` config sections.
    pub async fn from_config(cfg: &Config) -> Result<Self> {
        let store = Self::new();
        let sensor = store.add_sensor(&cfg.store.default_sensor, 1, &cfg.store.measure_type);

        if let Some(path) = &cfg.store.providers_file {
            let plans = store.load_providers_file(path).await?;
            info!(count = plans.len(), path = %path, "loaded tariff plans");
        }
        if let Some(name) = &cfg.store.current_provider {
            store.set_current_plan(name)?;
        }

        for user in &cfg.users {
            let window = TariffWindow::parse(&user.start_night_rate, &user.end_night_rate)
                .with_context(|| format!("invalid night-rate window for user {}", user.login))?;
            store.set_user_window(&user.login, window);
        }

        if cfg.store.demo_readings > 0 {
            let now = chrono::Utc::now().timestamp();
            let start = now - cfg.store.demo_readings as i64;
            store.seed_demo_readings(sensor, cfg.store.demo_readings, start);
            info!(sensor_id = sensor, count = cfg.store.demo_readings, "seeded demo readings");
        }

        Ok(store)
    }

    pub fn add_sensor(&self, name: &str, measure_type_id: i64, measure_type_name: &str) -> SensorId {
        let mut inner = self.inner.write();
        let id = inner.sensors.keys().next_back().map_or(1, |last| last + 1);
        inner.sensors.insert(
            id,
            Sensor {
                id,
                name: name.to_string(),
                measure_type_id,
                measure_type_name: measure_type_name.to_string(),
            },
        );
        id
    }

    /// Append a reading with the next sequence id for `sensor` (starting at 1).
    pub fn insert_reading(&self, sensor: SensorId, timestamp: i64, value: f64) -> Reading {
        let mut inner = self.inner.write();
        let series = inner.readings.entry(sensor).or_default();
        let sequence_id = series.last().map_or(1, |r| r.sequence_id + 1);
        let reading = Reading { sensor_id: sensor, sequence_id, timestamp, value };
        series.push(reading);
        reading
    }

    /// Insert a reading with an explicit sequence id, keeping order.
    pub fn push_reading(&self, reading: Reading) -> Result<()> {
        let mut inner = self.inner.write();
        let series = inner.readings.entry(reading.sensor_id).or_default();
        match series.binary_search_by_key(&reading.sequence_id, |r| r.sequence_id) {
            Ok(_) => bail!(
                "sequence id {} already exists for sensor {}",
                reading.sequence_id,
                reading.sensor_id
            ),
            Err(pos) => series.insert(pos, reading),
        }
        Ok(())
    }

    /// Synthetic `sin²` load profile at one sample per second.
    pub fn seed_demo_readings(&self, sensor: SensorId, count: usize, start_timestamp: i64) {
        for n in 1..=count {
            let value = (n as f64 / 10.0).sin().powi(2) * DEMO_MAX_POWER_W;
            self.insert_reading(sensor, start_timestamp + n as i64, value);
        }
    }

    /// Replace the whole plan table. The current flag survives on the plan
    /// whose name matches the previously current one.
    pub fn replace_tariff_plans(&self, records: Vec<ProviderRecord>) -> Vec<TariffPlan> {
        let mut inner = self.inner.write();
        let old_current = inner
            .plans
            .iter()
            .find(|p| p.is_current)
            .map(|p| p.name.clone());

        let mut plans = Vec::with_capacity(records.len());
        for record in records {
            inner.next_plan_id += 1;
            plans.push(TariffPlan {
                id: inner.next_plan_id,
                is_current: old_current.as_deref() == Some(record.name.as_str()),
                name: record.name,
                measure_type_id: record.type_id,
                slope: record.slope_watt_euros,
                constant: record.constant_watt_euros,
            });
        }
        debug!(count = plans.len(), kept_current = ?old_current, "replaced tariff plans");
        inner.plans = plans.clone();
        plans
    }

    pub async fn load_providers_file(&self, path: impl AsRef<Path>) -> Result<Vec<TariffPlan>> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading providers file {}", path.display()))?;
        let records: Vec<ProviderRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing providers file {}", path.display()))?;
        Ok(self.replace_tariff_plans(records))
    }

    /// Mark the plan called `name` as current, clearing the flag elsewhere.
    pub fn set_current_plan(&self, name: &str) -> Result<()> {
        let mut inner = self.inner.write();
        if !inner.plans.iter().any(|p| p.name == name) {
            bail!("no tariff plan named {:?}", name);
        }
        for plan in inner.plans.iter_mut() {
            plan.is_current = plan.name == name;
        }
        Ok(())
    }

    pub fn set_user_window(&self, login: &str, window: TariffWindow) {
        self.inner.write().windows.insert(login.to_string(), window);
    }

    fn with_series<T>(&self, sensor: SensorId, f: impl FnOnce(&[Reading]) -> T) -> T {
        let inner = self.inner.read();
        let series = inner.readings.get(&sensor).map(Vec::as_slice).unwrap_or(&[]);
        f(series)
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    async fn find_by_sequence(&self, sensor: SensorId, id: i64) -> Result<Option<Reading>> {
        Ok(self.with_series(sensor, |s| {
            s.binary_search_by_key(&id, |r| r.sequence_id).ok().map(|i| s[i])
        }))
    }

    async fn find_by_sequence_range(
        &self,
        sensor: SensorId,
        lo: i64,
        hi: i64,
    ) -> Result<Vec<Reading>> {
        Ok(self.with_series(sensor, |s| {
            s.iter()
                .filter(|r| r.sequence_id >= lo && r.sequence_id <= hi)
                .copied()
                .collect()
        }))
    }

    async fn last_readings(
        &self,
        sensor: SensorId,
        offset_from_end: usize,
        count: usize,
    ) -> Result<Vec<Reading>> {
        Ok(self.with_series(sensor, |s| {
            let end = s.len().saturating_sub(offset_from_end);
            let start = end.saturating_sub(count);
            s[start..end].to_vec()
        }))
    }

    async fn find_by_timestamp(&self, sensor: SensorId, t: i64) -> Result<Option<Reading>> {
        Ok(self.with_series(sensor, |s| s.iter().find(|r| r.timestamp == t).copied()))
    }

    async fn find_in_timestamp_range(
        &self,
        sensor: SensorId,
        t1: i64,
        t2: i64,
    ) -> Result<Vec<Reading>> {
        Ok(self.with_series(sensor, |s| {
            s.iter()
                .filter(|r| r.timestamp >= t1 && r.timestamp <= t2)
                .copied()
                .collect()
        }))
    }

    async fn mean_in_range(&self, sensor: SensorId, t1: i64, t2: i64) -> Result<Option<f64>> {
        Ok(self.with_series(sensor, |s| {
            let (sum, n) = s
                .iter()
                .filter(|r| r.timestamp >= t1 && r.timestamp <= t2)
                .fold((0.0, 0usize), |(sum, n), r| (sum + r.value, n + 1));
            (n > 0).then(|| sum / n as f64)
        }))
    }
}

#[async_trait]
impl TariffStore for MemoryStore {
    async fn current_plan(&self) -> Result<Option<TariffPlan>> {
        Ok(self.inner.read().plans.iter().find(|p| p.is_current).cloned())
    }

    async fn plan_by_id(&self, id: i64) -> Result<Option<TariffPlan>> {
        Ok(self.inner.read().plans.iter().find(|p| p.id == id).cloned())
    }

    async fn list_plans(&self) -> Result<Vec<TariffPlan>> {
        Ok(self.inner.read().plans.clone())
    }
}

#[async_trait]
impl SensorStore for MemoryStore {
    async fn list_sensors(&self) -> Result<Vec<Sensor>> {
        Ok(self.inner.read().sensors.values().cloned().collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn tariff_window(&self, login: &str) -> Result<Option<TariffWindow>> {
        Ok(self.inner.read().windows.get(login).copied())
    }
}
