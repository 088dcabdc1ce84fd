//! Read-only collaborator interfaces the query engine depends on, plus the
//! backends that implement them.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{Config, StoreBackend};
use crate::domain::{Reading, Sensor, SensorId, TariffPlan, TariffWindow};

pub mod memory;
#[cfg(feature = "db")]
pub mod pg;

pub use memory::MemoryStore;

/// Ordered store of timestamped readings, one sequence per sensor
#[async_trait]
pub trait ReadingStore: Send + Sync {
    async fn find_by_sequence(&self, sensor: SensorId, id: i64) -> Result<Option<Reading>>;

    /// Readings with `lo <= sequence_id <= hi`, ascending.
    async fn find_by_sequence_range(&self, sensor: SensorId, lo: i64, hi: i64)
        -> Result<Vec<Reading>>;

    /// Skip `offset_from_end` most recent readings, then take the next `count`
    /// going backwards. Returned in ascending sequence order.
    async fn last_readings(
        &self,
        sensor: SensorId,
        offset_from_end: usize,
        count: usize,
    ) -> Result<Vec<Reading>>;

    async fn find_by_timestamp(&self, sensor: SensorId, t: i64) -> Result<Option<Reading>>;

    /// Readings with `t1 <= timestamp <= t2`, ascending by sequence id.
    async fn find_in_timestamp_range(&self, sensor: SensorId, t1: i64, t2: i64)
        -> Result<Vec<Reading>>;

    /// Arithmetic mean of values with `t1 <= timestamp <= t2`, `None` when empty.
    async fn mean_in_range(&self, sensor: SensorId, t1: i64, t2: i64) -> Result<Option<f64>>;
}

/// Tariff plan table
#[async_trait]
pub trait TariffStore: Send + Sync {
    async fn current_plan(&self) -> Result<Option<TariffPlan>>;
    async fn plan_by_id(&self, id: i64) -> Result<Option<TariffPlan>>;
    async fn list_plans(&self) -> Result<Vec<TariffPlan>>;
}

#[async_trait]
pub trait SensorStore: Send + Sync {
    async fn list_sensors(&self) -> Result<Vec<Sensor>>;
}

/// Per-user settings owned by the session collaborator
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn tariff_window(&self, login: &str) -> Result<Option<TariffWindow>>;
}

/// The set of backends the service reads from
#[derive(Clone)]
pub struct Repositories {
    pub readings: Arc<dyn ReadingStore>,
    pub tariffs: Arc<dyn TariffStore>,
    pub sensors: Arc<dyn SensorStore>,
    pub users: Arc<dyn UserStore>,
}

impl Repositories {
    /// Every collaborator served by one in-process store.
    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            readings: store.clone(),
            tariffs: store.clone(),
            sensors: store.clone(),
            users: store,
        }
    }

    pub async fn new(cfg: &Config) -> Result<Self> {
        match cfg.store.backend {
            StoreBackend::Memory => {
                let store = MemoryStore::from_config(cfg).await?;
                Ok(Self::from_memory(Arc::new(store)))
            }
            #[cfg(feature = "db")]
            StoreBackend::Postgres => {
                let store = Arc::new(pg::PgStore::connect(&cfg.store.url).await?);
                Ok(Self {
                    readings: store.clone(),
                    tariffs: store.clone(),
                    sensors: store.clone(),
                    users: store,
                })
            }
            #[cfg(not(feature = "db"))]
            StoreBackend::Postgres => {
                anyhow::bail!("postgres backend requested but the `db` feature is not enabled")
            }
        }
    }
}
