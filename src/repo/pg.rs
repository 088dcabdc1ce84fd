#![cfg(feature = "db")]

//! Postgres backend. Timestamps are stored as epoch seconds and the night-rate
//! window as seconds since midnight.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use super::{ReadingStore, SensorStore, TariffStore, UserStore};
use crate::domain::{Reading, Sensor, SensorId, TariffPlan, TariffWindow, TimeOfDay};

#[derive(Debug, Clone, sqlx::FromRow)]
struct MeasureRow {
    id: i64,
    sensor_id: i64,
    value: f64,
    timestamp: i64,
}

impl From<MeasureRow> for Reading {
    fn from(row: MeasureRow) -> Self {
        Reading {
            sensor_id: row.sensor_id,
            sequence_id: row.id,
            timestamp: row.timestamp,
            value: row.value,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ProviderRow {
    id: i64,
    name: String,
    type_id: i64,
    slope_watt_euros: f64,
    constant_watt_euros: f64,
    current: i32,
}

impl From<ProviderRow> for TariffPlan {
    fn from(row: ProviderRow) -> Self {
        TariffPlan {
            id: row.id,
            name: row.name,
            measure_type_id: row.type_id,
            slope: row.slope_watt_euros,
            constant: row.constant_watt_euros,
            is_current: row.current == 1,
        }
    }
}

const PROVIDER_COLUMNS: &str =
    "id, name, type_id, slope_watt_euros, constant_watt_euros, current";

pub struct PgStore {
    pub pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl ReadingStore for PgStore {
    async fn find_by_sequence(&self, sensor: SensorId, id: i64) -> Result<Option<Reading>> {
        let row = sqlx::query_as::<_, MeasureRow>(
            "SELECT id, sensor_id, value, timestamp FROM measures WHERE sensor_id = $1 AND id = $2",
        )
        .bind(sensor)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Reading::from))
    }

    async fn find_by_sequence_range(
        &self,
        sensor: SensorId,
        lo: i64,
        hi: i64,
    ) -> Result<Vec<Reading>> {
        let rows = sqlx::query_as::<_, MeasureRow>(
            r#"
            SELECT id, sensor_id, value, timestamp
            FROM measures
            WHERE sensor_id = $1 AND id >= $2 AND id <= $3
            ORDER BY id ASC
            "#,
        )
        .bind(sensor)
        .bind(lo)
        .bind(hi)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Reading::from).collect())
    }

    async fn last_readings(
        &self,
        sensor: SensorId,
        offset_from_end: usize,
        count: usize,
    ) -> Result<Vec<Reading>> {
        let mut rows = sqlx::query_as::<_, MeasureRow>(
            r#"
            SELECT id, sensor_id, value, timestamp
            FROM measures
            WHERE sensor_id = $1
            ORDER BY id DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(sensor)
        .bind(offset_from_end as i64)
        .bind(count as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.reverse();
        Ok(rows.into_iter().map(Reading::from).collect())
    }

    async fn find_by_timestamp(&self, sensor: SensorId, t: i64) -> Result<Option<Reading>> {
        let row = sqlx::query_as::<_, MeasureRow>(
            r#"
            SELECT id, sensor_id, value, timestamp
            FROM measures
            WHERE sensor_id = $1 AND timestamp = $2
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(sensor)
        .bind(t)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Reading::from))
    }

    async fn find_in_timestamp_range(
        &self,
        sensor: SensorId,
        t1: i64,
        t2: i64,
    ) -> Result<Vec<Reading>> {
        let rows = sqlx::query_as::<_, MeasureRow>(
            r#"
            SELECT id, sensor_id, value, timestamp
            FROM measures
            WHERE sensor_id = $1 AND timestamp >= $2 AND timestamp <= $3
            ORDER BY id ASC
            "#,
        )
        .bind(sensor)
        .bind(t1)
        .bind(t2)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Reading::from).collect())
    }

    async fn mean_in_range(&self, sensor: SensorId, t1: i64, t2: i64) -> Result<Option<f64>> {
        let avg: Option<f64> = sqlx::query_scalar(
            r#"
            SELECT AVG(value)
            FROM measures
            WHERE sensor_id = $1 AND timestamp >= $2 AND timestamp <= $3
            "#,
        )
        .bind(sensor)
        .bind(t1)
        .bind(t2)
        .fetch_one(&self.pool)
        .await?;
        Ok(avg)
    }
}

#[async_trait]
impl TariffStore for PgStore {
    async fn current_plan(&self) -> Result<Option<TariffPlan>> {
        let row = sqlx::query_as::<_, ProviderRow>(&format!(
            "SELECT {PROVIDER_COLUMNS} FROM providers WHERE current = 1 LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(TariffPlan::from))
    }

    async fn plan_by_id(&self, id: i64) -> Result<Option<TariffPlan>> {
        let row = sqlx::query_as::<_, ProviderRow>(&format!(
            "SELECT {PROVIDER_COLUMNS} FROM providers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(TariffPlan::from))
    }

    async fn list_plans(&self) -> Result<Vec<TariffPlan>> {
        let rows = sqlx::query_as::<_, ProviderRow>(&format!(
            "SELECT {PROVIDER_COLUMNS} FROM providers ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(TariffPlan::from).collect())
    }
}

#[async_trait]
impl SensorStore for PgStore {
    async fn list_sensors(&self) -> Result<Vec<Sensor>> {
        let rows: Vec<(i64, String, i64, String)> = sqlx::query_as(
            r#"
            SELECT s.id, s.name, s.type_id, t.name
            FROM sensors s
            JOIN measures_types t ON t.id = s.type_id
            ORDER BY s.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name, measure_type_id, measure_type_name)| Sensor {
                id,
                name,
                measure_type_id,
                measure_type_name,
            })
            .collect())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn tariff_window(&self, login: &str) -> Result<Option<TariffWindow>> {
        let row: Option<(i32, i32)> = sqlx::query_as(
            "SELECT start_night_rate, end_night_rate FROM users WHERE login = $1",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        let Some((start, end)) = row else {
            return Ok(None);
        };
        let start = TimeOfDay::from_seconds(u32::try_from(start)?)?;
        let end = TimeOfDay::from_seconds(u32::try_from(end)?)?;
        Ok(Some(TariffWindow::new(start, end)))
    }
}
