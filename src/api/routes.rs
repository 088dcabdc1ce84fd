use axum::{
    extract::{Path, State},
    routing::get,
    Router,
};
use chrono::Local;

use super::{error::ApiError, response::ApiResponse};
use crate::{
    auth::SessionUser,
    domain::{Energy, PeriodKind, ProviderRef, Sensor, SensorId, TariffPlan, Unit},
    engine::{time_of_day, AggregateReport, ConvertedSeries, RatePeriod, Selector},
    state::AppState,
};

type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sensors", get(list_sensors))
        .route("/energy_providers", get(list_providers))
        .route("/energy_providers/:id", get(get_provider))
        .route("/:sensor/get/:unit/by_id/:a", get(by_id))
        .route("/:sensor/get/:unit/by_id/:a/:b", get(by_id_range))
        .route("/:sensor/get/:unit/by_time/:a", get(by_time))
        .route("/:sensor/get/:unit/by_time/:a/:b", get(by_time_range))
        // first segment is a provider reference here
        .route("/:sensor/watt_euros/:consumption", get(watt_euros))
        .route("/:sensor/mean/:unit/:period", get(mean))
        .with_state(state)
}

/// Tariff period active now, in local time, for the requesting user.
async fn current_rate(st: &AppState, user: &SessionUser) -> RatePeriod {
    st.engine
        .classify_rate(user.login(), time_of_day(&Local::now()))
        .await
}

/// Path timestamps may carry a fractional part; readings are stored at
/// whole seconds.
fn timestamp_param(raw: f64) -> Result<i64, ApiError> {
    if !raw.is_finite() {
        return Err(ApiError::BadRequest(format!("invalid timestamp {}", raw)));
    }
    Ok(raw.floor() as i64)
}

fn parse_provider(raw: &str) -> Result<ProviderRef, ApiError> {
    raw.parse().map_err(ApiError::BadRequest)
}

pub async fn list_sensors(State(st): State<AppState>, user: SessionUser) -> ApiResult<Vec<Sensor>> {
    let sensors = st.engine.list_sensors().await?;
    Ok(ApiResponse::new(sensors, current_rate(&st, &user).await))
}

pub async fn list_providers(
    State(st): State<AppState>,
    user: SessionUser,
) -> ApiResult<Vec<TariffPlan>> {
    let plans = st.engine.plans().await?;
    Ok(ApiResponse::new(plans, current_rate(&st, &user).await))
}

pub async fn get_provider(
    State(st): State<AppState>,
    user: SessionUser,
    Path(id): Path<String>,
) -> ApiResult<TariffPlan> {
    let plan = st.engine.plan(parse_provider(&id)?).await?;
    Ok(ApiResponse::new(plan, current_rate(&st, &user).await))
}

/// Single selectors return raw samples only.
async fn single(
    st: &AppState,
    user: &SessionUser,
    sensor: SensorId,
    unit: Unit,
    selector: Selector,
) -> ApiResult<ConvertedSeries> {
    if unit != Unit::Watts {
        return Err(ApiError::BadRequest(format!(
            "{} cannot be requested by a single {}",
            unit, selector
        )));
    }
    let series = st
        .engine
        .query(sensor, selector, unit, ProviderRef::Current)
        .await?;
    Ok(ApiResponse::new(series, current_rate(st, user).await))
}

async fn ranged(
    st: &AppState,
    user: &SessionUser,
    sensor: SensorId,
    unit: Unit,
    selector: Selector,
) -> ApiResult<ConvertedSeries> {
    let series = st
        .engine
        .query(sensor, selector, unit, ProviderRef::Current)
        .await?;
    Ok(ApiResponse::new(series, current_rate(st, user).await))
}

pub async fn by_id(
    State(st): State<AppState>,
    user: SessionUser,
    Path((sensor, unit, id)): Path<(SensorId, Unit, i64)>,
) -> ApiResult<ConvertedSeries> {
    single(&st, &user, sensor, unit, Selector::Index(id)).await
}

pub async fn by_id_range(
    State(st): State<AppState>,
    user: SessionUser,
    Path((sensor, unit, id1, id2)): Path<(SensorId, Unit, i64, i64)>,
) -> ApiResult<ConvertedSeries> {
    ranged(&st, &user, sensor, unit, Selector::IndexRange(id1, id2)).await
}

pub async fn by_time(
    State(st): State<AppState>,
    user: SessionUser,
    Path((sensor, unit, t)): Path<(SensorId, Unit, f64)>,
) -> ApiResult<ConvertedSeries> {
    let selector = Selector::Timestamp(timestamp_param(t)?);
    single(&st, &user, sensor, unit, selector).await
}

pub async fn by_time_range(
    State(st): State<AppState>,
    user: SessionUser,
    Path((sensor, unit, t1, t2)): Path<(SensorId, Unit, f64, f64)>,
) -> ApiResult<ConvertedSeries> {
    let selector = Selector::TimestampRange(timestamp_param(t1)?, timestamp_param(t2)?);
    ranged(&st, &user, sensor, unit, selector).await
}

/// Cost of `consumption` kWh under a plan
pub async fn watt_euros(
    State(st): State<AppState>,
    user: SessionUser,
    Path((provider, consumption)): Path<(String, f64)>,
) -> ApiResult<f64> {
    let provider = parse_provider(&provider)?;
    let cost = st
        .engine
        .cost_of(Energy::kilowatt_hours(consumption), provider)
        .await?;
    Ok(ApiResponse::new(cost, current_rate(&st, &user).await))
}

/// Means over the local calendar period containing now
pub async fn mean(
    State(st): State<AppState>,
    user: SessionUser,
    Path((sensor, unit, period)): Path<(SensorId, Unit, PeriodKind)>,
) -> ApiResult<AggregateReport> {
    let report = st
        .engine
        .compute_aggregate(sensor, period, &Local::now(), unit, ProviderRef::Current)
        .await?;
    Ok(ApiResponse::new(report, current_rate(&st, &user).await))
}
