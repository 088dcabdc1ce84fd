//! HTTP surface driven through the router with an in-memory store.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use consumption_api::{
    api,
    auth::USER_LOGIN_HEADER,
    config::Config,
    domain::TariffWindow,
    repo::{memory::ProviderRecord, MemoryStore, Repositories},
    state::AppState,
};

fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let sensor = store.add_sensor("main-meter", 1, "electricity");
    // sequence ids 1..=10 at one sample per hour
    for i in 1..=10 {
        store.insert_reading(sensor, i * 3600, 1000.0 * i as f64);
    }
    store.replace_tariff_plans(vec![
        ProviderRecord {
            name: "EDF".to_string(),
            slope_watt_euros: 0.2,
            constant_watt_euros: 1.0,
            type_id: 1,
        },
        ProviderRecord {
            name: "Engie".to_string(),
            slope_watt_euros: 0.1,
            constant_watt_euros: 0.0,
            type_id: 1,
        },
    ]);
    store
}

fn app(store: Arc<MemoryStore>) -> Router {
    let cfg = Config::default();
    let state = AppState::with_repositories(cfg.clone(), Repositories::from_memory(store));
    api::router(state, &cfg)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    get_as(app, uri, None).await
}

async fn get_as(app: Router, uri: &str, login: Option<&str>) -> (StatusCode, Value) {
    let mut req = Request::builder().uri(uri);
    if let Some(login) = login {
        req = req.header(USER_LOGIN_HEADER, login);
    }
    let response = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

#[tokio::test]
async fn test_healthz() {
    let (status, _) = get(app(seeded_store()), "/healthz").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(app(seeded_store()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_sensors() {
    let (status, body) = get(app(seeded_store()), "/api/sensors").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["name"], "main-meter");
    assert_eq!(body["data"][0]["type"], "electricity");
    assert_eq!(body["rate"], -1);

    let (status, body) = get(app(Arc::new(MemoryStore::new())), "/api/sensors").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn test_single_id() {
    let (status, body) = get(app(seeded_store()), "/api/1/get/watts/by_id/4").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["sequence_id"], 4);
    assert_eq!(body["data"][0]["value"], 4000.0);

    let (status, body) = get(app(seeded_store()), "/api/1/get/watts/by_id/-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["sequence_id"], 10);

    let (status, _) = get(app(seeded_store()), "/api/1/get/watts/by_id/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_single_selector_rejects_energy_units() {
    let (status, body) = get(app(seeded_store()), "/api/1/get/euros/by_id/4").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadRequest");
}

#[tokio::test]
async fn test_id_ranges() {
    let (status, body) = get(app(seeded_store()), "/api/1/get/watts/by_id/2/5").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["sequence_id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![2, 3, 4, 5]);

    let (status, body) = get(app(seeded_store()), "/api/1/get/watts/by_id/-3/0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let (status, _) = get(app(seeded_store()), "/api/1/get/watts/by_id/-3/4").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get(app(seeded_store()), "/api/1/get/watts/by_id/0/501").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("maximum is set to 500"));
}

#[tokio::test]
async fn test_energy_and_cost_over_range() {
    // 1000 W for the first hour, then 2000 W for the next
    let (status, body) = get(app(seeded_store()), "/api/1/get/kwatthours/by_id/1/2").await;
    assert_eq!(status, StatusCode::OK);
    assert!((body["data"].as_f64().unwrap() - 3.0).abs() < 1e-9);

    // no current plan yet
    let (status, _) = get(app(seeded_store()), "/api/1/get/euros/by_id/1/2").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let store = seeded_store();
    store.set_current_plan("EDF").unwrap();
    let (status, body) = get(app(store), "/api/1/get/euros/by_id/1/2").await;
    assert_eq!(status, StatusCode::OK);
    assert!((body["data"].as_f64().unwrap() - (0.2 * 3.0 + 1.0)).abs() < 1e-9);
}

#[tokio::test]
async fn test_time_selectors() {
    let (status, body) = get(app(seeded_store()), "/api/1/get/watts/by_time/7200").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["sequence_id"], 2);

    let (status, _) = get(app(seeded_store()), "/api/1/get/watts/by_time/7201").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(app(seeded_store()), "/api/1/get/watts/by_time/3500/3700").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["sequence_id"], 1);

    let (status, _) = get(app(seeded_store()), "/api/1/get/watts/by_time/3601/3700").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(app(seeded_store()), "/api/1/get/watts/by_time/0/36000").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = get(app(seeded_store()), "/api/1/get/watts/by_time/500/100").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_fractional_timestamps_are_floored() {
    let (status, body) = get(app(seeded_store()), "/api/1/get/watts/by_time/7200.9").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["sequence_id"], 2);

    let (status, body) = get(app(seeded_store()), "/api/1/get/watts/by_time/3599.5/3600.2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = get(app(seeded_store()), "/api/1/get/watts/by_time/-0.5").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(app(seeded_store()), "/api/1/get/watts/by_time/inf").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_unit_rejected() {
    let (status, _) = get(app(seeded_store()), "/api/1/get/joules/by_id/1/2").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_providers() {
    let (status, body) = get(app(seeded_store()), "/api/energy_providers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = get(app(seeded_store()), "/api/energy_providers/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Engie");

    let (status, _) = get(app(seeded_store()), "/api/energy_providers/current").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let store = seeded_store();
    store.set_current_plan("Engie").unwrap();
    let (status, body) = get(app(store), "/api/energy_providers/0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["current"], true);

    let (status, _) = get(app(seeded_store()), "/api/energy_providers/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_watt_euros() {
    let (status, body) = get(app(seeded_store()), "/api/1/watt_euros/10").await;
    assert_eq!(status, StatusCode::OK);
    assert!((body["data"].as_f64().unwrap() - 3.0).abs() < 1e-9);

    let (status, _) = get(app(seeded_store()), "/api/42/watt_euros/10").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_mean_shapes() {
    let store = seeded_store();
    store.insert_reading(1, chrono::Utc::now().timestamp(), 1200.0);

    let (status, body) = get(app(store.clone()), "/api/1/mean/watts/daily").await;
    assert_eq!(status, StatusCode::OK);
    let hourly = body["data"]["hourly"].as_array().unwrap();
    assert!((23..=25).contains(&hourly.len()));
    assert_eq!(body["data"]["global"], 1200.0);
    assert!(hourly.iter().filter(|v| **v == -1).count() >= hourly.len() - 2);

    let (status, body) = get(app(store), "/api/1/mean/kwatthours/monthly").await;
    assert_eq!(status, StatusCode::OK);
    let daily = body["data"]["daily"].as_array().unwrap();
    assert!((28..=31).contains(&daily.len()));

    let (status, _) = get(app(seeded_store()), "/api/1/mean/watts/yearly").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rate_follows_user_window() {
    use chrono::Timelike;

    // night at every minute except 00:00 and 00:01
    let now = chrono::Local::now();
    if now.hour() == 0 && now.minute() < 3 {
        return;
    }
    let store = seeded_store();
    store.set_user_window("alice", TariffWindow::parse("00:01", "00:00").unwrap());
    let (status, body) = get_as(app(store), "/api/sensors", Some("alice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rate"], "night");

    // a 00:00-00:01 window only holds its boundaries, so it is day
    let store = seeded_store();
    store.set_user_window("carol", TariffWindow::parse("00:00", "00:01").unwrap());
    let (_, body) = get_as(app(store), "/api/sensors", Some("carol")).await;
    assert_eq!(body["rate"], "day");

    let (_, body) = get_as(app(seeded_store()), "/api/sensors", Some("bob")).await;
    assert_eq!(body["rate"], -1);
}
