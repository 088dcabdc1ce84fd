use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::engine::RatePeriod;

/// Body of every successful `/api` answer: the payload plus the tariff period
/// active for the requesting user.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub rate: RatePeriod,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, rate: RatePeriod) -> Self {
        Self { data, rate }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
