//! Device admission and profile endpoints.
//!
//! Flow Overview:
//! 1) `GET /v1/user` resolves the calling device against the account's trusted
//!    devices and reports admitted, limit reached, profile incomplete or not
//!    recognized.
//! 2) On limit reached the client removes one device with
//!    `POST /v1/user/logout` and resolves again.
//! 3) `POST /v1/user/update` fills in the profile fields.

use axum::{
    extract::{Extension, Json, Query},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use crate::registry::{
    model::{RemoveDeviceRequest, ResolveQuery, UpdateProfileRequest},
    AccountView, Outcome, Registry,
};

#[utoipa::path(
    get,
    path = "/v1/user",
    params(ResolveQuery),
    responses (
        (status = 200, description = "Resolution outcome for this device", body = Outcome),
        (status = 400, description = "Invalid email, device id or device name", body = String),
        (status = 503, description = "Account store unavailable", body = String),
    ),
    tag = "user",
)]
pub async fn resolve(
    registry: Extension<Arc<Registry>>,
    Query(query): Query<ResolveQuery>,
) -> impl IntoResponse {
    match registry
        .resolve(&query.email, &query.device_id, &query.device_name, query.mode)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/user/logout",
    request_body = RemoveDeviceRequest,
    responses (
        (status = 204, description = "Device removed or already absent"),
        (status = 400, description = "Missing device id", body = String),
        (status = 503, description = "Account store unavailable", body = String),
    ),
    tag = "user",
)]
pub async fn logout(
    registry: Extension<Arc<Registry>>,
    Json(request): Json<RemoveDeviceRequest>,
) -> impl IntoResponse {
    match registry
        .remove_device(request.user_id, &request.device_id)
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/v1/user/update",
    request_body = UpdateProfileRequest,
    responses (
        (status = 200, description = "Updated account", body = AccountView),
        (status = 400, description = "Missing name or invalid phone number", body = String),
        (status = 404, description = "User not found", body = String),
        (status = 503, description = "Account store unavailable", body = String),
    ),
    tag = "user",
)]
pub async fn update(
    registry: Extension<Arc<Registry>>,
    Json(request): Json<UpdateProfileRequest>,
) -> impl IntoResponse {
    match registry
        .update_profile(request.user_id, &request.name, &request.phone_number)
        .await
    {
        Ok(account) => (StatusCode::OK, Json(account)).into_response(),
        Err(err) => err.into_response(),
    }
}
