use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use tracing::{error, info};

use crate::quota::QuotaError;

use super::types::{
    CheckQuotaRequest, CheckQuotaResponse, CreateQuotaRequest, ErrorResponse,
    OverrideTotalFriendedRequest, QuotaResponse, RemainingQuotaResponse, SetMaxAllowedRequest,
};
use super::ApiState;

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

pub async fn create_quota(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<CreateQuotaRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<QuotaResponse>), ApiError> {
    let request = parse_body(payload)?;
    let quota = state
        .quota_manager
        .create_quota(&request.email, request.max_allowed)
        .map_err(quota_error)?;

    Ok((StatusCode::CREATED, Json(quota.into())))
}

/// Quota exhaustion is a normal answer here, not an HTTP error.
pub async fn check_quota(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<CheckQuotaRequest>, JsonRejection>,
) -> ApiResult<CheckQuotaResponse> {
    let request = parse_body(payload)?;
    let decision = state
        .quota_manager
        .check_and_increment(&request.email)
        .map_err(quota_error)?;

    Ok(Json(CheckQuotaResponse {
        granted: decision.granted,
        remaining: decision.remaining(),
        quota: decision.quota,
    }))
}

pub async fn get_quota(
    State(state): State<Arc<ApiState>>,
    Path(email): Path<String>,
) -> ApiResult<QuotaResponse> {
    match state.quota_manager.get_quota(&email).map_err(quota_error)? {
        Some(quota) => Ok(Json(quota.into())),
        None => Err(not_found("quota_not_found", "email has no friending quota")),
    }
}

pub async fn get_remaining_quota(
    State(state): State<Arc<ApiState>>,
    Path(email): Path<String>,
) -> ApiResult<RemainingQuotaResponse> {
    let quota = state
        .quota_manager
        .get_quota(&email)
        .map_err(quota_error)?
        .ok_or_else(|| not_found("quota_not_found", "email has no friending quota"))?;

    Ok(Json(RemainingQuotaResponse {
        remaining: quota.remaining_quota(),
        email: quota.email().to_string(),
    }))
}

pub async fn list_quotas(State(state): State<Arc<ApiState>>) -> ApiResult<Vec<QuotaResponse>> {
    let quotas = state.quota_manager.list_quotas().map_err(quota_error)?;
    Ok(Json(quotas.into_iter().map(QuotaResponse::from).collect()))
}

pub async fn set_max_allowed(
    State(state): State<Arc<ApiState>>,
    Path(email): Path<String>,
    payload: Result<Json<SetMaxAllowedRequest>, JsonRejection>,
) -> ApiResult<QuotaResponse> {
    let request = parse_body(payload)?;
    let quota = state
        .quota_manager
        .set_max_allowed(&email, request.max_allowed)
        .map_err(quota_error)?;

    info!(
        email = quota.email(),
        max_allowed = quota.max_allowed(),
        "friending quota ceiling changed via API"
    );
    Ok(Json(quota.into()))
}

pub async fn override_total_friended(
    State(state): State<Arc<ApiState>>,
    Path(email): Path<String>,
    payload: Result<Json<OverrideTotalFriendedRequest>, JsonRejection>,
) -> ApiResult<QuotaResponse> {
    let request = parse_body(payload)?;
    let quota = state
        .quota_manager
        .override_total_friended(&email, request.total_friended)
        .map_err(quota_error)?;

    info!(
        email = quota.email(),
        total_friended = quota.total_friended(),
        "friending quota usage overridden via API"
    );
    Ok(Json(quota.into()))
}

pub async fn health_check(State(state): State<Arc<ApiState>>) -> ApiResult<serde_json::Value> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": "friending-quota",
        "default_max_allowed": state.config.default_max_allowed,
    })))
}

fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(request)) => Ok(request),
        Err(rejection) => Err(bad_request("invalid_request", &rejection.body_text())),
    }
}

fn quota_error(err: QuotaError) -> ApiError {
    match err {
        QuotaError::InvalidEmail(_) => bad_request("invalid_email", &err.to_string()),
        QuotaError::InvalidQuotaValue(_) => bad_request("invalid_quota_value", &err.to_string()),
        QuotaError::QuotaNotFound(_) => not_found("quota_not_found", &err.to_string()),
        QuotaError::QuotaExists(_) => conflict("quota_exists", &err.to_string()),
        QuotaError::StorageError(_) => internal_error(err),
    }
}

fn error_response(status: StatusCode, code: &str, message: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
            code: code.to_string(),
            details: None,
        }),
    )
}

fn bad_request(code: &str, message: &str) -> ApiError {
    error_response(StatusCode::BAD_REQUEST, code, message)
}

fn not_found(code: &str, message: &str) -> ApiError {
    error_response(StatusCode::NOT_FOUND, code, message)
}

fn conflict(code: &str, message: &str) -> ApiError {
    error_response(StatusCode::CONFLICT, code, message)
}

fn internal_error<E: std::fmt::Display>(err: E) -> ApiError {
    error!(error = %err, "friending quota API internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "internal server error".to_string(),
            code: "internal_error".to_string(),
            details: Some(serde_json::json!({ "message": err.to_string() })),
        }),
    )
}
