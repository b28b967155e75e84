// handler/payouts.rs
use std::sync::Arc;

use axum::{
    extract::Query,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use validator::Validate;

use crate::{
    dtos::{
        common::{ApiResponse, PageQueryDto},
        payoutdtos::*,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    models::usermodel::UserRole,
    utils::currency::usd_to_cents,
    AppState,
};

pub fn payouts_handler() -> Router {
    Router::new()
        .route("/", get(list_payouts))
        .route("/balance", get(get_balance))
}

pub fn plans_handler() -> Router {
    Router::new().route("/", get(list_plans).post(upsert_plan))
}

pub async fn list_payouts(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(page): Query<PageQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    if auth.user.role != UserRole::Freelancer {
        return Err(HttpError::forbidden("Only freelancers have payouts"));
    }

    let payouts = app_state
        .payout_service
        .list_for_freelancer(auth.user.id, page.limit(), page.offset())
        .await
        .map_err(HttpError::from)?;

    let response: Vec<PayoutResponseDto> = payouts.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success("Payouts retrieved successfully", response)))
}

pub async fn get_balance(
    Extension(_app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
) -> Result<impl IntoResponse, HttpError> {
    let response = BalanceResponseDto::from(&auth.user);
    Ok(Json(ApiResponse::success("Balance retrieved successfully", response)))
}

pub async fn list_plans(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpError> {
    let plans = app_state
        .subscription_service
        .list_plans()
        .await
        .map_err(HttpError::from)?;

    let response: Vec<PlanResponseDto> = plans.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success("Plans retrieved successfully", response)))
}

pub async fn upsert_plan(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<UpsertPlanDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    if auth.user.role != UserRole::Admin {
        return Err(HttpError::forbidden("Only platform operators manage plans"));
    }

    let plan = app_state
        .subscription_service
        .upsert_plan(
            &body.name,
            usd_to_cents(body.price),
            body.duration_days,
            body.is_active,
        )
        .await
        .map_err(HttpError::from)?;

    let response: PlanResponseDto = plan.into();
    Ok(Json(ApiResponse::success("Plan saved", response)))
}
