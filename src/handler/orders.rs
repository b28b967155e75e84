// handler/orders.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::{
    db::orderdb::OrderExt,
    dtos::{
        common::{ApiResponse, PageQueryDto},
        orderdtos::*,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    AppState,
};

pub fn orders_handler() -> Router {
    Router::new()
        .route("/", get(list_orders))
        .route("/:order_id", get(get_order))
        .route("/:order_id/payment-intent", post(create_payment_intent))
        .route("/:order_id/deliver", post(deliver_order))
        .route("/:order_id/complete", post(complete_order))
}

pub async fn list_orders(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(page): Query<PageQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let orders = app_state
        .db_client
        .list_orders_for_user(auth.user.id, page.limit(), page.offset())
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let response: Vec<OrderResponseDto> = orders.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success("Orders retrieved successfully", response)))
}

pub async fn get_order(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let order = app_state
        .db_client
        .get_order(order_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Order not found"))?;

    if order.employer_id != auth.user.id && order.freelancer_id != auth.user.id {
        return Err(HttpError::forbidden("You are not a party to this order"));
    }

    let response: OrderResponseDto = order.into();
    Ok(Json(ApiResponse::success("Order retrieved successfully", response)))
}

/// Create (or re-fetch) the escrow payment intent for an order. The
/// employer's client confirms the intent; funds are then authorized and
/// held until completion captures them.
pub async fn create_payment_intent(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let order = app_state
        .db_client
        .get_order(order_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Order not found"))?;

    let handle = app_state
        .escrow_service
        .create_escrow_intent(&order, auth.user.id)
        .await
        .map_err(HttpError::from)?;

    let response = PaymentIntentResponseDto {
        intent_id: handle.intent_id,
        client_secret: handle.client_secret,
    };
    Ok(Json(ApiResponse::success("Payment intent ready", response)))
}

pub async fn deliver_order(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let order = app_state
        .order_service
        .deliver_order(order_id, auth.user.id)
        .await
        .map_err(HttpError::from)?;

    let response: OrderResponseDto = order.into();
    Ok(Json(ApiResponse::success("Order delivered", response)))
}

/// Employer confirms completion: captures the escrowed funds (at most
/// once) and queues the freelancer's net for delayed release.
pub async fn complete_order(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let order = app_state
        .order_service
        .complete_order(order_id, auth.user.id)
        .await
        .map_err(HttpError::from)?;

    let response: OrderResponseDto = order.into();
    Ok(Json(ApiResponse::success("Order completed", response)))
}
