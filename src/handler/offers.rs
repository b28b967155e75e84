// handler/offers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::offerdb::{NewMilestone, OfferExt},
    dtos::{
        common::{ApiResponse, PageQueryDto},
        offerdtos::*,
        orderdtos::OrderResponseDto,
    },
    error::HttpError,
    middleware::JWTAuthMiddeware,
    models::{offermodel::Receiver, usermodel::UserRole},
    utils::currency::usd_to_cents,
    AppState,
};

pub fn offers_handler() -> Router {
    Router::new()
        .route("/", post(create_offer).get(list_offers))
        .route("/:offer_id", get(get_offer))
        .route("/:offer_id/review", post(review_offer))
        .route("/:offer_id/reject", post(reject_offer))
        .route("/:offer_id/withdraw", post(withdraw_offer))
        .route("/:offer_id/accept", post(accept_offer))
}

pub async fn create_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateOfferDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let milestones = body
        .milestones
        .unwrap_or_default()
        .into_iter()
        .map(|m| NewMilestone {
            name: m.name,
            due_date: m.due_date,
            amount: usd_to_cents(m.amount),
        })
        .collect();

    let offer = app_state
        .order_service
        .create_offer(
            &auth.user,
            Receiver {
                kind: body.receiver_kind,
                id: body.receiver_id,
            },
            body.job_id,
            usd_to_cents(body.price),
            body.duration_days,
            milestones,
        )
        .await
        .map_err(HttpError::from)?;

    app_state
        .notification_service
        .notify_offer_received(offer.receiver_id, offer.id);

    let response: OfferResponseDto = offer.into();
    Ok(Json(ApiResponse::success("Offer created successfully", response)))
}

pub async fn list_offers(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Query(page): Query<PageQueryDto>,
) -> Result<impl IntoResponse, HttpError> {
    let offers = if auth.user.role == UserRole::Freelancer {
        app_state
            .db_client
            .list_offers_for_sender(auth.user.id, page.limit(), page.offset())
            .await
    } else {
        app_state
            .db_client
            .list_offers_for_receiver(auth.user.id, page.limit(), page.offset())
            .await
    }
    .map_err(|e| HttpError::server_error(e.to_string()))?;

    let response: Vec<OfferResponseDto> = offers.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success("Offers retrieved successfully", response)))
}

pub async fn get_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let offer = app_state
        .db_client
        .get_offer(offer_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found("Offer not found"))?;

    if offer.sender_id != auth.user.id && offer.receiver_id != auth.user.id {
        return Err(HttpError::forbidden("You are not a party to this offer"));
    }

    let response: OfferResponseDto = offer.into();
    Ok(Json(ApiResponse::success("Offer retrieved successfully", response)))
}

pub async fn review_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
    Json(body): Json<ReviewOfferDto>,
) -> Result<impl IntoResponse, HttpError> {
    let offer = app_state
        .order_service
        .review_offer(offer_id, auth.user.id, body.stage)
        .await
        .map_err(HttpError::from)?;

    let response: OfferResponseDto = offer.into();
    Ok(Json(ApiResponse::success("Offer review stage updated", response)))
}

pub async fn reject_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let offer = app_state
        .order_service
        .reject_offer(offer_id, auth.user.id)
        .await
        .map_err(HttpError::from)?;

    let response: OfferResponseDto = offer.into();
    Ok(Json(ApiResponse::success("Offer rejected", response)))
}

pub async fn withdraw_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let offer = app_state
        .order_service
        .withdraw_offer(offer_id, auth.user.id)
        .await
        .map_err(HttpError::from)?;

    let response: OfferResponseDto = offer.into();
    Ok(Json(ApiResponse::success("Offer withdrawn", response)))
}

/// Accepting an offer creates its order (payment_pending) atomically.
pub async fn accept_offer(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(offer_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let order = app_state
        .order_service
        .create_order(offer_id, auth.user.id)
        .await
        .map_err(HttpError::from)?;

    let response: OrderResponseDto = order.into();
    Ok(Json(ApiResponse::success("Offer accepted, order created", response)))
}
