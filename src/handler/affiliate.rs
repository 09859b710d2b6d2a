// handler/affiliate.rs
use std::sync::Arc;

use axum::{extract::Path, response::IntoResponse, Extension, Json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{affiliatedb::AffiliateStore, trackingdb::TrackingStore},
    dtos::affiliatedtos::*,
    error::{ErrorMessage, HttpError},
    middleware::CallerIdentity,
    utils::currency::cents_to_amount,
    AppState,
};

const DEFAULT_COMMISSION_RATE: i32 = 20;

/// Apply to the affiliate program. The account starts in `pending` until
/// approved via the status endpoint.
pub async fn apply_affiliate(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Json(body): Json<ApplyAffiliateDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let existing = app_state
        .db_client
        .get_affiliate_by_user(caller.user_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    if existing.is_some() {
        return Err(HttpError::conflict(ErrorMessage::AffiliateExists.to_string()));
    }

    let rate = body.commission_rate.unwrap_or(DEFAULT_COMMISSION_RATE);
    let affiliate = app_state
        .db_client
        .create_affiliate(caller.user_id, rate)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let response: AffiliateResponseDto = affiliate.into();
    Ok(Json(ApiResponse::success(
        "Affiliate application received",
        response,
    )))
}

/// Approve or suspend an affiliate. Suspension stops commission accrual but
/// never deletes the account or its history.
pub async fn update_affiliate_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Path(affiliate_id): Path<Uuid>,
    Json(body): Json<UpdateAffiliateStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    let affiliate = app_state
        .db_client
        .update_affiliate_status(affiliate_id, body.status)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                HttpError::not_found(ErrorMessage::AffiliateNotFound.to_string())
            }
            e => HttpError::server_error(e.to_string()),
        })?;

    tracing::info!(
        "Affiliate {} status set to {:?} by {}",
        affiliate.id,
        affiliate.status,
        caller.user_id
    );

    let response: AffiliateResponseDto = affiliate.into();
    Ok(Json(ApiResponse::success("Affiliate status updated", response)))
}

pub async fn create_link(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    Json(body): Json<CreateLinkDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let affiliate = app_state
        .db_client
        .get_affiliate_by_user(caller.user_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::AffiliateNotFound.to_string()))?;

    let link = app_state
        .links
        .create_link(affiliate.id, &body.name, &body.target_url)
        .await?;

    let response: LinkResponseDto = link.into();
    Ok(Json(ApiResponse::success("Link created", response)))
}

pub async fn list_links(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<impl IntoResponse, HttpError> {
    let affiliate = app_state
        .db_client
        .get_affiliate_by_user(caller.user_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::AffiliateNotFound.to_string()))?;

    let links = app_state
        .db_client
        .list_links(affiliate.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let response: Vec<LinkResponseDto> = links.into_iter().map(Into::into).collect();
    Ok(Json(ApiResponse::success("Links retrieved", response)))
}

pub async fn get_dashboard(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<impl IntoResponse, HttpError> {
    let affiliate = app_state
        .db_client
        .get_affiliate_by_user(caller.user_id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?
        .ok_or_else(|| HttpError::not_found(ErrorMessage::AffiliateNotFound.to_string()))?;

    let stats = app_state
        .db_client
        .affiliate_traffic_stats(affiliate.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let links = app_state
        .db_client
        .list_links(affiliate.id)
        .await
        .map_err(|e| HttpError::server_error(e.to_string()))?;

    let response = DashboardDto {
        balance: affiliate.balance(),
        commission_rate: affiliate.commission_rate,
        status: affiliate.status,
        total_clicks: stats.total_clicks,
        total_conversions: stats.total_conversions,
        total_commission: cents_to_amount(stats.total_commission_cents),
        links: links.into_iter().map(Into::into).collect(),
    };

    Ok(Json(ApiResponse::success("Dashboard retrieved", response)))
}
