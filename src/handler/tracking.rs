// handler/tracking.rs
use std::sync::Arc;

use axum::{
    http::{header, HeaderMap},
    response::IntoResponse,
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use validator::Validate;

use crate::{
    dtos::{affiliatedtos::ApiResponse, trackingdtos::*},
    error::HttpError,
    service::error::ServiceError,
    utils::currency::amount_to_cents,
    AppState,
};

pub const ATTRIBUTION_COOKIE: &str = "aff_token";

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
}

/// Record a referral visit and hand the attribution token back, both in the
/// body and as a 30-day cookie.
///
/// This endpoint is fired on page load, so an unknown code must never break
/// the visited page: it soft-fails with 200 and a null token.
pub async fn record_click(
    Extension(app_state): Extension<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(body): Json<RecordClickDto>,
) -> Result<(CookieJar, Json<ApiResponse<ClickResponseDto>>), HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let user_agent = header_str(&headers, header::USER_AGENT);
    let visitor_ip = client_ip(&headers);

    match app_state
        .clicks
        .record_click(
            &body.code,
            body.referrer.as_deref(),
            user_agent.as_deref(),
            visitor_ip.as_deref(),
        )
        .await
    {
        Ok(token) => {
            let cookie = Cookie::build((ATTRIBUTION_COOKIE, token.clone()))
                .path("/")
                .max_age(time::Duration::days(
                    app_state.env.attribution_window_days as i64,
                ))
                .same_site(SameSite::Lax)
                .http_only(true)
                .build();

            Ok((
                jar.add(cookie),
                Json(ApiResponse::success(
                    "Click recorded",
                    ClickResponseDto {
                        attribution_token: Some(token),
                    },
                )),
            ))
        }
        Err(ServiceError::NotFound(_)) => {
            tracing::debug!("Click with unknown referral code, soft-failing");
            Ok((
                jar,
                Json(ApiResponse::success(
                    "No attribution",
                    ClickResponseDto {
                        attribution_token: None,
                    },
                )),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

/// Record a qualifying business event against an attribution token. The
/// token comes from the request body or, failing that, from the visitor's
/// attribution cookie. Missing or stale attribution is a successful no-op.
pub async fn record_conversion(
    Extension(app_state): Extension<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<RecordConversionDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let token = body
        .attribution_token
        .clone()
        .or_else(|| jar.get(ATTRIBUTION_COOKIE).map(|c| c.value().to_string()));

    let outcome = app_state
        .conversions
        .record_conversion(
            token.as_deref(),
            body.converting_user_id,
            amount_to_cents(body.amount),
            body.conversion_type,
        )
        .await?;

    Ok(Json(ApiResponse::success(
        "Conversion processed",
        ConversionResponseDto {
            success: true,
            conversion_id: outcome.conversion_id(),
        },
    )))
}
