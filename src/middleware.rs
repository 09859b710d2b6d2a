// middleware.rs
use axum::{extract::Request, middleware::Next, response::IntoResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ErrorMessage, HttpError};

/// Opaque caller identity, threaded explicitly into every handler that needs
/// it. Authentication itself happens upstream (API gateway); this service
/// only consumes the resolved identity and never infers it from ambient
/// state.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CallerIdentity {
    pub user_id: Uuid,
}

pub async fn caller_identity(
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let header = req
        .headers()
        .get("x-caller-id")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::CallerNotProvided.to_string()))?;

    let user_id = Uuid::parse_str(header)
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidCallerId.to_string()))?;

    req.extensions_mut().insert(CallerIdentity { user_id });

    Ok(next.run(req).await)
}
