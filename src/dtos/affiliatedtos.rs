// dtos/affiliatedtos.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::affiliatemodel::*;

// Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: &str) -> ApiResponse<()> {
        ApiResponse {
            status: "error".to_string(),
            message: message.to_string(),
            data: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ApplyAffiliateDto {
    #[validate(range(min = 0, max = 100, message = "Commission rate must be between 0 and 100"))]
    pub commission_rate: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateAffiliateStatusDto {
    pub status: AffiliateStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AffiliateResponseDto {
    pub id: Uuid,
    pub commission_rate: i32,
    pub balance: f64,
    pub status: AffiliateStatus,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateLinkDto {
    #[validate(length(min = 1, max = 100, message = "Link name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(url(message = "Target URL must be a valid URL"))]
    pub target_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkResponseDto {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub target_url: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardDto {
    pub balance: f64,
    pub commission_rate: i32,
    pub status: AffiliateStatus,
    pub total_clicks: i64,
    pub total_conversions: i64,
    pub total_commission: f64,
    pub links: Vec<LinkResponseDto>,
}

impl From<Affiliate> for AffiliateResponseDto {
    fn from(affiliate: Affiliate) -> Self {
        Self {
            id: affiliate.id,
            commission_rate: affiliate.commission_rate,
            balance: affiliate.balance(),
            status: affiliate.status,
            created_at: affiliate.created_at,
        }
    }
}

impl From<AffiliateLink> for LinkResponseDto {
    fn from(link: AffiliateLink) -> Self {
        Self {
            id: link.id,
            code: link.code,
            name: link.name,
            target_url: link.target_url,
            created_at: link.created_at,
        }
    }
}
