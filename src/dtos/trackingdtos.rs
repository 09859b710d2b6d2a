// dtos/trackingdtos.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::trackingmodels::ConversionType;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RecordClickDto {
    #[validate(length(min = 1, max = 32, message = "Referral code is required"))]
    pub code: String,

    #[validate(length(max = 2048, message = "Referrer is too long"))]
    pub referrer: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClickResponseDto {
    pub attribution_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RecordConversionDto {
    pub attribution_token: Option<String>,

    pub converting_user_id: Option<Uuid>,

    #[validate(range(min = 0.0, message = "Amount cannot be negative"))]
    pub amount: f64,

    pub conversion_type: ConversionType,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversionResponseDto {
    pub success: bool,
    pub conversion_id: Option<Uuid>,
}
