pub mod background_jobs;
pub mod click_service;
pub mod conversion_service;
pub mod error;
pub mod ingest;
pub mod link_service;
