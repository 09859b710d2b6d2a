pub mod affiliatemodel;
pub mod trackingmodels;
