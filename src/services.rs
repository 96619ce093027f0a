pub mod auth;
pub mod campaign_service;
pub mod crm_service;
pub mod report_service;
