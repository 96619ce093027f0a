pub mod auth;
pub mod campaigns;
pub mod crm;
pub mod reports;
pub mod tracking;
