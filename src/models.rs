pub mod auth;
pub mod campaign;
pub mod crm;
