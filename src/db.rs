pub mod user_repo;
pub use user_repo::UserRepository;
pub mod crm_repo;
pub use crm_repo::CrmRepository;
pub mod campaign_repo;
pub use campaign_repo::CampaignRepository;
