// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::get_me,

        // --- Usuários ---
        handlers::auth::create_user,
        handlers::auth::list_users,

        // --- CRM: Campos Personalizados ---
        handlers::crm::create_field_definition,
        handlers::crm::list_field_definitions,
        handlers::crm::update_field_definition,
        handlers::crm::retire_field_definition,

        // --- CRM: Leads ---
        handlers::crm::create_lead,
        handlers::crm::list_leads,
        handlers::crm::get_lead,
        handlers::crm::update_lead,
        handlers::crm::delete_lead,

        // --- CRM: Oportunidades ---
        handlers::crm::create_opportunity,
        handlers::crm::list_opportunities,
        handlers::crm::update_opportunity,
        handlers::crm::delete_opportunity,

        // --- CRM: Clientes ---
        handlers::crm::create_customer,
        handlers::crm::list_customers,

        // --- Campanhas ---
        handlers::campaigns::create_campaign,
        handlers::campaigns::list_campaigns,
        handlers::campaigns::get_campaign,
        handlers::campaigns::update_campaign,
        handlers::campaigns::send_campaign,
        handlers::campaigns::delete_campaign,

        // --- Relatórios ---
        handlers::reports::get_campaign_report,
        handlers::reports::get_campaign_report_csv,

        // --- Tracking ---
        handlers::tracking::track_open,
        handlers::tracking::track_click,
        handlers::tracking::track_attachment,
        handlers::tracking::list_campaign_tracking,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::UserRole,
            models::auth::Company,
            models::auth::CompanyUser,
            models::auth::RegisterPayload,
            models::auth::LoginPayload,
            models::auth::CreateUserPayload,
            models::auth::AuthResponse,

            // --- CRM ---
            models::crm::CrmModule,
            models::crm::FieldType,
            models::crm::FieldDefinition,
            models::crm::Lead,
            models::crm::Opportunity,
            models::crm::Customer,
            handlers::crm::CreateFieldPayload,
            handlers::crm::UpdateFieldPayload,
            handlers::crm::CreateLeadPayload,
            handlers::crm::UpdateLeadPayload,
            handlers::crm::CreateOpportunityPayload,
            handlers::crm::UpdateOpportunityPayload,
            handlers::crm::CreateCustomerPayload,

            // --- Campanhas ---
            models::campaign::CampaignChannel,
            models::campaign::RecipientSource,
            models::campaign::CampaignStatus,
            models::campaign::Campaign,
            models::campaign::TrackingEvent,
            models::campaign::DeliveryEventKind,
            models::campaign::DeliveryEventMeta,
            handlers::campaigns::CreateCampaignPayload,
            handlers::campaigns::UpdateCampaignPayload,

            // --- Relatórios ---
            services::report_service::CampaignSummary,
            services::report_service::LocationCount,
            handlers::reports::CampaignReport,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação e Registro"),
        (name = "Users", description = "Gestão de Usuários da Empresa"),
        (name = "CRM", description = "Campos Personalizados, Leads, Oportunidades e Clientes"),
        (name = "Campanhas", description = "Criação, Edição e Disparo de Campanhas"),
        (name = "Relatórios", description = "Resumos de Entrega e Exportação CSV"),
        (name = "Tracking", description = "Callbacks Públicos de Abertura e Clique")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
