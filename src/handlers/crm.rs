// src/handlers/crm.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::TenantContext, i18n::Locale},
    models::crm::{CrmModule, Customer, FieldDefinition, FieldType, Lead, Opportunity},
};

// =============================================================================
//  ÁREA 1: REGISTRO DE CAMPOS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFieldPayload {
    pub module: CrmModule,

    #[validate(length(min = 1, message = "key_name_required"))]
    #[schema(example = "tamanho_camiseta")]
    pub key_name: String,

    #[validate(length(min = 1, message = "label_required"))]
    #[schema(example = "Tamanho da Camiseta")]
    pub label: String,

    #[schema(example = "SELECT")]
    pub field_type: FieldType,

    #[schema(example = json!(["P", "M", "G"]))]
    pub options: Option<Value>,

    #[serde(default)]
    pub is_required: bool,

    #[serde(default)]
    pub display_order: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFieldPayload {
    pub label: Option<String>,
    pub field_type: Option<FieldType>,
    pub options: Option<Value>,
    pub is_required: Option<bool>,
    pub display_order: Option<i32>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListFieldsQuery {
    pub module: CrmModule,
}

// POST /api/crm/fields
#[utoipa::path(
    post,
    path = "/api/crm/fields",
    tag = "CRM",
    request_body = CreateFieldPayload,
    responses(
        (status = 201, description = "Campo customizado criado", body = FieldDefinition),
        (status = 409, description = "Chave já existe neste módulo")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_field_definition(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Json(payload): Json<CreateFieldPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let field = app_state
        .crm_service
        .define_field(
            &app_state.db_pool,
            tenant.company_id,
            payload.module,
            &payload.key_name,
            &payload.label,
            payload.field_type,
            payload.options,
            payload.is_required,
            payload.display_order,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(field)))
}

// GET /api/crm/fields?module=LEAD
#[utoipa::path(
    get,
    path = "/api/crm/fields",
    tag = "CRM",
    params(ListFieldsQuery),
    responses((status = 200, description = "Campos ativos do módulo, na ordem do formulário", body = Vec<FieldDefinition>)),
    security(("api_jwt" = []))
)]
pub async fn list_field_definitions(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Query(query): Query<ListFieldsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let fields = app_state
        .crm_service
        .list_fields(&app_state.db_pool, tenant.company_id, query.module)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(fields)))
}

// PATCH /api/crm/fields/{id}
#[utoipa::path(
    patch,
    path = "/api/crm/fields/{id}",
    tag = "CRM",
    params(("id" = Uuid, Path, description = "ID da definição de campo")),
    request_body = UpdateFieldPayload,
    responses(
        (status = 200, description = "Campo atualizado", body = FieldDefinition),
        (status = 404, description = "Campo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_field_definition(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(field_id): Path<Uuid>,
    Json(payload): Json<UpdateFieldPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let field = app_state
        .crm_service
        .update_field(
            &app_state.db_pool,
            tenant.company_id,
            field_id,
            payload.label.as_deref(),
            payload.field_type,
            payload.options,
            payload.is_required,
            payload.display_order,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(field)))
}

// DELETE /api/crm/fields/{id}  (aposenta; nunca remove de verdade)
#[utoipa::path(
    delete,
    path = "/api/crm/fields/{id}",
    tag = "CRM",
    params(("id" = Uuid, Path, description = "ID da definição de campo")),
    responses(
        (status = 204, description = "Campo aposentado"),
        (status = 404, description = "Campo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn retire_field_definition(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(field_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .crm_service
        .retire_field(&app_state.db_pool, tenant.company_id, field_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  ÁREA 2: LEADS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadPayload {
    #[validate(length(min = 1, message = "name_too_short"))]
    #[schema(example = "João Pereira")]
    pub name: String,

    #[validate(email(message = "invalid_email"))]
    #[schema(example = "joao@cliente.com")]
    pub email: String,

    pub phone: Option<String>,
    #[schema(example = "landing-page")]
    pub source: Option<String>,

    #[serde(default)]
    #[schema(example = json!({"tamanho_camiseta": "P"}))]
    pub custom_data: Value,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLeadPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: Option<String>,
    pub custom_data: Option<Value>,
}

// POST /api/crm/leads
#[utoipa::path(
    post,
    path = "/api/crm/leads",
    tag = "CRM",
    request_body = CreateLeadPayload,
    responses(
        (status = 201, description = "Lead criado", body = Lead),
        (status = 409, description = "E-mail já cadastrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_lead(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Json(payload): Json<CreateLeadPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    // O bag nasce como objeto mesmo quando o caller não manda nada
    let custom_data = if payload.custom_data.is_null() {
        json!({})
    } else {
        payload.custom_data
    };

    let lead = app_state
        .crm_service
        .create_lead(
            &app_state.db_pool,
            &tenant,
            &payload.name,
            &payload.email,
            payload.phone.as_deref(),
            payload.source.as_deref(),
            custom_data,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(lead)))
}

// GET /api/crm/leads
#[utoipa::path(
    get,
    path = "/api/crm/leads",
    tag = "CRM",
    responses((status = 200, description = "Leads visíveis para o papel do caller", body = Vec<Lead>)),
    security(("api_jwt" = []))
)]
pub async fn list_leads(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let leads = app_state
        .crm_service
        .list_leads(&app_state.db_pool, &tenant)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(leads)))
}

// GET /api/crm/leads/{id}
#[utoipa::path(
    get,
    path = "/api/crm/leads/{id}",
    tag = "CRM",
    params(("id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 200, description = "Lead", body = Lead),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_lead(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(lead_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let lead = app_state
        .crm_service
        .get_lead(&app_state.db_pool, &tenant, lead_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(lead)))
}

// PATCH /api/crm/leads/{id}
#[utoipa::path(
    patch,
    path = "/api/crm/leads/{id}",
    tag = "CRM",
    params(("id" = Uuid, Path, description = "ID do lead")),
    request_body = UpdateLeadPayload,
    responses(
        (status = 200, description = "Lead atualizado", body = Lead),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_lead(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(lead_id): Path<Uuid>,
    Json(payload): Json<UpdateLeadPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let lead = app_state
        .crm_service
        .update_lead(
            &app_state.db_pool,
            &tenant,
            lead_id,
            payload.name.as_deref(),
            payload.email.as_deref(),
            payload.phone.as_deref(),
            payload.source.as_deref(),
            payload.custom_data,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(lead)))
}

// DELETE /api/crm/leads/{id}  (hard delete, por contrato)
#[utoipa::path(
    delete,
    path = "/api/crm/leads/{id}",
    tag = "CRM",
    params(("id" = Uuid, Path, description = "ID do lead")),
    responses(
        (status = 204, description = "Lead removido"),
        (status = 404, description = "Lead não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_lead(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(lead_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .crm_service
        .delete_lead(&app_state.db_pool, &tenant, lead_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  ÁREA 3: OPORTUNIDADES
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOpportunityPayload {
    #[validate(length(min = 1, message = "name_too_short"))]
    #[schema(example = "Renovação anual Acme")]
    pub name: String,

    pub lead_id: Option<Uuid>,

    #[serde(default = "default_stage")]
    #[schema(example = "OPEN")]
    pub stage: String,

    #[serde(default)]
    #[schema(example = "1500.00")]
    pub amount: Decimal,

    pub close_date: Option<NaiveDate>,

    #[serde(default)]
    pub custom_data: Value,
}

fn default_stage() -> String {
    "OPEN".to_string()
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOpportunityPayload {
    pub name: Option<String>,
    pub stage: Option<String>,
    pub amount: Option<Decimal>,
    pub close_date: Option<NaiveDate>,
    pub custom_data: Option<Value>,
}

// POST /api/crm/opportunities
#[utoipa::path(
    post,
    path = "/api/crm/opportunities",
    tag = "CRM",
    request_body = CreateOpportunityPayload,
    responses((status = 201, description = "Oportunidade criada", body = Opportunity)),
    security(("api_jwt" = []))
)]
pub async fn create_opportunity(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Json(payload): Json<CreateOpportunityPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let custom_data = if payload.custom_data.is_null() {
        json!({})
    } else {
        payload.custom_data
    };

    let opportunity = app_state
        .crm_service
        .create_opportunity(
            &app_state.db_pool,
            &tenant,
            payload.lead_id,
            &payload.name,
            &payload.stage,
            payload.amount,
            payload.close_date,
            custom_data,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(opportunity)))
}

// GET /api/crm/opportunities
#[utoipa::path(
    get,
    path = "/api/crm/opportunities",
    tag = "CRM",
    responses((status = 200, description = "Oportunidades visíveis para o papel do caller", body = Vec<Opportunity>)),
    security(("api_jwt" = []))
)]
pub async fn list_opportunities(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let opportunities = app_state
        .crm_service
        .list_opportunities(&app_state.db_pool, &tenant)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(opportunities)))
}

// PATCH /api/crm/opportunities/{id}
#[utoipa::path(
    patch,
    path = "/api/crm/opportunities/{id}",
    tag = "CRM",
    params(("id" = Uuid, Path, description = "ID da oportunidade")),
    request_body = UpdateOpportunityPayload,
    responses(
        (status = 200, description = "Oportunidade atualizada", body = Opportunity),
        (status = 404, description = "Oportunidade não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_opportunity(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(opportunity_id): Path<Uuid>,
    Json(payload): Json<UpdateOpportunityPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let opportunity = app_state
        .crm_service
        .update_opportunity(
            &app_state.db_pool,
            &tenant,
            opportunity_id,
            payload.name.as_deref(),
            payload.stage.as_deref(),
            payload.amount,
            payload.close_date,
            payload.custom_data,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(opportunity)))
}

// DELETE /api/crm/opportunities/{id}
#[utoipa::path(
    delete,
    path = "/api/crm/opportunities/{id}",
    tag = "CRM",
    params(("id" = Uuid, Path, description = "ID da oportunidade")),
    responses(
        (status = 204, description = "Oportunidade removida"),
        (status = 404, description = "Oportunidade não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_opportunity(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(opportunity_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .crm_service
        .delete_opportunity(&app_state.db_pool, &tenant, opportunity_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  ÁREA 4: CLIENTES
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerPayload {
    #[validate(length(min = 1, message = "name_too_short"))]
    #[schema(example = "Maria da Silva")]
    pub name: String,

    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,
    pub phone: Option<String>,

    #[serde(default)]
    pub custom_data: Value,
}

// POST /api/crm/customers
#[utoipa::path(
    post,
    path = "/api/crm/customers",
    tag = "CRM",
    request_body = CreateCustomerPayload,
    responses((status = 201, description = "Cliente criado", body = Customer)),
    security(("api_jwt" = []))
)]
pub async fn create_customer(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Json(payload): Json<CreateCustomerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let custom_data = if payload.custom_data.is_null() {
        json!({})
    } else {
        payload.custom_data
    };

    let customer = app_state
        .crm_service
        .create_customer(
            &app_state.db_pool,
            &tenant,
            &payload.name,
            payload.email.as_deref(),
            payload.phone.as_deref(),
            custom_data,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(customer)))
}

// GET /api/crm/customers
#[utoipa::path(
    get,
    path = "/api/crm/customers",
    tag = "CRM",
    responses((status = 200, description = "Clientes da empresa", body = Vec<Customer>)),
    security(("api_jwt" = []))
)]
pub async fn list_customers(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let customers = app_state
        .crm_service
        .list_customers(&app_state.db_pool, &tenant)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(customers)))
}
