// src/handlers/campaigns.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::TenantContext, i18n::Locale},
    models::campaign::{Campaign, CampaignChannel, RecipientSource},
    services::campaign_service::AudienceInput,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignPayload {
    #[validate(length(min = 1, message = "campaign_name_required"))]
    #[schema(example = "Black Friday 2026")]
    pub campaign_name: String,

    pub channel: CampaignChannel,

    #[validate(length(min = 1, message = "sender_required"))]
    #[schema(example = "marketing@acme.com")]
    pub sender: String,

    #[validate(length(min = 1, message = "content_required"))]
    pub content: String,

    #[schema(example = "Só hoje: 50% off")]
    pub email_subject: Option<String>,

    #[serde(default)]
    pub attachments: Vec<String>,

    pub recipient_source: RecipientSource,

    // Entrada bruta conforme a origem; o serviço resolve e congela
    #[schema(example = json!(["A@x.com", "b@y.com"]))]
    pub recipient_excel_emails: Option<Vec<String>>,
    #[schema(example = "chefe@acme.com, socio@acme.com")]
    pub recipient_manual: Option<String>,

    pub scheduled_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCampaignPayload {
    pub campaign_name: Option<String>,
    pub sender: Option<String>,
    pub content: Option<String>,
    pub email_subject: Option<String>,
    pub attachments: Option<Vec<String>>,
    pub scheduled_time: Option<DateTime<Utc>>,

    // Qualquer um presente = o caller quer trocar a audiência (só vale antes
    // do envio). A origem decide qual entrada bruta é interpretada.
    pub recipient_source: Option<RecipientSource>,
    pub recipient_excel_emails: Option<Vec<String>>,
    pub recipient_manual: Option<String>,
}

impl UpdateCampaignPayload {
    /// Monta a troca de audiência quando o PATCH toca em qualquer campo dela.
    /// Entrada bruta sem a origem é ambígua: rejeitamos em vez de descartar.
    fn audience_patch(&self) -> Result<Option<AudienceInput>, AppError> {
        let touches_raw = self.recipient_excel_emails.is_some() || self.recipient_manual.is_some();

        match self.recipient_source {
            Some(source) => Ok(Some(AudienceInput {
                source,
                excel_raw: self.recipient_excel_emails.clone(),
                manual: self.recipient_manual.clone(),
            })),
            None if touches_raw => Err(AppError::InvalidInput("audience_source_required")),
            None => Ok(None),
        }
    }
}

// POST /api/campaigns
#[utoipa::path(
    post,
    path = "/api/campaigns",
    tag = "Campanhas",
    request_body = CreateCampaignPayload,
    responses(
        (status = 201, description = "Campanha criada com audiência congelada", body = Campaign),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_campaign(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Json(payload): Json<CreateCampaignPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let audience = AudienceInput {
        source: payload.recipient_source,
        excel_raw: payload.recipient_excel_emails,
        manual: payload.recipient_manual,
    };

    let campaign = app_state
        .campaign_service
        .create_campaign(
            &tenant,
            &payload.campaign_name,
            payload.channel,
            &payload.sender,
            &payload.content,
            payload.email_subject.as_deref(),
            payload.attachments,
            audience,
            payload.scheduled_time,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(campaign)))
}

// GET /api/campaigns
#[utoipa::path(
    get,
    path = "/api/campaigns",
    tag = "Campanhas",
    responses((status = 200, description = "Campanhas da empresa", body = Vec<Campaign>)),
    security(("api_jwt" = []))
)]
pub async fn list_campaigns(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let campaigns = app_state
        .campaign_service
        .list_campaigns(&tenant)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(campaigns)))
}

// GET /api/campaigns/{id}
#[utoipa::path(
    get,
    path = "/api/campaigns/{id}",
    tag = "Campanhas",
    params(("id" = Uuid, Path, description = "ID da campanha")),
    responses(
        (status = 200, description = "Campanha", body = Campaign),
        (status = 404, description = "Campanha não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_campaign(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(campaign_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let campaign = app_state
        .campaign_service
        .get_campaign(&tenant, campaign_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(campaign)))
}

// PATCH /api/campaigns/{id}
#[utoipa::path(
    patch,
    path = "/api/campaigns/{id}",
    tag = "Campanhas",
    params(("id" = Uuid, Path, description = "ID da campanha")),
    request_body = UpdateCampaignPayload,
    responses(
        (status = 200, description = "Campanha atualizada", body = Campaign),
        (status = 404, description = "Campanha não encontrada"),
        (status = 422, description = "Estado não permite a edição")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_campaign(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(campaign_id): Path<Uuid>,
    Json(payload): Json<UpdateCampaignPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let audience = payload
        .audience_patch()
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    let campaign = app_state
        .campaign_service
        .update_campaign(
            &tenant,
            campaign_id,
            payload.campaign_name.as_deref(),
            payload.sender.as_deref(),
            payload.content.as_deref(),
            payload.email_subject.as_deref(),
            payload.attachments.as_deref(),
            payload.scheduled_time,
            audience,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(campaign)))
}

// POST /api/campaigns/{id}/send
#[utoipa::path(
    post,
    path = "/api/campaigns/{id}/send",
    tag = "Campanhas",
    params(("id" = Uuid, Path, description = "ID da campanha")),
    responses(
        (status = 200, description = "Envio disparado; status final no corpo", body = Campaign),
        (status = 422, description = "Campanha não está em DRAFT/SCHEDULED")
    ),
    security(("api_jwt" = []))
)]
pub async fn send_campaign(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(campaign_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let campaign = app_state
        .campaign_service
        .send_now(&tenant, campaign_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(campaign)))
}

// DELETE /api/campaigns/{id}
#[utoipa::path(
    delete,
    path = "/api/campaigns/{id}",
    tag = "Campanhas",
    params(("id" = Uuid, Path, description = "ID da campanha")),
    responses(
        (status = 204, description = "Campanha removida (irreversível)"),
        (status = 404, description = "Campanha não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_campaign(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(campaign_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .campaign_service
        .delete_campaign(&tenant, campaign_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch_vazio() -> UpdateCampaignPayload {
        UpdateCampaignPayload {
            campaign_name: None,
            sender: None,
            content: None,
            email_subject: None,
            attachments: None,
            scheduled_time: None,
            recipient_source: None,
            recipient_excel_emails: None,
            recipient_manual: None,
        }
    }

    #[test]
    fn patch_sem_audiencia_nao_monta_troca() {
        let patch = patch_vazio();
        assert!(patch.audience_patch().unwrap().is_none());
    }

    #[test]
    fn origem_presente_monta_a_troca_com_a_entrada_bruta() {
        let mut patch = patch_vazio();
        patch.recipient_source = Some(RecipientSource::Excel);
        patch.recipient_excel_emails = Some(vec!["a@x.com".to_string()]);

        let audience = patch.audience_patch().unwrap().unwrap();
        assert_eq!(audience.source, RecipientSource::Excel);
        assert_eq!(audience.excel_raw, Some(vec!["a@x.com".to_string()]));
    }

    #[test]
    fn entrada_bruta_sem_origem_e_rejeitada_nunca_descartada() {
        let mut excel = patch_vazio();
        excel.recipient_excel_emails = Some(vec!["a@x.com".to_string()]);
        assert!(matches!(
            excel.audience_patch(),
            Err(AppError::InvalidInput("audience_source_required"))
        ));

        let mut manual = patch_vazio();
        manual.recipient_manual = Some("chefe@acme.com".to_string());
        assert!(matches!(
            manual.audience_patch(),
            Err(AppError::InvalidInput("audience_source_required"))
        ));
    }
}
