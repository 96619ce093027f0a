// src/handlers/tracking.rs
//
// Callbacks públicos do colaborador de entrega. Não passam pelo tenant_guard:
// quem chama aqui é o pixel de abertura / redirecionador de clique, sem JWT.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::TenantContext, i18n::Locale},
    models::campaign::{DeliveryEventKind, DeliveryEventMeta, TrackingEvent},
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct TrackQuery {
    /// Destinatário que gerou o evento
    pub to: String,
    pub ip: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub user_agent: Option<String>,
}

impl TrackQuery {
    fn into_meta(self) -> (String, DeliveryEventMeta) {
        let meta = DeliveryEventMeta {
            ip: self.ip,
            city: self.city,
            region: self.region,
            country: self.country,
            user_agent: self.user_agent,
        };
        (self.to, meta)
    }
}

// GET /api/track/{campaign_id}/open
#[utoipa::path(
    get,
    path = "/api/track/{campaign_id}/open",
    tag = "Tracking",
    params(
        ("campaign_id" = Uuid, Path, description = "ID da campanha rastreada"),
        TrackQuery
    ),
    responses(
        (status = 200, description = "Abertura registrada (contador incrementado)"),
        (status = 404, description = "Destinatário fora do snapshot da campanha")
    )
)]
pub async fn track_open(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(campaign_id): Path<Uuid>,
    Query(query): Query<TrackQuery>,
) -> Result<impl IntoResponse, ApiError> {
    record(&app_state, &locale, campaign_id, DeliveryEventKind::Open, query).await
}

// GET /api/track/{campaign_id}/click
#[utoipa::path(
    get,
    path = "/api/track/{campaign_id}/click",
    tag = "Tracking",
    params(
        ("campaign_id" = Uuid, Path, description = "ID da campanha rastreada"),
        TrackQuery
    ),
    responses(
        (status = 200, description = "Clique registrado"),
        (status = 404, description = "Destinatário fora do snapshot da campanha")
    )
)]
pub async fn track_click(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(campaign_id): Path<Uuid>,
    Query(query): Query<TrackQuery>,
) -> Result<impl IntoResponse, ApiError> {
    record(&app_state, &locale, campaign_id, DeliveryEventKind::Click, query).await
}

// GET /api/track/{campaign_id}/attachment
#[utoipa::path(
    get,
    path = "/api/track/{campaign_id}/attachment",
    tag = "Tracking",
    params(
        ("campaign_id" = Uuid, Path, description = "ID da campanha rastreada"),
        TrackQuery
    ),
    responses(
        (status = 200, description = "Abertura de anexo registrada"),
        (status = 404, description = "Destinatário fora do snapshot da campanha")
    )
)]
pub async fn track_attachment(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(campaign_id): Path<Uuid>,
    Query(query): Query<TrackQuery>,
) -> Result<impl IntoResponse, ApiError> {
    record(&app_state, &locale, campaign_id, DeliveryEventKind::Attachment, query).await
}

async fn record(
    app_state: &AppState,
    locale: &Locale,
    campaign_id: Uuid,
    kind: DeliveryEventKind,
    query: TrackQuery,
) -> Result<(StatusCode, Json<TrackingEvent>), ApiError> {
    let (to, meta) = query.into_meta();

    let event = app_state
        .campaign_service
        .record_delivery_event(campaign_id, &to, kind, meta)
        .await
        .map_err(|app_err| app_err.to_api_error(locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(event)))
}

// GET /api/campaigns/{id}/tracking
#[utoipa::path(
    get,
    path = "/api/campaigns/{id}/tracking",
    tag = "Tracking",
    params(
        ("id" = Uuid, Path, description = "ID da campanha")
    ),
    responses(
        (status = 200, description = "Eventos de entrega da campanha", body = Vec<TrackingEvent>),
        (status = 404, description = "Campanha não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_campaign_tracking(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(campaign_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let events = app_state
        .campaign_service
        .list_tracking(&tenant, campaign_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(events)))
}
