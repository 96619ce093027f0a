// src/handlers/reports.rs

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{auth::TenantContext, i18n::Locale},
    models::campaign::TrackingEvent,
    services::report_service::{self, CampaignSummary, LocationCount},
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    /// Quantas localizações entram no ranking (padrão: 5)
    pub top: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CampaignReport {
    pub summary: CampaignSummary,
    pub top_locations: Vec<LocationCount>,
    pub events: Vec<TrackingEvent>,
}

// GET /api/campaigns/{id}/report
#[utoipa::path(
    get,
    path = "/api/campaigns/{id}/report",
    tag = "Relatórios",
    params(
        ("id" = Uuid, Path, description = "ID da campanha"),
        ReportQuery
    ),
    responses(
        (status = 200, description = "Resumo de entrega da campanha", body = CampaignReport),
        (status = 404, description = "Campanha não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_campaign_report(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(campaign_id): Path<Uuid>,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let events = app_state
        .campaign_service
        .list_tracking(&tenant, campaign_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    let report = CampaignReport {
        summary: report_service::summarize(&events),
        top_locations: report_service::top_locations(&events, query.top.unwrap_or(5)),
        events,
    };

    Ok((StatusCode::OK, Json(report)))
}

// GET /api/campaigns/{id}/report.csv
#[utoipa::path(
    get,
    path = "/api/campaigns/{id}/report.csv",
    tag = "Relatórios",
    params(("id" = Uuid, Path, description = "ID da campanha")),
    responses(
        (status = 200, description = "Eventos em CSV para download", content_type = "text/csv"),
        (status = 404, description = "Campanha não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_campaign_report_csv(
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

    let csv = report_service::to_csv(&events);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"campaign_report.csv\"",
            ),
        ],
        csv,
    ))
}
