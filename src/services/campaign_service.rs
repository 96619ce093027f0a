// src/services/campaign_service.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::{
    common::error::AppError,
    db::{CampaignRepository, CrmRepository},
    middleware::auth::TenantContext,
    models::campaign::{
        Campaign, CampaignChannel, CampaignStatus, DeliveryEventKind, DeliveryEventMeta,
        RecipientSource, TrackingEvent,
    },
};

// =============================================================================
//  COLABORADOR DE ENTREGA (interface)
// =============================================================================

/// O transporte de verdade (SMTP, WhatsApp...) mora fora deste core.
/// Ele recebe a audiência resolvida + conteúdo e devolve sinais de
/// abertura/clique pelos callbacks de tracking.
#[async_trait]
pub trait DeliveryDispatcher: Send + Sync {
    async fn dispatch(&self, campaign: &Campaign, recipients: &[String]) -> anyhow::Result<()>;
}

/// Implementação padrão: só registra o envio no log. Serve para desenvolvimento
/// e para os testes; produção pluga o transporte real aqui.
pub struct TracingDispatcher;

#[async_trait]
impl DeliveryDispatcher for TracingDispatcher {
    async fn dispatch(&self, campaign: &Campaign, recipients: &[String]) -> anyhow::Result<()> {
        tracing::info!(
            "📨 Campanha '{}' ({:?}) despachada para {} destinatários",
            campaign.campaign_name,
            campaign.channel,
            recipients.len()
        );
        Ok(())
    }
}

// =============================================================================
//  ENTRADAS
// =============================================================================

/// A audiência como ela chega do caller; o serviço resolve e congela.
#[derive(Debug, Clone)]
pub struct AudienceInput {
    pub source: RecipientSource,
    pub excel_raw: Option<Vec<String>>,
    pub manual: Option<String>,
}

// =============================================================================
//  O MOTOR
// =============================================================================

#[derive(Clone)]
pub struct CampaignService {
    repo: CampaignRepository,
    crm_repo: CrmRepository,
    dispatcher: Arc<dyn DeliveryDispatcher>,
    pool: PgPool,
}

impl CampaignService {
    pub fn new(
        repo: CampaignRepository,
        crm_repo: CrmRepository,
        dispatcher: Arc<dyn DeliveryDispatcher>,
        pool: PgPool,
    ) -> Self {
        Self { repo, crm_repo, dispatcher, pool }
    }

    // -------------------------------------------------------------------------
    //  CRIAÇÃO
    // -------------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    pub async fn create_campaign(
        &self,
        tenant: &TenantContext,
        campaign_name: &str,
        channel: CampaignChannel,
        sender: &str,
        content: &str,
        email_subject: Option<&str>,
        attachments: Vec<String>,
        audience: AudienceInput,
        scheduled_time: Option<DateTime<Utc>>,
    ) -> Result<Campaign, AppError> {
        if channel == CampaignChannel::Email && email_subject.is_none() {
            return Err(AppError::InvalidInput("email_subject_required"));
        }

        // Agendamento no passado não agenda nada
        if let Some(when) = scheduled_time {
            if when <= Utc::now() {
                return Err(AppError::InvalidInput("scheduled_time_in_past"));
            }
        }

        // Resolve a origem em EXATAMENTE um snapshot concreto
        let (recipient_list, recipient_excel, recipient_manual) =
            self.resolve_audience(tenant.company_id, &audience).await?;

        // Com hora futura nasce agendada; sem hora, rascunho
        let status = if scheduled_time.is_some() {
            CampaignStatus::Scheduled
        } else {
            CampaignStatus::Draft
        };

        self.repo
            .create_campaign(
                &self.pool,
                tenant.company_id,
                tenant.user_id,
                campaign_name,
                channel,
                sender,
                content,
                email_subject,
                &attachments,
                audience.source,
                recipient_list.as_deref(),
                recipient_excel.as_deref(),
                recipient_manual.as_deref(),
                scheduled_time,
                status,
            )
            .await
    }

    /// Congela a audiência no momento da chamada. Mudanças futuras no CRM
    /// não alteram o que ficou gravado aqui.
    async fn resolve_audience(
        &self,
        company_id: Uuid,
        audience: &AudienceInput,
    ) -> Result<(Option<Vec<String>>, Option<Vec<String>>, Option<String>), AppError> {
        match audience.source {
            RecipientSource::Segment => {
                let emails = self.crm_repo.segment_emails(&self.pool, company_id).await?;
                Ok((Some(emails), None, None))
            }
            RecipientSource::Excel => {
                let raw = audience.excel_raw.clone().unwrap_or_default();
                Ok((None, Some(sanitize_excel_recipients(&raw)), None))
            }
            RecipientSource::Manual => {
                // Texto livre, guardado literalmente
                Ok((None, None, audience.manual.clone()))
            }
        }
    }

    // -------------------------------------------------------------------------
    //  CONSULTA
    // -------------------------------------------------------------------------

    pub async fn list_campaigns(&self, tenant: &TenantContext) -> Result<Vec<Campaign>, AppError> {
        self.repo.list_campaigns(&self.pool, tenant.company_id).await
    }

    pub async fn get_campaign(
        &self,
        tenant: &TenantContext,
        campaign_id: Uuid,
    ) -> Result<Campaign, AppError> {
        self.repo.find_campaign(&self.pool, tenant.company_id, campaign_id).await
    }

    // -------------------------------------------------------------------------
    //  EDIÇÃO
    // -------------------------------------------------------------------------

    /// Regras de imutabilidade (decisão registrada no DESIGN.md):
    /// - SENT/FAILED: nenhuma edição, de nenhum campo;
    /// - QUEUED/RUNNING: metadados ok, audiência congelada;
    /// - DRAFT/SCHEDULED: tudo editável, audiência re-resolvida.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_campaign(
        &self,
        tenant: &TenantContext,
        campaign_id: Uuid,
        campaign_name: Option<&str>,
        sender: Option<&str>,
        content: Option<&str>,
        email_subject: Option<&str>,
        attachments: Option<&[String]>,
        scheduled_time: Option<DateTime<Utc>>,
        audience: Option<AudienceInput>,
    ) -> Result<Campaign, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = self
            .repo
            .find_campaign(&mut *tx, tenant.company_id, campaign_id)
            .await?;

        if current.status.is_terminal() {
            return Err(AppError::InvalidState("campaign_terminal"));
        }

        if audience.is_some() && current.status.send_started() {
            return Err(AppError::InvalidState("audience_frozen"));
        }

        if let Some(when) = scheduled_time {
            if when <= Utc::now() {
                return Err(AppError::InvalidInput("scheduled_time_in_past"));
            }
        }

        let mut campaign = self
            .repo
            .update_campaign_meta(
                &mut *tx,
                tenant.company_id,
                campaign_id,
                campaign_name,
                sender,
                content,
                email_subject,
                attachments,
                scheduled_time,
            )
            .await?;

        if let Some(audience) = audience {
            let (list, excel, manual) =
                self.resolve_audience(tenant.company_id, &audience).await?;
            // O UPDATE é condicional no status: se um envio concorrente
            // enfileirou a campanha depois do find acima, zero linhas casam
            // e o snapshot permanece congelado.
            campaign = self
                .repo
                .update_audience(
                    &mut *tx,
                    tenant.company_id,
                    campaign_id,
                    audience.source,
                    list.as_deref(),
                    excel.as_deref(),
                    manual.as_deref(),
                )
                .await?
                .ok_or(AppError::InvalidState("audience_frozen"))?;
        }

        // Ganhou hora futura ainda em rascunho? Passa a agendada.
        if campaign.status == CampaignStatus::Draft && campaign.scheduled_time.is_some() {
            if let Some(updated) = self
                .repo
                .transition(
                    &mut *tx,
                    tenant.company_id,
                    campaign_id,
                    CampaignStatus::Draft,
                    CampaignStatus::Scheduled,
                )
                .await?
            {
                campaign = updated;
            }
        }

        tx.commit().await?;

        Ok(campaign)
    }

    pub async fn delete_campaign(
        &self,
        tenant: &TenantContext,
        campaign_id: Uuid,
    ) -> Result<(), AppError> {
        self.repo.delete_campaign(&self.pool, tenant.company_id, campaign_id).await
    }

    // -------------------------------------------------------------------------
    //  ENVIO
    // -------------------------------------------------------------------------

    /// DRAFT/SCHEDULED → QUEUED → RUNNING → SENT (ou FAILED).
    ///
    /// A entrada na fila é um update condicional: dois "enviar agora"
    /// simultâneos disputam a mesma linha e só um ganha; o perdedor
    /// recebe InvalidState, nunca um segundo disparo.
    pub async fn send_now(
        &self,
        tenant: &TenantContext,
        campaign_id: Uuid,
    ) -> Result<Campaign, AppError> {
        let queued = match self
            .repo
            .queue_for_send(&self.pool, tenant.company_id, campaign_id)
            .await?
        {
            Some(campaign) => campaign,
            None => {
                // Ou a campanha não existe, ou já saiu de DRAFT/SCHEDULED.
                // O find distingue os dois casos (NotFound vs InvalidState).
                let existing = self
                    .repo
                    .find_campaign(&self.pool, tenant.company_id, campaign_id)
                    .await?;
                tracing::warn!(
                    "Envio rejeitado: campanha {} está em {:?}",
                    existing.id,
                    existing.status
                );
                return Err(AppError::InvalidState("campaign_not_sendable"));
            }
        };

        let recipients = queued.recipients();
        if recipients.is_empty() {
            // Falha antes de qualquer tentativa: QUEUED → FAILED
            self.repo
                .transition(
                    &self.pool,
                    tenant.company_id,
                    campaign_id,
                    CampaignStatus::Queued,
                    CampaignStatus::Failed,
                )
                .await?;
            return Err(AppError::InvalidInput("audience_empty"));
        }

        // Um registro de tracking por destinatário, antes do disparo
        self.repo
            .create_tracking_rows(&self.pool, campaign_id, &recipients)
            .await?;

        let running = self
            .repo
            .transition(
                &self.pool,
                tenant.company_id,
                campaign_id,
                CampaignStatus::Queued,
                CampaignStatus::Running,
            )
            .await?
            .ok_or(AppError::InvalidState("campaign_not_sendable"))?;

        // Despacho de fato é do colaborador externo
        let outcome = self.dispatcher.dispatch(&running, &recipients).await;

        let (to, log) = match &outcome {
            Ok(()) => (CampaignStatus::Sent, "enviada"),
            Err(e) => {
                tracing::error!("Despacho da campanha {} falhou: {}", campaign_id, e);
                (CampaignStatus::Failed, "falhou")
            }
        };

        let finished = self
            .repo
            .transition(
                &self.pool,
                tenant.company_id,
                campaign_id,
                CampaignStatus::Running,
                to,
            )
            .await?
            .ok_or(AppError::InvalidState("campaign_not_sendable"))?;

        tracing::info!("Campanha {} {}", campaign_id, log);

        Ok(finished)
    }

    // -------------------------------------------------------------------------
    //  TRACKING (re-entrada do colaborador de entrega)
    // -------------------------------------------------------------------------

    /// Seguro sob callbacks duplicados/concorrentes: os incrementos são
    /// atômicos no banco e o timestamp só anda pra frente.
    pub async fn record_delivery_event(
        &self,
        campaign_id: Uuid,
        recipient: &str,
        kind: DeliveryEventKind,
        meta: DeliveryEventMeta,
    ) -> Result<TrackingEvent, AppError> {
        self.repo
            .record_delivery_event(
                &self.pool,
                campaign_id,
                recipient.trim(),
                kind,
                &meta,
                Utc::now(),
            )
            .await
    }

    pub async fn list_tracking(
        &self,
        tenant: &TenantContext,
        campaign_id: Uuid,
    ) -> Result<Vec<TrackingEvent>, AppError> {
        // Garante a posse antes de expor os eventos
        self.repo
            .find_campaign(&self.pool, tenant.company_id, campaign_id)
            .await?;
        self.repo.list_tracking(&self.pool, campaign_id).await
    }
}

// =============================================================================
//  SANITIZAÇÃO DE AUDIÊNCIA EXCEL
// =============================================================================

/// Apara, minusculiza, deduplica (primeira ocorrência vence) e descarta o que
/// não segue o padrão `local@dominio.tld`. Entradas inválidas caem em
/// silêncio, sem erro para o caller.
pub fn sanitize_excel_recipients(raw: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for entry in raw {
        let email = entry.trim().to_lowercase();
        if email.is_empty() || !email.validate_email() {
            continue;
        }
        // O validador aceita domínio sem TLD ("a@x"); planilha de audiência
        // precisa do padrão completo local@dominio.tld
        let has_tld = email
            .rsplit_once('@')
            .map(|(_, domain)| domain.contains('.'))
            .unwrap_or(false);
        if !has_tld {
            continue;
        }
        if seen.insert(email.clone()) {
            out.push(email);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::sanitize_excel_recipients;

    fn lista(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn apara_minusculiza_deduplica_e_descarta_invalidos() {
        let raw = lista(&["A@x.com", "a@x.com ", "not-an-email", "b@y.com"]);
        assert_eq!(sanitize_excel_recipients(&raw), vec!["a@x.com", "b@y.com"]);
    }

    #[test]
    fn primeira_ocorrencia_vence_na_deduplicacao() {
        let raw = lista(&["b@y.com", "A@X.COM", "a@x.com"]);
        assert_eq!(sanitize_excel_recipients(&raw), vec!["b@y.com", "a@x.com"]);
    }

    #[test]
    fn lista_vazia_ou_so_lixo_vira_vazia() {
        assert!(sanitize_excel_recipients(&[]).is_empty());
        let raw = lista(&["", "   ", "sem-arroba", "@sem-local.com"]);
        assert!(sanitize_excel_recipients(&raw).is_empty());
    }

    #[test]
    fn dominio_sem_tld_e_descartado() {
        let raw = lista(&["a@x", "b@y.com"]);
        assert_eq!(sanitize_excel_recipients(&raw), vec!["b@y.com"]);
    }
}
