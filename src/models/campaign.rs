// src/models/campaign.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- ENUMS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "campaign_channel", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum CampaignChannel {
    Email,
    Whatsapp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "recipient_source", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum RecipientSource {
    Segment,
    Excel,
    Manual,
}

// A máquina de estados da campanha.
// DRAFT → SCHEDULED → QUEUED → RUNNING → SENT
// Falha só a partir de QUEUED ou RUNNING; de SENT/FAILED não se sai mais.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "campaign_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Queued,
    Running,
    Sent,
    Failed,
}

impl CampaignStatus {
    /// O status só anda pra frente na cadeia; nunca regride.
    pub fn can_transition(self, to: CampaignStatus) -> bool {
        use CampaignStatus::*;
        matches!(
            (self, to),
            (Draft, Scheduled)
                | (Draft, Queued)
                | (Scheduled, Queued)
                | (Queued, Running)
                | (Queued, Failed)
                | (Running, Sent)
                | (Running, Failed)
        )
    }

    /// SENT e FAILED são terminais: nada mais muda nessa campanha.
    pub fn is_terminal(self) -> bool {
        matches!(self, CampaignStatus::Sent | CampaignStatus::Failed)
    }

    /// Um envio já começou? (A partir daqui o snapshot de audiência congela.)
    pub fn send_started(self) -> bool {
        !matches!(self, CampaignStatus::Draft | CampaignStatus::Scheduled)
    }
}

// --- CAMPANHA ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: Uuid,
    #[schema(ignore)]
    pub company_id: Uuid,
    pub created_by: Uuid,

    #[schema(example = "Black Friday 2026")]
    pub campaign_name: String,
    pub channel: CampaignChannel,
    #[schema(example = "marketing@acme.com")]
    pub sender: String,

    // HTML para e-mail, texto puro para WhatsApp
    pub content: String,
    pub email_subject: Option<String>,
    pub attachments: Vec<String>,

    pub recipient_source: RecipientSource,

    // O snapshot de audiência. Exatamente um preenchido, conforme a origem.
    // A lista reflete o momento da criação/edição: mudanças posteriores no
    // CRM não aparecem aqui.
    pub recipient_list: Option<Vec<String>>,
    pub recipient_excel_emails: Option<Vec<String>>,
    pub recipient_manual: Option<String>,

    pub scheduled_time: Option<DateTime<Utc>>,
    pub status: CampaignStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Os destinatários concretos do snapshot, seja qual for a origem.
    pub fn recipients(&self) -> Vec<String> {
        match self.recipient_source {
            RecipientSource::Segment => self.recipient_list.clone().unwrap_or_default(),
            RecipientSource::Excel => self.recipient_excel_emails.clone().unwrap_or_default(),
            RecipientSource::Manual => self
                .recipient_manual
                .as_deref()
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

// --- TRACKING (um registro por destinatário) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub id: Uuid,
    pub campaign_id: Uuid,

    #[serde(rename = "to")]
    #[schema(example = "joao@cliente.com")]
    pub recipient: String,

    // Nomes serializados fazem parte do contrato consumido pelos relatórios:
    // isOpened, openCount, attachmentOpened, linkClicked, lastOpenedAt.
    pub is_opened: bool,
    pub open_count: i32,
    pub attachment_opened: bool,
    pub link_clicked: bool,
    pub last_opened_at: Option<DateTime<Utc>>,

    pub ip: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub user_agent: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Tipo de sinal reportado pelo colaborador de entrega.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryEventKind {
    Open,
    Click,
    Attachment,
}

/// Metadados que chegam junto com o callback (pixel, clique, anexo).
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryEventMeta {
    pub ip: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub user_agent: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::CampaignStatus::*;

    #[test]
    fn cadeia_feliz_anda_pra_frente() {
        assert!(Draft.can_transition(Scheduled));
        assert!(Scheduled.can_transition(Queued));
        assert!(Queued.can_transition(Running));
        assert!(Running.can_transition(Sent));
    }

    #[test]
    fn rascunho_pode_ir_direto_para_fila() {
        assert!(Draft.can_transition(Queued));
    }

    #[test]
    fn falha_so_a_partir_de_fila_ou_execucao() {
        assert!(Queued.can_transition(Failed));
        assert!(Running.can_transition(Failed));
        assert!(!Draft.can_transition(Failed));
        assert!(!Scheduled.can_transition(Failed));
        assert!(!Sent.can_transition(Failed));
    }

    #[test]
    fn nenhuma_aresta_sai_de_estado_terminal() {
        for to in [Draft, Scheduled, Queued, Running, Sent, Failed] {
            assert!(!Sent.can_transition(to));
            assert!(!Failed.can_transition(to));
        }
    }

    #[test]
    fn nenhuma_regressao_e_permitida() {
        assert!(!Scheduled.can_transition(Draft));
        assert!(!Queued.can_transition(Scheduled));
        assert!(!Running.can_transition(Queued));
        assert!(!Sent.can_transition(Scheduled));
    }

    #[test]
    fn terminais_e_inicio_de_envio() {
        assert!(Sent.is_terminal() && Failed.is_terminal());
        assert!(!Draft.is_terminal() && !Running.is_terminal());
        assert!(!Draft.send_started() && !Scheduled.send_started());
        assert!(Queued.send_started() && Running.send_started() && Sent.send_started());
    }
}
