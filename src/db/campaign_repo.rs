// src/db/campaign_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::campaign::{
        Campaign, CampaignChannel, CampaignStatus, DeliveryEventKind, DeliveryEventMeta,
        RecipientSource, TrackingEvent,
    },
};

#[derive(Clone)]
pub struct CampaignRepository;

impl CampaignRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  CAMPANHAS
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    pub async fn create_campaign<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        created_by: Uuid,
        campaign_name: &str,
        channel: CampaignChannel,
        sender: &str,
        content: &str,
        email_subject: Option<&str>,
        attachments: &[String],
        recipient_source: RecipientSource,
        recipient_list: Option<&[String]>,
        recipient_excel_emails: Option<&[String]>,
        recipient_manual: Option<&str>,
        scheduled_time: Option<DateTime<Utc>>,
        status: CampaignStatus,
    ) -> Result<Campaign, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let campaign = sqlx::query_as::<_, Campaign>(
            r#"
            INSERT INTO campaigns (
                company_id, created_by, campaign_name, channel, sender, content,
                email_subject, attachments, recipient_source,
                recipient_list, recipient_excel_emails, recipient_manual,
                scheduled_time, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(created_by)
        .bind(campaign_name)
        .bind(channel)
        .bind(sender)
        .bind(content)
        .bind(email_subject)
        .bind(attachments)
        .bind(recipient_source)
        .bind(recipient_list)
        .bind(recipient_excel_emails)
        .bind(recipient_manual)
        .bind(scheduled_time)
        .bind(status)
        .fetch_one(executor)
        .await?;

        Ok(campaign)
    }

    pub async fn find_campaign<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        campaign_id: Uuid,
    ) -> Result<Campaign, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Campaign>(
            "SELECT * FROM campaigns WHERE company_id = $1 AND id = $2",
        )
        .bind(company_id)
        .bind(campaign_id)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("campaign_not_found"))
    }

    pub async fn list_campaigns<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
    ) -> Result<Vec<Campaign>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let campaigns = sqlx::query_as::<_, Campaign>(
            r#"
            SELECT * FROM campaigns
            WHERE company_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(company_id)
        .fetch_all(executor)
        .await?;

        Ok(campaigns)
    }

    /// Atualização parcial dos METADADOS da campanha. Audiência e status
    /// têm métodos próprios, com as próprias regras.
    pub async fn update_campaign_meta<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        campaign_id: Uuid,
        campaign_name: Option<&str>,
        sender: Option<&str>,
        content: Option<&str>,
        email_subject: Option<&str>,
        attachments: Option<&[String]>,
        scheduled_time: Option<DateTime<Utc>>,
    ) -> Result<Campaign, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Campaign>(
            r#"
            UPDATE campaigns
            SET campaign_name = COALESCE($3, campaign_name),
                sender = COALESCE($4, sender),
                content = COALESCE($5, content),
                email_subject = COALESCE($6, email_subject),
                attachments = COALESCE($7, attachments),
                scheduled_time = COALESCE($8, scheduled_time),
                updated_at = NOW()
            WHERE company_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(campaign_id)
        .bind(campaign_name)
        .bind(sender)
        .bind(content)
        .bind(email_subject)
        .bind(attachments)
        .bind(scheduled_time)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("campaign_not_found"))
    }

    /// Regrava o snapshot de audiência por inteiro: exatamente uma das três
    /// colunas fica preenchida, as outras voltam a NULL.
    ///
    /// Condicional no status, como toda escrita que disputa com o envio:
    /// se um "enviar agora" concorrente tirou a campanha de DRAFT/SCHEDULED
    /// entre o read do serviço e este UPDATE, nenhuma linha casa e o snapshot
    /// congelado fica intacto.
    pub async fn update_audience<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        campaign_id: Uuid,
        recipient_source: RecipientSource,
        recipient_list: Option<&[String]>,
        recipient_excel_emails: Option<&[String]>,
        recipient_manual: Option<&str>,
    ) -> Result<Option<Campaign>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let campaign = sqlx::query_as::<_, Campaign>(
            r#"
            UPDATE campaigns
            SET recipient_source = $3,
                recipient_list = $4,
                recipient_excel_emails = $5,
                recipient_manual = $6,
                updated_at = NOW()
            WHERE company_id = $1 AND id = $2
              AND status IN ('DRAFT', 'SCHEDULED')
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(campaign_id)
        .bind(recipient_source)
        .bind(recipient_list)
        .bind(recipient_excel_emails)
        .bind(recipient_manual)
        .fetch_optional(executor)
        .await?;

        Ok(campaign)
    }

    /// Transição condicional: só acontece se o status atual for o esperado.
    /// Dois "enviar agora" concorrentes disputam esta linha; um ganha,
    /// o outro recebe None.
    pub async fn transition<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        campaign_id: Uuid,
        from: CampaignStatus,
        to: CampaignStatus,
    ) -> Result<Option<Campaign>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let campaign = sqlx::query_as::<_, Campaign>(
            r#"
            UPDATE campaigns
            SET status = $4, updated_at = NOW()
            WHERE company_id = $1 AND id = $2 AND status = $3
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(campaign_id)
        .bind(from)
        .bind(to)
        .fetch_optional(executor)
        .await?;

        Ok(campaign)
    }

    /// DRAFT ou SCHEDULED → QUEUED, em uma única declaração atômica.
    pub async fn queue_for_send<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        campaign_id: Uuid,
    ) -> Result<Option<Campaign>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let campaign = sqlx::query_as::<_, Campaign>(
            r#"
            UPDATE campaigns
            SET status = 'QUEUED', updated_at = NOW()
            WHERE company_id = $1 AND id = $2
              AND status IN ('DRAFT', 'SCHEDULED')
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(campaign_id)
        .fetch_optional(executor)
        .await?;

        Ok(campaign)
    }

    pub async fn delete_campaign<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        campaign_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // O tracking cai junto via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM campaigns WHERE company_id = $1 AND id = $2")
            .bind(company_id)
            .bind(campaign_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("campaign_not_found"));
        }

        Ok(())
    }

    // =========================================================================
    //  TRACKING (um registro por destinatário)
    // =========================================================================

    /// Cria os registros de tracking para o snapshot inteiro.
    /// Idempotente: reenvio da mesma lista não duplica linhas.
    pub async fn create_tracking_rows<'e, E>(
        &self,
        executor: E,
        campaign_id: Uuid,
        recipients: &[String],
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO campaign_tracking (campaign_id, recipient)
            SELECT $1, unnest($2::text[])
            ON CONFLICT (campaign_id, recipient) DO NOTHING
            "#,
        )
        .bind(campaign_id)
        .bind(recipients)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Aplica um sinal do colaborador de entrega ao registro do destinatário.
    ///
    /// Tudo em UMA declaração: contadores via `open_count + 1` e timestamp via
    /// GREATEST, para que pixels concorrentes não se atropelem (nada de
    /// read-modify-write na aplicação).
    pub async fn record_delivery_event<'e, E>(
        &self,
        executor: E,
        campaign_id: Uuid,
        recipient: &str,
        kind: DeliveryEventKind,
        meta: &DeliveryEventMeta,
        seen_at: DateTime<Utc>,
    ) -> Result<TrackingEvent, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = match kind {
            DeliveryEventKind::Open => {
                r#"
                UPDATE campaign_tracking
                SET is_opened = TRUE,
                    open_count = open_count + 1,
                    last_opened_at = GREATEST(COALESCE(last_opened_at, $3), $3),
                    ip = COALESCE($4, ip),
                    city = COALESCE($5, city),
                    region = COALESCE($6, region),
                    country = COALESCE($7, country),
                    user_agent = COALESCE($8, user_agent)
                WHERE campaign_id = $1 AND recipient = $2
                RETURNING *
                "#
            }
            DeliveryEventKind::Click => {
                r#"
                UPDATE campaign_tracking
                SET link_clicked = TRUE,
                    last_opened_at = GREATEST(COALESCE(last_opened_at, $3), $3),
                    ip = COALESCE($4, ip),
                    city = COALESCE($5, city),
                    region = COALESCE($6, region),
                    country = COALESCE($7, country),
                    user_agent = COALESCE($8, user_agent)
                WHERE campaign_id = $1 AND recipient = $2
                RETURNING *
                "#
            }
            DeliveryEventKind::Attachment => {
                r#"
                UPDATE campaign_tracking
                SET attachment_opened = TRUE,
                    last_opened_at = GREATEST(COALESCE(last_opened_at, $3), $3),
                    ip = COALESCE($4, ip),
                    city = COALESCE($5, city),
                    region = COALESCE($6, region),
                    country = COALESCE($7, country),
                    user_agent = COALESCE($8, user_agent)
                WHERE campaign_id = $1 AND recipient = $2
                RETURNING *
                "#
            }
        };

        sqlx::query_as::<_, TrackingEvent>(sql)
            .bind(campaign_id)
            .bind(recipient)
            .bind(seen_at)
            .bind(meta.ip.as_deref())
            .bind(meta.city.as_deref())
            .bind(meta.region.as_deref())
            .bind(meta.country.as_deref())
            .bind(meta.user_agent.as_deref())
            .fetch_optional(executor)
            .await?
            // Sem envio prévio não há registro: callback órfão é NotFound.
            .ok_or(AppError::NotFound("tracking_not_found"))
    }

    pub async fn list_tracking<'e, E>(
        &self,
        executor: E,
        campaign_id: Uuid,
    ) -> Result<Vec<TrackingEvent>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let events = sqlx::query_as::<_, TrackingEvent>(
            r#"
            SELECT * FROM campaign_tracking
            WHERE campaign_id = $1
            ORDER BY created_at ASC, recipient ASC
            "#,
        )
        .bind(campaign_id)
        .fetch_all(executor)
        .await?;

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    async fn empresa_com_usuario(pool: &PgPool) -> (Uuid, Uuid) {
        let company: Uuid =
            sqlx::query_scalar("INSERT INTO companies (name) VALUES ('Acme') RETURNING id")
                .fetch_one(pool)
                .await
                .unwrap();
        let user: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO company_users (company_id, name, email, password_hash, role)
            VALUES ($1, 'Maria', 'maria@acme.com', 'hash', 'ADMIN')
            RETURNING id
            "#,
        )
        .bind(company)
        .fetch_one(pool)
        .await
        .unwrap();

        (company, user)
    }

    async fn rascunho(
        repo: &CampaignRepository,
        pool: &PgPool,
        company: Uuid,
        user: Uuid,
    ) -> Campaign {
        let snapshot = vec!["a@x.com".to_string()];
        repo.create_campaign(
            pool,
            company,
            user,
            "Teste",
            CampaignChannel::Email,
            "mkt@acme.com",
            "<p>oi</p>",
            Some("Oi"),
            &[],
            RecipientSource::Excel,
            None,
            Some(snapshot.as_slice()),
            None,
            None,
            CampaignStatus::Draft,
        )
        .await
        .unwrap()
    }

    #[sqlx::test]
    async fn duas_aberturas_somam_exatamente_dois(pool: PgPool) {
        let repo = CampaignRepository::new();
        let (company, user) = empresa_com_usuario(&pool).await;
        let campanha = rascunho(&repo, &pool, company, user).await;

        repo.create_tracking_rows(&pool, campanha.id, &["a@x.com".to_string()])
            .await
            .unwrap();

        let meta = DeliveryEventMeta::default();
        let primeira = repo
            .record_delivery_event(&pool, campanha.id, "a@x.com", DeliveryEventKind::Open, &meta, Utc::now())
            .await
            .unwrap();
        assert!(primeira.is_opened);
        assert_eq!(primeira.open_count, 1);

        // Pixel duplicado só incrementa; nunca cria linha nem reseta flags
        let segunda = repo
            .record_delivery_event(&pool, campanha.id, "a@x.com", DeliveryEventKind::Open, &meta, Utc::now())
            .await
            .unwrap();
        assert!(segunda.is_opened);
        assert_eq!(segunda.open_count, 2);
    }

    #[sqlx::test]
    async fn enfileiramentos_concorrentes_tem_um_so_vencedor(pool: PgPool) {
        let repo = CampaignRepository::new();
        let (company, user) = empresa_com_usuario(&pool).await;
        let campanha = rascunho(&repo, &pool, company, user).await;

        let (primeiro, segundo) = tokio::join!(
            repo.queue_for_send(&pool, company, campanha.id),
            repo.queue_for_send(&pool, company, campanha.id),
        );

        let vencedores = [primeiro.unwrap(), segundo.unwrap()]
            .into_iter()
            .flatten()
            .count();
        assert_eq!(vencedores, 1);

        let atual = repo.find_campaign(&pool, company, campanha.id).await.unwrap();
        assert_eq!(atual.status, CampaignStatus::Queued);
    }

    #[sqlx::test]
    async fn audiencia_nao_regrava_depois_de_enfileirada(pool: PgPool) {
        let repo = CampaignRepository::new();
        let (company, user) = empresa_com_usuario(&pool).await;
        let campanha = rascunho(&repo, &pool, company, user).await;

        repo.queue_for_send(&pool, company, campanha.id).await.unwrap().unwrap();

        let tentativa = repo
            .update_audience(
                &pool,
                company,
                campanha.id,
                RecipientSource::Manual,
                None,
                None,
                Some("chefe@acme.com"),
            )
            .await
            .unwrap();
        assert!(tentativa.is_none());

        // O snapshot congelado fica intacto
        let atual = repo.find_campaign(&pool, company, campanha.id).await.unwrap();
        assert_eq!(atual.recipient_source, RecipientSource::Excel);
        assert_eq!(atual.recipient_excel_emails, Some(vec!["a@x.com".to_string()]));
    }
}
