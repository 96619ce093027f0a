// src/db/crm_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::crm::{CrmModule, Customer, FieldDefinition, FieldType, Lead, Opportunity},
};

#[derive(Clone)]
pub struct CrmRepository;

const FIELD_COLUMNS: &str = "id, company_id, module, key_name, label, field_type, \
                             options, is_required, display_order, is_active, created_at";

impl CrmRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  DEFINIÇÕES DE CAMPOS (O Molde)
    // =========================================================================

    /// Cria uma nova definição de campo (Ex: "Peso", "Alergias")
    pub async fn create_field_definition<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        module: CrmModule,
        key_name: &str,
        label: &str,
        field_type: FieldType,
        options: Option<&Value>,
        is_required: bool,
        display_order: i32,
    ) -> Result<FieldDefinition, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO crm_field_definitions (
                company_id, module, key_name, label, field_type,
                options, is_required, display_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {FIELD_COLUMNS}
            "#
        );

        sqlx::query_as::<_, FieldDefinition>(&sql)
            .bind(company_id)
            .bind(module)
            .bind(key_name)
            .bind(label)
            .bind(field_type)
            .bind(options)
            .bind(is_required)
            .bind(display_order)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                // A unique (company_id, module, key_name) cobre ativos E aposentados:
                // a chave nunca é reutilizável.
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        return AppError::Conflict("field_key_exists");
                    }
                }
                e.into()
            })
    }

    /// Lista as definições ATIVAS de um módulo, na ordem do formulário.
    pub async fn list_field_definitions<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        module: CrmModule,
    ) -> Result<Vec<FieldDefinition>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            SELECT {FIELD_COLUMNS}
            FROM crm_field_definitions
            WHERE company_id = $1 AND module = $2 AND is_active = TRUE
            ORDER BY display_order ASC, created_at ASC
            "#
        );

        let fields = sqlx::query_as::<_, FieldDefinition>(&sql)
            .bind(company_id)
            .bind(module)
            .fetch_all(executor)
            .await?;

        Ok(fields)
    }

    /// Atualização parcial: só toca nos atributos enviados.
    /// Chave e módulo são imutáveis de propósito.
    pub async fn update_field_definition<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        field_id: Uuid,
        label: Option<&str>,
        field_type: Option<FieldType>,
        options: Option<&Value>,
        is_required: Option<bool>,
        display_order: Option<i32>,
    ) -> Result<FieldDefinition, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE crm_field_definitions
            SET label = COALESCE($3, label),
                field_type = COALESCE($4, field_type),
                options = COALESCE($5, options),
                is_required = COALESCE($6, is_required),
                display_order = COALESCE($7, display_order)
            WHERE company_id = $1 AND id = $2
            RETURNING {FIELD_COLUMNS}
            "#
        );

        sqlx::query_as::<_, FieldDefinition>(&sql)
            .bind(company_id)
            .bind(field_id)
            .bind(label)
            .bind(field_type)
            .bind(options)
            .bind(is_required)
            .bind(display_order)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("field_not_found"))
    }

    /// Aposenta o campo (is_active = false). Remoção física nunca é exposta.
    pub async fn retire_field_definition<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        field_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE crm_field_definitions
            SET is_active = FALSE
            WHERE company_id = $1 AND id = $2
            "#,
        )
        .bind(company_id)
        .bind(field_id)
        .execute(executor)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("field_not_found"));
        }

        Ok(())
    }

    // =========================================================================
    //  LEADS
    // =========================================================================

    pub async fn create_lead<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        lead_owner: Uuid,
        name: &str,
        email: &str,
        phone: Option<&str>,
        source: Option<&str>,
        custom_data: &Value,
    ) -> Result<Lead, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (company_id, lead_owner, name, email, phone, source, custom_data)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(lead_owner)
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(source)
        .bind(custom_data)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::Conflict("lead_email_exists");
                }
            }
            e.into()
        })
    }

    /// Listagem com recorte de papel: `owner_filter = Some(user)` restringe
    /// ao dono; `None` devolve a empresa inteira.
    pub async fn list_leads<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        owner_filter: Option<Uuid>,
    ) -> Result<Vec<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let leads = sqlx::query_as::<_, Lead>(
            r#"
            SELECT * FROM leads
            WHERE company_id = $1
              AND ($2::uuid IS NULL OR lead_owner = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(company_id)
        .bind(owner_filter)
        .fetch_all(executor)
        .await?;

        Ok(leads)
    }

    pub async fn find_lead<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        lead_id: Uuid,
    ) -> Result<Lead, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Lead>(
            "SELECT * FROM leads WHERE company_id = $1 AND id = $2",
        )
        .bind(company_id)
        .bind(lead_id)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("lead_not_found"))
    }

    pub async fn update_lead<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        lead_id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
        phone: Option<&str>,
        source: Option<&str>,
        custom_data: Option<&Value>,
    ) -> Result<Lead, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Lead>(
            r#"
            UPDATE leads
            SET name = COALESCE($3, name),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                source = COALESCE($6, source),
                custom_data = COALESCE($7, custom_data),
                updated_at = NOW()
            WHERE company_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(lead_id)
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(source)
        .bind(custom_data)
        .fetch_optional(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::Conflict("lead_email_exists");
                }
            }
            AppError::from(e)
        })?
        .ok_or(AppError::NotFound("lead_not_found"))
    }

    /// Hard delete, conforme o contrato do Lead (sem soft-delete/auditoria).
    pub async fn delete_lead<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        lead_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM leads WHERE company_id = $1 AND id = $2")
            .bind(company_id)
            .bind(lead_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("lead_not_found"));
        }

        Ok(())
    }

    // =========================================================================
    //  OPORTUNIDADES
    // =========================================================================

    pub async fn create_opportunity<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        owner_id: Uuid,
        lead_id: Option<Uuid>,
        name: &str,
        stage: &str,
        amount: Decimal,
        close_date: Option<NaiveDate>,
        custom_data: &Value,
    ) -> Result<Opportunity, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let opportunity = sqlx::query_as::<_, Opportunity>(
            r#"
            INSERT INTO opportunities (
                company_id, owner_id, lead_id, name, stage, amount, close_date, custom_data
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(owner_id)
        .bind(lead_id)
        .bind(name)
        .bind(stage)
        .bind(amount)
        .bind(close_date)
        .bind(custom_data)
        .fetch_one(executor)
        .await?;

        Ok(opportunity)
    }

    pub async fn list_opportunities<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        owner_filter: Option<Uuid>,
    ) -> Result<Vec<Opportunity>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let opportunities = sqlx::query_as::<_, Opportunity>(
            r#"
            SELECT * FROM opportunities
            WHERE company_id = $1
              AND ($2::uuid IS NULL OR owner_id = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(company_id)
        .bind(owner_filter)
        .fetch_all(executor)
        .await?;

        Ok(opportunities)
    }

    pub async fn update_opportunity<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        opportunity_id: Uuid,
        name: Option<&str>,
        stage: Option<&str>,
        amount: Option<Decimal>,
        close_date: Option<NaiveDate>,
        custom_data: Option<&Value>,
    ) -> Result<Opportunity, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Opportunity>(
            r#"
            UPDATE opportunities
            SET name = COALESCE($3, name),
                stage = COALESCE($4, stage),
                amount = COALESCE($5, amount),
                close_date = COALESCE($6, close_date),
                custom_data = COALESCE($7, custom_data),
                updated_at = NOW()
            WHERE company_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(opportunity_id)
        .bind(name)
        .bind(stage)
        .bind(amount)
        .bind(close_date)
        .bind(custom_data)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("opportunity_not_found"))
    }

    pub async fn delete_opportunity<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        opportunity_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM opportunities WHERE company_id = $1 AND id = $2")
            .bind(company_id)
            .bind(opportunity_id)
            .execute(executor)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("opportunity_not_found"));
        }

        Ok(())
    }

    // =========================================================================
    //  CLIENTES
    // =========================================================================

    pub async fn create_customer<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        name: &str,
        email: Option<&str>,
        phone: Option<&str>,
        custom_data: &Value,
    ) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (company_id, name, email, phone, custom_data)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(custom_data)
        .fetch_one(executor)
        .await?;

        Ok(customer)
    }

    pub async fn list_customers<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
    ) -> Result<Vec<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT * FROM customers
            WHERE company_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(company_id)
        .fetch_all(executor)
        .await?;

        Ok(customers)
    }

    // =========================================================================
    //  SEGMENTO (audiência viva, congelada pelo Campaign Engine)
    // =========================================================================

    /// Os e-mails distintos de leads + clientes da empresa, no momento da
    /// chamada. Quem congela o resultado é a campanha, não este método.
    pub async fn segment_emails<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
    ) -> Result<Vec<String>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT lower(email) AS email FROM leads
            WHERE company_id = $1
            UNION
            SELECT DISTINCT lower(email) FROM customers
            WHERE company_id = $1 AND email IS NOT NULL
            ORDER BY email ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(executor)
        .await?;

        Ok(rows.into_iter().map(|(email,)| email).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    async fn empresa(pool: &PgPool, nome: &str) -> Uuid {
        sqlx::query_scalar("INSERT INTO companies (name) VALUES ($1) RETURNING id")
            .bind(nome)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test]
    async fn listagem_de_campos_nao_vaza_entre_empresas(pool: PgPool) {
        let repo = CrmRepository::new();
        let acme = empresa(&pool, "Acme").await;
        let beta = empresa(&pool, "Beta").await;

        repo.create_field_definition(
            &pool, acme, CrmModule::Lead, "peso", "Peso", FieldType::Number, None, false, 0,
        )
        .await
        .unwrap();

        let da_acme = repo.list_field_definitions(&pool, acme, CrmModule::Lead).await.unwrap();
        assert_eq!(da_acme.len(), 1);

        // A empresa vizinha nunca enxerga o molde alheio
        let da_beta = repo.list_field_definitions(&pool, beta, CrmModule::Lead).await.unwrap();
        assert!(da_beta.is_empty());
    }

    #[sqlx::test]
    async fn chave_aposentada_sai_da_listagem_mas_continua_reservada(pool: PgPool) {
        let repo = CrmRepository::new();
        let acme = empresa(&pool, "Acme").await;

        let campo = repo
            .create_field_definition(
                &pool, acme, CrmModule::Lead, "peso", "Peso", FieldType::Number, None, false, 0,
            )
            .await
            .unwrap();

        repo.retire_field_definition(&pool, acme, campo.id).await.unwrap();

        let ativos = repo.list_field_definitions(&pool, acme, CrmModule::Lead).await.unwrap();
        assert!(ativos.is_empty());

        // Recriar com a mesma chave conflita mesmo com o original aposentado
        let repetido = repo
            .create_field_definition(
                &pool, acme, CrmModule::Lead, "peso", "Peso de novo", FieldType::Number, None,
                false, 0,
            )
            .await;
        assert!(matches!(repetido, Err(AppError::Conflict("field_key_exists"))));
    }
}
