// src/services/crm_service.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{Acquire, Executor, Postgres};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CrmRepository,
    middleware::auth::TenantContext,
    models::auth::VisibleScope,
    models::crm::{CrmModule, Customer, FieldDefinition, FieldType, Lead, Opportunity},
};

#[derive(Clone)]
pub struct CrmService {
    repo: CrmRepository,
}

impl CrmService {
    pub fn new(repo: CrmRepository) -> Self {
        Self { repo }
    }

    // =========================================================================
    //  1. REGISTRO DE CAMPOS (O Molde)
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    pub async fn define_field<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        module: CrmModule,
        key_name: &str,
        label: &str,
        field_type: FieldType,
        options: Option<Value>,
        is_required: bool,
        display_order: i32,
    ) -> Result<FieldDefinition, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // SELECT sem opções não tem como ser preenchido depois
        if field_type == FieldType::Select {
            let has_options = options
                .as_ref()
                .and_then(|v| v.as_array())
                .map(|arr| !arr.is_empty())
                .unwrap_or(false);
            if !has_options {
                return Err(AppError::InvalidInput("select_requires_options"));
            }
        }

        self.repo
            .create_field_definition(
                executor,
                company_id,
                module,
                key_name,
                label,
                field_type,
                options.as_ref(),
                is_required,
                display_order,
            )
            .await
    }

    pub async fn list_fields<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        module: CrmModule,
    ) -> Result<Vec<FieldDefinition>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_field_definitions(executor, company_id, module).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update_field<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        field_id: Uuid,
        label: Option<&str>,
        field_type: Option<FieldType>,
        options: Option<Value>,
        is_required: Option<bool>,
        display_order: Option<i32>,
    ) -> Result<FieldDefinition, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Virar SELECT exige mandar as opções junto
        if field_type == Some(FieldType::Select) {
            let has_options = options
                .as_ref()
                .and_then(|v| v.as_array())
                .map(|arr| !arr.is_empty())
                .unwrap_or(false);
            if !has_options {
                return Err(AppError::InvalidInput("select_requires_options"));
            }
        }

        self.repo
            .update_field_definition(
                executor,
                company_id,
                field_id,
                label,
                field_type,
                options.as_ref(),
                is_required,
                display_order,
            )
            .await
    }

    pub async fn retire_field<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        field_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.retire_field_definition(executor, company_id, field_id).await
    }

    // =========================================================================
    //  2. LEADS (com validação dinâmica do bag)
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    pub async fn create_lead<'e, E>(
        &self,
        executor: E,
        tenant: &TenantContext,
        name: &str,
        email: &str,
        phone: Option<&str>,
        source: Option<&str>,
        custom_data: Value,
    ) -> Result<Lead, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        // 1. Busca as definições ativas do módulo
        let definitions = self
            .repo
            .list_field_definitions(&mut *tx, tenant.company_id, CrmModule::Lead)
            .await?;

        // 2. Valida o bag contra o molde (obrigatórios contam na criação)
        validate_custom_data(&definitions, &custom_data, true)?;

        // 3. Salva
        let lead = self
            .repo
            .create_lead(
                &mut *tx,
                tenant.company_id,
                tenant.user_id,
                name,
                email,
                phone,
                source,
                &custom_data,
            )
            .await?;

        tx.commit().await?;

        Ok(lead)
    }

    pub async fn list_leads<'e, E>(
        &self,
        executor: E,
        tenant: &TenantContext,
    ) -> Result<Vec<Lead>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let owner_filter = match tenant.role.visible_scope() {
            VisibleScope::All => None,
            VisibleScope::OwnedOnly => Some(tenant.user_id),
        };

        self.repo.list_leads(executor, tenant.company_id, owner_filter).await
    }

    pub async fn get_lead<'e, E>(
        &self,
        executor: E,
        tenant: &TenantContext,
        lead_id: Uuid,
    ) -> Result<Lead, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.find_lead(executor, tenant.company_id, lead_id).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update_lead<'e, E>(
        &self,
        executor: E,
        tenant: &TenantContext,
        lead_id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
        phone: Option<&str>,
        source: Option<&str>,
        custom_data: Option<Value>,
    ) -> Result<Lead, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        if let Some(data) = &custom_data {
            let definitions = self
                .repo
                .list_field_definitions(&mut *tx, tenant.company_id, CrmModule::Lead)
                .await?;
            // Na edição só checamos tipos: chaves omitidas ficam como estão
            validate_custom_data(&definitions, data, false)?;
        }

        let lead = self
            .repo
            .update_lead(
                &mut *tx,
                tenant.company_id,
                lead_id,
                name,
                email,
                phone,
                source,
                custom_data.as_ref(),
            )
            .await?;

        tx.commit().await?;

        Ok(lead)
    }

    pub async fn delete_lead<'e, E>(
        &self,
        executor: E,
        tenant: &TenantContext,
        lead_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.delete_lead(executor, tenant.company_id, lead_id).await
    }

    // =========================================================================
    //  3. OPORTUNIDADES
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    pub async fn create_opportunity<'e, E>(
        &self,
        executor: E,
        tenant: &TenantContext,
        lead_id: Option<Uuid>,
        name: &str,
        stage: &str,
        amount: Decimal,
        close_date: Option<NaiveDate>,
        custom_data: Value,
    ) -> Result<Opportunity, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Oportunidades não têm módulo próprio no registro: o bag é livre
        // (chaves órfãs são toleradas por contrato)
        self.repo
            .create_opportunity(
                executor,
                tenant.company_id,
                tenant.user_id,
                lead_id,
                name,
                stage,
                amount,
                close_date,
                &custom_data,
            )
            .await
    }

    pub async fn list_opportunities<'e, E>(
        &self,
        executor: E,
        tenant: &TenantContext,
    ) -> Result<Vec<Opportunity>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let owner_filter = match tenant.role.visible_scope() {
            VisibleScope::All => None,
            VisibleScope::OwnedOnly => Some(tenant.user_id),
        };

        self.repo
            .list_opportunities(executor, tenant.company_id, owner_filter)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn update_opportunity<'e, E>(
        &self,
        executor: E,
        tenant: &TenantContext,
        opportunity_id: Uuid,
        name: Option<&str>,
        stage: Option<&str>,
        amount: Option<Decimal>,
        close_date: Option<NaiveDate>,
        custom_data: Option<Value>,
    ) -> Result<Opportunity, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .update_opportunity(
                executor,
                tenant.company_id,
                opportunity_id,
                name,
                stage,
                amount,
                close_date,
                custom_data.as_ref(),
            )
            .await
    }

    pub async fn delete_opportunity<'e, E>(
        &self,
        executor: E,
        tenant: &TenantContext,
        opportunity_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .delete_opportunity(executor, tenant.company_id, opportunity_id)
            .await
    }

    // =========================================================================
    //  4. CLIENTES
    // =========================================================================

    pub async fn create_customer<'e, E>(
        &self,
        executor: E,
        tenant: &TenantContext,
        name: &str,
        email: Option<&str>,
        phone: Option<&str>,
        custom_data: Value,
    ) -> Result<Customer, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let definitions = self
            .repo
            .list_field_definitions(&mut *tx, tenant.company_id, CrmModule::Client)
            .await?;
        validate_custom_data(&definitions, &custom_data, true)?;

        let customer = self
            .repo
            .create_customer(&mut *tx, tenant.company_id, name, email, phone, &custom_data)
            .await?;

        tx.commit().await?;

        Ok(customer)
    }

    pub async fn list_customers<'e, E>(
        &self,
        executor: E,
        tenant: &TenantContext,
    ) -> Result<Vec<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_customers(executor, tenant.company_id).await
    }
}

// --- MOTOR DE VALIDAÇÃO ---
//
// Valida o bag contra as definições ATIVAS do módulo. Chaves sem definição
// correspondente são toleradas de propósito: registros antigos continuam
// graváveis mesmo depois de um campo ser aposentado ou renomeado.
pub fn validate_custom_data(
    definitions: &[FieldDefinition],
    data: &Value,
    enforce_required: bool,
) -> Result<(), AppError> {
    let obj = data
        .as_object()
        .ok_or(AppError::InvalidInput("custom_data_invalid"))?;

    // Mapa de erros: Chave do campo -> Código do erro
    let mut errors: HashMap<String, String> = HashMap::new();

    for def in definitions {
        let value = obj.get(&def.key_name);

        // A. OBRIGATORIEDADE (só na criação)
        if enforce_required
            && def.is_required
            && value.is_none_or(|v| v.is_null())
        {
            errors.insert(def.key_name.clone(), "required".to_string());
            continue;
        }

        // B. TIPO
        if let Some(val) = value {
            if val.is_null() {
                continue;
            }

            let error_code = match def.field_type {
                FieldType::Text => (!val.is_string()).then_some("invalid_text"),
                FieldType::Number => (!val.is_number()).then_some("invalid_number"),
                FieldType::Date => {
                    let ok = val
                        .as_str()
                        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok())
                        .unwrap_or(false);
                    (!ok).then_some("invalid_date_format")
                }
                FieldType::Select => match val.as_str() {
                    // Valor de SELECT precisa estar entre as opções definidas
                    Some(s) if def.option_values().iter().any(|o| o == s) => None,
                    _ => Some("invalid_option"),
                },
            };

            if let Some(code) = error_code {
                errors.insert(def.key_name.clone(), code.to_string());
            }
        }
    }

    if !errors.is_empty() {
        return Err(AppError::CustomDataValidationError(errors));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn def(key: &str, field_type: FieldType, required: bool, options: Option<Value>) -> FieldDefinition {
        FieldDefinition {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            module: CrmModule::Lead,
            key_name: key.to_string(),
            label: key.to_string(),
            field_type,
            options,
            is_required: required,
            display_order: 0,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn erro_de(result: Result<(), AppError>, key: &str) -> String {
        match result {
            Err(AppError::CustomDataValidationError(map)) => {
                map.get(key).cloned().unwrap_or_default()
            }
            other => panic!("esperava CustomDataValidationError, veio {:?}", other.err()),
        }
    }

    #[test]
    fn bag_valido_passa() {
        let defs = vec![
            def("peso", FieldType::Number, true, None),
            def("nascimento", FieldType::Date, false, None),
            def("tamanho", FieldType::Select, false, Some(json!(["P", "M", "G"]))),
        ];
        let data = json!({ "peso": 80, "nascimento": "1990-05-20", "tamanho": "M" });
        assert!(validate_custom_data(&defs, &data, true).is_ok());
    }

    #[test]
    fn obrigatorio_ausente_falha_na_criacao() {
        let defs = vec![def("peso", FieldType::Number, true, None)];
        assert_eq!(erro_de(validate_custom_data(&defs, &json!({}), true), "peso"), "required");

        // Na edição, a ausência é tolerada
        assert!(validate_custom_data(&defs, &json!({}), false).is_ok());
    }

    #[test]
    fn tipo_errado_nomeia_a_chave() {
        let defs = vec![def("peso", FieldType::Number, false, None)];
        let data = json!({ "peso": "oitenta" });
        assert_eq!(erro_de(validate_custom_data(&defs, &data, true), "peso"), "invalid_number");
    }

    #[test]
    fn data_exige_formato_iso() {
        let defs = vec![def("nascimento", FieldType::Date, false, None)];
        let ruim = json!({ "nascimento": "20/05/1990" });
        assert_eq!(
            erro_de(validate_custom_data(&defs, &ruim, true), "nascimento"),
            "invalid_date_format"
        );
    }

    #[test]
    fn select_fora_das_opcoes_falha() {
        let defs = vec![def("tamanho", FieldType::Select, false, Some(json!(["P", "M"])))];
        let data = json!({ "tamanho": "GG" });
        assert_eq!(erro_de(validate_custom_data(&defs, &data, true), "tamanho"), "invalid_option");
    }

    #[test]
    fn chave_orfa_e_tolerada() {
        // Nenhuma definição conhece "legado", mas o registro continua gravável
        let defs = vec![def("peso", FieldType::Number, false, None)];
        let data = json!({ "peso": 80, "legado": "qualquer coisa" });
        assert!(validate_custom_data(&defs, &data, true).is_ok());
    }

    #[test]
    fn bag_que_nao_e_objeto_e_invalido() {
        let defs = vec![];
        assert!(matches!(
            validate_custom_data(&defs, &json!([1, 2]), true),
            Err(AppError::InvalidInput("custom_data_invalid"))
        ));
    }
}
