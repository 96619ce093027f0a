// src/models/crm.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value}; // <--- A chave para o JSONB
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- ENUMS ---

// Mapeia o CREATE TYPE crm_module do banco.
// É a categoria de entidade a que uma definição de campo se prende.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "crm_module", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum CrmModule {
    Lead,
    Client,
    Ticket,
}

// Mapeia o CREATE TYPE crm_field_type do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "crm_field_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Select,
}

// --- DEFINIÇÕES (O Molde) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub id: Uuid,
    #[schema(ignore)]
    pub company_id: Uuid,

    pub module: CrmModule,

    #[schema(example = "tamanho_camiseta")]
    pub key_name: String, // Chave de máquina, imutável
    #[schema(example = "Tamanho da Camiseta")]
    pub label: String, // Texto de exibição

    pub field_type: FieldType,

    // Opções para Selects (Ex: ["P", "M", "G"]).
    #[schema(example = json!(["P", "M", "G"]))]
    pub options: Option<Value>,

    pub is_required: bool,
    #[schema(example = 0)]
    pub display_order: i32,

    // "Deletar" é lógico: o campo aposentado sai do formulário,
    // mas os registros históricos continuam interpretáveis.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl FieldDefinition {
    /// As opções de um SELECT como lista de strings (ignora entradas não-string).
    pub fn option_values(&self) -> Vec<String> {
        self.options
            .as_ref()
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|o| o.as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

// --- ENTIDADES (O Dado) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: Uuid,
    #[schema(ignore)]
    pub company_id: Uuid,
    pub lead_owner: Uuid,

    #[schema(example = "João Pereira")]
    pub name: String,
    #[schema(example = "joao@cliente.com")]
    pub email: String,
    pub phone: Option<String>,
    #[schema(example = "landing-page")]
    pub source: Option<String>,

    // CAMPOS PERSONALIZADOS
    // Aqui vai o { "tamanho_camiseta": "P", "orcamento": 5000 }
    pub custom_data: Value,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: Uuid,
    #[schema(ignore)]
    pub company_id: Uuid,
    pub owner_id: Uuid,
    pub lead_id: Option<Uuid>,

    #[schema(example = "Renovação anual Acme")]
    pub name: String,
    #[schema(example = "OPEN")]
    pub stage: String,
    #[schema(example = "1500.00")]
    pub amount: Decimal,
    pub close_date: Option<NaiveDate>,

    pub custom_data: Value,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    #[schema(ignore)]
    pub company_id: Uuid,

    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,

    pub custom_data: Value,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
