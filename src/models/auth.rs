// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- ENUMS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    Manager,
    Member,
}

/// O que cada papel enxerga nas listagens da empresa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibleScope {
    /// Todas as linhas da empresa.
    All,
    /// Apenas as linhas cujo dono é o próprio usuário.
    OwnedOnly,
}

impl UserRole {
    /// Função pura de shaping de query: o papel decide o recorte, o repositório
    /// aplica o predicado. Admins e gerentes veem tudo; membros, só o que é deles.
    pub fn visible_scope(&self) -> VisibleScope {
        match self {
            UserRole::Admin | UserRole::Manager => VisibleScope::All,
            UserRole::Member => VisibleScope::OwnedOnly,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

// --- TENANCY ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    #[schema(example = "Acme Ltda")]
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// Representa um usuário da empresa vindo do banco de dados
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyUser {
    pub id: Uuid,
    #[schema(ignore)]
    pub company_id: Uuid,
    pub name: String,
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: String,

    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- PAYLOADS ---

// Registro abre a empresa e cria o primeiro usuário (admin) de uma vez
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    #[validate(length(min = 2, message = "company_name_too_short"))]
    #[schema(example = "Acme Ltda")]
    pub company_name: String,

    #[validate(length(min = 2, message = "name_too_short"))]
    #[schema(example = "Maria da Silva")]
    pub name: String,

    #[validate(email(message = "invalid_email"))]
    #[schema(example = "maria@acme.com")]
    pub email: String,

    #[validate(length(min = 6, message = "password_too_short"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginPayload {
    #[validate(email(message = "invalid_email"))]
    pub email: String,
    #[validate(length(min = 6, message = "password_too_short"))]
    pub password: String,
}

// Admin cria colegas dentro da própria empresa
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    #[validate(length(min = 2, message = "name_too_short"))]
    pub name: String,

    #[validate(email(message = "invalid_email"))]
    pub email: String,

    #[validate(length(min = 6, message = "password_too_short"))]
    pub password: String,

    pub role: UserRole,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
}

// Estrutura de dados ("claims") dentro do JWT.
// O company_id viaja no token: é ele que escopa TODAS as queries.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,        // ID do usuário
    pub company_id: Uuid, // Tenant do usuário
    pub role: UserRole,
    pub exp: usize,
    pub iat: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_e_gerente_veem_tudo() {
        assert_eq!(UserRole::Admin.visible_scope(), VisibleScope::All);
        assert_eq!(UserRole::Manager.visible_scope(), VisibleScope::All);
    }

    #[test]
    fn membro_ve_apenas_o_que_e_dele() {
        assert_eq!(UserRole::Member.visible_scope(), VisibleScope::OwnedOnly);
    }
}
