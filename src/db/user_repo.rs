// src/db/user_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::{Company, CompanyUser, UserRole},
};

// O repositório de usuários, responsável pelas tabelas 'companies' e 'company_users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Cria a empresa (o tenant). Usado só no registro.
    pub async fn create_company<'e, E>(&self, executor: E, name: &str) -> Result<Company, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let company = sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (name)
            VALUES ($1)
            RETURNING id, name, created_at
            "#,
        )
        .bind(name)
        .fetch_one(executor)
        .await?;

        Ok(company)
    }

    /// Cria um usuário dentro da empresa.
    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        name: &str,
        email: &str,
        password_hash: &str,
        role: UserRole,
    ) -> Result<CompanyUser, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, CompanyUser>(
            r#"
            INSERT INTO company_users (company_id, name, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, company_id, name, email, password_hash, role, created_at, updated_at
            "#,
        )
        .bind(company_id)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            // Converte violação de chave única em erro amigável
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::Conflict("email_exists");
                }
            }
            e.into()
        })
    }

    // Busca um usuário pelo seu e-mail (login)
    pub async fn find_by_email(&self, email: &str) -> Result<Option<CompanyUser>, AppError> {
        let user = sqlx::query_as::<_, CompanyUser>(
            "SELECT * FROM company_users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    // Busca um usuário pelo seu ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<CompanyUser>, AppError> {
        let user = sqlx::query_as::<_, CompanyUser>(
            "SELECT * FROM company_users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Lista os colegas da mesma empresa.
    pub async fn list_by_company<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
    ) -> Result<Vec<CompanyUser>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let users = sqlx::query_as::<_, CompanyUser>(
            r#"
            SELECT * FROM company_users
            WHERE company_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(executor)
        .await?;

        Ok(users)
    }
}
