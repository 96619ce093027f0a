// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Claims, CompanyUser, UserRole},
};

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    pool: PgPool,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String, pool: PgPool) -> Self {
        Self { user_repo, jwt_secret, pool }
    }

    /// Registro: abre a empresa e cria o primeiro usuário (admin) na MESMA
    /// transação. Se qualquer passo falhar, nada fica pela metade.
    pub async fn register_company(
        &self,
        company_name: &str,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<String, AppError> {
        // Hashing fora da transação (e fora do runtime async)
        let password_hash = Self::hash_password(password.to_owned()).await?;

        let mut tx = self.pool.begin().await?;

        let company = self.user_repo.create_company(&mut *tx, company_name).await?;
        let admin = self
            .user_repo
            .create_user(&mut *tx, company.id, name, email, &password_hash, UserRole::Admin)
            .await?;

        tx.commit().await?;

        tracing::info!("🏢 Empresa '{}' registrada com admin {}", company.name, admin.email);

        self.create_token(&admin)
    }

    /// Admin cria um colega dentro da própria empresa.
    pub async fn create_company_user(
        &self,
        company_id: Uuid,
        name: &str,
        email: &str,
        password: &str,
        role: UserRole,
    ) -> Result<CompanyUser, AppError> {
        let password_hash = Self::hash_password(password.to_owned()).await?;

        self.user_repo
            .create_user(&self.pool, company_id, name, email, &password_hash, role)
            .await
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || {
            verify(&password_clone, &password_hash_clone)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.create_token(&user)
    }

    /// Valida o token e devolve o usuário + as claims (o tenant mora nelas).
    pub async fn validate_token(&self, token: &str) -> Result<(CompanyUser, Claims), AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;

        let user = self
            .user_repo
            .find_by_id(token_data.claims.sub)
            .await?
            .ok_or(AppError::NotFound("user_not_found"))?;

        // O token escopa um tenant; se o vínculo do usuário mudou, o token morre.
        if user.company_id != token_data.claims.company_id {
            return Err(AppError::InvalidToken);
        }

        Ok((user, token_data.claims))
    }

    pub async fn list_company_users(&self, company_id: Uuid) -> Result<Vec<CompanyUser>, AppError> {
        self.user_repo.list_by_company(&self.pool, company_id).await
    }

    async fn hash_password(password: String) -> Result<String, AppError> {
        let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
        Ok(hashed)
    }

    fn create_token(&self, user: &CompanyUser) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(7);

        let claims = Claims {
            sub: user.id,
            company_id: user.company_id,
            role: user.role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}
