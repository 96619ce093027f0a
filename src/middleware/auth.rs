// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    models::auth::{CompanyUser, UserRole},
};

/// O contexto de tenant que TODA operação protegida recebe.
/// Vem das claims do token, nunca de estado global.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub company_id: Uuid,
    pub user_id: Uuid,
    pub role: UserRole,
}

fn bearer_token(request: &axum::http::Request<axum::body::Body>) -> Option<&str> {
    request
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
}

/// Middleware de autenticação: valida o token e insere o usuário nas extensions.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request).ok_or(AppError::InvalidToken)?;

    let (user, _claims) = app_state.auth_service.validate_token(token).await?;
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Middleware de tenancy: além do usuário, insere o TenantContext
/// derivado das claims. Tudo que roda atrás dele já nasce escopado.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request).ok_or(AppError::InvalidToken)?;

    let (user, claims) = app_state.auth_service.validate_token(token).await?;

    let tenant = TenantContext {
        company_id: claims.company_id,
        user_id: user.id,
        role: user.role,
    };

    request.extensions_mut().insert(user);
    request.extensions_mut().insert(tenant);

    Ok(next.run(request).await)
}

// Extrator para obter o usuário autenticado diretamente nos handlers
pub struct AuthenticatedUser(pub CompanyUser);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CompanyUser>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or(AppError::InvalidToken)
    }
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}
