// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;

// Nosso tipo de erro interno, com `thiserror` para melhor ergonomia.
// As variantes de domínio carregam um CÓDIGO (não frase) que o catálogo
// i18n resolve na hora de responder.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Chave do campo customizado -> código do erro ("required", "invalid_number"...)
    #[error("Dados customizados inválidos")]
    CustomDataValidationError(HashMap<String, String>),

    #[error("Não autenticado")]
    Unauthorized,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Sem permissão: {0}")]
    Forbidden(&'static str),

    #[error("Não encontrado: {0}")]
    NotFound(&'static str),

    #[error("Conflito: {0}")]
    Conflict(&'static str),

    #[error("Entrada inválida: {0}")]
    InvalidInput(&'static str),

    #[error("Operação não permitida no estado atual: {0}")]
    InvalidState(&'static str),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// O erro "de borda": já tem status HTTP e mensagem no idioma do caller.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl AppError {
    /// Resolve o erro interno em uma resposta pronta, no idioma do caller.
    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        let lang = locale.0.as_str();

        match self {
            AppError::ValidationError(errors) => {
                // Retornamos todos os detalhes da validação, campo a campo.
                let mut details = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| {
                            e.message.as_ref().map(|m| store.translate(lang, m))
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                ApiError {
                    status: StatusCode::BAD_REQUEST,
                    error: store.translate(lang, "validation_failed"),
                    details: Some(json!(details)),
                }
            }

            AppError::CustomDataValidationError(errors) => {
                let details: HashMap<&String, String> = errors
                    .iter()
                    .map(|(key, code)| (key, store.translate(lang, code)))
                    .collect();
                ApiError {
                    status: StatusCode::BAD_REQUEST,
                    error: store.translate(lang, "custom_data_invalid"),
                    details: Some(json!(details)),
                }
            }

            AppError::Unauthorized | AppError::InvalidToken => ApiError {
                status: StatusCode::UNAUTHORIZED,
                error: store.translate(lang, "invalid_token"),
                details: None,
            },

            AppError::InvalidCredentials => ApiError {
                status: StatusCode::UNAUTHORIZED,
                error: store.translate(lang, "invalid_credentials"),
                details: None,
            },

            AppError::Forbidden(code) => ApiError {
                status: StatusCode::FORBIDDEN,
                error: store.translate(lang, code),
                details: None,
            },

            AppError::NotFound(code) => ApiError {
                status: StatusCode::NOT_FOUND,
                error: store.translate(lang, code),
                details: None,
            },

            AppError::Conflict(code) => ApiError {
                status: StatusCode::CONFLICT,
                error: store.translate(lang, code),
                details: None,
            },

            AppError::InvalidInput(code) => ApiError {
                status: StatusCode::BAD_REQUEST,
                error: store.translate(lang, code),
                details: None,
            },

            AppError::InvalidState(code) => ApiError {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                error: store.translate(lang, code),
                details: None,
            },

            // Todos os outros (DatabaseError, InternalServerError...) viram 500.
            // O `tracing` loga a mensagem detalhada; o caller recebe o genérico.
            e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                ApiError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    error: store.translate(lang, "internal_error"),
                    details: None,
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

// Os middlewares devolvem AppError direto (sem Locale à mão):
// respondemos com o catálogo padrão (inglês).
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), &I18nStore::new())
            .into_response()
    }
}
