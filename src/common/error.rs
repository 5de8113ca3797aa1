use std::collections::HashMap;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    common::i18n::{I18nStore, DEFAULT_LANG},
    middleware::i18n::Locale,
    models::ticket::TicketStatus,
};

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Erro de validação fora do `validator` (ex: intervalo de datas)
    #[error("Campo inválido: {field} ({code})")]
    InvalidField { field: &'static str, code: &'static str },

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado")]
    Forbidden,

    #[error("Conta desativada")]
    AccountInactive,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("{0} não encontrado")]
    NotFound(&'static str),

    #[error("Transição de status inválida: {from:?} -> {to:?}")]
    InvalidStatusTransition { from: TicketStatus, to: TicketStatus },

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    #[error("Referência inválida: {0}")]
    ForeignKeyViolation(String),

    #[error("Arquivo excede {max_bytes} bytes")]
    FileTooLarge { max_bytes: usize },

    #[error("Tipo de arquivo não suportado: {0}")]
    UnsupportedFileType(String),

    #[error("Nenhum arquivo enviado")]
    EmptyFile,

    #[error("Limite de requisições excedido")]
    RateLimited { retry_after_secs: u64 },

    #[error("Integração não configurada: {0}")]
    IntegrationNotConfigured(&'static str),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro de cliente HTTP: {0}")]
    HttpClientError(#[from] reqwest::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

/// O corpo de erro que chega ao cliente (já traduzido).
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidField { .. } => StatusCode::BAD_REQUEST,
            AppError::EmptyFile | AppError::ForeignKeyViolation(_) => StatusCode::BAD_REQUEST,
            AppError::EmailAlreadyExists | AppError::UniqueConstraintViolation(_) => StatusCode::CONFLICT,
            AppError::InvalidStatusTransition { .. } => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden | AppError::AccountInactive => StatusCode::FORBIDDEN,
            AppError::UserNotFound | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UnsupportedFileType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::IntegrationNotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::HttpClientError(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Código estável usado para traduzir a mensagem.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) | AppError::InvalidField { .. } => "validation_error",
            AppError::EmailAlreadyExists => "email_already_exists",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::InvalidToken => "invalid_token",
            AppError::Forbidden => "forbidden",
            AppError::AccountInactive => "account_inactive",
            AppError::UserNotFound => "user_not_found",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidStatusTransition { .. } => "invalid_status_transition",
            AppError::UniqueConstraintViolation(_) => "unique_violation",
            AppError::ForeignKeyViolation(_) => "foreign_key_violation",
            AppError::FileTooLarge { .. } => "file_too_large",
            AppError::UnsupportedFileType(_) => "unsupported_file_type",
            AppError::EmptyFile => "empty_file",
            AppError::RateLimited { .. } => "rate_limited",
            AppError::IntegrationNotConfigured(_) => "integration_not_configured",
            AppError::HttpClientError(_) => "upstream_error",
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => "internal_error",
        }
    }

    /// Converte para a resposta pública, traduzida para o idioma do cliente.
    pub fn to_api_error(self, locale: &Locale, store: &I18nStore) -> ApiError {
        let status = self.status();
        let lang = locale.0.as_str();

        if status.is_server_error() {
            // O detalhe fica no log; o cliente só recebe a mensagem genérica
            tracing::error!("Erro Interno do Servidor: {}", self);
        }

        let details = match &self {
            AppError::ValidationError(errors) => {
                let mut details: HashMap<String, Vec<String>> = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages = field_errors
                        .iter()
                        .map(|e| {
                            let code = e.message.as_deref().unwrap_or(&e.code);
                            store.translate(lang, code)
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                Some(json!(details))
            }
            AppError::InvalidField { field, code } => {
                let mut map = serde_json::Map::new();
                map.insert(field.to_string(), json!([store.translate(lang, code)]));
                Some(Value::Object(map))
            }
            AppError::InvalidStatusTransition { from, to } => Some(json!({ "from": from, "to": to })),
            AppError::FileTooLarge { max_bytes } => Some(json!({ "maxBytes": max_bytes })),
            AppError::RateLimited { retry_after_secs } => {
                Some(json!({ "retryAfterSecs": retry_after_secs }))
            }
            _ => None,
        };

        ApiError {
            status,
            error: store.translate(lang, self.code()),
            details,
        }
    }
}

// Usado pelos middlewares, que ainda não têm o idioma resolvido.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retry_after = match &self {
            AppError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };

        let mut response = self
            .to_api_error(&Locale(DEFAULT_LANG.to_string()), &I18nStore::new())
            .into_response();

        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt() -> Locale {
        Locale("pt".into())
    }

    #[test]
    fn test_not_found_maps_to_404_with_translation() {
        let api = AppError::NotFound("Chamado").to_api_error(&Locale("en".into()), &I18nStore::new());
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert_eq!(api.error, "Record not found.");
        assert!(api.details.is_none());
    }

    #[test]
    fn test_database_error_hides_details() {
        let api = AppError::DatabaseError(sqlx::Error::PoolTimedOut).to_api_error(&pt(), &I18nStore::new());
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.error, "Ocorreu um erro inesperado.");
    }

    #[test]
    fn test_invalid_field_carries_field_details() {
        let api = AppError::InvalidField { field: "dueTo", code: "invalid_date_range" }
            .to_api_error(&pt(), &I18nStore::new());
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.unwrap();
        assert_eq!(details["dueTo"][0], "A data inicial deve ser anterior à final.");
    }

    #[test]
    fn test_transition_error_is_conflict() {
        let err = AppError::InvalidStatusTransition {
            from: TicketStatus::Closed,
            to: TicketStatus::Open,
        };
        assert_eq!(err.status(), StatusCode::CONFLICT);
        let api = err.to_api_error(&pt(), &I18nStore::new());
        assert_eq!(api.details.unwrap()["from"], "closed");
    }

    #[test]
    fn test_rate_limited_response_sets_retry_after() {
        let response = AppError::RateLimited { retry_after_secs: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }
}
