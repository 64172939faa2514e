// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
// As variantes cobrem a taxonomia do ciclo de vida de assinaturas.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Recurso inexistente (assinatura, plano, pagamento, taxa de câmbio).
    #[error("{0}")]
    NotFound(String),

    // Conflito de estado: assinatura aberta duplicada, referência de pagamento repetida.
    #[error("{0}")]
    Conflict(String),

    // Troca de plano violaria o uso atual de algum recurso.
    #[error("{0}")]
    LimitViolation(String),

    // Movimento ilegal na máquina de estados (assinatura ou pagamento).
    #[error("{0}")]
    InvalidTransition(String),

    // Falha na checagem de versão otimista: outra escrita venceu. O chamador deve reler e repetir.
    #[error("O registro foi modificado por outra operação. Tente novamente.")]
    ConcurrentModification,

    // Valor monetário fora das regras (pagamento negativo, reembolso maior que o pago).
    #[error("{0}")]
    InvalidAmount(String),

    // Variante para erros de banco de dados (sqlx)
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        // Violação de unicidade vira conflito: é o backstop do banco para corridas
        // (duas criações simultâneas, referência de pagamento repetida).
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some("23505") {
                return AppError::Conflict(
                    "Registro conflita com outro já existente.".to_string(),
                );
            }
        }
        AppError::DatabaseError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::LimitViolation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::InvalidTransition(msg) => (StatusCode::CONFLICT, msg),
            AppError::ConcurrentModification => (
                StatusCode::CONFLICT,
                "O registro foi modificado por outra operação. Tente novamente.".to_string(),
            ),
            AppError::InvalidAmount(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),

            // Os demais (DatabaseError, InternalServerError) viram 500.
            // O `tracing` loga a mensagem detalhada que o `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
