use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::llm::contract::ContractViolation;
use crate::llm::gemini::LlmError;

/// Error taxonomy for the whole service. Handlers return `Result<_, AppError>`
/// and the `IntoResponse` impl below is the single place errors become HTTP.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Análise recusada pelo modelo: {0}")]
    ModelRefused(String),
    #[error("Limite de requisições do modelo de IA excedido. Tente novamente mais tarde.")]
    RateLimited,
    #[error("A resposta da IA não era um JSON válido.")]
    InvalidModelOutput {
        raw: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Modelo de IA não inicializado corretamente.")]
    LlmNotInitialized,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(e.into())
    }
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::RateLimited => AppError::RateLimited,
            LlmError::Blocked { reason } => AppError::ModelRefused(reason),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl From<ContractViolation> for AppError {
    fn from(e: ContractViolation) -> Self {
        AppError::InvalidModelOutput {
            raw: e.raw,
            source: e.source,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::ModelRefused(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            AppError::InvalidModelOutput { raw, source } => {
                // The raw text stays in the logs for diagnostics; it is never
                // echoed back to the caller.
                tracing::error!(error = %source, raw = %raw, "resposta da IA fora do contrato");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::LlmNotInitialized => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Internal(e) => {
                tracing::error!(error = ?e, "erro interno não classificado");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.".to_string(),
                )
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::gemini::LlmError;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn mapeia_erros_para_status_http() {
        assert_eq!(
            status_of(AppError::Validation("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::NotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::ModelRefused("SAFETY".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(AppError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            status_of(AppError::LlmNotInitialized),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(AppError::Internal(anyhow::anyhow!("boom"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn erros_do_gateway_viram_condicoes_tipadas() {
        assert!(matches!(
            AppError::from(LlmError::RateLimited),
            AppError::RateLimited
        ));
        assert!(matches!(
            AppError::from(LlmError::Blocked {
                reason: "SAFETY".into()
            }),
            AppError::ModelRefused(_)
        ));
        assert!(matches!(
            AppError::from(LlmError::Empty),
            AppError::Internal(_)
        ));
    }

    #[test]
    fn erro_interno_nao_vaza_detalhe() {
        let resp = AppError::Internal(anyhow::anyhow!("segredo interno")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
