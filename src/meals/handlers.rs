use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use tracing::instrument;
use uuid::Uuid;

use super::dto::{AnaliseUrlRequest, RefeicaoComItens};
use super::service;
use crate::error::AppError;
use crate::state::AppState;

/// POST /refeicoes/analisar-imagem/:usuario_id (multipart, campo `file`)
#[instrument(skip(state, mp))]
pub async fn analisar_imagem(
    State(state): State<AppState>,
    Path(usuario_id): Path<Uuid>,
    mut mp: Multipart,
) -> Result<(StatusCode, Json<RefeicaoComItens>), AppError> {
    let mut arquivo: Option<(Bytes, Option<String>)> = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart inválido: {e}")))?
    {
        if field.name() == Some("file") {
            let content_type = field.content_type().map(|s| s.to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Falha ao ler o arquivo: {e}")))?;
            arquivo = Some((data, content_type));
            break;
        }
    }

    let (bytes, content_type) =
        arquivo.ok_or_else(|| AppError::Validation("Nenhum arquivo foi enviado.".into()))?;
    if !content_type.as_deref().unwrap_or("").starts_with("image/") {
        return Err(AppError::Validation(
            "O arquivo enviado não é uma imagem.".into(),
        ));
    }
    let format = image::guess_format(&bytes)
        .map_err(|_| AppError::Validation("Formato de imagem inválido.".into()))?;

    let refeicao = service::analisar_e_salvar(&state, usuario_id, bytes, format).await?;
    Ok((StatusCode::CREATED, Json(refeicao)))
}

/// POST /refeicoes/analisar-url/:usuario_id — baixa a imagem do link e segue
/// o mesmo pipeline do upload.
#[instrument(skip(state, body))]
pub async fn analisar_url(
    State(state): State<AppState>,
    Path(usuario_id): Path<Uuid>,
    Json(body): Json<AnaliseUrlRequest>,
) -> Result<(StatusCode, Json<RefeicaoComItens>), AppError> {
    let download_err =
        |_| AppError::Validation("Não foi possível baixar a imagem do link fornecido.".into());

    let response = state
        .http
        .get(&body.image_url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(download_err)?;
    let bytes = response.bytes().await.map_err(download_err)?;

    let format = image::guess_format(&bytes).map_err(|_| {
        AppError::Validation("O link não continha um formato de imagem válido.".into())
    })?;

    let refeicao = service::analisar_e_salvar(&state, usuario_id, bytes, format).await?;
    Ok((StatusCode::CREATED, Json(refeicao)))
}
