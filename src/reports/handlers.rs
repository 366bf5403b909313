use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{AprovarBody, AprovarQuery, PeriodoQuery, SugestaoResponse};
use super::repo::Relatorio;
use super::service;
use crate::error::AppError;
use crate::state::AppState;

/// GET /relatorios/:usuario_id?data_inicio&data_fim
#[instrument(skip(state))]
pub async fn gerar_ou_buscar(
    State(state): State<AppState>,
    Path(usuario_id): Path<Uuid>,
    Query(periodo): Query<PeriodoQuery>,
) -> Result<Json<Relatorio>, AppError> {
    let relatorio =
        service::gerar_ou_buscar(&state, usuario_id, periodo.data_inicio, periodo.data_fim)
            .await?;
    Ok(Json(relatorio))
}

/// GET /relatorios/:relatorio_id/sugestao-ia
#[instrument(skip(state))]
pub async fn sugestao_ia(
    State(state): State<AppState>,
    Path(relatorio_id): Path<Uuid>,
) -> Result<Json<SugestaoResponse>, AppError> {
    let sugestao_texto = service::gerar_sugestao(&state, relatorio_id).await?;
    Ok(Json(SugestaoResponse { sugestao_texto }))
}

/// PUT /relatorios/:relatorio_id/aprovar?nutricionista_id=..
#[instrument(skip(state, body))]
pub async fn aprovar(
    State(state): State<AppState>,
    Path(relatorio_id): Path<Uuid>,
    Query(q): Query<AprovarQuery>,
    Json(body): Json<AprovarBody>,
) -> Result<Json<Relatorio>, AppError> {
    let relatorio = service::aprovar(
        &state,
        relatorio_id,
        q.nutricionista_id,
        body.comentarios_nutricionista,
    )
    .await?;
    Ok(Json(relatorio))
}

/// GET /relatorios/aprovados/:usuario_id
#[instrument(skip(state))]
pub async fn listar_aprovados(
    State(state): State<AppState>,
    Path(usuario_id): Path<Uuid>,
) -> Result<Json<Vec<Relatorio>>, AppError> {
    let relatorios = service::aprovados(&state, usuario_id).await?;
    Ok(Json(relatorios))
}
