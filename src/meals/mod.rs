mod dto;
mod handlers;
mod repo;
mod service;

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/refeicoes/analisar-imagem/:usuario_id",
            post(handlers::analisar_imagem),
        )
        .route(
            "/refeicoes/analisar-url/:usuario_id",
            post(handlers::analisar_url),
        )
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}
