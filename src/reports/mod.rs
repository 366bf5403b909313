mod dto;
mod handlers;
mod repo;
mod service;

use axum::routing::{get, put};
use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/relatorios/aprovados/:id",
            get(handlers::listar_aprovados),
        )
        .route("/relatorios/:id", get(handlers::gerar_ou_buscar))
        .route("/relatorios/:id/sugestao-ia", get(handlers::sugestao_ia))
        .route("/relatorios/:id/aprovar", put(handlers::aprovar))
}
