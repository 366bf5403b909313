use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct PeriodoQuery {
    pub data_inicio: Option<Date>,
    pub data_fim: Option<Date>,
}

#[derive(Debug, Deserialize)]
pub struct AprovarQuery {
    pub nutricionista_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AprovarBody {
    pub comentarios_nutricionista: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SugestaoResponse {
    pub sugestao_texto: String,
}
