use serde::{Deserialize, Serialize};

use super::repo::{Refeicao, RefeicaoItem};

#[derive(Debug, Serialize)]
pub struct RefeicaoComItens {
    #[serde(flatten)]
    pub refeicao: Refeicao,
    pub itens: Vec<RefeicaoItem>,
}

#[derive(Debug, Deserialize)]
pub struct AnaliseUrlRequest {
    pub image_url: String,
}
