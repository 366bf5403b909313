use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::llm::contract::FoodEntry;

/// One logged eating event. Immutable after creation; items are created in
/// the same transaction and removed by cascade.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Refeicao {
    pub id: Uuid,
    pub usuario_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub data_hora: OffsetDateTime,
    pub imagem_url: String,
    pub llm_raw_response: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefeicaoItem {
    pub id: Uuid,
    pub refeicao_id: Uuid,
    pub nome_alimento: String,
    pub quantidade: f64,
    pub calorias: f64,
    pub proteinas: f64,
    pub carboidratos: f64,
    pub gordura: f64,
}

pub async fn inserir_refeicao_tx(
    tx: &mut Transaction<'_, Postgres>,
    usuario_id: Uuid,
    imagem_url: &str,
    llm_raw_response: &serde_json::Value,
) -> anyhow::Result<Refeicao> {
    let refeicao = sqlx::query_as::<_, Refeicao>(
        r#"
        INSERT INTO refeicoes (id, usuario_id, imagem_url, llm_raw_response)
        VALUES ($1, $2, $3, $4)
        RETURNING id, usuario_id, data_hora, imagem_url, llm_raw_response
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(usuario_id)
    .bind(imagem_url)
    .bind(llm_raw_response)
    .fetch_one(&mut **tx)
    .await?;
    Ok(refeicao)
}

/// The contract's `fats` maps to the stored `gordura` column and the
/// tolerated `calories` to `calorias`.
pub async fn inserir_item_tx(
    tx: &mut Transaction<'_, Postgres>,
    refeicao_id: Uuid,
    entry: &FoodEntry,
) -> anyhow::Result<RefeicaoItem> {
    let item = sqlx::query_as::<_, RefeicaoItem>(
        r#"
        INSERT INTO refeicao_itens
            (id, refeicao_id, nome_alimento, quantidade, calorias, proteinas, carboidratos, gordura)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, refeicao_id, nome_alimento, quantidade, calorias, proteinas, carboidratos, gordura
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(refeicao_id)
    .bind(&entry.name)
    .bind(entry.amount)
    .bind(entry.calories)
    .bind(entry.proteins)
    .bind(entry.carbohydrates)
    .bind(entry.fats)
    .fetch_one(&mut **tx)
    .await?;
    Ok(item)
}
