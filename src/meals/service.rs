use bytes::Bytes;
use image::ImageFormat;
use uuid::Uuid;

use super::dto::RefeicaoComItens;
use super::repo;
use crate::error::AppError;
use crate::llm::contract::parse_food_analysis;
use crate::state::AppState;

/// Fixed nutrition-extraction prompt; the JSON shape it requests is the
/// contract enforced by `llm::contract`.
const PROMPT_ANALISE_IMAGEM: &str = "\
Parse the image and return ONLY a JSON object as a response.
The JSON must contain a main list named 'food'.
Each item in the 'food' list must have the following attributes:
- 'name': Food name in pt-br (if it has a portuguese name).
- 'amount': Food amount in g.
- 'carbohydrates': Carbohydrates amount in g.
- 'proteins': Proteins amount in g.
- 'fats': Fat (lipids) amount in g.

If a macronutrient is not applicable or cannot be estimated, return a value of 0.
If the image contains no food, return an empty 'food' list.
";

fn extensao_da_imagem(format: ImageFormat) -> &'static str {
    match format {
        // normalize the common alias
        ImageFormat::Jpeg => "jpg",
        ImageFormat::Png => "png",
        ImageFormat::WebP => "webp",
        ImageFormat::Gif => "gif",
        other => other.extensions_str().first().copied().unwrap_or("bin"),
    }
}

/// Full analysis pipeline: persist the image, ask the model, enforce the
/// response contract and record the meal with its items in one transaction.
///
/// The image write is not transactional with the database write; a DB failure
/// after it leaves an orphaned file behind.
pub async fn analisar_e_salvar(
    state: &AppState,
    usuario_id: Uuid,
    imagem: Bytes,
    format: ImageFormat,
) -> Result<RefeicaoComItens, AppError> {
    let llm = state.llm()?;

    let nome_arquivo = format!("{}.{}", Uuid::new_v4(), extensao_da_imagem(format));
    state.storage.put_object(&nome_arquivo, imagem.clone()).await?;
    let imagem_url = format!("/uploads/{nome_arquivo}");
    tracing::debug!(%usuario_id, %imagem_url, "imagem persistida");

    let resposta = llm
        .generate_with_image(PROMPT_ANALISE_IMAGEM, &imagem, format.to_mime_type())
        .await?;
    let analise = parse_food_analysis(&resposta)?;

    let mut tx = state.db.begin().await?;
    let refeicao =
        repo::inserir_refeicao_tx(&mut tx, usuario_id, &imagem_url, &analise.document).await?;
    let mut itens = Vec::with_capacity(analise.food.len());
    for entry in &analise.food {
        itens.push(repo::inserir_item_tx(&mut tx, refeicao.id, entry).await?);
    }
    tx.commit().await?;

    tracing::info!(refeicao_id = %refeicao.id, %usuario_id, itens = itens.len(), "refeição analisada e registrada");
    Ok(RefeicaoComItens { refeicao, itens })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpeg_normaliza_para_jpg() {
        assert_eq!(extensao_da_imagem(ImageFormat::Jpeg), "jpg");
    }

    #[test]
    fn formatos_comuns_mantem_extensao() {
        assert_eq!(extensao_da_imagem(ImageFormat::Png), "png");
        assert_eq!(extensao_da_imagem(ImageFormat::WebP), "webp");
        assert_eq!(extensao_da_imagem(ImageFormat::Gif), "gif");
    }

    #[test]
    fn formato_incomum_usa_primeira_extensao_conhecida() {
        assert_eq!(extensao_da_imagem(ImageFormat::Bmp), "bmp");
    }

    #[tokio::test]
    async fn pipeline_sem_modelo_falha_antes_de_persistir() {
        let state = AppState::fake(None);
        let err = analisar_e_salvar(
            &state,
            Uuid::new_v4(),
            Bytes::from_static(b"\xff\xd8\xff"),
            ImageFormat::Jpeg,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::LlmNotInitialized));
    }
}
