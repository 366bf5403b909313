use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "status_relatorio", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusRelatorio {
    Pendente,
    // Definido no ciclo de vida mas nenhum fluxo o utiliza hoje.
    Revisado,
    Aprovado,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Relatorio {
    pub id: Uuid,
    pub usuario_id: Uuid,
    pub nutricionista_id: Option<Uuid>,
    pub periodo_inicio: Date,
    pub periodo_fim: Date,
    pub resumo_automatico: Option<String>,
    pub comentarios_nutricionista: Option<String>,
    pub status: StatusRelatorio,
    #[serde(with = "time::serde::rfc3339")]
    pub criado_em: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub data_aprovacao: Option<OffsetDateTime>,
}

pub async fn buscar_pendente(
    db: &PgPool,
    usuario_id: Uuid,
    periodo_inicio: Date,
    periodo_fim: Date,
) -> anyhow::Result<Option<Relatorio>> {
    let relatorio = sqlx::query_as::<_, Relatorio>(
        r#"
        SELECT id, usuario_id, nutricionista_id, periodo_inicio, periodo_fim,
               resumo_automatico, comentarios_nutricionista, status, criado_em, data_aprovacao
        FROM relatorios
        WHERE usuario_id = $1
          AND periodo_inicio = $2
          AND periodo_fim = $3
          AND status = $4
        "#,
    )
    .bind(usuario_id)
    .bind(periodo_inicio)
    .bind(periodo_fim)
    .bind(StatusRelatorio::Pendente)
    .fetch_optional(db)
    .await?;
    Ok(relatorio)
}

/// Insert guarded by the partial unique index on
/// (usuario_id, periodo_inicio, periodo_fim) WHERE status = 'PENDENTE'.
/// Returns None when a concurrent request won the race.
pub async fn inserir_pendente(
    db: &PgPool,
    usuario_id: Uuid,
    periodo_inicio: Date,
    periodo_fim: Date,
    resumo_automatico: &str,
) -> anyhow::Result<Option<Relatorio>> {
    let relatorio = sqlx::query_as::<_, Relatorio>(
        r#"
        INSERT INTO relatorios (id, usuario_id, periodo_inicio, periodo_fim, resumo_automatico, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (usuario_id, periodo_inicio, periodo_fim) WHERE status = 'PENDENTE'
        DO NOTHING
        RETURNING id, usuario_id, nutricionista_id, periodo_inicio, periodo_fim,
                  resumo_automatico, comentarios_nutricionista, status, criado_em, data_aprovacao
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(usuario_id)
    .bind(periodo_inicio)
    .bind(periodo_fim)
    .bind(resumo_automatico)
    .bind(StatusRelatorio::Pendente)
    .fetch_optional(db)
    .await?;
    Ok(relatorio)
}

pub async fn buscar_por_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Relatorio>> {
    let relatorio = sqlx::query_as::<_, Relatorio>(
        r#"
        SELECT id, usuario_id, nutricionista_id, periodo_inicio, periodo_fim,
               resumo_automatico, comentarios_nutricionista, status, criado_em, data_aprovacao
        FROM relatorios
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(relatorio)
}

/// Single-statement approval; no row is written when the id is unknown.
pub async fn aprovar(
    db: &PgPool,
    id: Uuid,
    nutricionista_id: Uuid,
    comentarios: Option<&str>,
) -> anyhow::Result<Option<Relatorio>> {
    let relatorio = sqlx::query_as::<_, Relatorio>(
        r#"
        UPDATE relatorios
        SET comentarios_nutricionista = $2,
            nutricionista_id = $3,
            status = $4,
            data_aprovacao = now()
        WHERE id = $1
        RETURNING id, usuario_id, nutricionista_id, periodo_inicio, periodo_fim,
                  resumo_automatico, comentarios_nutricionista, status, criado_em, data_aprovacao
        "#,
    )
    .bind(id)
    .bind(comentarios)
    .bind(nutricionista_id)
    .bind(StatusRelatorio::Aprovado)
    .fetch_optional(db)
    .await?;
    Ok(relatorio)
}

pub async fn listar_aprovados(db: &PgPool, usuario_id: Uuid) -> anyhow::Result<Vec<Relatorio>> {
    let relatorios = sqlx::query_as::<_, Relatorio>(
        r#"
        SELECT id, usuario_id, nutricionista_id, periodo_inicio, periodo_fim,
               resumo_automatico, comentarios_nutricionista, status, criado_em, data_aprovacao
        FROM relatorios
        WHERE usuario_id = $1 AND status = $2
        ORDER BY data_aprovacao DESC
        "#,
    )
    .bind(usuario_id)
    .bind(StatusRelatorio::Aprovado)
    .fetch_all(db)
    .await?;
    Ok(relatorios)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TotaisPeriodo {
    pub refeicoes: i64,
    pub calorias: f64,
    pub proteinas: f64,
    pub carboidratos: f64,
    pub gordura: f64,
}

/// Nutrient totals across every item of every meal whose timestamp falls in
/// the (inclusive) window. Missing per-item values are stored as 0.
pub async fn totais_no_periodo(
    db: &PgPool,
    usuario_id: Uuid,
    janela_inicio: OffsetDateTime,
    janela_fim: OffsetDateTime,
) -> anyhow::Result<TotaisPeriodo> {
    let (refeicoes,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM refeicoes
        WHERE usuario_id = $1 AND data_hora >= $2 AND data_hora <= $3
        "#,
    )
    .bind(usuario_id)
    .bind(janela_inicio)
    .bind(janela_fim)
    .fetch_one(db)
    .await?;

    let (calorias, proteinas, carboidratos, gordura): (f64, f64, f64, f64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(i.calorias), 0),
               COALESCE(SUM(i.proteinas), 0),
               COALESCE(SUM(i.carboidratos), 0),
               COALESCE(SUM(i.gordura), 0)
        FROM refeicao_itens i
        JOIN refeicoes r ON r.id = i.refeicao_id
        WHERE r.usuario_id = $1 AND r.data_hora >= $2 AND r.data_hora <= $3
        "#,
    )
    .bind(usuario_id)
    .bind(janela_inicio)
    .bind(janela_fim)
    .fetch_one(db)
    .await?;

    Ok(TotaisPeriodo {
        refeicoes,
        calorias,
        proteinas,
        carboidratos,
        gordura,
    })
}
