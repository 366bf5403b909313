use time::{Date, Duration, OffsetDateTime, Time};
use uuid::Uuid;

use super::repo::{self, Relatorio, TotaisPeriodo};
use crate::error::AppError;
use crate::llm::contract::strip_code_fences;
use crate::state::AppState;

/// Fixed instructional template for the nutritionist-feedback draft; the
/// report summary is embedded verbatim.
fn montar_prompt_sugestao(resumo: &str) -> String {
    format!(
        "Act like an professional nutricionist and based on the info about his diet, \
         write a very short feedback for the user (in português-BR).\n\
         The feedback must try to reinforce positive behavior and point out what the \
         pacient should do to achieve a healthier diet.\n\
         The feedback should also be on point and professional instead of extense, do not do chit chat\n\
         Avoid technical jargon, to try engage the patient.\n\
         \n\
         SUMMARY:\n\
         {resumo}\n\
         \n\
         SUGESTED COMMENT:\n"
    )
}

/// Applies the default 14-day window and validates the range before any
/// report lookup happens.
pub fn resolver_periodo(
    data_inicio: Option<Date>,
    data_fim: Option<Date>,
    hoje: Date,
) -> Result<(Date, Date), AppError> {
    let fim = data_fim.unwrap_or(hoje);
    let inicio = data_inicio.unwrap_or(fim - Duration::days(14));

    if inicio > hoje {
        return Err(AppError::Validation(
            "Data inválida: A data de início não pode ser no futuro.".into(),
        ));
    }
    if inicio > fim {
        return Err(AppError::Validation(
            "Data inválida: A data de início não pode ser após a data final.".into(),
        ));
    }
    Ok((inicio, fim))
}

/// Inclusive timestamp window [start-of-day(inicio), end-of-day(fim)].
pub fn janela_do_periodo(inicio: Date, fim: Date) -> (OffsetDateTime, OffsetDateTime) {
    (
        inicio.midnight().assume_utc(),
        fim.with_time(Time::MAX).assume_utc(),
    )
}

fn formatar_data(d: Date) -> String {
    let fmt = time::macros::format_description!("[day]/[month]/[year]");
    d.format(fmt).unwrap_or_else(|_| d.to_string())
}

pub fn montar_resumo(inicio: Date, fim: Date, t: &TotaisPeriodo) -> String {
    format!(
        "Relatório do período: {} a {}\n\
         Total de refeições registradas: {}\n\
         Resumo de Macronutrientes (Total):\n\
         - Calorias Totais: {:.2} kcal\n\
         - Proteínas Totais: {:.2} g\n\
         - Carboidratos Totais: {:.2} g\n\
         - Gorduras Totais: {:.2} g",
        formatar_data(inicio),
        formatar_data(fim),
        t.refeicoes,
        t.calorias,
        t.proteinas,
        t.carboidratos,
        t.gordura,
    )
}

/// Returns the PENDENTE report for the exact (usuário, período) tuple when
/// one exists; otherwise aggregates the window and creates a new one. The
/// reused report can be stale if meals were logged after its creation.
pub async fn gerar_ou_buscar(
    state: &AppState,
    usuario_id: Uuid,
    data_inicio: Option<Date>,
    data_fim: Option<Date>,
) -> Result<Relatorio, AppError> {
    let hoje = OffsetDateTime::now_utc().date();
    let (inicio, fim) = resolver_periodo(data_inicio, data_fim, hoje)?;

    if let Some(existente) = repo::buscar_pendente(&state.db, usuario_id, inicio, fim).await? {
        tracing::debug!(relatorio_id = %existente.id, "relatório pendente já existe, reutilizando");
        return Ok(existente);
    }

    let (janela_inicio, janela_fim) = janela_do_periodo(inicio, fim);
    let totais = repo::totais_no_periodo(&state.db, usuario_id, janela_inicio, janela_fim).await?;
    let resumo = montar_resumo(inicio, fim, &totais);

    match repo::inserir_pendente(&state.db, usuario_id, inicio, fim, &resumo).await? {
        Some(novo) => {
            tracing::info!(relatorio_id = %novo.id, %usuario_id, "novo relatório criado");
            Ok(novo)
        }
        // Uma requisição concorrente inseriu primeiro; o índice parcial
        // garante que existe exatamente um para reutilizar.
        None => repo::buscar_pendente(&state.db, usuario_id, inicio, fim)
            .await?
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "relatório pendente ausente após conflito de inserção"
                ))
            }),
    }
}

/// Drafts nutritionist-facing feedback from the report summary. Does not
/// mutate the report.
pub async fn gerar_sugestao(state: &AppState, relatorio_id: Uuid) -> Result<String, AppError> {
    let llm = state.llm()?;

    let relatorio = repo::buscar_por_id(&state.db, relatorio_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Relatório não encontrado".into()))?;
    let resumo = relatorio
        .resumo_automatico
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| {
            AppError::Validation("Relatório não contém resumo para análise.".into())
        })?;

    let sugestao = llm.generate_text(&montar_prompt_sugestao(&resumo)).await?;
    Ok(strip_code_fences(&sugestao).to_string())
}

/// Re-approval overwrites nutritionist, comment and approval time silently.
pub async fn aprovar(
    state: &AppState,
    relatorio_id: Uuid,
    nutricionista_id: Uuid,
    comentarios: Option<String>,
) -> Result<Relatorio, AppError> {
    let relatorio = repo::aprovar(
        &state.db,
        relatorio_id,
        nutricionista_id,
        comentarios.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Relatório não encontrado".into()))?;

    tracing::info!(%relatorio_id, %nutricionista_id, "relatório aprovado");
    Ok(relatorio)
}

pub async fn aprovados(state: &AppState, usuario_id: Uuid) -> Result<Vec<Relatorio>, AppError> {
    Ok(repo::listar_aprovados(&state.db, usuario_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    const HOJE: Date = date!(2026 - 08 - 23);

    #[test]
    fn periodo_sem_datas_usa_ultimos_14_dias() {
        let (inicio, fim) = resolver_periodo(None, None, HOJE).unwrap();
        assert_eq!(fim, HOJE);
        assert_eq!(inicio, HOJE - Duration::days(14));
    }

    #[test]
    fn periodo_sem_inicio_conta_14_dias_do_fim() {
        let fim = date!(2026 - 08 - 01);
        let (inicio, fim_resolvido) = resolver_periodo(None, Some(fim), HOJE).unwrap();
        assert_eq!(fim_resolvido, fim);
        assert_eq!(inicio, date!(2026 - 07 - 18));
    }

    #[test]
    fn inicio_no_futuro_e_rejeitado() {
        let err = resolver_periodo(Some(date!(2026 - 09 - 01)), None, HOJE).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn inicio_apos_fim_e_rejeitado() {
        let err = resolver_periodo(
            Some(date!(2026 - 08 - 10)),
            Some(date!(2026 - 08 - 01)),
            HOJE,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn janela_inclui_o_fim_do_dia_e_exclui_um_microssegundo_depois() {
        let (inicio, fim) = janela_do_periodo(date!(2026 - 01 - 01), date!(2026 - 01 - 14));
        assert_eq!(inicio, datetime!(2026 - 01 - 01 00:00 UTC));

        let exatamente_no_fim = datetime!(2026 - 01 - 14 23:59:59.999999 UTC);
        assert!(exatamente_no_fim <= fim);
        assert!(exatamente_no_fim + Duration::microseconds(1) > fim);
    }

    #[test]
    fn resumo_sem_refeicoes_mostra_zeros() {
        let totais = TotaisPeriodo {
            refeicoes: 0,
            calorias: 0.0,
            proteinas: 0.0,
            carboidratos: 0.0,
            gordura: 0.0,
        };
        let resumo = montar_resumo(date!(2026 - 08 - 09), date!(2026 - 08 - 23), &totais);
        assert!(resumo.contains("Relatório do período: 09/08/2026 a 23/08/2026"));
        assert!(resumo.contains("Total de refeições registradas: 0"));
        assert!(resumo.contains("- Calorias Totais: 0.00 kcal"));
        assert!(resumo.contains("- Proteínas Totais: 0.00 g"));
        assert!(resumo.contains("- Carboidratos Totais: 0.00 g"));
        assert!(resumo.contains("- Gorduras Totais: 0.00 g"));
    }

    #[test]
    fn resumo_formata_totais_com_duas_casas() {
        let totais = TotaisPeriodo {
            refeicoes: 3,
            calorias: 1234.567,
            proteinas: 80.0,
            carboidratos: 28.126,
            gordura: 0.3,
        };
        let resumo = montar_resumo(date!(2026 - 08 - 01), date!(2026 - 08 - 15), &totais);
        assert!(resumo.contains("Total de refeições registradas: 3"));
        assert!(resumo.contains("- Calorias Totais: 1234.57 kcal"));
        assert!(resumo.contains("- Proteínas Totais: 80.00 g"));
        assert!(resumo.contains("- Carboidratos Totais: 28.13 g"), "{resumo}");
        assert!(resumo.contains("- Gorduras Totais: 0.30 g"));
    }

    #[test]
    fn prompt_de_sugestao_embute_o_resumo() {
        let prompt = montar_prompt_sugestao("Relatório do período: X");
        assert!(prompt.contains("SUMMARY:\nRelatório do período: X"));
        assert!(prompt.ends_with("SUGESTED COMMENT:\n"));
    }
}
