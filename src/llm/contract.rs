//! Decoding of the loosely-specified contract the vision model is instructed
//! to follow: a single JSON object `{"food": [...]}`, routinely wrapped in a
//! fenced code block. All "the model might say anything" handling lives here.

use serde::{Deserialize, Serialize};

/// One entry of the model's `food` list. Numeric fields the model omits or
/// cannot estimate default to 0. `calories` is not requested by the prompt
/// but tolerated when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub carbohydrates: f64,
    #[serde(default)]
    pub proteins: f64,
    #[serde(default)]
    pub fats: f64,
    #[serde(default)]
    pub calories: f64,
}

/// Successfully decoded model output: the JSON document as received plus the
/// typed food entries.
#[derive(Debug, Clone, PartialEq)]
pub struct FoodAnalysis {
    pub document: serde_json::Value,
    pub food: Vec<FoodEntry>,
}

#[derive(Debug, thiserror::Error)]
#[error("A resposta da IA não era um JSON válido.")]
pub struct ContractViolation {
    /// Original model text, kept for diagnostics.
    pub raw: String,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Debug, Deserialize)]
struct FoodDocument {
    // A missing `food` list means "no food", not a violation.
    #[serde(default)]
    food: Vec<FoodEntry>,
}

/// Removes one leading/trailing fenced-code marker (with or without a
/// language tag) and surrounding whitespace.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```") {
        s = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

pub fn parse_food_analysis(raw: &str) -> Result<FoodAnalysis, ContractViolation> {
    let cleaned = strip_code_fences(raw);
    let document: serde_json::Value =
        serde_json::from_str(cleaned).map_err(|source| ContractViolation {
            raw: raw.to_string(),
            source,
        })?;
    let parsed: FoodDocument =
        serde_json::from_value(document.clone()).map_err(|source| ContractViolation {
            raw: raw.to_string(),
            source,
        })?;
    Ok(FoodAnalysis {
        document,
        food: parsed.food,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str =
        r#"{"food":[{"name":"Arroz","amount":100,"carbohydrates":28,"proteins":2.5,"fats":0.3}]}"#;

    #[test]
    fn cerca_com_tag_de_linguagem_e_removida() {
        let wrapped = format!("```json\n{PAYLOAD}\n```");
        let direto = parse_food_analysis(PAYLOAD).unwrap();
        let embrulhado = parse_food_analysis(&wrapped).unwrap();
        assert_eq!(direto, embrulhado);
    }

    #[test]
    fn cerca_sem_tag_e_removida() {
        let wrapped = format!("\n  ```\n{PAYLOAD}\n```  \n");
        let embrulhado = parse_food_analysis(&wrapped).unwrap();
        assert_eq!(embrulhado.food.len(), 1);
        assert_eq!(embrulhado.food[0].name, "Arroz");
    }

    #[test]
    fn campos_numericos_ausentes_valem_zero() {
        let analise = parse_food_analysis(r#"{"food":[{"name":"Água"}]}"#).unwrap();
        let item = &analise.food[0];
        assert_eq!(item.amount, 0.0);
        assert_eq!(item.carbohydrates, 0.0);
        assert_eq!(item.proteins, 0.0);
        assert_eq!(item.fats, 0.0);
        assert_eq!(item.calories, 0.0);
    }

    #[test]
    fn lista_vazia_e_lista_ausente_nao_sao_erro() {
        assert!(parse_food_analysis(r#"{"food":[]}"#).unwrap().food.is_empty());
        assert!(parse_food_analysis(r#"{}"#).unwrap().food.is_empty());
    }

    #[test]
    fn calorias_sao_toleradas_quando_presentes() {
        let analise =
            parse_food_analysis(r#"{"food":[{"name":"Pão","calories":250}]}"#).unwrap();
        assert_eq!(analise.food[0].calories, 250.0);
    }

    #[test]
    fn violacao_retem_o_texto_original() {
        let raw = "Claro! Aqui está a análise do seu prato:";
        let err = parse_food_analysis(raw).unwrap_err();
        assert_eq!(err.raw, raw);
    }

    #[test]
    fn texto_sem_cerca_passa_inalterado() {
        assert_eq!(strip_code_fences("  olá mundo  "), "olá mundo");
        assert_eq!(strip_code_fences("```\nolá\n```"), "olá");
    }
}
