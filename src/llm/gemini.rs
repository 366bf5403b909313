use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("limite de requisições da API do modelo excedido")]
    RateLimited,
    #[error("geração bloqueada pelo modelo: {reason}")]
    Blocked { reason: String },
    #[error("falha de transporte ao chamar a API do modelo")]
    Transport(#[from] reqwest::Error),
    #[error("API do modelo retornou {status}: {body}")]
    Api { status: u16, body: String },
    #[error("resposta do modelo sem texto")]
    Empty,
}

/// Gateway to the external generative model. A trait so the pipeline and the
/// report services can be exercised with scripted fakes.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError>;

    async fn generate_with_image(
        &self,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, LlmError>;
}

pub struct GeminiClient {
    api_key: String,
    image_model: String,
    text_model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: String, image_model: String, text_model: String) -> Self {
        Self {
            api_key,
            image_model,
            text_model,
            client: reqwest::Client::new(),
        }
    }

    async fn call(&self, model: &str, request: GeminiRequest) -> Result<String, LlmError> {
        let url = format!("{API_BASE}/{model}:generateContent?key={}", self.api_key);

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, %body, "erro da API do Gemini");
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GeminiResponse = response.json().await?;
        extract_text(parsed)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError> {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part::Text {
                    text: prompt.to_string(),
                }],
            }],
            safety_settings: permissive_safety_settings(),
        };
        self.call(&self.text_model, request).await
    }

    async fn generate_with_image(
        &self,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, LlmError> {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: prompt.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data: general_purpose::STANDARD.encode(image),
                        },
                    },
                ],
            }],
            safety_settings: permissive_safety_settings(),
        };
        self.call(&self.image_model, request).await
    }
}

/// The gateway never blocks on the model's own content categories; a block
/// that still happens is surfaced as `LlmError::Blocked`.
fn permissive_safety_settings() -> Vec<SafetySetting> {
    [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ]
    .into_iter()
    .map(|category| SafetySetting {
        category: category.to_string(),
        threshold: "BLOCK_NONE".to_string(),
    })
    .collect()
}

fn extract_text(response: GeminiResponse) -> Result<String, LlmError> {
    if let Some(text) = response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .and_then(|c| c.parts.first())
        .and_then(|p| p.text.clone())
    {
        return Ok(text);
    }

    // No text materialized: report why generation was blocked, if known.
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.clone())
    {
        return Err(LlmError::Blocked { reason });
    }
    if let Some(reason) = response
        .candidates
        .first()
        .and_then(|c| c.finish_reason.clone())
        .filter(|r| r == "SAFETY")
    {
        return Err(LlmError::Blocked { reason });
    }

    Err(LlmError::Empty)
}

// --- generateContent wire types ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: String,
    threshold: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GeminiResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn extrai_texto_do_primeiro_candidato() {
        let resp = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"olá"}]},"finishReason":"STOP"}]}"#,
        );
        assert_eq!(extract_text(resp).unwrap(), "olá");
    }

    #[test]
    fn bloqueio_de_prompt_vira_blocked_com_motivo() {
        let resp = parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        match extract_text(resp) {
            Err(LlmError::Blocked { reason }) => assert_eq!(reason, "SAFETY"),
            other => panic!("esperava Blocked, obteve {other:?}"),
        }
    }

    #[test]
    fn candidato_interrompido_por_safety_vira_blocked() {
        let resp = parse(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#);
        assert!(matches!(extract_text(resp), Err(LlmError::Blocked { .. })));
    }

    #[test]
    fn resposta_sem_texto_e_sem_motivo_vira_empty() {
        let resp = parse(r#"{"candidates":[]}"#);
        assert!(matches!(extract_text(resp), Err(LlmError::Empty)));
    }

    #[test]
    fn requisicao_serializa_safety_settings_em_camel_case() {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part::Text {
                    text: "oi".into(),
                }],
            }],
            safety_settings: permissive_safety_settings(),
        };
        let json = serde_json::to_value(&request).unwrap();
        let settings = json["safetySettings"].as_array().unwrap();
        assert_eq!(settings.len(), 4);
        for s in settings {
            assert_eq!(s["threshold"], "BLOCK_NONE");
        }
    }
}
