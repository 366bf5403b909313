use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Absent key does not prevent startup; every model-dependent endpoint
    /// degrades to a "not initialized" 500 instead.
    pub gemini_api_key: Option<String>,
    pub gemini_image_model: String,
    pub gemini_text_model: String,
    pub upload_dir: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL não definida")?;
        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        let gemini_image_model = std::env::var("GEMINI_IMAGE_MODEL")
            .unwrap_or_else(|_| "gemini-2.5-flash-lite".into());
        let gemini_text_model =
            std::env::var("GEMINI_TEXT_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".into());
        let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".into());
        Ok(Self {
            database_url,
            gemini_api_key,
            gemini_image_model,
            gemini_text_model,
            upload_dir,
        })
    }
}
