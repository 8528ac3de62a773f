//! Gemini `generateContent` client: the answer-synthesis collaborator.
//!
//! The core treats this as black-box text-in/text-out; a failed call is
//! surfaced per query and never crashes the serving loop.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use grimoire_core::config::LlmConfig;
use grimoire_core::traits::ChatModel;
use grimoire_core::types::{Role, Turn};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Fails when the configured API key variable is unset: a missing
    /// credential is a startup error, not a per-query one.
    pub fn from_config(cfg: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var(&cfg.api_key_env)
            .map_err(|_| anyhow!("environment variable {} is not set", cfg.api_key_env))?;
        Ok(Self::new(api_key, cfg.model.clone()))
    }

    pub fn new(api_key: String, model: String) -> Self {
        Self { http: reqwest::Client::new(), api_key, model }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

fn build_contents(prompt: &str, history: &[Turn]) -> Vec<Content> {
    let mut contents: Vec<Content> = history
        .iter()
        .map(|turn| Content {
            role: role_name(turn.role).to_string(),
            parts: vec![Part { text: turn.text.clone() }],
        })
        .collect();
    contents.push(Content {
        role: "user".to_string(),
        parts: vec![Part { text: prompt.to_string() }],
    });
    contents
}

fn extract_text(response: GenerateResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().map(|p| p.text).collect::<String>())
        .filter(|t| !t.trim().is_empty())
}

#[async_trait::async_trait]
impl ChatModel for GeminiClient {
    async fn complete(&self, prompt: &str, history: &[Turn]) -> Result<String> {
        let url = format!("{API_BASE}/{}:generateContent", self.model);
        tracing::debug!(model = %self.model, history_turns = history.len(), "calling chat model");
        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&GenerateRequest { contents: build_contents(prompt, history) })
            .send()
            .await
            .context("chat model request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("chat model returned {status}: {body}");
        }
        let parsed: GenerateResponse =
            response.json().await.context("chat model response was not valid JSON")?;
        extract_text(parsed).ok_or_else(|| anyhow!("chat model returned no text"))
    }
}
