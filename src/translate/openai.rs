use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;

use crate::error::PipelineError;

use super::retry::{is_retryable, retry_after, wait_with_backoff};
use super::{RetryPolicy, TranslateApi, TranslateFuture, TranslateOptions, Translation};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub(crate) const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const TEMPERATURE: f64 = 0.7;
const MAX_COMPLETION_TOKENS: u32 = 150;
/// The chat API reports no per-translation score; callers get a fixed
/// advisory value.
const REPORTED_CONFIDENCE: f64 = 0.9;

/// Chat-completions translation client. The credential is injected at
/// construction; there is no ambient environment lookup here.
#[derive(Debug, Clone)]
pub struct OpenAiTranslator {
    client: reqwest::Client,
    key: String,
    model: String,
    base_url: String,
    retry: RetryPolicy,
}

impl OpenAiTranslator {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(PipelineError::MissingCredential.into());
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .with_context(|| "failed to build HTTP client")?;
        Ok(Self {
            client,
            key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        if !base_url.trim().is_empty() {
            self.base_url = base_url.trim_end_matches('/').to_string();
        }
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    async fn call(&self, text: &str, options: &TranslateOptions) -> Result<Translation> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt(text, options)},
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_COMPLETION_TOKENS,
        });

        let mut attempt = 0usize;
        let mut delay = self.retry.base_delay;
        loop {
            attempt += 1;
            let response = self
                .client
                .post(&url)
                .bearer_auth(self.key.clone())
                .json(&body)
                .send()
                .await
                .map_err(|err| PipelineError::TranslationApi(err.to_string()))?;

            let status = response.status();
            let retry_hint = retry_after(response.headers());
            let payload = response.text().await.unwrap_or_default();
            if status.is_success() {
                let translated = parse_chat_response(&payload)?;
                return Ok(Translation {
                    original_text: text.to_string(),
                    translated_text: translated,
                    confidence: REPORTED_CONFIDENCE,
                });
            }
            if is_retryable(status, &payload) && attempt < self.retry.max_attempts {
                delay = wait_with_backoff(&self.retry, attempt, delay, retry_hint).await;
                continue;
            }
            let detail = extract_api_error(&payload).unwrap_or(payload);
            return Err(
                PipelineError::TranslationApi(format!("HTTP {}: {}", status, detail)).into(),
            );
        }
    }
}

impl TranslateApi for OpenAiTranslator {
    fn translate(&self, text: &str, options: &TranslateOptions) -> TranslateFuture {
        let translator = self.clone();
        let text = text.to_string();
        let options = options.clone();
        Box::pin(async move { translator.call(&text, &options).await })
    }
}

const SYSTEM_PROMPT: &str = "You are a professional manga and manhwa translator. \
Produce natural-sounding translations that keep the conversational style and \
emotional tone of the original, carry over exclamations and onomatopoeia in a \
fitting register, and preserve cultural context where it matters.";

fn user_prompt(text: &str, options: &TranslateOptions) -> String {
    format!(
        "Translate the following manga text from {} to {}. Keep the style and \
         tone of the original; the result should sound natural in speech. \
         Reply with the translation only, no labels or commentary.\n\nText: {}",
        options.source_lang, options.target_lang, text
    )
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

fn parse_chat_response(payload: &str) -> Result<String> {
    let parsed: ChatResponse = serde_json::from_str(payload)
        .map_err(|err| PipelineError::TranslationApi(format!("malformed response: {}", err)))?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| {
            PipelineError::TranslationApi("response contains no message content".to_string())
        })?;
    Ok(content.trim().to_string())
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

fn extract_api_error(payload: &str) -> Option<String> {
    let parsed: ApiErrorBody = serde_json::from_str(payload).ok()?;
    parsed.error.and_then(|detail| detail.message)
}
