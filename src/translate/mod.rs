mod openai;
mod retry;

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;

pub use openai::OpenAiTranslator;
pub use retry::RetryPolicy;

/// Result of translating one text unit. `confidence` is advisory only and
/// passed through untouched.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Translation {
    pub original_text: String,
    pub translated_text: String,
    pub confidence: f64,
}

/// Source/target language pair, passed through to the provider verbatim.
#[derive(Debug, Clone)]
pub struct TranslateOptions {
    pub source_lang: String,
    pub target_lang: String,
}

pub type TranslateFuture = Pin<Box<dyn Future<Output = Result<Translation>> + Send>>;

/// Remote translation, consumed as a black box: text plus language pair in,
/// translated text out. Failures are fatal to the calling page's run.
pub trait TranslateApi: Send + Sync {
    fn translate(&self, text: &str, options: &TranslateOptions) -> TranslateFuture;
}
