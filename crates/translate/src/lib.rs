mod chunking;
mod google;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use mausam_core::{Language, SoftResult};
use tracing::warn;

pub use chunking::chunk_text;
pub use google::GoogleTranslator;

/// Largest piece of text sent to the translation service in one call.
pub const CHUNK_SIZE: usize = 4500;

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String>;
}

/// Chunking, fail-soft wrapper around a [`Translator`].
///
/// Never returns an error: when any chunk fails the caller gets the original
/// text back as a `SoftResult::Fallback`.
#[derive(Clone)]
pub struct TranslationAdapter {
    translator: Arc<dyn Translator>,
    chunk_size: usize,
}

impl TranslationAdapter {
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self {
            translator,
            chunk_size: CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// English content to the user's language. English is returned untouched.
    pub async fn translate(&self, text: &str, target: Language) -> SoftResult<String> {
        if target.is_english() {
            return SoftResult::Value(text.to_string());
        }
        self.translate_chunked(text, Language::En, target).await
    }

    /// User input to English ahead of the chat model.
    pub async fn translate_to_english(&self, text: &str, source: Language) -> SoftResult<String> {
        if source.is_english() {
            return SoftResult::Value(text.to_string());
        }
        self.translate_chunked(text, source, Language::En).await
    }

    async fn translate_chunked(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> SoftResult<String> {
        if text.trim().is_empty() {
            return SoftResult::Value(text.to_string());
        }

        match self.try_translate(text, source, target).await {
            Ok(translated) => SoftResult::Value(translated),
            Err(err) => {
                warn!(
                    source = source.as_code(),
                    target = target.as_code(),
                    error = %format!("{err:#}"),
                    "translation failed, using original text"
                );
                SoftResult::fallback(text.to_string(), format!("{err:#}"))
            }
        }
    }

    async fn try_translate(&self, text: &str, source: Language, target: Language) -> Result<String> {
        let chunks = chunk_text(text, self.chunk_size);
        let mut translated = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            translated.push(self.translator.translate(chunk, source, target).await?);
        }
        Ok(translated.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingTranslator {
        calls: Mutex<Vec<(String, Language, Language)>>,
        fail_on_call: Option<usize>,
    }

    #[async_trait]
    impl Translator for RecordingTranslator {
        async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String> {
            let mut calls = self.calls.lock();
            calls.push((text.to_string(), source, target));
            if self.fail_on_call == Some(calls.len()) {
                bail!("quota exceeded");
            }
            Ok(format!("[{}:{}]", target.as_code(), text.chars().count()))
        }
    }

    #[tokio::test]
    async fn english_target_is_identity() {
        let fake = Arc::new(RecordingTranslator::default());
        let adapter = TranslationAdapter::new(fake.clone());

        let text = "Current weather in Surat, Gujarat:\nTemperature: 31°C";
        let result = adapter.translate(text, Language::En).await;

        assert_eq!(result, SoftResult::Value(text.to_string()));
        assert!(fake.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn long_text_is_translated_in_two_chunks() {
        let fake = Arc::new(RecordingTranslator::default());
        let adapter = TranslationAdapter::new(fake.clone());

        let text = "x".repeat(9000);
        let result = adapter.translate(&text, Language::Hi).await;

        assert_eq!(fake.calls.lock().len(), 2);
        assert_eq!(result.into_value(), "[hi:4500] [hi:4500]");
    }

    #[tokio::test]
    async fn text_at_chunk_size_is_one_call() {
        let fake = Arc::new(RecordingTranslator::default());
        let adapter = TranslationAdapter::new(fake.clone());

        let text = "ब".repeat(CHUNK_SIZE);
        let result = adapter.translate(&text, Language::Hi).await;

        assert_eq!(fake.calls.lock().len(), 1);
        assert_eq!(result.into_value(), "[hi:4500]");

        let result = adapter.translate(&format!("{text}!"), Language::Hi).await;
        assert_eq!(fake.calls.lock().len(), 3);
        assert_eq!(result.into_value(), "[hi:4500] [hi:1]");
    }

    #[tokio::test]
    async fn failure_returns_original_text() {
        let fake = Arc::new(RecordingTranslator {
            fail_on_call: Some(2),
            ..RecordingTranslator::default()
        });
        let adapter = TranslationAdapter::new(fake).with_chunk_size(10);

        let text = "a".repeat(25);
        let result = adapter.translate(&text, Language::Ta).await;

        assert!(result.is_degraded());
        assert_eq!(result.value(), &text);
        assert!(result.reason().unwrap_or_default().contains("quota"));
    }

    #[tokio::test]
    async fn inbound_translation_targets_english() {
        let fake = Arc::new(RecordingTranslator::default());
        let adapter = TranslationAdapter::new(fake.clone());

        let result = adapter.translate_to_english("आज मौसम कैसा है", Language::Hi).await;
        assert!(!result.is_degraded());

        let calls = fake.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!((calls[0].1, calls[0].2), (Language::Hi, Language::En));
    }

    #[tokio::test]
    async fn english_input_skips_inbound_translation() {
        let fake = Arc::new(RecordingTranslator::default());
        let adapter = TranslationAdapter::new(fake.clone());

        let result = adapter.translate_to_english("hello", Language::En).await;
        assert_eq!(result.into_value(), "hello");
        assert!(fake.calls.lock().is_empty());
    }
}
