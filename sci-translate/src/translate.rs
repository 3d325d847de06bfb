//! Translation orchestration: validate, split, dispatch per chunk, join.

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use indicatif::ProgressBar;
use llm_client::{LlmError, LlmProvider, LlmRequest};

use crate::config::{DispatchPolicy, TranslatorConfig};
use crate::error::{Result, TranslateError};
use crate::text::{Chunk, chunk_document};

const PROMPT_TEMPLATE: &str = "You are a professional translator specializing in scientific documents.
Translate the following text into \"{target_language}\", preserving the original formatting and layout as much as possible.

Original Text:
{text}";

/// Text plus the language to translate it into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub text: String,
    pub target_language: String,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_language: target_language.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationResult {
    pub translated_text: String,
}

/// One translation call against a remote service
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    async fn translate_chunk(
        &self,
        request: &TranslationRequest,
    ) -> std::result::Result<TranslationResult, LlmError>;
}

/// Backend that renders the scientific translation prompt for an LLM provider
pub struct LlmBackend {
    provider: Box<dyn LlmProvider>,
}

impl LlmBackend {
    pub fn new(provider: Box<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}

pub fn render_prompt(request: &TranslationRequest) -> String {
    PROMPT_TEMPLATE
        .replace("{target_language}", &request.target_language)
        .replace("{text}", &request.text)
}

#[async_trait]
impl TranslationBackend for LlmBackend {
    async fn translate_chunk(
        &self,
        request: &TranslationRequest,
    ) -> std::result::Result<TranslationResult, LlmError> {
        let response = self
            .provider
            .complete(LlmRequest::new(render_prompt(request)))
            .await?;

        if let Some(usage) = &response.usage {
            log::debug!(
                "{} tokens: {} in, {} out",
                response.model,
                usage.input_tokens,
                usage.output_tokens
            );
        }

        Ok(TranslationResult {
            translated_text: response.content,
        })
    }
}

/// Reject requests that should never reach the backend
pub fn validate_request(request: &TranslationRequest, min_text_len: usize) -> Result<()> {
    if request.text.chars().count() < min_text_len {
        return Err(TranslateError::invalid(
            "text",
            format!("Text must be at least {} characters long.", min_text_len),
        ));
    }

    if request.target_language.trim().is_empty() {
        return Err(TranslateError::invalid(
            "target_language",
            "Target language is required.",
        ));
    }

    Ok(())
}

/// Knobs for a translation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslateOptions {
    pub chunk_size: usize,
    pub min_text_len: usize,
    pub dispatch: DispatchPolicy,
    pub max_in_flight: Option<usize>,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        TranslateOptions::from(&TranslatorConfig::default())
    }
}

impl From<&TranslatorConfig> for TranslateOptions {
    fn from(config: &TranslatorConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            min_text_len: config.min_text_len,
            dispatch: config.dispatch,
            max_in_flight: config.max_in_flight,
        }
    }
}

/// Splits a document, sends every chunk to the backend, and reassembles the
/// translations in source order.
pub struct Translator<B> {
    backend: B,
    options: TranslateOptions,
    progress: Option<ProgressBar>,
}

impl<B: TranslationBackend> Translator<B> {
    pub fn new(backend: B, options: TranslateOptions) -> Self {
        Self {
            backend,
            options,
            progress: None,
        }
    }

    /// Report chunk completion on a progress bar
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Translate a whole document
    ///
    /// Any chunk failure fails the request; nothing is retried and no partial
    /// translation is returned.
    pub async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult> {
        validate_request(request, self.options.min_text_len)?;

        let chunks = chunk_document(&request.text, self.options.chunk_size);
        log::info!(
            "translating {} characters into {} as {} chunk(s), {:?} dispatch",
            request.text.chars().count(),
            request.target_language,
            chunks.len(),
            self.options.dispatch
        );

        if let Some(pb) = &self.progress {
            pb.set_length(chunks.len() as u64);
        }

        let results = match self.options.dispatch {
            DispatchPolicy::Sequential => {
                let mut results = Vec::with_capacity(chunks.len());
                for chunk in &chunks {
                    results.push(self.translate_one(chunk, &request.target_language).await?);
                }
                results
            }
            DispatchPolicy::Concurrent => {
                let limit = self
                    .options
                    .max_in_flight
                    .unwrap_or(chunks.len())
                    .max(1);

                // `buffered` yields in submission order, so results line up with chunks.
                stream::iter(
                    chunks
                        .iter()
                        .map(|chunk| self.translate_one(chunk, &request.target_language)),
                )
                .buffered(limit)
                .try_collect::<Vec<_>>()
                .await?
            }
        };

        let translated_text = results
            .into_iter()
            .map(|r| r.translated_text)
            .collect::<String>();

        Ok(TranslationResult { translated_text })
    }

    async fn translate_one(&self, chunk: &Chunk, target_language: &str) -> Result<TranslationResult> {
        let request = TranslationRequest::new(chunk.text.clone(), target_language);

        log::debug!(
            "chunk {}: sending {} characters",
            chunk.index,
            chunk.text.chars().count()
        );

        let result = self.backend.translate_chunk(&request).await.map_err(|e| {
            log::error!("Translation error on chunk {}: {}", chunk.index, e);
            if e.status_code() == Some(429) && self.options.dispatch == DispatchPolicy::Concurrent {
                log::warn!("backend is rate limiting; lower max_in_flight or use sequential dispatch");
            }
            TranslateError::Backend
        })?;

        if let Some(pb) = &self.progress {
            pb.inc(1);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_client::MockProvider;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Echoes `[LANG] text`, records every chunk, and can fail on one call.
    struct EchoBackend {
        calls: Mutex<Vec<String>>,
        fail_on: Option<usize>,
        delay_first: bool,
    }

    impl EchoBackend {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_on: None,
                delay_first: false,
            }
        }

        fn failing_on(call: usize) -> Self {
            Self {
                fail_on: Some(call),
                ..Self::new()
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TranslationBackend for EchoBackend {
        async fn translate_chunk(
            &self,
            request: &TranslationRequest,
        ) -> std::result::Result<TranslationResult, LlmError> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(request.text.clone());
                calls.len() - 1
            };

            if self.delay_first && call == 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }

            if self.fail_on == Some(call) {
                return Err(LlmError::Status {
                    status: 500,
                    message: "upstream exploded".to_string(),
                });
            }

            Ok(TranslationResult {
                translated_text: format!("[{}] {}", request.target_language, request.text),
            })
        }
    }

    fn options(dispatch: DispatchPolicy) -> TranslateOptions {
        TranslateOptions {
            chunk_size: 20,
            dispatch,
            ..TranslateOptions::default()
        }
    }

    fn three_chunk_text() -> String {
        // Three paragraphs, each too large to share a 20-character chunk.
        "First paragraph.\nSecond paragraph\nThird paragraph!".to_string()
    }

    #[tokio::test]
    async fn test_short_text_rejected_before_backend() {
        let translator = Translator::new(EchoBackend::new(), TranslateOptions::default());
        let err = translator
            .translate(&TranslationRequest::new("123456789", "French"))
            .await
            .unwrap_err();

        assert!(matches!(err, TranslateError::InvalidInput { field: "text", .. }));
        assert_eq!(translator.backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ten_characters_accepted() {
        let translator = Translator::new(EchoBackend::new(), TranslateOptions::default());
        let result = translator
            .translate(&TranslationRequest::new("0123456789", "French"))
            .await
            .unwrap();

        assert_eq!(result.translated_text, "[French] 0123456789");
        assert_eq!(translator.backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_language_rejected() {
        let translator = Translator::new(EchoBackend::new(), TranslateOptions::default());
        let err = translator
            .translate(&TranslationRequest::new("long enough text", "  "))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TranslateError::InvalidInput { field: "target_language", .. }
        ));
        assert_eq!(translator.backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_sequential_joins_in_order() {
        let text = three_chunk_text();
        let translator = Translator::new(EchoBackend::new(), options(DispatchPolicy::Sequential));
        let result = translator
            .translate(&TranslationRequest::new(text.clone(), "German"))
            .await
            .unwrap();

        let chunks = translator.backend.calls.lock().unwrap().clone();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), text);

        let expected: String = chunks.iter().map(|c| format!("[German] {}", c)).collect();
        assert_eq!(result.translated_text, expected);
    }

    #[tokio::test]
    async fn test_concurrent_preserves_order_when_first_chunk_is_slowest() {
        let text = three_chunk_text();
        let backend = EchoBackend {
            delay_first: true,
            ..EchoBackend::new()
        };
        let translator = Translator::new(backend, options(DispatchPolicy::Concurrent));
        let result = translator
            .translate(&TranslationRequest::new(text.clone(), "Korean"))
            .await
            .unwrap();

        let expected: String = crate::text::split_into_chunks(&text, 20)
            .iter()
            .map(|c| format!("[Korean] {}", c))
            .collect();
        assert_eq!(result.translated_text, expected);
        assert_eq!(translator.backend.call_count(), 3);
    }

    #[tokio::test]
    async fn test_sequential_failure_on_second_chunk_stops_without_retry() {
        let translator = Translator::new(
            EchoBackend::failing_on(1),
            options(DispatchPolicy::Sequential),
        );
        let err = translator
            .translate(&TranslationRequest::new(three_chunk_text(), "Italian"))
            .await
            .unwrap_err();

        assert_eq!(err, TranslateError::Backend);
        assert_eq!(translator.backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_failure_reports_single_error() {
        let translator = Translator::new(
            EchoBackend::failing_on(1),
            options(DispatchPolicy::Concurrent),
        );
        let err = translator
            .translate(&TranslationRequest::new(three_chunk_text(), "Italian"))
            .await
            .unwrap_err();

        assert_eq!(err, TranslateError::Backend);
        assert!(translator.backend.call_count() <= 3);
    }

    #[tokio::test]
    async fn test_concurrency_cap_of_one_behaves_sequentially() {
        let translator = Translator::new(
            EchoBackend::failing_on(1),
            TranslateOptions {
                max_in_flight: Some(1),
                ..options(DispatchPolicy::Concurrent)
            },
        );
        let result = translator
            .translate(&TranslationRequest::new(three_chunk_text(), "Arabic"))
            .await;

        assert!(result.is_err());
        assert_eq!(translator.backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_forced_split_dispatches_three_requests() {
        let text = "x".repeat(9999);
        let translator = Translator::new(EchoBackend::new(), TranslateOptions::default());
        translator
            .translate(&TranslationRequest::new(text, "Russian"))
            .await
            .unwrap();

        let sizes: Vec<usize> = translator
            .backend
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.len())
            .collect();
        assert_eq!(sizes, vec![4000, 4000, 1999]);
    }

    #[tokio::test]
    async fn test_progress_tracks_chunks() {
        let pb = ProgressBar::hidden();
        let translator = Translator::new(EchoBackend::new(), options(DispatchPolicy::Sequential))
            .with_progress(pb.clone());
        translator
            .translate(&TranslationRequest::new(three_chunk_text(), "Japanese"))
            .await
            .unwrap();

        assert_eq!(pb.length(), Some(3));
        assert_eq!(pb.position(), 3);
    }

    #[tokio::test]
    async fn test_llm_backend_renders_prompt() {
        let backend = LlmBackend::new(Box::new(MockProvider::echo()));
        let result = backend
            .translate_chunk(&TranslationRequest::new("Cells divide.", "Portuguese"))
            .await
            .unwrap();

        assert!(result.translated_text.contains("scientific documents"));
        assert!(result.translated_text.contains("into \"Portuguese\""));
        assert!(result.translated_text.ends_with("Original Text:\nCells divide."));
    }

    #[tokio::test]
    async fn test_llm_backend_error_becomes_generic_failure() {
        let backend = LlmBackend::new(Box::new(MockProvider::always_fails("401 bad key")));
        let translator = Translator::new(backend, TranslateOptions::default());
        let err = translator
            .translate(&TranslationRequest::new("The mitochondria is...", "French"))
            .await
            .unwrap_err();

        assert_eq!(err, TranslateError::Backend);
        assert!(!err.to_string().contains("401"));
    }
}
