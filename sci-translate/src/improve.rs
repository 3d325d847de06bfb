//! Review pass: ask the model to improve an existing translation and explain why.

use llm_client::{LlmProvider, LlmRequest};
use serde::Deserialize;

use crate::error::{Result, TranslateError};

const SYSTEM_PROMPT: &str = "You are a professional translator. You are provided with an original text segment, its translation, and the target language of the translation. Your task is to improve the translated text segment and provide an explanation of the improvements you made.

Respond with a single JSON object and nothing else:
{\"improvedTranslation\": \"...\", \"explanation\": \"...\"}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImprovementRequest {
    pub original_text: String,
    pub translated_text: String,
    pub target_language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImprovementSuggestion {
    pub improved_translation: String,
    pub explanation: String,
}

fn render_prompt(request: &ImprovementRequest) -> String {
    format!(
        "Original Text: {}\nTranslated Text: {}\nTarget Language: {}\n\nImprove the translated text and provide an explanation of the improvements.",
        request.original_text, request.translated_text, request.target_language
    )
}

/// Pull the JSON object out of a reply that may be wrapped in prose or code fences
fn parse_suggestion(reply: &str) -> Option<ImprovementSuggestion> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&reply[start..=end]).ok()
}

fn validate(request: &ImprovementRequest) -> Result<()> {
    let fields = [
        ("original_text", &request.original_text),
        ("translated_text", &request.translated_text),
        ("target_language", &request.target_language),
    ];

    for (field, value) in fields {
        if value.trim().is_empty() {
            return Err(TranslateError::invalid(field, "This field is required."));
        }
    }
    Ok(())
}

/// Ask the provider for an improved translation of one segment
pub async fn suggest_improvements(
    provider: &dyn LlmProvider,
    request: &ImprovementRequest,
) -> Result<ImprovementSuggestion> {
    validate(request)?;

    let llm_request = LlmRequest::new(render_prompt(request))
        .with_system_prompt(SYSTEM_PROMPT)
        .with_temperature(0.2);

    let response = provider.complete(llm_request).await.map_err(|e| {
        log::error!("Improvement request failed: {}", e);
        TranslateError::Backend
    })?;

    parse_suggestion(&response.content).ok_or_else(|| {
        log::error!(
            "Improvement reply was not the expected JSON object: {:?}",
            response.content
        );
        TranslateError::Backend
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_client::MockProvider;

    fn request() -> ImprovementRequest {
        ImprovementRequest {
            original_text: "The enzyme is denatured.".to_string(),
            translated_text: "La enzima es desnaturalizada.".to_string(),
            target_language: "Spanish".to_string(),
        }
    }

    #[test]
    fn test_parse_plain_json() {
        let reply = r#"{"improvedTranslation": "La enzima se desnaturaliza.", "explanation": "Pasiva refleja."}"#;
        let suggestion = parse_suggestion(reply).unwrap();
        assert_eq!(suggestion.improved_translation, "La enzima se desnaturaliza.");
        assert_eq!(suggestion.explanation, "Pasiva refleja.");
    }

    #[test]
    fn test_parse_fenced_json() {
        let reply = "Here you go:\n```json\n{\"improvedTranslation\": \"x\", \"explanation\": \"y\"}\n```";
        assert_eq!(
            parse_suggestion(reply),
            Some(ImprovementSuggestion {
                improved_translation: "x".to_string(),
                explanation: "y".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_rejects_prose() {
        assert!(parse_suggestion("I think it is fine.").is_none());
        assert!(parse_suggestion("} backwards {").is_none());
    }

    #[tokio::test]
    async fn test_suggest_improvements_sends_all_fields() {
        let provider = MockProvider::always_succeeds(
            r#"{"improvedTranslation": "La enzima se desnaturaliza.", "explanation": "More natural."}"#,
        );
        let suggestion = suggest_improvements(&provider, &request()).await.unwrap();

        assert_eq!(suggestion.explanation, "More natural.");
        let requests = provider.requests();
        let sent = &requests[0];
        assert!(sent.prompt.contains("Original Text: The enzyme is denatured."));
        assert!(sent.prompt.contains("Target Language: Spanish"));
        assert!(sent.system_prompt.as_deref().unwrap().contains("improvedTranslation"));
    }

    #[tokio::test]
    async fn test_unparseable_reply_is_backend_error() {
        let provider = MockProvider::always_succeeds("Looks good to me!");
        let err = suggest_improvements(&provider, &request()).await.unwrap_err();
        assert_eq!(err, TranslateError::Backend);
    }

    #[tokio::test]
    async fn test_empty_field_rejected_without_call() {
        let provider = MockProvider::echo();
        let mut req = request();
        req.translated_text = " ".to_string();

        let err = suggest_improvements(&provider, &req).await.unwrap_err();
        assert!(matches!(
            err,
            TranslateError::InvalidInput { field: "translated_text", .. }
        ));
        assert_eq!(provider.call_count(), 0);
    }
}
