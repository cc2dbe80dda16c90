//! Google Gemini `generateContent` backend

use super::types::{Reply, Source};
use super::{Backend, ErrorInfo};
use serde::Deserialize;
use serde_json::{json, Value};

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-09-2025";

/// Instruction preamble for the grounded analyst variant
pub const DEFAULT_SYSTEM_PROMPT: &str = "Act as a world-class financial analyst. Provide a \
    concise, single-paragraph summary of the key findings. Do not include introductory \
    phrases like 'Here is the summary' or 'Based on the search results'.";

/// Direct API URL for a model
pub fn endpoint_for(model: &str) -> String {
    format!("https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent")
}

/// Builds Gemini requests and extracts text plus grounding sources
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    system_instruction: Option<String>,
    grounded: bool,
}

impl GeminiBackend {
    pub fn new(system_instruction: Option<String>, grounded: bool) -> Self {
        Self {
            system_instruction: system_instruction.filter(|s| !s.trim().is_empty()),
            grounded,
        }
    }
}

#[cfg(test)]
impl GeminiBackend {
    /// Plain text-in, text-out variant
    pub fn plain() -> Self {
        Self::new(None, false)
    }

    /// Google Search grounded variant with the analyst preamble
    pub fn grounded_analyst() -> Self {
        Self::new(Some(DEFAULT_SYSTEM_PROMPT.to_string()), true)
    }
}

impl Backend for GeminiBackend {
    fn name(&self) -> &str {
        if self.grounded {
            "gemini-grounded"
        } else {
            "gemini"
        }
    }

    fn build_payload(&self, text: &str) -> Value {
        let mut payload = json!({
            "contents": [{ "parts": [{ "text": text }] }],
        });
        if self.grounded {
            payload["tools"] = json!([{ "google_search": {} }]);
        }
        if let Some(instruction) = &self.system_instruction {
            payload["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
        }
        payload
    }

    fn parse_reply(&self, body: &str) -> Result<Reply, ErrorInfo> {
        let response: GeminiResponse = serde_json::from_str(body).map_err(|e| {
            ErrorInfo::invalid_response(format!("Failed to parse response: {e}"))
        })?;

        let candidate = response.candidates.into_iter().next();
        let text = candidate
            .as_ref()
            .and_then(|c| c.content.as_ref())
            .and_then(|content| content.parts.first())
            .and_then(|part| part.text.clone())
            .filter(|t| !t.is_empty());

        let Some(text) = text else {
            return Err(match response.error {
                Some(error) => ErrorInfo::invalid_response(format!("API Error: {}", error.message)),
                None => ErrorInfo::invalid_response("Could not get a valid response from the API."),
            });
        };

        let sources = candidate
            .and_then(|c| c.grounding_metadata)
            .map(GroundingMetadata::into_sources)
            .unwrap_or_default();

        Ok(Reply::text(text).with_sources(sources))
    }
}

// Gemini API types

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_attributions: Vec<GroundingEntry>,
    #[serde(default)]
    grounding_chunks: Vec<GroundingEntry>,
}

impl GroundingMetadata {
    /// Keep only entries with both a non-empty uri and title
    fn into_sources(self) -> Vec<Source> {
        self.grounding_attributions
            .into_iter()
            .chain(self.grounding_chunks)
            .filter_map(|entry| {
                let web = entry.web?;
                match (web.uri, web.title) {
                    (Some(uri), Some(title)) if !uri.is_empty() && !title.is_empty() => {
                        Some(Source { uri, title })
                    }
                    _ => None,
                }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct GroundingEntry {
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}
