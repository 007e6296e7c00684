use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::SearchError;
use crate::state::Source;

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// One message in a `generateContent` request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

/// Base64 file contents sent inline with a prompt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

impl Content {
    pub fn user_text(text: &str) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part::Text {
                text: text.to_string(),
            }],
        }
    }

    /// Prompt text first, then the image, the same order the web client used
    pub fn user_with_image(text: &str, image: InlineData) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![
                Part::Text {
                    text: text.to_string(),
                },
                Part::Inline { inline_data: image },
            ],
        }
    }

    pub fn model_text(text: &str) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![Part::Text {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: &'a [Content],
    tools: Vec<Tool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Deserialize)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Generated text plus the web sources it was grounded on
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GroundedAnswer {
    pub text: String,
    pub sources: Vec<Source>,
}

impl GroundedAnswer {
    fn from_response(response: GenerateResponse) -> Self {
        let Some(candidate) = response.candidates.and_then(|c| c.into_iter().next()) else {
            return Self::default();
        };

        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let mut sources: Vec<Source> = Vec::new();
        let chunks = candidate
            .grounding_metadata
            .map(|m| m.grounding_chunks)
            .unwrap_or_default();
        for web in chunks.into_iter().filter_map(|c| c.web) {
            let Some(uri) = web.uri.filter(|u| !u.is_empty()) else {
                continue;
            };
            if sources.iter().any(|s| s.uri == uri) {
                continue;
            }
            let title = web.title.filter(|t| !t.is_empty()).unwrap_or_else(|| uri.clone());
            sources.push(Source { uri, title });
        }

        Self { text, sources }
    }
}

/// Decode a `generateContent` response body
pub fn parse_answer(body: &str) -> Result<GroundedAnswer, SearchError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| SearchError::classify(e.to_string()))?;
    Ok(GroundedAnswer::from_response(response))
}

/// Turn a non-success response body into the error the user sees
fn api_error(status: reqwest::StatusCode, body: &str) -> SearchError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.to_string());
    SearchError::classify(format!("Gemini API error {}: {}", status, message))
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one grounded generation with the web-search tool enabled
    pub async fn generate(&self, contents: &[Content]) -> Result<GroundedAnswer, SearchError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let request = GenerateRequest {
            contents,
            tools: vec![Tool {
                google_search: GoogleSearch {},
            }],
        };

        log::info!(
            "Sending grounded request to {} ({} content turns)",
            self.model,
            contents.len()
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                log::error!("Error fetching from Gemini API: {}", e);
                SearchError::from(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            log::error!("Error reading Gemini API response: {}", e);
            SearchError::from(e)
        })?;

        if !status.is_success() {
            log::error!("Gemini API returned {}: {}", status, body);
            return Err(api_error(status, &body));
        }

        let answer = parse_answer(&body).inspect_err(|e| {
            log::error!("Could not decode Gemini API response: {:?}", e);
        })?;
        log::info!(
            "Received answer ({} chars, {} sources)",
            answer.text.len(),
            answer.sources.len()
        );
        Ok(answer)
    }
}

/// Successful exchanges of a conversation, replayed with every follow-up
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    history: Vec<Content>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prior exchanges followed by the new prompt
    pub fn contents_for(&self, prompt: &str) -> Vec<Content> {
        let mut contents = self.history.clone();
        contents.push(Content::user_text(prompt));
        contents
    }

    pub fn record(&mut self, prompt: &str, reply: &str) {
        self.history.push(Content::user_text(prompt));
        self.history.push(Content::model_text(reply));
    }

    pub fn exchanges(&self) -> usize {
        self.history.len() / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_enables_google_search() {
        let contents = vec![Content::user_text("Who won?")];
        let request = GenerateRequest {
            contents: &contents,
            tools: vec![Tool {
                google_search: GoogleSearch {},
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Who won?" }] }],
                "tools": [{ "googleSearch": {} }]
            })
        );
    }

    #[test]
    fn test_image_part_uses_inline_data() {
        let content = Content::user_with_image(
            "What is this?",
            InlineData {
                mime_type: "image/png".to_string(),
                data: "aGVsbG8=".to_string(),
            },
        );
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(value["parts"][0]["text"], "What is this?");
        assert_eq!(value["parts"][1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(value["parts"][1]["inlineData"]["data"], "aGVsbG8=");
    }

    #[test]
    fn test_parse_answer_joins_parts_and_collects_sources() {
        let body = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Hello " }, { "text": "world" }] },
                "groundingMetadata": {
                    "webSearchQueries": ["hello"],
                    "groundingChunks": [
                        { "web": { "uri": "https://a.example", "title": "A" } },
                        { "web": { "uri": "https://b.example" } },
                        { "web": { "uri": "https://a.example", "title": "A again" } },
                        { "web": { "title": "no uri" } },
                        {}
                    ]
                }
            }]
        })
        .to_string();

        let answer = parse_answer(&body).unwrap();
        assert_eq!(answer.text, "Hello world");
        assert_eq!(
            answer.sources,
            vec![
                Source {
                    uri: "https://a.example".to_string(),
                    title: "A".to_string()
                },
                Source {
                    uri: "https://b.example".to_string(),
                    title: "https://b.example".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_parse_answer_without_grounding_has_no_sources() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Plain answer" }] } }]
        })
        .to_string();
        let answer = parse_answer(&body).unwrap();
        assert_eq!(answer.text, "Plain answer");
        assert!(answer.sources.is_empty());
    }

    #[test]
    fn test_parse_answer_without_candidates_is_empty() {
        let answer = parse_answer("{}").unwrap();
        assert_eq!(answer, GroundedAnswer::default());
    }

    #[test]
    fn test_parse_answer_rejects_garbage() {
        assert!(matches!(
            parse_answer("not json"),
            Err(SearchError::Request { .. })
        ));
    }

    #[test]
    fn test_api_error_detects_bad_key() {
        let body = json!({
            "error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT"
            }
        })
        .to_string();
        assert_eq!(
            api_error(reqwest::StatusCode::BAD_REQUEST, &body),
            SearchError::ApiKey
        );
    }

    #[test]
    fn test_api_error_other_status_is_generic() {
        let err = api_error(reqwest::StatusCode::SERVICE_UNAVAILABLE, "overloaded");
        assert!(matches!(err, SearchError::Request { detail } if detail.contains("overloaded")));
    }

    #[test]
    fn test_chat_session_replays_recorded_exchanges() {
        let mut session = ChatSession::new();
        assert_eq!(session.contents_for("first"), vec![Content::user_text("first")]);

        session.record("first", "answer one");
        let contents = session.contents_for("second");
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0], Content::user_text("first"));
        assert_eq!(contents[1], Content::model_text("answer one"));
        assert_eq!(contents[2], Content::user_text("second"));
        assert_eq!(session.exchanges(), 1);
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = GeminiClient::new("key", DEFAULT_MODEL, "http://localhost:8080/");
        assert_eq!(client.base_url, "http://localhost:8080");
        assert_eq!(client.model(), DEFAULT_MODEL);
    }
}
