//! Story text generation via the Anthropic Messages API.
//!
//! Produces the main story, a simplified learn-to-read variant and per-page
//! illustration descriptions. The main story call retries with exponential
//! backoff since it is the one request the whole flow depends on; the
//! auxiliary calls degrade gracefully instead (local simplification
//! fallback, empty description list).

use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::errors::{AppError, AppResult};
use crate::utils::common::{normalize_escaped_newlines, preview};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const MODEL: &str = "claude-3-5-sonnet-20241022";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1000;
const MAX_RETRIES: u32 = 3;
const INITIAL_RETRY_DELAY_SECS: u64 = 1;

/// Numbering and labeling noise the model sometimes adds to description
/// lines despite instructions.
static DESCRIPTION_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+\.|\*|-|STANZA \d+:)\s*").unwrap());

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: String,
}

/// Client for the text-generation provider.
pub struct StoryService {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl StoryService {
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: Option<String>, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
        }
    }

    /// Generate a story for the given premise, specialized by template.
    ///
    /// Retries transient failures (including the provider's "overloaded"
    /// status) with exponential backoff before giving up.
    pub async fn generate_story_with_template(
        &self,
        description: &str,
        character_description: &str,
        template_type: &str,
    ) -> AppResult<String> {
        if self.api_key.is_none() {
            return Err(AppError::Configuration(
                "CLAUDE_API_KEY is not set".to_string(),
            ));
        }

        let prompt = build_story_prompt(description, character_description, template_type);

        let mut last_error = String::new();
        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay =
                    Duration::from_secs(INITIAL_RETRY_DELAY_SECS * 2u64.pow(attempt - 1));
                info!(
                    "Retrying story generation (attempt {}/{}) after {:?}",
                    attempt + 1,
                    MAX_RETRIES,
                    delay
                );
                tokio::time::sleep(delay).await;
            }

            match self.send_messages_request(&prompt).await {
                Ok(text) => return Ok(text),
                Err(RequestFailure::Overloaded) => {
                    warn!("Text provider is overloaded");
                    last_error = "provider overloaded (status 529)".to_string();
                }
                Err(RequestFailure::Other(message)) => {
                    warn!("Story generation attempt {} failed: {}", attempt + 1, message);
                    last_error = message;
                }
            }
        }

        error!(
            "Story generation failed after {} attempts: {}",
            MAX_RETRIES, last_error
        );
        Err(AppError::StoryGeneration(format!(
            "failed after {} attempts: {}",
            MAX_RETRIES, last_error
        )))
    }

    /// Generate a simplified version of the story for teaching reading.
    ///
    /// Never fails: if the provider call does not work out, a basic local
    /// simplification is returned instead.
    pub async fn generate_simplified_story(&self, original_story: &str) -> String {
        let prompt = build_simplified_prompt(original_story);

        match self.send_messages_request(&prompt).await {
            Ok(text) => text,
            Err(failure) => {
                error!("Error generating simplified story: {}", failure);
                fallback_simplified_story(original_story)
            }
        }
    }

    /// Generate one illustration description per page.
    ///
    /// Returns an empty list on failure so the caller falls back to using
    /// the page text directly.
    pub async fn generate_image_descriptions(
        &self,
        pages: &[String],
        character_description: &str,
    ) -> Vec<String> {
        let prompt = build_image_descriptions_prompt(pages, character_description);

        match self.send_messages_request(&prompt).await {
            Ok(text) => {
                let descriptions: Vec<String> = text
                    .lines()
                    .map(|line| DESCRIPTION_PREFIX_RE.replace(line.trim(), "").to_string())
                    .filter(|line| !line.is_empty())
                    .collect();
                info!("Generated {} image descriptions", descriptions.len());
                descriptions
            }
            Err(failure) => {
                error!("Error generating image descriptions: {}", failure);
                Vec::new()
            }
        }
    }

    async fn send_messages_request(&self, prompt: &str) -> Result<String, RequestFailure> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            RequestFailure::Other("CLAUDE_API_KEY is not configured".to_string())
        })?;

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&json!({
                "model": MODEL,
                "max_tokens": MAX_TOKENS,
                "messages": [{"role": "user", "content": prompt}],
            }))
            .send()
            .await
            .map_err(|e| RequestFailure::Other(e.to_string()))?;

        let status = response.status();
        info!("Text API response status: {}", status);

        if status.as_u16() == 529 {
            return Err(RequestFailure::Overloaded);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RequestFailure::Other(format!(
                "API error ({}): {}",
                status,
                preview(&body, 200)
            )));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| RequestFailure::Other(e.to_string()))?;
        let text = parsed
            .content
            .first()
            .map(|block| block.text.clone())
            .ok_or_else(|| RequestFailure::Other("empty response content".to_string()))?;

        Ok(normalize_escaped_newlines(&text))
    }
}

#[derive(Debug)]
enum RequestFailure {
    Overloaded,
    Other(String),
}

impl std::fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestFailure::Overloaded => write!(f, "provider overloaded (status 529)"),
            RequestFailure::Other(message) => write!(f, "{}", message),
        }
    }
}

fn template_focus(template_type: &str) -> &'static str {
    match template_type {
        "mystery" => "a gentle mystery where she follows clues and uncovers a happy secret",
        "friendship" => "a warm story about making a new friend and learning to share",
        "problem_solving" => "a story where she uses her imagination to solve a tricky problem",
        _ => "an adventure where she explores, discovers something wonderful and feels brave",
    }
}

fn build_story_prompt(
    description: &str,
    character_description: &str,
    template_type: &str,
) -> String {
    format!(
        "Write a rhyming children's story about Esme ({character}).\n\
         The story should be {focus}.\n\
         Premise: {premise}\n\n\
         Requirements:\n\
         - 4 to 6 short stanzas separated by blank lines\n\
         - simple, concrete words a 4-year-old can follow\n\
         - playful, bouncy rhythm with active verbs\n\
         - no title, no commentary, just the story stanzas",
        character = character_description,
        focus = template_focus(template_type),
        premise = description,
    )
}

fn build_simplified_prompt(original_story: &str) -> String {
    format!(
        "Rewrite this children's story for a child who is just learning to read.\n\
         Keep the same stanza breaks (blank lines between stanzas).\n\
         Use mostly short sight words and simple decodable words.\n\
         Respond with only the rewritten story.\n\n\
         {original}",
        original = original_story,
    )
}

fn build_image_descriptions_prompt(pages: &[String], character_description: &str) -> String {
    let mut stanzas_text = String::new();
    for (i, page) in pages.iter().enumerate() {
        stanzas_text.push_str(&format!("STANZA {}:\n{}\n\n", i + 1, page));
    }

    format!(
        "For each stanza below, write one concise visual description of an\n\
         illustration showing that scene, featuring Esme ({character}).\n\
         Respond with exactly one line per stanza, in order, with no\n\
         numbering and no extra text.\n\n\
         {stanzas}",
        character = character_description,
        stanzas = stanzas_text,
    )
}

/// Basic local simplification used when the provider call fails: the first
/// and (for longer stanzas) last line of each stanza.
fn fallback_simplified_story(original_story: &str) -> String {
    let mut simplified_stanzas = Vec::new();

    for stanza in original_story.split("\n\n") {
        let lines: Vec<&str> = stanza
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if lines.is_empty() {
            continue;
        }

        let mut simplified_lines = vec![lines[0]];
        if lines.len() > 2 {
            simplified_lines.push(lines[lines.len() - 1]);
        }
        simplified_stanzas.push(simplified_lines.join("\n"));
    }

    simplified_stanzas.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const STORY: &str = "Esme skipped along the sunny lane.\n\nShe found a frog out in the rain.\n\nThey played all day and home again.";

    fn service(server: &MockServer) -> StoryService {
        StoryService::with_base_url(Some("test-key".to_string()), server.base_url())
    }

    #[tokio::test]
    async fn test_generate_story_success() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/messages")
                .header("x-api-key", "test-key")
                .header("anthropic-version", ANTHROPIC_VERSION);
            then.status(200)
                .json_body(serde_json::json!({"content": [{"type": "text", "text": STORY}]}));
        });

        let story = service(&server)
            .generate_story_with_template("a frog friend", "4 years old", "adventure")
            .await
            .unwrap();
        assert_eq!(story, STORY);
        mock.assert();
    }

    #[tokio::test]
    async fn test_generate_story_normalizes_escaped_newlines() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(200).json_body(
                serde_json::json!({"content": [{"type": "text", "text": "One stanza.\\n\\nTwo stanza."}]}),
            );
        });

        let story = service(&server)
            .generate_story_with_template("anything", "4 years old", "adventure")
            .await
            .unwrap();
        assert_eq!(story, "One stanza.\n\nTwo stanza.");
    }

    #[tokio::test]
    async fn test_generate_story_gives_up_with_status_in_error() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(400).body("bad request");
        });

        let err = service(&server)
            .generate_story_with_template("anything", "4 years old", "adventure")
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("400"), "error should mention the status: {message}");
        mock.assert_hits(MAX_RETRIES as usize);
    }

    #[tokio::test]
    async fn test_generate_story_retries_when_overloaded() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(529).body("overloaded");
        });

        let err = service(&server)
            .generate_story_with_template("anything", "4 years old", "adventure")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("overloaded"));
        mock.assert_hits(MAX_RETRIES as usize);
    }

    #[tokio::test]
    async fn test_simplified_story_falls_back_locally() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(500).body("boom");
        });

        let simplified = service(&server)
            .generate_simplified_story("Line one.\nLine two.\nLine three.\n\nOnly line.")
            .await;
        assert_eq!(simplified, "Line one.\nLine three.\n\nOnly line.");
    }

    #[tokio::test]
    async fn test_image_descriptions_strip_numbering() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(200).json_body(serde_json::json!({
                "content": [{"type": "text", "text": "1. Esme by a pond\nSTANZA 2: A green frog\n- They wave goodbye"}]
            }));
        });

        let descriptions = service(&server)
            .generate_image_descriptions(
                &["a".to_string(), "b".to_string(), "c".to_string()],
                "4 years old",
            )
            .await;
        assert_eq!(
            descriptions,
            vec!["Esme by a pond", "A green frog", "They wave goodbye"]
        );
    }

    #[tokio::test]
    async fn test_image_descriptions_empty_on_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/messages");
            then.status(500).body("boom");
        });

        let descriptions = service(&server)
            .generate_image_descriptions(&["a".to_string()], "4 years old")
            .await;
        assert!(descriptions.is_empty());
    }

    #[test]
    fn test_fallback_simplification_shape() {
        let result = fallback_simplified_story("A.\nB.\nC.\n\nD.\nE.");
        assert_eq!(result, "A.\nC.\n\nD.");
    }
}
