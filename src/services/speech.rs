//! Narration synthesis via the ElevenLabs API.
//!
//! Turns page text into audio at the speaking rate the active reading mode
//! asks for, and produces the predictive word-timing preview the client
//! uses to highlight words in sync with playback.

use bytes::Bytes;
use log::{info, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::config::ReadingSpeedSettings;
use crate::errors::{AppError, AppResult};
use crate::models::{SpeechMeta, Voice};
use crate::reading::{build_timeline, TimingPreview};
use crate::utils::common::preview;

const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io/v1";
const TTS_MODEL: &str = "eleven_multilingual_v2";
/// Provider-accepted speaking-rate range.
const MIN_SPEAKING_RATE: f32 = 0.25;
const MAX_SPEAKING_RATE: f32 = 4.0;

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    voices: Vec<VoiceEntry>,
}

#[derive(Debug, Deserialize)]
struct VoiceEntry {
    voice_id: String,
    name: String,
}

/// Client for the text-to-speech provider.
pub struct SpeechService {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    settings: ReadingSpeedSettings,
}

impl SpeechService {
    pub fn new(api_key: Option<String>, settings: ReadingSpeedSettings) -> Self {
        Self::with_base_url(api_key, settings, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(
        api_key: Option<String>,
        settings: ReadingSpeedSettings,
        base_url: String,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            settings,
        }
    }

    /// List the provider's available voices. Without an API key there is
    /// nothing to list, which is not an error.
    pub async fn get_voices(&self) -> AppResult<Vec<Voice>> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("Speech API key not set, cannot retrieve voices");
            return Ok(Vec::new());
        };

        let response = self
            .client
            .get(format!("{}/voices", self.base_url))
            .header("Accept", "application/json")
            .header("xi-api-key", api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::SpeechSynthesis(format!(
                "voice listing error ({}): {}",
                status,
                preview(&body, 200)
            )));
        }

        let parsed: VoicesResponse = response.json().await?;
        info!("Retrieved {} voices from speech API", parsed.voices.len());

        Ok(parsed
            .voices
            .into_iter()
            .map(|entry| Voice {
                id: entry.voice_id,
                name: entry.name,
            })
            .collect())
    }

    /// Synthesize speech for the given text.
    ///
    /// The reading mode picks the base speaking rate; `reading_speed` scales
    /// it further and the result is clamped into the provider's accepted
    /// range. Returns the audio bytes and the metadata the web layer
    /// forwards as response headers.
    pub async fn generate_speech(
        &self,
        text: &str,
        voice_id: &str,
        reading_mode: &str,
        reading_speed: f32,
    ) -> AppResult<(Bytes, SpeechMeta)> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::Configuration("ELEVEN_LABS_API_KEY is not set".to_string())
        })?;

        // Collapse the text onto one line; stanza breaks are for the eyes,
        // not the narrator.
        let clean_text = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let (mode, config) = self.settings.mode(reading_mode);
        let effective_rate =
            (config.speaking_rate * reading_speed).clamp(MIN_SPEAKING_RATE, MAX_SPEAKING_RATE);

        info!(
            "Speech synthesis: mode={}, speed={}, effective_rate={}",
            mode.as_str(),
            reading_speed,
            effective_rate
        );

        let response = self
            .client
            .post(format!(
                "{}/text-to-speech/{}/stream",
                self.base_url, voice_id
            ))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .header("xi-api-key", api_key)
            .json(&json!({
                "text": clean_text,
                "model_id": TTS_MODEL,
                "voice_settings": {
                    "stability": 0.6,
                    "similarity_boost": 0.7,
                    "style": 0.0,
                    "use_speaker_boost": true,
                    "speed": effective_rate,
                },
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::SpeechSynthesis(format!(
                "synthesis error ({}): {}",
                status,
                preview(&body, 200)
            )));
        }

        let audio = response.bytes().await?;
        info!("Received {} bytes of audio", audio.len());

        Ok((
            audio,
            SpeechMeta {
                reading_mode: mode,
                effective_rate,
                playback_rate: config.playback_rate,
            },
        ))
    }

    /// Predictive word-timing analysis for client-side highlighting.
    pub fn get_timing_preview(&self, text: &str, reading_mode: &str) -> TimingPreview {
        build_timeline(text, reading_mode, &self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReadingMode;
    use httpmock::prelude::*;

    fn service(server: &MockServer) -> SpeechService {
        SpeechService::with_base_url(
            Some("test-key".to_string()),
            ReadingSpeedSettings::default(),
            server.base_url(),
        )
    }

    #[tokio::test]
    async fn test_get_voices_maps_entries() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/voices").header("xi-api-key", "test-key");
            then.status(200).json_body(serde_json::json!({
                "voices": [
                    {"voice_id": "v1", "name": "Bella", "category": "premade"},
                    {"voice_id": "v2", "name": "Josh", "category": "premade"},
                ]
            }));
        });

        let voices = service(&server).get_voices().await.unwrap();
        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].id, "v1");
        assert_eq!(voices[1].name, "Josh");
        mock.assert();
    }

    #[tokio::test]
    async fn test_get_voices_without_key_is_empty() {
        let service = SpeechService::new(None, ReadingSpeedSettings::default());
        let voices = service.get_voices().await.unwrap();
        assert!(voices.is_empty());
    }

    #[tokio::test]
    async fn test_generate_speech_learning_mode_meta() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/text-to-speech/v1/stream")
                .body_contains("eleven_multilingual_v2");
            then.status(200).body("audio-bytes");
        });

        let (audio, meta) = service(&server)
            .generate_speech("Esme ran fast.\n\nShe found a cave.", "v1", "learning", 1.0)
            .await
            .unwrap();

        assert_eq!(&audio[..], b"audio-bytes");
        assert_eq!(meta.reading_mode, ReadingMode::Learning);
        assert!((meta.effective_rate - 0.7).abs() < f32::EPSILON);
        assert!((meta.playback_rate - 0.6).abs() < f32::EPSILON);
        mock.assert();
    }

    #[tokio::test]
    async fn test_generate_speech_clamps_rate() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/text-to-speech/v1/stream");
            then.status(200).body("audio");
        });

        let service = service(&server);
        let (_, fast) = service
            .generate_speech("hi", "v1", "normal", 100.0)
            .await
            .unwrap();
        assert_eq!(fast.effective_rate, MAX_SPEAKING_RATE);

        let (_, slow) = service
            .generate_speech("hi", "v1", "normal", 0.001)
            .await
            .unwrap();
        assert_eq!(slow.effective_rate, MIN_SPEAKING_RATE);
    }

    #[tokio::test]
    async fn test_unknown_mode_behaves_like_normal() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/text-to-speech/v1/stream");
            then.status(200).body("audio");
        });

        let service = service(&server);
        let (_, meta) = service
            .generate_speech("hi", "v1", "warp-speed", 1.0)
            .await
            .unwrap();
        assert_eq!(meta.reading_mode, ReadingMode::Normal);
        assert_eq!(meta.effective_rate, 1.0);
    }

    #[tokio::test]
    async fn test_missing_key_rejects_synthesis() {
        let service = SpeechService::new(None, ReadingSpeedSettings::default());
        let err = service
            .generate_speech("hi", "v1", "normal", 1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn test_timing_preview_uses_reading_core() {
        let service = SpeechService::new(None, ReadingSpeedSettings::default());
        let preview = service.get_timing_preview("Esme ran fast.", "learning");
        assert_eq!(preview.word_count, 3);
        assert_eq!(preview.reading_mode, ReadingMode::Learning);
        assert!(preview.total_duration_ms > 0);
    }
}
