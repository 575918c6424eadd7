//! Application facade.
//!
//! One function per user-facing operation, mirroring the hosting web
//! layer's routes. Handlers validate input, sequence the services and log;
//! everything else lives in `services/` and `reading/`.

use bytes::Bytes;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{AppConfig, ReadingSpeedSettings, DEFAULT_CHARACTER_DESCRIPTION};
use crate::errors::{AppError, AppResult};
use crate::models::{GeneratedStory, PageRecord, SpeechMeta, StoryRecord, StorySummary, StoryTemplate, Voice};
use crate::reading::{self, SegmenterConfig, TimingPreview};
use crate::services::animation::{AnimationResult, SummaryAnalysis};
use crate::services::{
    ImageService, SpeechService, StorageService, StoryService, SummaryAnimationService,
};

/// How much trailing story text is fed back into the next illustration
/// prompt for scene continuity.
const STORY_CONTEXT_CHARS: usize = 300;

/// Everything a request handler needs, built once at startup.
pub struct AppState {
    pub config: AppConfig,
    pub settings: ReadingSpeedSettings,
    pub segmenter: SegmenterConfig,
    pub story: StoryService,
    pub image: ImageService,
    pub speech: SpeechService,
    pub animation: SummaryAnimationService,
    pub storage: StorageService,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let settings = ReadingSpeedSettings::default();
        let story = StoryService::new(config.claude_api_key.clone());
        let image = ImageService::new(
            config.stability_api_key.clone(),
            config.images_dir.clone(),
            config.reference_photo.clone(),
        );
        let speech = SpeechService::new(config.eleven_labs_api_key.clone(), settings.clone());
        let animation = SummaryAnimationService::new(
            config.stability_api_key.clone(),
            config.images_dir.clone(),
            config.videos_dir.clone(),
            settings.clone(),
        );
        let storage = StorageService::new(config.db_path.clone(), config.temp_stories_dir.clone());

        Self {
            config,
            settings,
            segmenter: SegmenterConfig::default(),
            story,
            image,
            speech,
            animation,
            storage,
        }
    }

    /// Prepare directories, the database and the staging area.
    pub fn init(&self) -> AppResult<()> {
        std::fs::create_dir_all(&self.config.images_dir)?;
        std::fs::create_dir_all(&self.config.videos_dir)?;
        std::fs::create_dir_all(&self.config.temp_stories_dir)?;
        self.storage.init_db()?;
        self.storage.cleanup_temp_stories(24)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateStoryRequest {
    pub description: String,
    #[serde(default = "default_template")]
    pub template_type: String,
    #[serde(default)]
    pub enable_animation: bool,
    #[serde(default = "default_reading_mode")]
    pub animation_reading_mode: String,
}

fn default_template() -> String {
    "adventure".to_string()
}

fn default_reading_mode() -> String {
    "normal".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadTextRequest {
    pub text: String,
    pub voice: String,
    #[serde(default = "default_reading_mode")]
    pub reading_mode: String,
    #[serde(default = "default_reading_speed")]
    pub reading_speed: f32,
}

fn default_reading_speed() -> f32 {
    1.0
}

/// Generate a complete story from a premise: text, simplified text, one
/// illustration per page, reading annotations and (optionally) a closing
/// summary animation. The result is staged until saved under a title.
pub async fn generate_story(
    state: &AppState,
    request: &GenerateStoryRequest,
) -> AppResult<GeneratedStory> {
    if request.description.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "Please describe Esme's adventure!".to_string(),
        ));
    }

    let character_description = DEFAULT_CHARACTER_DESCRIPTION;
    info!(
        "Generating {} story: {}",
        request.template_type,
        crate::utils::common::preview(&request.description, 80)
    );

    let story_text = state
        .story
        .generate_story_with_template(
            &request.description,
            character_description,
            &request.template_type,
        )
        .await?;

    let simplified_text = state.story.generate_simplified_story(&story_text).await;

    let pages = reading::segment(&story_text, &state.segmenter);
    if pages.is_empty() {
        error!("Story processing failed: no valid content found");
        return Err(AppError::NoContent);
    }
    info!("Final result: {} story pages", pages.len());

    let simplified_pages = reading::strict_pass(&simplified_text, &state.segmenter);
    info!("Processed {} simplified pages", simplified_pages.len());

    let profile = state.image.generate_character_profile(character_description).await;

    let image_descriptions = state
        .story
        .generate_image_descriptions(&pages, character_description)
        .await;

    let mut content = Vec::with_capacity(pages.len());
    let mut story_context = String::new();

    for (index, text) in pages.iter().enumerate() {
        info!("Processing story page {} of {}", index + 1, pages.len());

        let scene_description = image_descriptions.get(index).unwrap_or(text);
        let image_url = state
            .image
            .generate_story_image(scene_description, index + 1, &story_context)
            .await?;

        let simplified_page = simplified_pages.get(index).cloned().unwrap_or_default();
        content.push(PageRecord::new(
            index + 1,
            text.clone(),
            image_url,
            simplified_page,
        ));

        story_context.push(' ');
        story_context.push_str(text);
        story_context = tail_chars(&story_context, STORY_CONTEXT_CHARS);
    }

    if request.enable_animation {
        info!(
            "Adding story summary animation for {} reading mode",
            request.animation_reading_mode
        );
        content = state
            .animation
            .add_story_summary_page(content, &request.animation_reading_mode)
            .await;
    }

    let has_summary_animation = content
        .iter()
        .any(|page| page.is_summary_page && page.has_animation);

    let mut story = GeneratedStory {
        temp_id: String::new(),
        description: request.description.clone(),
        character_description: character_description.to_string(),
        template_type: request.template_type.clone(),
        story_text,
        simplified_text,
        image_descriptions,
        content,
        uses_photo_reference: profile.uses_photo_reference,
        has_summary_animation,
    };

    story.temp_id = state.storage.store_temp_story(&story)?;
    info!(
        "Story generation completed: {} pages, staged as {}",
        story.content.len(),
        story.temp_id
    );
    Ok(story)
}

/// Synthesize narration for a block of text.
pub async fn read_text(
    state: &AppState,
    request: &ReadTextRequest,
) -> AppResult<(Bytes, SpeechMeta)> {
    if request.text.is_empty() || request.voice.is_empty() {
        return Err(AppError::InvalidRequest("Missing text or voice".to_string()));
    }

    info!(
        "Speech generation: mode={}, text_length={}",
        request.reading_mode,
        request.text.len()
    );
    state
        .speech
        .generate_speech(
            &request.text,
            &request.voice,
            &request.reading_mode,
            request.reading_speed,
        )
        .await
}

/// Word-timing analysis for client-side highlighting.
pub fn analyze_timing(state: &AppState, text: &str, reading_mode: &str) -> TimingPreview {
    state.speech.get_timing_preview(text, reading_mode)
}

/// Motion/summary analysis of a complete story.
pub fn analyze_story_summary(
    state: &AppState,
    content: &[PageRecord],
) -> AppResult<SummaryAnalysis> {
    if content.is_empty() {
        return Err(AppError::InvalidRequest("No story content provided".to_string()));
    }

    Ok(SummaryAnalysis {
        motion_intensity: state.animation.analyze_story_motion(content),
        story_summary: state.animation.create_story_summary(content),
        total_pages: content.len(),
        animation_approach: "story_summary".to_string(),
    })
}

/// Generate a story summary animation on demand.
pub async fn generate_summary_animation(
    state: &AppState,
    content: &[PageRecord],
    reading_mode: &str,
) -> AppResult<AnimationResult> {
    if content.is_empty() {
        return Err(AppError::InvalidRequest("No story content provided".to_string()));
    }
    state
        .animation
        .generate_story_summary_animation(content, reading_mode)
        .await
}

/// Promote a staged story into the library under the given title.
pub fn save_story(state: &AppState, temp_id: &str, title: &str) -> AppResult<String> {
    if title.trim().is_empty() {
        return Err(AppError::InvalidRequest("No title provided".to_string()));
    }

    let (data, content) = state.storage.get_temp_story(temp_id)?;
    state.storage.save_story(title, &data, &content)
}

pub fn get_stories(state: &AppState) -> AppResult<Vec<StorySummary>> {
    state.storage.get_all_stories()
}

pub fn view_story(state: &AppState, story_id: &str) -> AppResult<StoryRecord> {
    state.storage.get_story(story_id)
}

pub fn delete_story(state: &AppState, story_id: &str) -> AppResult<()> {
    state.storage.delete_story(story_id)
}

/// The built-in story templates.
pub fn story_templates() -> BTreeMap<String, StoryTemplate> {
    let mut templates = BTreeMap::new();
    templates.insert(
        "adventure".to_string(),
        StoryTemplate {
            name: "Adventure Story".to_string(),
            description: "Esme explores, discovers, and overcomes challenges".to_string(),
            example: "Esme discovers a hidden cave and finds treasure".to_string(),
        },
    );
    templates.insert(
        "mystery".to_string(),
        StoryTemplate {
            name: "Mystery Story".to_string(),
            description: "Esme solves puzzles and uncovers secrets".to_string(),
            example: "Esme finds clues to solve the missing toy mystery".to_string(),
        },
    );
    templates.insert(
        "friendship".to_string(),
        StoryTemplate {
            name: "Friendship Story".to_string(),
            description: "Esme makes new friends and learns about cooperation".to_string(),
            example: "Esme meets a new neighbor and they become best friends".to_string(),
        },
    );
    templates.insert(
        "problem_solving".to_string(),
        StoryTemplate {
            name: "Problem-Solving Story".to_string(),
            description: "Esme uses creativity to solve challenges".to_string(),
            example: "Esme builds a bridge to help animals cross the stream".to_string(),
        },
    );
    templates
}

/// Available narrator voices; provider trouble degrades to an empty list
/// rather than failing the page.
pub async fn get_voices(state: &AppState) -> Vec<Voice> {
    match state.speech.get_voices().await {
        Ok(voices) => voices,
        Err(e) => {
            error!("Error fetching voices: {}", e);
            Vec::new()
        }
    }
}

fn tail_chars(text: &str, max_chars: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        text.to_string()
    } else {
        chars[chars.len() - max_chars..].iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_story_templates_cover_the_four_kinds() {
        let templates = story_templates();
        assert_eq!(templates.len(), 4);
        for key in ["adventure", "mystery", "friendship", "problem_solving"] {
            assert!(templates.contains_key(key), "missing template {key}");
        }
        assert_eq!(templates["adventure"].name, "Adventure Story");
    }

    #[test]
    fn test_tail_chars_keeps_the_end() {
        assert_eq!(tail_chars("abcdef", 10), "abcdef");
        assert_eq!(tail_chars("abcdef", 3), "def");
        assert_eq!(tail_chars("", 3), "");
    }

    #[tokio::test]
    async fn test_generate_story_requires_description() {
        let state = AppState::new(AppConfig::default());
        let request = GenerateStoryRequest {
            description: "   ".to_string(),
            template_type: default_template(),
            enable_animation: false,
            animation_reading_mode: default_reading_mode(),
        };
        let err = generate_story(&state, &request).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_read_text_requires_text_and_voice() {
        let state = AppState::new(AppConfig::default());
        let request = ReadTextRequest {
            text: String::new(),
            voice: "v1".to_string(),
            reading_mode: default_reading_mode(),
            reading_speed: 1.0,
        };
        let err = read_text(&state, &request).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[test]
    fn test_analyze_timing_passthrough() {
        let state = AppState::new(AppConfig::default());
        let preview = analyze_timing(&state, "Esme ran fast.", "learning");
        assert_eq!(preview.word_count, 3);
    }

    #[test]
    fn test_analyze_story_summary_requires_content() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(
            analyze_story_summary(&state, &[]),
            Err(AppError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_save_story_requires_title() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(
            save_story(&state, "some-temp-id", ""),
            Err(AppError::InvalidRequest(_))
        ));
    }
}
