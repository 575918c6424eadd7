use serde::{Deserialize, Serialize};

use crate::config::ReadingMode;
use crate::reading::Stanza;

/// One assembled story page: text, illustration and reading annotations for
/// both the full and the simplified variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    pub page: usize,
    pub text: String,
    pub image: String,
    pub stanzas: Vec<Stanza>,
    pub simplified_text: String,
    pub simplified_stanzas: Vec<Stanza>,
    #[serde(default)]
    pub has_animation: bool,
    #[serde(default)]
    pub is_summary_page: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_duration: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_error: Option<String>,
}

impl PageRecord {
    pub fn new(page: usize, text: String, image: String, simplified_text: String) -> Self {
        let stanzas = crate::reading::process_story_text(&text);
        let simplified_stanzas = crate::reading::process_story_text(&simplified_text);
        Self {
            page,
            text,
            image,
            stanzas,
            simplified_text,
            simplified_stanzas,
            has_animation: false,
            is_summary_page: false,
            animation: None,
            animation_description: None,
            animation_duration: None,
            story_summary: None,
            animation_error: None,
        }
    }
}

/// A freshly generated story, staged in the temp store until the user saves
/// it under a title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedStory {
    pub temp_id: String,
    pub description: String,
    pub character_description: String,
    pub template_type: String,
    pub story_text: String,
    pub simplified_text: String,
    pub image_descriptions: Vec<String>,
    pub content: Vec<PageRecord>,
    pub uses_photo_reference: bool,
    pub has_summary_animation: bool,
}

/// The metadata half of a staged story, persisted separately from the page
/// content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempStoryData {
    pub temp_id: String,
    pub description: String,
    pub character_description: String,
    pub template_type: String,
    pub story_text: String,
    pub simplified_text: String,
    pub image_descriptions: Vec<String>,
    pub created_at: String,
}

/// A story saved to the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub character_description: String,
    pub created_at: String,
    pub story_text: String,
    pub simplified_text: Option<String>,
    pub image_descriptions: Vec<String>,
    pub content: Vec<PageRecord>,
}

/// Listing row for the story library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorySummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub created_at: String,
}

/// A built-in story template the generator can specialize for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryTemplate {
    pub name: String,
    pub description: String,
    pub example: String,
}

/// A narrator voice offered by the speech provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voice {
    pub id: String,
    pub name: String,
}

/// Synthesis metadata the web layer forwards to the client alongside the
/// audio (as response headers).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechMeta {
    pub reading_mode: ReadingMode,
    pub effective_rate: f32,
    pub playback_rate: f32,
}
