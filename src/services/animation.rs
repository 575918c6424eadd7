//! Story summary animation via the Stability AI image-to-video API.
//!
//! After the last page, the story can close with a single short animation
//! summarizing the whole adventure. The animation's motion level is derived
//! from the story's verbs and its duration from the active reading-mode
//! configuration, so the clip matches how fast the story is being read.

use chrono::Utc;
use log::{info, warn};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::ReadingSpeedSettings;
use crate::errors::{AppError, AppResult};
use crate::models::PageRecord;
use crate::utils::common::preview;

const DEFAULT_BASE_URL: &str = "https://api.stability.ai";
/// Separate seed from the page illustrations.
const SUMMARY_SEED: u32 = 123;
/// Slightly lower guidance keeps the animation faithful to the base image.
const SUMMARY_CFG_SCALE: f32 = 1.5;
const SUMMARY_MAX_CHARS: usize = 200;
const MIN_ANIMATION_SECS: f64 = 3.0;

/// Verbs suggesting a lot of on-screen movement.
const HIGH_MOTION_WORDS: &[&str] = &[
    "run", "running", "ran", "jump", "jumping", "leapt", "slide", "sliding", "slid", "swim",
    "swimming", "dive", "diving", "fly", "flying", "dance", "dancing", "race", "racing", "chase",
    "chasing", "climb", "climbing", "rush", "rushing", "bounce", "bouncing", "twirl", "twirling",
    "adventure", "explore", "exploring",
];

const MEDIUM_MOTION_WORDS: &[&str] = &[
    "walk", "walking", "move", "moving", "reach", "reaching", "turn", "turning", "play",
    "playing", "build", "building", "work", "working", "help", "helping", "point", "pointing",
    "wave", "waving", "clap", "clapping", "skip", "skipping", "discover", "find", "found",
    "search", "searching",
];

const LOW_MOTION_WORDS: &[&str] = &[
    "smile", "smiling", "laugh", "laughing", "think", "thinking", "wonder", "wondering", "look",
    "looking", "see", "seeing", "watch", "watching", "listen", "listening", "sit", "sitting",
    "rest", "resting", "yawn", "yawning", "sleep", "sleeping",
];

/// A successfully generated summary animation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationResult {
    pub video_path: String,
    pub summary_image: String,
    pub story_summary: String,
    pub motion_intensity: f32,
    pub duration: f32,
    pub description: String,
}

/// Motion/summary analysis of a complete story, without generating anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryAnalysis {
    pub motion_intensity: f32,
    pub story_summary: String,
    pub total_pages: usize,
    pub animation_approach: String,
}

/// Client for the image-to-video provider.
pub struct SummaryAnimationService {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    images_dir: PathBuf,
    videos_dir: PathBuf,
    settings: ReadingSpeedSettings,
}

impl SummaryAnimationService {
    pub fn new(
        api_key: Option<String>,
        images_dir: PathBuf,
        videos_dir: PathBuf,
        settings: ReadingSpeedSettings,
    ) -> Self {
        Self::with_base_url(
            api_key,
            images_dir,
            videos_dir,
            settings,
            DEFAULT_BASE_URL.to_string(),
        )
    }

    pub fn with_base_url(
        api_key: Option<String>,
        images_dir: PathBuf,
        videos_dir: PathBuf,
        settings: ReadingSpeedSettings,
        base_url: String,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            images_dir,
            videos_dir,
            settings,
        }
    }

    /// Overall motion intensity of the story, in [0.3, 0.7].
    pub fn analyze_story_motion(&self, content: &[PageRecord]) -> f32 {
        let all_text = content
            .iter()
            .map(|page| page.text.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");

        let high = count_present(&all_text, HIGH_MOTION_WORDS);
        let medium = count_present(&all_text, MEDIUM_MOTION_WORDS);
        let low = count_present(&all_text, LOW_MOTION_WORDS);
        let total = high + medium + low;

        if total == 0 {
            return 0.4;
        }

        let score = (high as f64 * 0.8 + medium as f64 * 0.5 + low as f64 * 0.2) / total as f64;
        let intensity = score.clamp(0.3, 0.7);
        info!(
            "Story motion analysis: high={}, medium={}, low={}, score={:.2}",
            high, medium, low, intensity
        );
        intensity as f32
    }

    /// One-line summary text of the whole story, capped at 200 characters.
    pub fn create_story_summary(&self, content: &[PageRecord]) -> String {
        let parts: Vec<String> = content
            .iter()
            .map(|page| page.text.replace('\n', " ").trim().to_string())
            .filter(|text| !text.is_empty())
            .collect();

        let full_story = parts.join(" ");
        let summary = if full_story.chars().count() > SUMMARY_MAX_CHARS {
            let first = parts.first().map(String::as_str).unwrap_or("");
            let last = if parts.len() > 1 {
                parts.last().map(String::as_str).unwrap_or("")
            } else {
                ""
            };
            format!("{} ... {}", first, last)
        } else {
            full_story
        };

        summary.chars().take(SUMMARY_MAX_CHARS).collect()
    }

    /// Animation length in seconds, synchronized to the reading mode's pace.
    pub fn calculate_animation_duration(&self, scene_text: &str, reading_mode: &str) -> f32 {
        let words: Vec<&str> = scene_text.split_whitespace().collect();
        if words.is_empty() {
            return MIN_ANIMATION_SECS as f32;
        }

        let word_count = words.len() as f64;
        let avg_word_length =
            words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / word_count;

        let (mode, config) = self.settings.mode(reading_mode);
        let speech_ms = word_count
            * (config.base_duration_ms as f64 + avg_word_length * config.char_duration_ms as f64);
        let speech_secs = speech_ms / 1000.0 / config.playback_rate as f64;

        // A fifth of slack so the clip never ends mid-narration
        let animation_secs = speech_secs * 1.2;

        let max_secs = match mode {
            crate::config::ReadingMode::Learning => 8.0,
            crate::config::ReadingMode::Normal => 6.0,
        };
        animation_secs.clamp(MIN_ANIMATION_SECS, max_secs) as f32
    }

    /// Generate the summary animation for a complete story.
    pub async fn generate_story_summary_animation(
        &self,
        content: &[PageRecord],
        reading_mode: &str,
    ) -> AppResult<AnimationResult> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::Configuration("STABILITY_API_KEY is not set".to_string())
        })?;

        self.validate_api_key(api_key).await?;

        info!("Creating story summary animation...");
        let summary_image = self.create_story_summary_image(content)?;
        let story_summary = self.create_story_summary(content);
        let motion_intensity = self.analyze_story_motion(content);
        let motion_bucket_id = (motion_intensity * 127.0) as u32;

        info!(
            "Story summary: {} (motion_bucket_id: {})",
            preview(&story_summary, 100),
            motion_bucket_id
        );

        let image_bytes = tokio::fs::read(&summary_image).await?;
        let image_part = Part::bytes(image_bytes)
            .file_name("story_summary.jpg")
            .mime_str("image/jpeg")?;
        let form = Form::new()
            .part("image", image_part)
            .text("seed", SUMMARY_SEED.to_string())
            .text("cfg_scale", SUMMARY_CFG_SCALE.to_string())
            .text("motion_bucket_id", motion_bucket_id.to_string());

        let response = self
            .client
            .post(format!("{}/v2beta/image-to-video", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Accept", "video/*")
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::AnimationGeneration(format!(
                "API error ({}): {}",
                status,
                preview(&body, 200)
            )));
        }

        let video_data = response.bytes().await?;
        if video_data.is_empty() {
            return Err(AppError::AnimationGeneration(
                "received empty video data from API".to_string(),
            ));
        }

        std::fs::create_dir_all(&self.videos_dir)?;
        let video_path = self
            .videos_dir
            .join(format!("story_summary_animation_{}.mp4", Utc::now().timestamp()));
        std::fs::write(&video_path, &video_data)?;
        info!(
            "Story summary animation saved: {} ({}KB)",
            video_path.display(),
            video_data.len() / 1024
        );

        let duration = self.calculate_animation_duration(&story_summary, reading_mode);

        Ok(AnimationResult {
            video_path: url_path(&video_path),
            summary_image: url_path(&summary_image),
            story_summary,
            motion_intensity,
            duration,
            description: "Complete story summary animation".to_string(),
        })
    }

    /// Append the summary page to the story. Animation failures degrade to a
    /// plain closing page carrying the error; they never fail the story.
    pub async fn add_story_summary_page(
        &self,
        mut content: Vec<PageRecord>,
        reading_mode: &str,
    ) -> Vec<PageRecord> {
        if content.is_empty() {
            return content;
        }

        info!("Adding story summary animation page...");
        let result = self.generate_story_summary_animation(&content, reading_mode).await;

        let fallback_image = content[0].image.clone();
        let mut page = PageRecord::new(
            content.len() + 1,
            "The End - Story Summary".to_string(),
            fallback_image,
            "The End".to_string(),
        );
        page.is_summary_page = true;

        match result {
            Ok(animation) => {
                page.image = animation.summary_image.clone();
                page.has_animation = true;
                page.animation = Some(animation.video_path);
                page.animation_description = Some(animation.description);
                page.animation_duration = Some(animation.duration);
                page.story_summary = Some(animation.story_summary);
                info!("Story summary animation page created successfully");
            }
            Err(e) => {
                warn!("Story summary animation failed: {}", e);
                page.animation_error = Some(e.to_string());
            }
        }

        content.push(page);
        content
    }

    async fn validate_api_key(&self, api_key: &str) -> AppResult<()> {
        let response = self
            .client
            .get(format!("{}/v1/user/account", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::AnimationGeneration(format!(
                "invalid API key (status: {})",
                response.status()
            )));
        }
        Ok(())
    }

    /// Copy the most action-packed scene's image (the middle of the story)
    /// as the animation base.
    fn create_story_summary_image(&self, content: &[PageRecord]) -> AppResult<PathBuf> {
        let middle = &content[content.len() / 2];
        let source = resolve_image_path(&middle.image);
        if !source.exists() {
            return Err(AppError::AnimationGeneration(
                "could not create summary image".to_string(),
            ));
        }

        std::fs::create_dir_all(&self.images_dir)?;
        let destination = self
            .images_dir
            .join(format!("story_summary_{}.jpg", Utc::now().timestamp()));
        std::fs::copy(&source, &destination)?;
        info!("Created story summary base image: {}", destination.display());
        Ok(destination)
    }
}

fn count_present(text: &str, words: &[&str]) -> usize {
    words.iter().filter(|word| text.contains(*word)).count()
}

fn url_path(path: &Path) -> String {
    format!("/{}", path.display())
}

/// Image URLs are rooted at the static directory; map one back to a file
/// path, tolerating absolute paths (tests point at scratch directories).
fn resolve_image_path(image_url: &str) -> PathBuf {
    let direct = PathBuf::from(image_url);
    if direct.is_absolute() && direct.exists() {
        return direct;
    }
    PathBuf::from(image_url.trim_start_matches('/'))
}
