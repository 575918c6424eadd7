//! Illustration generation via the Stability AI SDXL API.
//!
//! Each story page gets one illustration. When a reference photo of the
//! star character exists on disk, image-to-image keeps her appearance
//! consistent across pages; otherwise text-to-image runs with a fixed seed
//! for the same reason. Artifacts are re-encoded as compressed JPEGs under
//! the images directory.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::DEFAULT_CHARACTER_DESCRIPTION;
use crate::errors::{AppError, AppResult};
use crate::utils::common::{check_file_exists_and_valid, preview};

const DEFAULT_BASE_URL: &str = "https://api.stability.ai";
const ENGINE: &str = "stable-diffusion-xl-1024-v1-0";
const JPEG_QUALITY: u8 = 85;
/// Fixed seed keeps the character recognizable across text-only generations.
const CHARACTER_SEED: u32 = 12345;
/// How far image-to-image may drift from the reference photo.
const IMAGE_STRENGTH: f32 = 0.35;

const NEGATIVE_PROMPT: &str = "realistic photography, adult features on child, all characters \
     looking identical, scary, dark, blurry, distorted face, extra limbs";

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    artifacts: Vec<Artifact>,
}

#[derive(Debug, Deserialize)]
struct Artifact {
    base64: String,
}

/// How the star character is being kept consistent for this run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterProfile {
    pub description: String,
    pub uses_photo_reference: bool,
    pub photo_path: Option<PathBuf>,
}

/// Client for the image-generation provider.
pub struct ImageService {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    images_dir: PathBuf,
    reference_photo: PathBuf,
    character_profile: Mutex<Option<CharacterProfile>>,
}

impl ImageService {
    pub fn new(api_key: Option<String>, images_dir: PathBuf, reference_photo: PathBuf) -> Self {
        Self::with_base_url(api_key, images_dir, reference_photo, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(
        api_key: Option<String>,
        images_dir: PathBuf,
        reference_photo: PathBuf,
        base_url: String,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            images_dir,
            reference_photo,
            character_profile: Mutex::new(None),
        }
    }

    pub async fn has_reference_photo(&self) -> bool {
        check_file_exists_and_valid(&self.reference_photo).await
    }

    /// Build (and remember) the character profile for this generation run.
    pub async fn generate_character_profile(&self, description: &str) -> CharacterProfile {
        let uses_photo = self.has_reference_photo().await;
        let profile = CharacterProfile {
            description: description.to_string(),
            uses_photo_reference: uses_photo,
            photo_path: uses_photo.then(|| self.reference_photo.clone()),
        };

        info!("Character profile created, photo reference: {}", uses_photo);
        *self.character_profile.lock().unwrap() = Some(profile.clone());
        profile
    }

    /// Generate the illustration for one story page and return its URL path.
    pub async fn generate_story_image(
        &self,
        scene_description: &str,
        page_number: usize,
        story_context: &str,
    ) -> AppResult<String> {
        if self.has_reference_photo().await {
            self.generate_with_photo(scene_description, page_number, story_context)
                .await
        } else {
            self.generate_text_only(scene_description, page_number).await
        }
    }

    /// Image-to-image against the reference photo; falls back to text-only
    /// generation on any failure.
    async fn generate_with_photo(
        &self,
        scene_description: &str,
        page_number: usize,
        _story_context: &str,
    ) -> AppResult<String> {
        info!("Using photo reference for page {}", page_number);

        match self.try_photo_generation(scene_description, page_number).await {
            Ok(url) => Ok(url),
            Err(e) => {
                warn!(
                    "Photo-based generation failed ({}), falling back to text-only",
                    e
                );
                self.generate_text_only(scene_description, page_number).await
            }
        }
    }

    async fn try_photo_generation(
        &self,
        scene_description: &str,
        page_number: usize,
    ) -> AppResult<String> {
        let api_key = self.require_api_key()?;
        let photo_bytes = tokio::fs::read(&self.reference_photo).await?;
        let init_image = STANDARD.encode(&photo_bytes);

        let payload = json!({
            "init_image": init_image,
            "text_prompts": [
                {"text": build_photo_prompt(scene_description), "weight": 1.0},
                {"text": NEGATIVE_PROMPT, "weight": -1.0},
            ],
            "image_strength": IMAGE_STRENGTH,
            "cfg_scale": 7,
            "height": 1024,
            "width": 1024,
            "samples": 1,
            "steps": 25,
        });

        let response = self
            .client
            .post(format!(
                "{}/v1/generation/{}/image-to-image",
                self.base_url, ENGINE
            ))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ImageGeneration(format!(
                "image-to-image error ({}): {}",
                status,
                preview(&body, 200)
            )));
        }

        let parsed: GenerationResponse = response.json().await?;
        let url = self.store_artifact(&parsed, scene_description, page_number)?;
        info!("Generated image with photo reference for page {}", page_number);
        Ok(url)
    }

    async fn generate_text_only(
        &self,
        scene_description: &str,
        page_number: usize,
    ) -> AppResult<String> {
        let api_key = self.require_api_key()?;
        let character = self
            .character_profile
            .lock()
            .unwrap()
            .as_ref()
            .map(|profile| profile.description.clone())
            .unwrap_or_else(|| DEFAULT_CHARACTER_DESCRIPTION.to_string());

        let payload = json!({
            "text_prompts": [
                {"text": build_text_prompt(scene_description, &character), "weight": 1.0},
                {"text": NEGATIVE_PROMPT, "weight": -1.0},
            ],
            "cfg_scale": 7,
            "height": 1024,
            "width": 1024,
            "samples": 1,
            "steps": 30,
            "seed": CHARACTER_SEED,
        });

        let response = self
            .client
            .post(format!(
                "{}/v1/generation/{}/text-to-image",
                self.base_url, ENGINE
            ))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ImageGeneration(format!(
                "text-to-image error ({}): {}",
                status,
                preview(&body, 200)
            )));
        }

        let parsed: GenerationResponse = response.json().await?;
        let url = self.store_artifact(&parsed, scene_description, page_number)?;
        info!("Generated text-only image for page {}", page_number);
        Ok(url)
    }

    fn require_api_key(&self) -> AppResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AppError::Configuration("STABILITY_API_KEY is not set".to_string()))
    }

    fn store_artifact(
        &self,
        response: &GenerationResponse,
        scene_description: &str,
        page_number: usize,
    ) -> AppResult<String> {
        let artifact = response.artifacts.first().ok_or_else(|| {
            AppError::ImageGeneration("response contained no artifacts".to_string())
        })?;

        let hash = format!("{:x}", md5::compute(scene_description));
        let file_name = format!("story_page_{}_{}.jpg", page_number, &hash[..8]);
        let path = self.save_and_compress(&artifact.base64, &file_name)?;
        Ok(url_path(&path))
    }

    /// Decode the artifact and save it as a compressed JPEG.
    fn save_and_compress(&self, image_b64: &str, file_name: &str) -> AppResult<PathBuf> {
        let data = STANDARD.decode(image_b64).map_err(|e| {
            AppError::ImageGeneration(format!("invalid image payload: {}", e))
        })?;
        let decoded = image::load_from_memory(&data)
            .map_err(|e| AppError::ImageGeneration(format!("could not decode image: {}", e)))?;
        let rgb = image::DynamicImage::ImageRgb8(decoded.to_rgb8());

        std::fs::create_dir_all(&self.images_dir)?;
        let path = self.images_dir.join(file_name);
        let mut file = std::fs::File::create(&path)?;
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut file, JPEG_QUALITY);
        rgb.write_with_encoder(encoder)
            .map_err(|e| AppError::ImageGeneration(format!("could not save image: {}", e)))?;

        let file_size = std::fs::metadata(&path)?.len();
        info!("Image saved: {} ({}KB)", path.display(), file_size / 1024);
        Ok(path)
    }
}

fn url_path(path: &Path) -> String {
    format!("/{}", path.display())
}

fn build_photo_prompt(scene_description: &str) -> String {
    format!(
        "Create a cinematic children's book illustration showing: {scene}\n\n\
         Keep Esme's facial features, hair and appearance exactly the same as\n\
         in the reference photo. Any other characters must look clearly\n\
         different from her.\n\n\
         Style: soft pastel children's book art, cinematic composition, rich\n\
         environmental detail, whimsical storybook atmosphere.",
        scene = scene_description,
    )
}

fn build_text_prompt(scene_description: &str, character_description: &str) -> String {
    format!(
        "Cinematic children's book illustration: {scene}\n\n\
         Main character Esme: exactly {character}. She must appear identical\n\
         in every image: same face shape, hair texture and color, eye color\n\
         and skin tone, always the focal point.\n\
         Other characters, if present, must look clearly different from her.\n\n\
         Style: soft pastel colors with vibrant accents, cinematic\n\
         composition, whimsical magical atmosphere, professional children's\n\
         book quality.",
        scene = scene_description,
        character = character_description,
    )
}
