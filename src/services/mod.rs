// Services module
// Business logic separated by domain area, one module per external provider
// plus local persistence

pub mod animation; // Story summary animation (Stability image-to-video)
pub mod image; // Illustration generation (Stability SDXL)
pub mod speech; // Narration synthesis (ElevenLabs)
pub mod storage; // SQLite persistence + temp staging
pub mod story; // Story text generation (Anthropic)

pub use animation::SummaryAnimationService;
pub use image::ImageService;
pub use speech::SpeechService;
pub use storage::StorageService;
pub use story::StoryService;
