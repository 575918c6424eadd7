// Domain models module
// Core data structures used throughout the application

pub mod story;

pub use story::{
    GeneratedStory, PageRecord, SpeechMeta, StoryRecord, StorySummary, StoryTemplate,
    TempStoryData, Voice,
};
