//! Story persistence.
//!
//! Saved stories live in a local SQLite database; freshly generated stories
//! are staged as JSON files under a temp directory until the user names and
//! saves them. Stale staging entries are swept on startup.

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use rusqlite::{params, Connection};
use std::path::PathBuf;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{GeneratedStory, PageRecord, StoryRecord, StorySummary, TempStoryData};

pub struct StorageService {
    db_path: PathBuf,
    temp_dir: PathBuf,
}

impl StorageService {
    pub fn new(db_path: PathBuf, temp_dir: PathBuf) -> Self {
        Self { db_path, temp_dir }
    }

    fn open(&self) -> AppResult<Connection> {
        Ok(Connection::open(&self.db_path)?)
    }

    /// Create the schema if it does not exist yet.
    pub fn init_db(&self) -> AppResult<()> {
        let conn = self.open()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS stories (
                id TEXT PRIMARY KEY,
                title TEXT,
                description TEXT,
                character_description TEXT,
                created_at TEXT,
                story_text TEXT,
                simplified_text TEXT,
                image_descriptions TEXT,
                content TEXT
            )",
            [],
        )?;
        info!("Database initialized successfully");
        Ok(())
    }

    /// Save a staged story under a title. Returns the new story id.
    pub fn save_story(
        &self,
        title: &str,
        data: &TempStoryData,
        content: &[PageRecord],
    ) -> AppResult<String> {
        let conn = self.open()?;
        let story_id = Uuid::new_v4().to_string();
        let created_at = Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO stories (id, title, description, character_description, created_at,
                                  story_text, simplified_text, image_descriptions, content)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                story_id,
                title,
                data.description,
                data.character_description,
                created_at,
                data.story_text,
                data.simplified_text,
                serde_json::to_string(&data.image_descriptions)?,
                serde_json::to_string(content)?,
            ],
        )?;

        info!("Saved story '{}' with ID: {}", title, story_id);
        Ok(story_id)
    }

    /// All saved stories, newest first.
    pub fn get_all_stories(&self) -> AppResult<Vec<StorySummary>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, description, created_at FROM stories ORDER BY created_at DESC",
        )?;

        let stories = stmt
            .query_map([], |row| {
                Ok(StorySummary {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        info!("Retrieved {} stories from database", stories.len());
        Ok(stories)
    }

    /// A saved story with its full page content.
    pub fn get_story(&self, story_id: &str) -> AppResult<StoryRecord> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, description, character_description, created_at, story_text,
                    simplified_text, image_descriptions, content
             FROM stories WHERE id = ?1",
        )?;

        let row = stmt.query_row(params![story_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<String>>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, String>(8)?,
            ))
        });

        let (id, title, description, character_description, created_at, story_text, simplified, descriptions_json, content_json) =
            match row {
                Ok(values) => values,
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    return Err(AppError::StoryNotFound(story_id.to_string()));
                }
                Err(e) => return Err(e.into()),
            };

        Ok(StoryRecord {
            id,
            title,
            description,
            character_description,
            created_at,
            story_text,
            simplified_text: simplified,
            image_descriptions: serde_json::from_str(&descriptions_json)?,
            content: serde_json::from_str(&content_json)?,
        })
    }

    pub fn delete_story(&self, story_id: &str) -> AppResult<()> {
        let conn = self.open()?;
        conn.execute("DELETE FROM stories WHERE id = ?1", params![story_id])?;
        info!("Deleted story with ID: {}", story_id);
        Ok(())
    }

    /// Stage a freshly generated story on disk. Returns the staging id.
    pub fn store_temp_story(&self, story: &GeneratedStory) -> AppResult<String> {
        let temp_id = Uuid::new_v4().to_string();
        let story_dir = self.temp_dir.join(&temp_id);
        std::fs::create_dir_all(&story_dir)?;

        let data = TempStoryData {
            temp_id: temp_id.clone(),
            description: story.description.clone(),
            character_description: story.character_description.clone(),
            template_type: story.template_type.clone(),
            story_text: story.story_text.clone(),
            simplified_text: story.simplified_text.clone(),
            image_descriptions: story.image_descriptions.clone(),
            created_at: Utc::now().to_rfc3339(),
        };

        std::fs::write(
            story_dir.join("story_data.json"),
            serde_json::to_string(&data)?,
        )?;
        std::fs::write(
            story_dir.join("content.json"),
            serde_json::to_string(&story.content)?,
        )?;

        info!("Stored temporary story with ID: {}", temp_id);
        Ok(temp_id)
    }

    /// Load a staged story back.
    pub fn get_temp_story(&self, temp_id: &str) -> AppResult<(TempStoryData, Vec<PageRecord>)> {
        let story_dir = self.temp_dir.join(temp_id);
        if !story_dir.is_dir() {
            return Err(AppError::StoryNotFound(temp_id.to_string()));
        }

        let data: TempStoryData =
            serde_json::from_str(&std::fs::read_to_string(story_dir.join("story_data.json"))?)?;
        let content: Vec<PageRecord> =
            serde_json::from_str(&std::fs::read_to_string(story_dir.join("content.json"))?)?;

        Ok((data, content))
    }

    /// Remove staged stories older than `max_age_hours`, plus directories
    /// with no metadata at all. Per-entry failures are logged and skipped.
    pub fn cleanup_temp_stories(&self, max_age_hours: i64) -> AppResult<usize> {
        if !self.temp_dir.is_dir() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut removed = 0;

        for entry in std::fs::read_dir(&self.temp_dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable temp entry: {}", e);
                    continue;
                }
            };
            let story_dir = entry.path();
            if !story_dir.is_dir() {
                continue;
            }

            let data_file = story_dir.join("story_data.json");
            if !data_file.exists() {
                // No metadata means nothing to save: sweep it
                if let Err(e) = std::fs::remove_dir_all(&story_dir) {
                    error!("Error cleaning up {}: {}", story_dir.display(), e);
                } else {
                    removed += 1;
                }
                continue;
            }

            let age_hours = std::fs::read_to_string(&data_file)
                .ok()
                .and_then(|raw| serde_json::from_str::<TempStoryData>(&raw).ok())
                .and_then(|data| DateTime::parse_from_rfc3339(&data.created_at).ok())
                .map(|created_at| (now - created_at.with_timezone(&Utc)).num_hours());

            match age_hours {
                Some(age) if age > max_age_hours => {
                    if let Err(e) = std::fs::remove_dir_all(&story_dir) {
                        error!("Error cleaning up {}: {}", story_dir.display(), e);
                    } else {
                        removed += 1;
                    }
                }
                Some(_) => {}
                None => {
                    warn!("Unreadable staging metadata in {}", story_dir.display());
                }
            }
        }

        info!(
            "Cleaned up {} temporary stories older than {} hours",
            removed, max_age_hours
        );
        Ok(removed)
    }
}
