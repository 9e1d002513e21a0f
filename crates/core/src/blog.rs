// crates/core/src/blog.rs
//! Flat-file blog post store.
//!
//! Posts live in a single JSON array on disk. Every mutation is
//! load-all/mutate/save-all with last-writer-wins semantics. A missing or
//! corrupt file degrades to an empty post list rather than an error.

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Auto-generated excerpts are cut at this many characters.
const EXCERPT_LEN: usize = 150;

#[derive(Debug, Error)]
pub enum BlogError {
    #[error("Post not found: {0}")]
    NotFound(i64),

    #[error("Failed to read blog store: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize blog store: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type BlogResult<T> = Result<T, BlogError>;

/// A published blog post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub category: String,
    /// Display date, `YYYY-MM-DD`.
    pub date: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Fields accepted when creating or updating a post.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFields {
    pub title: String,
    pub content: String,
    pub category: String,
    /// Explicit excerpt. When `None`, one is derived from the content.
    #[serde(default)]
    pub excerpt: Option<String>,
}

/// JSON-file-backed post store.
#[derive(Debug, Clone)]
pub struct BlogStore {
    data_file: PathBuf,
}

impl BlogStore {
    /// Create a store over the given file, ensuring its parent directory
    /// exists. The file itself is created lazily on first write.
    pub fn new(data_file: impl Into<PathBuf>) -> BlogResult<Self> {
        let data_file = data_file.into();
        if let Some(parent) = data_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { data_file })
    }

    pub fn path(&self) -> &Path {
        &self.data_file
    }

    /// Load all posts. Missing or unparseable files yield an empty list.
    pub fn list_posts(&self) -> Vec<BlogPost> {
        let raw = match std::fs::read_to_string(&self.data_file) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        match serde_json::from_str(&raw) {
            Ok(posts) => posts,
            Err(e) => {
                warn!(path = %self.data_file.display(), error = %e, "Blog store unreadable, treating as empty");
                Vec::new()
            }
        }
    }

    /// Get a single post by id.
    pub fn get_post(&self, id: i64) -> Option<BlogPost> {
        self.list_posts().into_iter().find(|p| p.id == id)
    }

    /// Create a new post, allocating the next id (max + 1).
    pub fn create_post(&self, fields: PostFields) -> BlogResult<BlogPost> {
        let mut posts = self.list_posts();
        let id = posts.iter().map(|p| p.id).max().unwrap_or(0) + 1;

        let now = Local::now();
        let post = BlogPost {
            id,
            excerpt: resolve_excerpt(&fields.content, fields.excerpt),
            title: fields.title,
            content: fields.content,
            category: fields.category,
            date: now.format("%Y-%m-%d").to_string(),
            created_at: now.to_rfc3339(),
            updated_at: None,
        };

        posts.push(post.clone());
        self.save_posts(&posts)?;
        Ok(post)
    }

    /// Update an existing post in place. The excerpt rule re-applies: an
    /// explicit excerpt overrides any previously derived one.
    pub fn update_post(&self, id: i64, fields: PostFields) -> BlogResult<BlogPost> {
        let mut posts = self.list_posts();
        let post = posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(BlogError::NotFound(id))?;

        post.excerpt = resolve_excerpt(&fields.content, fields.excerpt);
        post.title = fields.title;
        post.content = fields.content;
        post.category = fields.category;
        post.updated_at = Some(Local::now().to_rfc3339());

        let updated = post.clone();
        self.save_posts(&posts)?;
        Ok(updated)
    }

    /// Delete a post. Deleting an unknown id is a no-op.
    pub fn delete_post(&self, id: i64) -> BlogResult<()> {
        let mut posts = self.list_posts();
        posts.retain(|p| p.id != id);
        self.save_posts(&posts)
    }

    fn save_posts(&self, posts: &[BlogPost]) -> BlogResult<()> {
        let raw = serde_json::to_string_pretty(posts)?;
        std::fs::write(&self.data_file, raw)?;
        Ok(())
    }
}

/// An explicit excerpt always wins; otherwise content longer than
/// `EXCERPT_LEN` characters is cut there with a trailing ellipsis.
fn resolve_excerpt(content: &str, explicit: Option<String>) -> String {
    if let Some(excerpt) = explicit.filter(|e| !e.trim().is_empty()) {
        return excerpt;
    }
    if content.chars().count() > EXCERPT_LEN {
        let cut: String = content.chars().take(EXCERPT_LEN).collect();
        format!("{cut}...")
    } else {
        content.to_string()
    }
}
