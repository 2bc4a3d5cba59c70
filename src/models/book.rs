//! Book (catalog title, not a specific copy) and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::{
    author::AuthorRef,
    book_instance::InstanceView,
    genre::Genre,
    language::Language,
    not_blank,
};
use crate::error::{AppResult, FieldErrors};

/// Book as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    /// Cleared when the author is deleted
    pub author_id: Option<i32>,
    pub summary: String,
    pub isbn: String,
    /// Cleared when the language is deleted
    pub language_id: Option<i32>,
    pub genre_ids: Vec<i32>,
}

/// Row shape for listings
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookSummary {
    pub id: i32,
    pub title: String,
    pub author: Option<AuthorRef>,
    /// Up to three genre names
    pub display_genre: String,
}

/// Book with its related entities and copies
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetail {
    pub id: i32,
    pub title: String,
    pub author: Option<AuthorRef>,
    pub summary: String,
    pub isbn: String,
    pub language: Option<Language>,
    pub genres: Vec<Genre>,
    pub display_genre: String,
    pub instances: Vec<InstanceView>,
}

/// Create / update book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BookInput {
    #[validate(
        length(max = 200, message = "Title must be at most 200 characters"),
        custom(function = "not_blank")
    )]
    pub title: String,
    pub author_id: Option<i32>,
    /// Brief description of the book
    #[validate(
        length(max = 1000, message = "Summary must be at most 1000 characters"),
        custom(function = "not_blank")
    )]
    pub summary: String,
    /// 13 character ISBN number
    #[validate(
        length(max = 13, message = "ISBN must be at most 13 characters"),
        custom(function = "not_blank")
    )]
    pub isbn: String,
    #[serde(default)]
    pub genre_ids: Vec<i32>,
    pub language_id: Option<i32>,
}

impl BookInput {
    pub fn check(&self) -> AppResult<()> {
        self.validate().map_err(FieldErrors::from)?;
        Ok(())
    }

    /// Copy with surrounding whitespace stripped from the text fields
    pub fn trimmed(&self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            summary: self.summary.trim().to_string(),
            isbn: self.isbn.trim().to_string(),
            ..self.clone()
        }
    }

    /// Genre ids without duplicates, first occurrence wins
    pub fn distinct_genre_ids(&self) -> Vec<i32> {
        let mut ids = Vec::with_capacity(self.genre_ids.len());
        for id in &self.genre_ids {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }
}

/// Book listing filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookFilter {
    /// Case-insensitive substring of the title
    pub title_contains: Option<String>,
    pub author_id: Option<i32>,
    pub genre_id: Option<i32>,
    pub language_id: Option<i32>,
}

impl BookFilter {
    pub fn by_author(author_id: i32) -> Self {
        Self {
            author_id: Some(author_id),
            ..Self::default()
        }
    }

    pub fn title_contains(needle: &str) -> Self {
        Self {
            title_contains: Some(needle.to_string()),
            ..Self::default()
        }
    }

    /// In-process evaluation, mirrors the SQL filter
    pub fn matches(&self, book: &Book) -> bool {
        if let Some(ref needle) = self.title_contains {
            if !book.title.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if self.author_id.is_some() && book.author_id != self.author_id {
            return false;
        }
        if let Some(genre_id) = self.genre_id {
            if !book.genre_ids.contains(&genre_id) {
                return false;
            }
        }
        if self.language_id.is_some() && book.language_id != self.language_id {
            return false;
        }
        true
    }
}
