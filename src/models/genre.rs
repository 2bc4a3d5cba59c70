//! Genre model (e.g. "Science Fiction", "French Poetry")

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::{not_blank, NamedEntity};
use crate::error::{AppResult, FieldErrors};

/// Book genre
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

/// Create / update genre request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct GenreInput {
    /// Genre name (e.g. Science Fiction, French Poetry)
    #[validate(
        length(max = 200, message = "Name must be at most 200 characters"),
        custom(function = "not_blank")
    )]
    pub name: String,
}

impl GenreInput {
    pub fn check(&self) -> AppResult<()> {
        self.validate().map_err(FieldErrors::from)?;
        Ok(())
    }
}

impl NamedEntity for Genre {
    const KIND: &'static str = "Genre";

    fn from_parts(id: i32, name: String) -> Self {
        Self { id, name }
    }

    fn id(&self) -> i32 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Compact rendering of up to three genre names, in the order given
pub fn display_genre(genres: &[Genre]) -> String {
    genres
        .iter()
        .take(3)
        .map(|g| g.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
