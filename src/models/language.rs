//! Language model (e.g. "English", "Japanese")

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::{not_blank, NamedEntity};
use crate::error::{AppResult, FieldErrors};

/// Natural language a book is written in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Language {
    pub id: i32,
    pub name: String,
}

/// Create / update language request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LanguageInput {
    /// The book's natural language (e.g. English, French, Japanese)
    #[validate(
        length(max = 200, message = "Name must be at most 200 characters"),
        custom(function = "not_blank")
    )]
    pub name: String,
}

impl LanguageInput {
    pub fn check(&self) -> AppResult<()> {
        self.validate().map_err(FieldErrors::from)?;
        Ok(())
    }
}

impl NamedEntity for Language {
    const KIND: &'static str = "Language";

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
