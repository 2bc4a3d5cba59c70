//! Author model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::{book::BookSummary, not_blank};
use crate::error::{AppResult, FieldErrors};

/// Author of zero or more books
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    /// Displayed as "died"
    pub date_of_death: Option<NaiveDate>,
}

impl Author {
    /// "last_name, first_name"
    pub fn label(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }
}

/// Author reference embedded in book views
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AuthorRef {
    pub id: i32,
    pub label: String,
}

impl From<&Author> for AuthorRef {
    fn from(author: &Author) -> Self {
        Self {
            id: author.id,
            label: author.label(),
        }
    }
}

/// Author detail with the books they wrote
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorDetail {
    #[serde(flatten)]
    pub author: Author,
    pub label: String,
    pub books: Vec<BookSummary>,
}

/// Create / update author request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AuthorInput {
    #[validate(
        length(max = 100, message = "First name must be at most 100 characters"),
        custom(function = "not_blank")
    )]
    pub first_name: String,
    #[validate(
        length(max = 100, message = "Last name must be at most 100 characters"),
        custom(function = "not_blank")
    )]
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
}

impl AuthorInput {
    pub fn trimmed(&self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            ..self.clone()
        }
    }

    pub fn check(&self) -> AppResult<()> {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => FieldErrors::from(e),
        };
        if let (Some(born), Some(died)) = (self.date_of_birth, self.date_of_death) {
            if died < born {
                errors.add("date_of_death", "Date of death cannot precede date of birth");
            }
        }
        errors.into_result()
    }
}
