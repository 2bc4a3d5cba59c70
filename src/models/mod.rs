//! Data models for the catalog

pub mod author;
pub mod book;
pub mod book_instance;
pub mod display;
pub mod genre;
pub mod language;
pub mod page;
pub mod renewal;
pub mod summary;
pub mod user;

use validator::ValidationError;

// Re-export commonly used types
pub use author::{Author, AuthorDetail, AuthorInput, AuthorRef};
pub use book::{Book, BookDetail, BookFilter, BookInput, BookSummary};
pub use book_instance::{BookInstance, BookInstanceInput, InstanceFilter, InstanceView, LoanStatus};
pub use genre::{Genre, GenreInput};
pub use language::{Language, LanguageInput};
pub use page::{Page, PageQuery, PageRequest, Paginator, Window};
pub use user::{Permission, UserClaims};

/// Entities that are nothing more than an id and a name (genres, languages)
pub trait NamedEntity: Clone + Send + Sync + 'static {
    /// Name used in error messages
    const KIND: &'static str;

    fn from_parts(id: i32, name: String) -> Self;
    fn id(&self) -> i32;
    fn name(&self) -> &str;
}

/// Rejects empty or whitespace-only text
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some("This field is required.".into());
        return Err(error);
    }
    Ok(())
}
