//! Repository layer: persistence contracts and their backends
//!
//! Every delete clears nullable references to the removed row instead of
//! cascading: books keep existing when their author or language goes away,
//! copies keep existing when their book goes away.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        Author, AuthorInput, Book, BookFilter, BookInput, BookInstance, Genre, InstanceFilter,
        Language, NamedEntity, Window,
    },
};

/// Storage for id + name entities, ordered by name
#[async_trait]
pub trait LookupRepository<T: NamedEntity>: Send + Sync {
    async fn create(&self, name: &str) -> AppResult<T>;
    async fn get(&self, id: i32) -> AppResult<T>;
    /// Rows with the given ids that exist, in default order
    async fn get_many(&self, ids: &[i32]) -> AppResult<Vec<T>>;
    async fn list(&self, window: Window) -> AppResult<(Vec<T>, i64)>;
    async fn update(&self, id: i32, name: &str) -> AppResult<T>;
    async fn delete(&self, id: i32) -> AppResult<()>;
    async fn count(&self) -> AppResult<i64>;
}

/// Authors, ordered by last name then first name
#[async_trait]
pub trait AuthorsRepository: Send + Sync {
    async fn create(&self, author: &AuthorInput) -> AppResult<Author>;
    async fn get(&self, id: i32) -> AppResult<Author>;
    async fn get_many(&self, ids: &[i32]) -> AppResult<Vec<Author>>;
    async fn list(&self, window: Window) -> AppResult<(Vec<Author>, i64)>;
    async fn update(&self, id: i32, author: &AuthorInput) -> AppResult<Author>;
    async fn delete(&self, id: i32) -> AppResult<()>;
    async fn count(&self) -> AppResult<i64>;
}

/// Books, ordered by title. ISBNs are unique.
#[async_trait]
pub trait BooksRepository: Send + Sync {
    async fn create(&self, book: &BookInput) -> AppResult<Book>;
    async fn get(&self, id: i32) -> AppResult<Book>;
    async fn get_many(&self, ids: &[i32]) -> AppResult<Vec<Book>>;
    async fn list(&self, filter: &BookFilter, window: Window) -> AppResult<(Vec<Book>, i64)>;
    async fn update(&self, id: i32, book: &BookInput) -> AppResult<Book>;
    async fn delete(&self, id: i32) -> AppResult<()>;
    async fn count(&self, filter: &BookFilter) -> AppResult<i64>;
}

/// Raised by `create`/`update` when another book already holds the ISBN.
/// Backends check this atomically with the write.
pub fn isbn_conflict(isbn: &str) -> AppError {
    AppError::Conflict(format!("A book with ISBN {} already exists", isbn))
}

/// Book copies, ordered by due date with undated copies first
#[async_trait]
pub trait InstancesRepository: Send + Sync {
    async fn create(&self, instance: &BookInstance) -> AppResult<BookInstance>;
    async fn get(&self, id: Uuid) -> AppResult<BookInstance>;
    async fn list(
        &self,
        filter: &InstanceFilter,
        window: Window,
    ) -> AppResult<(Vec<BookInstance>, i64)>;
    /// Persist every field of an existing copy
    async fn save(&self, instance: &BookInstance) -> AppResult<BookInstance>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
    async fn count(&self, filter: &InstanceFilter) -> AppResult<i64>;
}

/// Main repository struct holding one handle per entity
#[derive(Clone)]
pub struct Repository {
    pub genres: Arc<dyn LookupRepository<Genre>>,
    pub languages: Arc<dyn LookupRepository<Language>>,
    pub authors: Arc<dyn AuthorsRepository>,
    pub books: Arc<dyn BooksRepository>,
    pub instances: Arc<dyn InstancesRepository>,
}

impl Repository {
    /// Repository backed by PostgreSQL
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            genres: Arc::new(postgres::PgLookupRepository::<Genre>::new(pool.clone())),
            languages: Arc::new(postgres::PgLookupRepository::<Language>::new(pool.clone())),
            authors: Arc::new(postgres::PgAuthorsRepository::new(pool.clone())),
            books: Arc::new(postgres::PgBooksRepository::new(pool.clone())),
            instances: Arc::new(postgres::PgInstancesRepository::new(pool)),
        }
    }

    /// Repository backed by process memory; contents are lost on exit
    pub fn memory() -> Self {
        let db = memory::MemoryDb::default();
        Self {
            genres: Arc::new(memory::MemoryLookupRepository::<Genre>::new(db.clone())),
            languages: Arc::new(memory::MemoryLookupRepository::<Language>::new(db.clone())),
            authors: Arc::new(memory::MemoryAuthorsRepository::new(db.clone())),
            books: Arc::new(memory::MemoryBooksRepository::new(db.clone())),
            instances: Arc::new(memory::MemoryInstancesRepository::new(db)),
        }
    }
}
