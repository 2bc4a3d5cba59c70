//! In-process store. One lock guards all tables so a delete and the
//! reference clearing it implies are applied together.

use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    isbn_conflict, AuthorsRepository, BooksRepository, InstancesRepository, LookupRepository,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        book_instance::due_back_order, Author, AuthorInput, Book, BookFilter, BookInput,
        BookInstance, Genre, InstanceFilter, Language, NamedEntity, Window,
    },
};

/// Every table of the store
#[derive(Debug, Default)]
pub struct Tables {
    last_id: HashMap<&'static str, i32>,
    genres: BTreeMap<i32, Genre>,
    languages: BTreeMap<i32, Language>,
    authors: BTreeMap<i32, Author>,
    books: BTreeMap<i32, Book>,
    instances: HashMap<Uuid, BookInstance>,
}

impl Tables {
    fn next_id(&mut self, table: &'static str) -> i32 {
        let id = self.last_id.entry(table).or_insert(0);
        *id += 1;
        *id
    }

    fn ensure_isbn_free(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<()> {
        if self
            .books
            .values()
            .any(|b| b.isbn == isbn && Some(b.id) != exclude_id)
        {
            return Err(isbn_conflict(isbn));
        }
        Ok(())
    }
}

/// Shared handle on the in-memory tables
#[derive(Clone, Default)]
pub struct MemoryDb {
    tables: Arc<RwLock<Tables>>,
}

fn not_found(kind: &str, id: impl std::fmt::Display) -> AppError {
    AppError::NotFound(format!("{} with id {} not found", kind, id))
}

fn total(rows: usize) -> i64 {
    i64::try_from(rows).unwrap_or(i64::MAX)
}

// ---------------------------------------------------------------------------
// Genres & languages
// ---------------------------------------------------------------------------

/// Table access for named entities
pub trait MemoryTable: NamedEntity {
    const TABLE: &'static str;

    fn rows(tables: &Tables) -> &BTreeMap<i32, Self>;
    fn rows_mut(tables: &mut Tables) -> &mut BTreeMap<i32, Self>;
    /// Clear references held by other tables
    fn detach(tables: &mut Tables, id: i32);
}

impl MemoryTable for Genre {
    const TABLE: &'static str = "genres";

    fn rows(tables: &Tables) -> &BTreeMap<i32, Self> {
        &tables.genres
    }

    fn rows_mut(tables: &mut Tables) -> &mut BTreeMap<i32, Self> {
        &mut tables.genres
    }

    fn detach(tables: &mut Tables, id: i32) {
        for book in tables.books.values_mut() {
            book.genre_ids.retain(|g| *g != id);
        }
    }
}

impl MemoryTable for Language {
    const TABLE: &'static str = "languages";

    fn rows(tables: &Tables) -> &BTreeMap<i32, Self> {
        &tables.languages
    }

    fn rows_mut(tables: &mut Tables) -> &mut BTreeMap<i32, Self> {
        &mut tables.languages
    }

    fn detach(tables: &mut Tables, id: i32) {
        for book in tables.books.values_mut() {
            if book.language_id == Some(id) {
                book.language_id = None;
            }
        }
    }
}

fn sorted_by_name<T: NamedEntity>(rows: impl Iterator<Item = T>) -> Vec<T> {
    let mut rows: Vec<T> = rows.collect();
    rows.sort_by(|a, b| a.name().cmp(b.name()).then(a.id().cmp(&b.id())));
    rows
}

pub struct MemoryLookupRepository<T> {
    db: MemoryDb,
    _entity: PhantomData<fn() -> T>,
}

impl<T> MemoryLookupRepository<T> {
    pub fn new(db: MemoryDb) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<T: MemoryTable> LookupRepository<T> for MemoryLookupRepository<T> {
    async fn create(&self, name: &str) -> AppResult<T> {
        let mut tables = self.db.tables.write().await;
        let id = tables.next_id(T::TABLE);
        let row = T::from_parts(id, name.to_string());
        T::rows_mut(&mut tables).insert(id, row.clone());
        Ok(row)
    }

    async fn get(&self, id: i32) -> AppResult<T> {
        let tables = self.db.tables.read().await;
        T::rows(&tables)
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(T::KIND, id))
    }

    async fn get_many(&self, ids: &[i32]) -> AppResult<Vec<T>> {
        let tables = self.db.tables.read().await;
        let rows = T::rows(&tables);
        Ok(sorted_by_name(ids.iter().filter_map(|id| rows.get(id).cloned())))
    }

    async fn list(&self, window: Window) -> AppResult<(Vec<T>, i64)> {
        let tables = self.db.tables.read().await;
        let rows = sorted_by_name(T::rows(&tables).values().cloned());
        Ok((window.slice(&rows), total(rows.len())))
    }

    async fn update(&self, id: i32, name: &str) -> AppResult<T> {
        let mut tables = self.db.tables.write().await;
        let rows = T::rows_mut(&mut tables);
        if !rows.contains_key(&id) {
            return Err(not_found(T::KIND, id));
        }
        let row = T::from_parts(id, name.to_string());
        rows.insert(id, row.clone());
        Ok(row)
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tables = self.db.tables.write().await;
        if T::rows_mut(&mut tables).remove(&id).is_none() {
            return Err(not_found(T::KIND, id));
        }
        T::detach(&mut tables, id);
        Ok(())
    }

    async fn count(&self) -> AppResult<i64> {
        let tables = self.db.tables.read().await;
        Ok(total(T::rows(&tables).len()))
    }
}

// ---------------------------------------------------------------------------
// Authors
// ---------------------------------------------------------------------------

fn author_order(a: &Author, b: &Author) -> std::cmp::Ordering {
    a.last_name
        .cmp(&b.last_name)
        .then_with(|| a.first_name.cmp(&b.first_name))
        .then(a.id.cmp(&b.id))
}

fn author_from_input(id: i32, input: &AuthorInput) -> Author {
    Author {
        id,
        first_name: input.first_name.clone(),
        last_name: input.last_name.clone(),
        date_of_birth: input.date_of_birth,
        date_of_death: input.date_of_death,
    }
}

pub struct MemoryAuthorsRepository {
    db: MemoryDb,
}

impl MemoryAuthorsRepository {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuthorsRepository for MemoryAuthorsRepository {
    async fn create(&self, input: &AuthorInput) -> AppResult<Author> {
        let mut tables = self.db.tables.write().await;
        let id = tables.next_id("authors");
        let author = author_from_input(id, input);
        tables.authors.insert(id, author.clone());
        Ok(author)
    }

    async fn get(&self, id: i32) -> AppResult<Author> {
        let tables = self.db.tables.read().await;
        tables
            .authors
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("Author", id))
    }

    async fn get_many(&self, ids: &[i32]) -> AppResult<Vec<Author>> {
        let tables = self.db.tables.read().await;
        let mut rows: Vec<Author> = ids
            .iter()
            .filter_map(|id| tables.authors.get(id).cloned())
            .collect();
        rows.sort_by(author_order);
        rows.dedup_by_key(|a| a.id);
        Ok(rows)
    }

    async fn list(&self, window: Window) -> AppResult<(Vec<Author>, i64)> {
        let tables = self.db.tables.read().await;
        let mut rows: Vec<Author> = tables.authors.values().cloned().collect();
        rows.sort_by(author_order);
        Ok((window.slice(&rows), total(rows.len())))
    }

    async fn update(&self, id: i32, input: &AuthorInput) -> AppResult<Author> {
        let mut tables = self.db.tables.write().await;
        let slot = tables
            .authors
            .get_mut(&id)
            .ok_or_else(|| not_found("Author", id))?;
        *slot = author_from_input(id, input);
        Ok(slot.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tables = self.db.tables.write().await;
        if tables.authors.remove(&id).is_none() {
            return Err(not_found("Author", id));
        }
        for book in tables.books.values_mut() {
            if book.author_id == Some(id) {
                book.author_id = None;
            }
        }
        Ok(())
    }

    async fn count(&self) -> AppResult<i64> {
        let tables = self.db.tables.read().await;
        Ok(total(tables.authors.len()))
    }
}

// ---------------------------------------------------------------------------
// Books
// ---------------------------------------------------------------------------

fn book_order(a: &Book, b: &Book) -> std::cmp::Ordering {
    a.title.cmp(&b.title).then(a.id.cmp(&b.id))
}

fn book_from_input(id: i32, input: &BookInput) -> Book {
    Book {
        id,
        title: input.title.clone(),
        author_id: input.author_id,
        summary: input.summary.clone(),
        isbn: input.isbn.clone(),
        language_id: input.language_id,
        genre_ids: input.distinct_genre_ids(),
    }
}

pub struct MemoryBooksRepository {
    db: MemoryDb,
}

impl MemoryBooksRepository {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BooksRepository for MemoryBooksRepository {
    async fn create(&self, input: &BookInput) -> AppResult<Book> {
        let mut tables = self.db.tables.write().await;
        tables.ensure_isbn_free(&input.isbn, None)?;
        let id = tables.next_id("books");
        let book = book_from_input(id, input);
        tables.books.insert(id, book.clone());
        Ok(book)
    }

    async fn get(&self, id: i32) -> AppResult<Book> {
        let tables = self.db.tables.read().await;
        tables
            .books
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("Book", id))
    }

    async fn get_many(&self, ids: &[i32]) -> AppResult<Vec<Book>> {
        let tables = self.db.tables.read().await;
        let mut rows: Vec<Book> = ids
            .iter()
            .filter_map(|id| tables.books.get(id).cloned())
            .collect();
        rows.sort_by(book_order);
        rows.dedup_by_key(|b| b.id);
        Ok(rows)
    }

    async fn list(&self, filter: &BookFilter, window: Window) -> AppResult<(Vec<Book>, i64)> {
        let tables = self.db.tables.read().await;
        let mut rows: Vec<Book> = tables
            .books
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        rows.sort_by(book_order);
        Ok((window.slice(&rows), total(rows.len())))
    }

    async fn update(&self, id: i32, input: &BookInput) -> AppResult<Book> {
        let mut tables = self.db.tables.write().await;
        if !tables.books.contains_key(&id) {
            return Err(not_found("Book", id));
        }
        tables.ensure_isbn_free(&input.isbn, Some(id))?;
        let slot = tables
            .books
            .get_mut(&id)
            .ok_or_else(|| not_found("Book", id))?;
        *slot = book_from_input(id, input);
        Ok(slot.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tables = self.db.tables.write().await;
        if tables.books.remove(&id).is_none() {
            return Err(not_found("Book", id));
        }
        for instance in tables.instances.values_mut() {
            if instance.book_id == Some(id) {
                instance.book_id = None;
            }
        }
        Ok(())
    }

    async fn count(&self, filter: &BookFilter) -> AppResult<i64> {
        let tables = self.db.tables.read().await;
        Ok(total(tables.books.values().filter(|b| filter.matches(b)).count()))
    }
}

// ---------------------------------------------------------------------------
// Book instances
// ---------------------------------------------------------------------------

pub struct MemoryInstancesRepository {
    db: MemoryDb,
}

impl MemoryInstancesRepository {
    pub fn new(db: MemoryDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InstancesRepository for MemoryInstancesRepository {
    async fn create(&self, instance: &BookInstance) -> AppResult<BookInstance> {
        let mut tables = self.db.tables.write().await;
        if tables.instances.contains_key(&instance.id) {
            return Err(AppError::Conflict(format!(
                "Book instance {} already exists",
                instance.id
            )));
        }
        tables.instances.insert(instance.id, instance.clone());
        Ok(instance.clone())
    }

    async fn get(&self, id: Uuid) -> AppResult<BookInstance> {
        let tables = self.db.tables.read().await;
        tables
            .instances
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("Book instance", id))
    }

    async fn list(
        &self,
        filter: &InstanceFilter,
        window: Window,
    ) -> AppResult<(Vec<BookInstance>, i64)> {
        let tables = self.db.tables.read().await;
        let mut rows: Vec<BookInstance> = tables
            .instances
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        rows.sort_by(due_back_order);
        Ok((window.slice(&rows), total(rows.len())))
    }

    async fn save(&self, instance: &BookInstance) -> AppResult<BookInstance> {
        let mut tables = self.db.tables.write().await;
        let slot = tables
            .instances
            .get_mut(&instance.id)
            .ok_or_else(|| not_found("Book instance", instance.id))?;
        *slot = instance.clone();
        Ok(instance.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.db.tables.write().await;
        tables
            .instances
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found("Book instance", id))
    }

    async fn count(&self, filter: &InstanceFilter) -> AppResult<i64> {
        let tables = self.db.tables.read().await;
        Ok(total(
            tables.instances.values().filter(|i| filter.matches(i)).count(),
        ))
    }
}
