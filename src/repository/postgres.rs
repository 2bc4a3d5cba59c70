//! PostgreSQL backend

use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::{postgres::PgRow, FromRow, Pool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    isbn_conflict, AuthorsRepository, BooksRepository, InstancesRepository, LookupRepository,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        Author, AuthorInput, Book, BookFilter, BookInput, BookInstance, Genre, InstanceFilter,
        Language, NamedEntity, Window,
    },
};

fn not_found(kind: &str, id: impl std::fmt::Display) -> AppError {
    AppError::NotFound(format!("{} with id {} not found", kind, id))
}

/// Escape LIKE wildcards so the needle matches literally
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// The only UNIQUE constraint a book write can hit is the ISBN
fn isbn_violation(error: sqlx::Error, isbn: &str) -> AppError {
    let unique = error
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if unique {
        isbn_conflict(isbn)
    } else {
        error.into()
    }
}

fn push_window(builder: &mut QueryBuilder<'_, Postgres>, window: Window) {
    builder
        .push(" LIMIT ")
        .push_bind(window.limit)
        .push(" OFFSET ")
        .push_bind(window.offset);
}

// ---------------------------------------------------------------------------
// Genres & languages
// ---------------------------------------------------------------------------

/// Table holding a named entity
pub trait PgTable: NamedEntity + for<'r> FromRow<'r, PgRow> + Unpin {
    const TABLE: &'static str;
}

impl PgTable for Genre {
    const TABLE: &'static str = "genres";
}

impl PgTable for Language {
    const TABLE: &'static str = "languages";
}

pub struct PgLookupRepository<T> {
    pool: Pool<Postgres>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> PgLookupRepository<T> {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<T: PgTable> LookupRepository<T> for PgLookupRepository<T> {
    async fn create(&self, name: &str) -> AppResult<T> {
        let query = format!("INSERT INTO {} (name) VALUES ($1) RETURNING id, name", T::TABLE);
        let row = sqlx::query_as::<_, T>(&query)
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get(&self, id: i32) -> AppResult<T> {
        let query = format!("SELECT id, name FROM {} WHERE id = $1", T::TABLE);
        sqlx::query_as::<_, T>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(T::KIND, id))
    }

    async fn get_many(&self, ids: &[i32]) -> AppResult<Vec<T>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT id, name FROM {} WHERE id = ANY($1) ORDER BY name, id",
            T::TABLE
        );
        let rows = sqlx::query_as::<_, T>(&query)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list(&self, window: Window) -> AppResult<(Vec<T>, i64)> {
        let total = self.count().await?;
        let query = format!(
            "SELECT id, name FROM {} ORDER BY name, id LIMIT $1 OFFSET $2",
            T::TABLE
        );
        let rows = sqlx::query_as::<_, T>(&query)
            .bind(window.limit)
            .bind(window.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok((rows, total))
    }

    async fn update(&self, id: i32, name: &str) -> AppResult<T> {
        let query = format!(
            "UPDATE {} SET name = $1 WHERE id = $2 RETURNING id, name",
            T::TABLE
        );
        sqlx::query_as::<_, T>(&query)
            .bind(name)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(T::KIND, id))
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let query = format!("DELETE FROM {} WHERE id = $1", T::TABLE);
        let result = sqlx::query(&query).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(not_found(T::KIND, id));
        }
        Ok(())
    }

    async fn count(&self) -> AppResult<i64> {
        let query = format!("SELECT COUNT(*) FROM {}", T::TABLE);
        let total: i64 = sqlx::query_scalar(&query).fetch_one(&self.pool).await?;
        Ok(total)
    }
}

// ---------------------------------------------------------------------------
// Authors
// ---------------------------------------------------------------------------

const AUTHOR_COLUMNS: &str = "id, first_name, last_name, date_of_birth, date_of_death";

#[derive(Clone)]
pub struct PgAuthorsRepository {
    pool: Pool<Postgres>,
}

impl PgAuthorsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorsRepository for PgAuthorsRepository {
    async fn create(&self, input: &AuthorInput) -> AppResult<Author> {
        let query = format!(
            r#"
            INSERT INTO authors (first_name, last_name, date_of_birth, date_of_death)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            AUTHOR_COLUMNS
        );
        let author = sqlx::query_as::<_, Author>(&query)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(input.date_of_birth)
            .bind(input.date_of_death)
            .fetch_one(&self.pool)
            .await?;
        Ok(author)
    }

    async fn get(&self, id: i32) -> AppResult<Author> {
        let query = format!("SELECT {} FROM authors WHERE id = $1", AUTHOR_COLUMNS);
        sqlx::query_as::<_, Author>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found("Author", id))
    }

    async fn get_many(&self, ids: &[i32]) -> AppResult<Vec<Author>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {} FROM authors WHERE id = ANY($1) ORDER BY last_name, first_name, id",
            AUTHOR_COLUMNS
        );
        let rows = sqlx::query_as::<_, Author>(&query)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list(&self, window: Window) -> AppResult<(Vec<Author>, i64)> {
        let total = self.count().await?;
        let query = format!(
            "SELECT {} FROM authors ORDER BY last_name, first_name, id LIMIT $1 OFFSET $2",
            AUTHOR_COLUMNS
        );
        let rows = sqlx::query_as::<_, Author>(&query)
            .bind(window.limit)
            .bind(window.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok((rows, total))
    }

    async fn update(&self, id: i32, input: &AuthorInput) -> AppResult<Author> {
        let query = format!(
            r#"
            UPDATE authors
            SET first_name = $1, last_name = $2, date_of_birth = $3, date_of_death = $4
            WHERE id = $5
            RETURNING {}
            "#,
            AUTHOR_COLUMNS
        );
        sqlx::query_as::<_, Author>(&query)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(input.date_of_birth)
            .bind(input.date_of_death)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found("Author", id))
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        // books.author_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("Author", id));
        }
        Ok(())
    }

    async fn count(&self) -> AppResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM authors")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}

// ---------------------------------------------------------------------------
// Books
// ---------------------------------------------------------------------------

const BOOK_SELECT: &str = r#"
    SELECT b.id, b.title, b.author_id, b.summary, b.isbn, b.language_id,
           COALESCE(
               array_agg(bg.genre_id ORDER BY bg.genre_id) FILTER (WHERE bg.genre_id IS NOT NULL),
               '{}'
           ) AS genre_ids
    FROM books b
    LEFT JOIN book_genres bg ON bg.book_id = b.id
"#;

fn push_book_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &BookFilter) {
    builder.push(" WHERE TRUE");
    if let Some(ref needle) = filter.title_contains {
        builder
            .push(" AND b.title ILIKE ")
            .push_bind(like_pattern(needle))
            .push(" ESCAPE '\\'");
    }
    if let Some(author_id) = filter.author_id {
        builder.push(" AND b.author_id = ").push_bind(author_id);
    }
    if let Some(language_id) = filter.language_id {
        builder.push(" AND b.language_id = ").push_bind(language_id);
    }
    if let Some(genre_id) = filter.genre_id {
        builder
            .push(" AND EXISTS (SELECT 1 FROM book_genres g WHERE g.book_id = b.id AND g.genre_id = ")
            .push_bind(genre_id)
            .push(")");
    }
}

#[derive(Clone)]
pub struct PgBooksRepository {
    pool: Pool<Postgres>,
}

impl PgBooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn replace_genres(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        book_id: i32,
        genre_ids: &[i32],
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM book_genres WHERE book_id = $1")
            .bind(book_id)
            .execute(&mut **tx)
            .await?;
        if !genre_ids.is_empty() {
            sqlx::query(
                "INSERT INTO book_genres (book_id, genre_id) SELECT $1, UNNEST($2::int[])",
            )
            .bind(book_id)
            .bind(genre_ids.to_vec())
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BooksRepository for PgBooksRepository {
    async fn create(&self, input: &BookInput) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO books (title, author_id, summary, isbn, language_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&input.title)
        .bind(input.author_id)
        .bind(&input.summary)
        .bind(&input.isbn)
        .bind(input.language_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| isbn_violation(e, &input.isbn))?;

        Self::replace_genres(&mut tx, id, &input.distinct_genre_ids()).await?;
        tx.commit().await?;

        self.get(id).await
    }

    async fn get(&self, id: i32) -> AppResult<Book> {
        let mut builder = QueryBuilder::<Postgres>::new(BOOK_SELECT);
        builder
            .push(" WHERE b.id = ")
            .push_bind(id)
            .push(" GROUP BY b.id");
        builder
            .build_query_as::<Book>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found("Book", id))
    }

    async fn get_many(&self, ids: &[i32]) -> AppResult<Vec<Book>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut builder = QueryBuilder::<Postgres>::new(BOOK_SELECT);
        builder
            .push(" WHERE b.id = ANY(")
            .push_bind(ids.to_vec())
            .push(") GROUP BY b.id ORDER BY b.title, b.id");
        let rows = builder.build_query_as::<Book>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn list(&self, filter: &BookFilter, window: Window) -> AppResult<(Vec<Book>, i64)> {
        let total = self.count(filter).await?;

        let mut builder = QueryBuilder::<Postgres>::new(BOOK_SELECT);
        push_book_filter(&mut builder, filter);
        builder.push(" GROUP BY b.id ORDER BY b.title, b.id");
        push_window(&mut builder, window);

        let rows = builder.build_query_as::<Book>().fetch_all(&self.pool).await?;
        Ok((rows, total))
    }

    async fn update(&self, id: i32, input: &BookInput) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = $1, author_id = $2, summary = $3, isbn = $4, language_id = $5
            WHERE id = $6
            "#,
        )
        .bind(&input.title)
        .bind(input.author_id)
        .bind(&input.summary)
        .bind(&input.isbn)
        .bind(input.language_id)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| isbn_violation(e, &input.isbn))?;

        if result.rows_affected() == 0 {
            return Err(not_found("Book", id));
        }

        Self::replace_genres(&mut tx, id, &input.distinct_genre_ids()).await?;
        tx.commit().await?;

        self.get(id).await
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        // book_genres cascade, book_instances.book_id is ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("Book", id));
        }
        Ok(())
    }

    async fn count(&self, filter: &BookFilter) -> AppResult<i64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books b");
        push_book_filter(&mut builder, filter);
        let total: i64 = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}

// ---------------------------------------------------------------------------
// Book instances
// ---------------------------------------------------------------------------

const INSTANCE_COLUMNS: &str = "id, book_id, imprint, due_back, status, borrower_id";

fn push_instance_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &InstanceFilter) {
    builder.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(book_id) = filter.book_id {
        builder.push(" AND book_id = ").push_bind(book_id);
    }
    if let Some(borrower_id) = filter.borrower_id {
        builder.push(" AND borrower_id = ").push_bind(borrower_id);
    }
    if let Some(from) = filter.due_from {
        builder.push(" AND due_back >= ").push_bind(from);
    }
    if let Some(until) = filter.due_until {
        builder.push(" AND due_back <= ").push_bind(until);
    }
}

#[derive(Clone)]
pub struct PgInstancesRepository {
    pool: Pool<Postgres>,
}

impl PgInstancesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InstancesRepository for PgInstancesRepository {
    async fn create(&self, instance: &BookInstance) -> AppResult<BookInstance> {
        let query = format!(
            r#"
            INSERT INTO book_instances (id, book_id, imprint, due_back, status, borrower_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            INSTANCE_COLUMNS
        );
        let row = sqlx::query_as::<_, BookInstance>(&query)
            .bind(instance.id)
            .bind(instance.book_id)
            .bind(&instance.imprint)
            .bind(instance.due_back)
            .bind(instance.status)
            .bind(instance.borrower_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get(&self, id: Uuid) -> AppResult<BookInstance> {
        let query = format!("SELECT {} FROM book_instances WHERE id = $1", INSTANCE_COLUMNS);
        sqlx::query_as::<_, BookInstance>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found("Book instance", id))
    }

    async fn list(
        &self,
        filter: &InstanceFilter,
        window: Window,
    ) -> AppResult<(Vec<BookInstance>, i64)> {
        let total = self.count(filter).await?;

        let mut builder = QueryBuilder::<Postgres>::new("SELECT ");
        builder.push(INSTANCE_COLUMNS).push(" FROM book_instances");
        push_instance_filter(&mut builder, filter);
        builder.push(" ORDER BY due_back ASC NULLS FIRST, id");
        push_window(&mut builder, window);

        let rows = builder
            .build_query_as::<BookInstance>()
            .fetch_all(&self.pool)
            .await?;
        Ok((rows, total))
    }

    async fn save(&self, instance: &BookInstance) -> AppResult<BookInstance> {
        let query = format!(
            r#"
            UPDATE book_instances
            SET book_id = $1, imprint = $2, due_back = $3, status = $4, borrower_id = $5
            WHERE id = $6
            RETURNING {}
            "#,
            INSTANCE_COLUMNS
        );
        sqlx::query_as::<_, BookInstance>(&query)
            .bind(instance.book_id)
            .bind(&instance.imprint)
            .bind(instance.due_back)
            .bind(instance.status)
            .bind(instance.borrower_id)
            .bind(instance.id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found("Book instance", instance.id))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM book_instances WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found("Book instance", id));
        }
        Ok(())
    }

    async fn count(&self, filter: &InstanceFilter) -> AppResult<i64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM book_instances");
        push_instance_filter(&mut builder, filter);
        let total: i64 = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}
