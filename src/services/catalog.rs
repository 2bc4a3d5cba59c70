//! Catalog service: genres, languages, authors, books and their copies

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    clock::Clock,
    error::{AppError, AppResult, FieldErrors},
    models::{
        genre::display_genre, Author, AuthorDetail, AuthorInput, AuthorRef, Book, BookDetail,
        BookFilter, BookInput, BookInstance, BookInstanceInput, BookSummary, Genre, GenreInput,
        InstanceFilter, InstanceView, Language, LanguageInput, NamedEntity, Page, PageQuery,
        PageRequest, Paginator, Window,
    },
    repository::{LookupRepository, Repository},
};

const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";

/// `Ok(false)` when the lookup failed only because the row is missing
fn found<T>(result: AppResult<T>) -> AppResult<bool> {
    match result {
        Ok(_) => Ok(true),
        Err(AppError::NotFound(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Check the requested page exists and wrap the rows
pub(crate) fn into_page<T>(rows: Vec<T>, total: i64, request: &PageRequest) -> AppResult<Page<T>> {
    request.ensure_in_range(total)?;
    Ok(Page::new(rows, total, request))
}

/// Attach book titles and date-dependent flags to copies
pub(crate) async fn instance_views(
    repository: &Repository,
    instances: Vec<BookInstance>,
    clock: &dyn Clock,
) -> AppResult<Vec<InstanceView>> {
    let mut book_ids: Vec<i32> = instances.iter().filter_map(|i| i.book_id).collect();
    book_ids.sort_unstable();
    book_ids.dedup();

    let titles: HashMap<i32, String> = repository
        .books
        .get_many(&book_ids)
        .await?
        .into_iter()
        .map(|b| (b.id, b.title))
        .collect();

    let today = clock.today();
    Ok(instances
        .into_iter()
        .map(|instance| {
            let title = instance.book_id.and_then(|id| titles.get(&id).cloned());
            InstanceView::new(instance, title, today)
        })
        .collect())
}

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    clock: Arc<dyn Clock>,
    paginator: Paginator,
}

impl CatalogService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>, paginator: Paginator) -> Self {
        Self {
            repository,
            clock,
            paginator,
        }
    }

    // =========================================================================
    // Genres & languages
    // =========================================================================

    async fn list_named<T: NamedEntity>(
        &self,
        repository: &dyn LookupRepository<T>,
        query: &PageQuery,
    ) -> AppResult<Page<T>> {
        let request = self.paginator.resolve(query)?;
        let (rows, total) = repository.list(request.window()).await?;
        into_page(rows, total, &request)
    }

    pub async fn list_genres(&self, query: &PageQuery) -> AppResult<Page<Genre>> {
        self.list_named(self.repository.genres.as_ref(), query).await
    }

    pub async fn get_genre(&self, id: i32) -> AppResult<Genre> {
        self.repository.genres.get(id).await
    }

    pub async fn create_genre(&self, input: &GenreInput) -> AppResult<Genre> {
        input.check()?;
        let genre = self.repository.genres.create(input.name.trim()).await?;
        tracing::info!(genre_id = genre.id, "Genre created");
        Ok(genre)
    }

    pub async fn update_genre(&self, id: i32, input: &GenreInput) -> AppResult<Genre> {
        input.check()?;
        self.repository.genres.update(id, input.name.trim()).await
    }

    pub async fn delete_genre(&self, id: i32) -> AppResult<()> {
        self.repository.genres.delete(id).await?;
        tracing::info!(genre_id = id, "Genre deleted");
        Ok(())
    }

    pub async fn list_languages(&self, query: &PageQuery) -> AppResult<Page<Language>> {
        self.list_named(self.repository.languages.as_ref(), query).await
    }

    pub async fn get_language(&self, id: i32) -> AppResult<Language> {
        self.repository.languages.get(id).await
    }

    pub async fn create_language(&self, input: &LanguageInput) -> AppResult<Language> {
        input.check()?;
        let language = self.repository.languages.create(input.name.trim()).await?;
        tracing::info!(language_id = language.id, "Language created");
        Ok(language)
    }

    pub async fn update_language(&self, id: i32, input: &LanguageInput) -> AppResult<Language> {
        input.check()?;
        self.repository.languages.update(id, input.name.trim()).await
    }

    pub async fn delete_language(&self, id: i32) -> AppResult<()> {
        self.repository.languages.delete(id).await?;
        tracing::info!(language_id = id, "Language deleted");
        Ok(())
    }

    // =========================================================================
    // Authors
    // =========================================================================

    pub async fn list_authors(&self, query: &PageQuery) -> AppResult<Page<Author>> {
        let request = self.paginator.resolve(query)?;
        let (rows, total) = self.repository.authors.list(request.window()).await?;
        into_page(rows, total, &request)
    }

    /// Author with every book they wrote
    pub async fn get_author(&self, id: i32) -> AppResult<AuthorDetail> {
        let author = self.repository.authors.get(id).await?;
        let (books, _) = self
            .repository
            .books
            .list(&BookFilter::by_author(id), Window::ALL)
            .await?;
        let books = self.book_summaries(books).await?;

        Ok(AuthorDetail {
            label: author.label(),
            author,
            books,
        })
    }

    pub async fn create_author(&self, input: &AuthorInput) -> AppResult<Author> {
        let input = input.trimmed();
        input.check()?;
        let author = self.repository.authors.create(&input).await?;
        tracing::info!(author_id = author.id, "Author created");
        Ok(author)
    }

    pub async fn update_author(&self, id: i32, input: &AuthorInput) -> AppResult<Author> {
        let input = input.trimmed();
        input.check()?;
        self.repository.authors.update(id, &input).await
    }

    /// Books by this author are kept, with their author cleared
    pub async fn delete_author(&self, id: i32) -> AppResult<()> {
        self.repository.authors.delete(id).await?;
        tracing::info!(author_id = id, "Author deleted");
        Ok(())
    }

    // =========================================================================
    // Books
    // =========================================================================

    pub async fn list_books(
        &self,
        filter: &BookFilter,
        query: &PageQuery,
    ) -> AppResult<Page<BookSummary>> {
        let request = self.paginator.resolve(query)?;
        let (rows, total) = self.repository.books.list(filter, request.window()).await?;
        request.ensure_in_range(total)?;
        let items = self.book_summaries(rows).await?;
        Ok(Page::new(items, total, &request))
    }

    pub async fn get_book(&self, id: i32) -> AppResult<BookDetail> {
        let book = self.repository.books.get(id).await?;

        let author = match book.author_id {
            Some(author_id) => self
                .repository
                .authors
                .get_many(&[author_id])
                .await?
                .first()
                .map(AuthorRef::from),
            None => None,
        };
        let language = match book.language_id {
            Some(language_id) => self
                .repository
                .languages
                .get_many(&[language_id])
                .await?
                .into_iter()
                .next(),
            None => None,
        };
        let genres = self.repository.genres.get_many(&book.genre_ids).await?;

        let (copies, _) = self
            .repository
            .instances
            .list(&InstanceFilter::for_book(id), Window::ALL)
            .await?;
        let instances = instance_views(&self.repository, copies, self.clock.as_ref()).await?;

        Ok(BookDetail {
            id: book.id,
            title: book.title,
            author,
            summary: book.summary,
            isbn: book.isbn,
            language,
            display_genre: display_genre(&genres),
            genres,
            instances,
        })
    }

    pub async fn create_book(&self, input: &BookInput) -> AppResult<Book> {
        let input = input.trimmed();
        input.check()?;
        self.check_book_references(&input).await?;

        let book = self.repository.books.create(&input).await?;
        tracing::info!(book_id = book.id, isbn = %book.isbn, "Book created");
        Ok(book)
    }

    pub async fn update_book(&self, id: i32, input: &BookInput) -> AppResult<Book> {
        let input = input.trimmed();
        input.check()?;
        // 404 before reference errors
        self.repository.books.get(id).await?;
        self.check_book_references(&input).await?;

        self.repository.books.update(id, &input).await
    }

    /// Copies of this book are kept, with their book cleared
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    async fn check_book_references(&self, input: &BookInput) -> AppResult<()> {
        let mut errors = FieldErrors::new();

        if let Some(author_id) = input.author_id {
            if !found(self.repository.authors.get(author_id).await)? {
                errors.add("author_id", INVALID_CHOICE);
            }
        }
        if let Some(language_id) = input.language_id {
            if !found(self.repository.languages.get(language_id).await)? {
                errors.add("language_id", INVALID_CHOICE);
            }
        }

        let genre_ids = input.distinct_genre_ids();
        let known = self.repository.genres.get_many(&genre_ids).await?;
        for id in genre_ids.iter().filter(|id| !known.iter().any(|g| g.id == **id)) {
            errors.add(
                "genre_ids",
                format!("Select a valid choice. {} is not one of the available choices.", id),
            );
        }

        errors.into_result()
    }

    /// Listing rows: author label and genre names resolved in batch
    async fn book_summaries(&self, books: Vec<Book>) -> AppResult<Vec<BookSummary>> {
        let mut author_ids: Vec<i32> = books.iter().filter_map(|b| b.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        let mut genre_ids: Vec<i32> = books.iter().flat_map(|b| b.genre_ids.clone()).collect();
        genre_ids.sort_unstable();
        genre_ids.dedup();

        let authors: HashMap<i32, AuthorRef> = self
            .repository
            .authors
            .get_many(&author_ids)
            .await?
            .iter()
            .map(|a| (a.id, AuthorRef::from(a)))
            .collect();
        // Ordered by name, so per-book selections keep that order
        let genres = self.repository.genres.get_many(&genre_ids).await?;

        Ok(books
            .into_iter()
            .map(|book| {
                let book_genres: Vec<Genre> = genres
                    .iter()
                    .filter(|g| book.genre_ids.contains(&g.id))
                    .cloned()
                    .collect();
                BookSummary {
                    id: book.id,
                    author: book.author_id.and_then(|id| authors.get(&id).cloned()),
                    title: book.title,
                    display_genre: display_genre(&book_genres),
                }
            })
            .collect())
    }

    // =========================================================================
    // Book instances
    // =========================================================================

    pub async fn list_instances(
        &self,
        filter: &InstanceFilter,
        query: &PageQuery,
    ) -> AppResult<Page<InstanceView>> {
        let request = self.paginator.resolve(query)?;
        let (rows, total) = self
            .repository
            .instances
            .list(filter, request.window())
            .await?;
        request.ensure_in_range(total)?;
        let items = instance_views(&self.repository, rows, self.clock.as_ref()).await?;
        Ok(Page::new(items, total, &request))
    }

    pub async fn get_instance(&self, id: Uuid) -> AppResult<InstanceView> {
        let instance = self.repository.instances.get(id).await?;
        self.view(instance).await
    }

    pub async fn create_instance(&self, input: &BookInstanceInput) -> AppResult<InstanceView> {
        input.check()?;
        self.check_instance_references(input).await?;

        let mut instance = BookInstance::new(input.book_id, input.imprint.trim());
        apply_instance_input(&mut instance, input);

        let created = self.repository.instances.create(&instance).await?;
        tracing::info!(instance_id = %created.id, book_id = ?created.book_id, "Book instance created");
        self.view(created).await
    }

    pub async fn update_instance(
        &self,
        id: Uuid,
        input: &BookInstanceInput,
    ) -> AppResult<InstanceView> {
        input.check()?;
        let mut instance = self.repository.instances.get(id).await?;
        self.check_instance_references(input).await?;

        instance.book_id = input.book_id;
        instance.imprint = input.imprint.trim().to_string();
        apply_instance_input(&mut instance, input);

        let saved = self.repository.instances.save(&instance).await?;
        self.view(saved).await
    }

    pub async fn delete_instance(&self, id: Uuid) -> AppResult<()> {
        self.repository.instances.delete(id).await?;
        tracing::info!(instance_id = %id, "Book instance deleted");
        Ok(())
    }

    async fn check_instance_references(&self, input: &BookInstanceInput) -> AppResult<()> {
        if let Some(book_id) = input.book_id {
            if !found(self.repository.books.get(book_id).await)? {
                return Err(FieldErrors::single("book_id", INVALID_CHOICE).into());
            }
        }
        Ok(())
    }

    async fn view(&self, instance: BookInstance) -> AppResult<InstanceView> {
        let mut views =
            instance_views(&self.repository, vec![instance], self.clock.as_ref()).await?;
        views
            .pop()
            .ok_or_else(|| AppError::Internal("Empty instance view".to_string()))
    }
}

fn apply_instance_input(instance: &mut BookInstance, input: &BookInstanceInput) {
    instance.due_back = input.due_back;
    instance.status = input.status.unwrap_or_default();
    instance.borrower_id = input.borrower_id;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::FixedClock, config::PaginationConfig, models::LoanStatus};
    use chrono::NaiveDate;

    fn service() -> CatalogService {
        let clock = FixedClock::new(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        CatalogService::new(
            Repository::memory(),
            Arc::new(clock),
            Paginator::new(&PaginationConfig::default()),
        )
    }

    fn book_input(title: &str, isbn: &str) -> BookInput {
        BookInput {
            title: title.to_string(),
            author_id: None,
            summary: "A summary".to_string(),
            isbn: isbn.to_string(),
            genre_ids: vec![],
            language_id: None,
        }
    }

    fn author_input(first: &str, last: &str) -> AuthorInput {
        AuthorInput {
            first_name: first.to_string(),
            last_name: last.to_string(),
            date_of_birth: None,
            date_of_death: None,
        }
    }

    #[tokio::test]
    async fn test_book_detail_resolves_references() {
        let catalog = service();
        let author = catalog.create_author(&author_input("Frank", "Herbert")).await.unwrap();
        let sf = catalog
            .create_genre(&GenreInput { name: "Science Fiction".to_string() })
            .await
            .unwrap();
        let english = catalog
            .create_language(&LanguageInput { name: "English".to_string() })
            .await
            .unwrap();

        let mut input = book_input("Dune", "9780441013593");
        input.author_id = Some(author.id);
        input.genre_ids = vec![sf.id];
        input.language_id = Some(english.id);
        let book = catalog.create_book(&input).await.unwrap();

        let detail = catalog.get_book(book.id).await.unwrap();
        assert_eq!(detail.author.unwrap().label, "Herbert, Frank");
        assert_eq!(detail.language.unwrap().name, "English");
        assert_eq!(detail.display_genre, "Science Fiction");
        assert!(detail.instances.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_references_are_field_errors() {
        let catalog = service();
        let mut input = book_input("Dune", "9780441013593");
        input.author_id = Some(99);
        input.genre_ids = vec![5];

        match catalog.create_book(&input).await {
            Err(AppError::Validation(errors)) => {
                assert!(errors.get("author_id").is_some());
                assert!(errors.get("genre_ids").is_some());
                assert!(errors.get("language_id").is_none());
            }
            other => panic!("expected validation error, got {:?}", other.map(|b| b.id)),
        }
    }

    #[tokio::test]
    async fn test_text_fields_are_trimmed() {
        let catalog = service();
        let author = catalog
            .create_author(&author_input("  Frank ", "Herbert  "))
            .await
            .unwrap();
        assert_eq!(author.label(), "Herbert, Frank");

        catalog.create_book(&book_input("Emma", "9780141439587")).await.unwrap();
        let dune = catalog
            .create_book(&book_input("  Dune ", " 9780441013593 "))
            .await
            .unwrap();
        assert_eq!(dune.title, "Dune");
        assert_eq!(dune.isbn, "9780441013593");

        let page = catalog
            .list_books(&BookFilter::default(), &PageQuery::default())
            .await
            .unwrap();
        let titles: Vec<&str> = page.items.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Dune", "Emma"]);

        // Padding does not dodge the ISBN check
        let result = catalog
            .create_book(&book_input("Dune Messiah", "9780441013593  "))
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_duplicate_isbn_conflicts() {
        let catalog = service();
        let first = catalog
            .create_book(&book_input("Dune", "9780441013593"))
            .await
            .unwrap();
        let result = catalog
            .create_book(&book_input("Dune Messiah", "9780441013593"))
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        // Saving a book with its own ISBN is fine
        assert!(catalog
            .update_book(first.id, &book_input("Dune (revised)", "9780441013593"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_author_detail_lists_books() {
        let catalog = service();
        let author = catalog.create_author(&author_input("Frank", "Herbert")).await.unwrap();
        for (title, isbn) in [("Dune Messiah", "9780441172696"), ("Dune", "9780441013593")] {
            let mut input = book_input(title, isbn);
            input.author_id = Some(author.id);
            catalog.create_book(&input).await.unwrap();
        }

        let detail = catalog.get_author(author.id).await.unwrap();
        let titles: Vec<&str> = detail.books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Dune", "Dune Messiah"]);
        assert_eq!(detail.label, "Herbert, Frank");
    }

    #[tokio::test]
    async fn test_instance_defaults_and_book_reference() {
        let catalog = service();
        let input = BookInstanceInput {
            book_id: Some(1),
            imprint: "Ace, 1990".to_string(),
            due_back: None,
            status: None,
            borrower_id: None,
        };
        assert!(matches!(
            catalog.create_instance(&input).await,
            Err(AppError::Validation(_))
        ));

        let book = catalog
            .create_book(&book_input("Dune", "9780441013593"))
            .await
            .unwrap();
        let input = BookInstanceInput {
            book_id: Some(book.id),
            ..input
        };
        let copy = catalog.create_instance(&input).await.unwrap();
        assert_eq!(copy.instance.status, LoanStatus::Maintenance);
        assert_eq!(copy.book_title.as_deref(), Some("Dune"));
        assert_eq!(copy.label, format!("{} (Dune)", copy.instance.id));
    }

    #[tokio::test]
    async fn test_empty_listing_first_page_only() {
        let catalog = service();
        let page = catalog.list_genres(&PageQuery::default()).await.unwrap();
        assert_eq!(page.total, 0);
        assert_eq!(page.num_pages, 1);
        assert!(matches!(
            catalog.list_genres(&PageQuery::page(2)).await,
            Err(AppError::NotFound(_))
        ));
    }
}
