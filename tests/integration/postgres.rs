//! PostgreSQL backend tests
//!
//! These need a live server. Each test migrates a private schema and drops it
//! afterwards. Run with: DATABASE_URL=postgres://... cargo test -- --ignored

use chrono::NaiveDate;
use sqlx::{postgres::PgPoolOptions, Executor, Pool, Postgres};
use uuid::Uuid;

use catalog_server::{
    models::{BookFilter, BookInput, BookInstance, InstanceFilter, LoanStatus, Window},
    repository::Repository,
    AppError,
};

struct PgFixture {
    admin: Pool<Postgres>,
    schema: String,
    repository: Repository,
}

impl PgFixture {
    async fn new() -> Self {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let schema = format!("catalog_test_{}", Uuid::new_v4().simple());

        let admin = PgPoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .unwrap();
        admin
            .execute(format!("CREATE SCHEMA {}", schema).as_str())
            .await
            .unwrap();

        let search_path = format!("SET search_path TO {}", schema);
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .after_connect(move |conn, _meta| {
                let search_path = search_path.clone();
                Box::pin(async move {
                    conn.execute(search_path.as_str()).await?;
                    Ok(())
                })
            })
            .connect(&url)
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();

        Self {
            admin,
            schema,
            repository: Repository::postgres(pool),
        }
    }

    async fn drop_schema(self) {
        self.admin
            .execute(format!("DROP SCHEMA {} CASCADE", self.schema).as_str())
            .await
            .unwrap();
    }
}

fn book_input(title: &str, isbn: &str, genre_ids: Vec<i32>) -> BookInput {
    BookInput {
        title: title.to_string(),
        author_id: None,
        summary: "A summary".to_string(),
        isbn: isbn.to_string(),
        genre_ids,
        language_id: None,
    }
}

fn day(d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2024, 5, d)
}

#[tokio::test]
#[ignore]
async fn test_pg_undated_copies_sort_first() {
    let fixture = PgFixture::new().await;
    let instances = &fixture.repository.instances;

    let mut late = BookInstance::new(None, "late");
    late.status = LoanStatus::OnLoan;
    late.due_back = day(20);
    let mut early = BookInstance::new(None, "early");
    early.status = LoanStatus::OnLoan;
    early.due_back = day(2);
    let shelf = BookInstance::new(None, "shelf");
    for copy in [&late, &early, &shelf] {
        instances.create(copy).await.unwrap();
    }

    let (rows, total) = instances
        .list(&InstanceFilter::default(), Window::ALL)
        .await
        .unwrap();
    assert_eq!(total, 3);
    let imprints: Vec<&str> = rows.iter().map(|r| r.imprint.as_str()).collect();
    assert_eq!(imprints, vec!["shelf", "early", "late"]);

    let filter = InstanceFilter {
        due_from: day(1),
        due_until: day(10),
        ..InstanceFilter::default()
    };
    let (rows, _) = instances.list(&filter, Window::ALL).await.unwrap();
    assert_eq!(rows, vec![early]);

    fixture.drop_schema().await;
}

#[tokio::test]
#[ignore]
async fn test_pg_deletes_clear_references() {
    let fixture = PgFixture::new().await;
    let repository = &fixture.repository;

    let sf = repository.genres.create("Science Fiction").await.unwrap();
    let adventure = repository.genres.create("Adventure").await.unwrap();
    let book = repository
        .books
        .create(&book_input("Dune", "9780441013593", vec![sf.id, adventure.id, sf.id]))
        .await
        .unwrap();
    assert_eq!(book.genre_ids.len(), 2);

    let copy = repository
        .instances
        .create(&BookInstance::new(Some(book.id), "Ace"))
        .await
        .unwrap();

    repository.genres.delete(sf.id).await.unwrap();
    assert_eq!(
        repository.books.get(book.id).await.unwrap().genre_ids,
        vec![adventure.id]
    );

    repository.books.delete(book.id).await.unwrap();
    assert_eq!(repository.instances.get(copy.id).await.unwrap().book_id, None);
    assert_eq!(repository.books.count(&BookFilter::default()).await.unwrap(), 0);

    fixture.drop_schema().await;
}

#[tokio::test]
#[ignore]
async fn test_pg_duplicate_isbn_is_a_conflict() {
    let fixture = PgFixture::new().await;
    let books = &fixture.repository.books;

    let dune = books
        .create(&book_input("Dune", "9780441013593", vec![]))
        .await
        .unwrap();
    let emma = books
        .create(&book_input("Emma", "9780141439587", vec![]))
        .await
        .unwrap();

    let result = books
        .create(&book_input("Dune Messiah", "9780441013593", vec![]))
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let result = books
        .update(emma.id, &book_input("Emma", "9780441013593", vec![]))
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    assert!(books
        .update(dune.id, &book_input("Dune", "9780441013593", vec![]))
        .await
        .is_ok());

    fixture.drop_schema().await;
}
