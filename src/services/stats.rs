//! Statistics service: home page counts

use crate::{
    error::AppResult,
    models::{summary::CatalogSummary, BookFilter, InstanceFilter, LoanStatus},
    repository::Repository,
};

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Catalog counts. `title_contains` adds a count of matching books.
    pub async fn summary(
        &self,
        title_contains: Option<&str>,
        num_visits: i64,
    ) -> AppResult<CatalogSummary> {
        let repo = &self.repository;
        let all_books = BookFilter::default();
        let all_instances = InstanceFilter::default();
        let available = InstanceFilter::with_status(LoanStatus::Available);
        let on_loan = InstanceFilter::with_status(LoanStatus::OnLoan);

        let (num_books, num_instances, num_instances_available, num_instances_on_loan) = tokio::try_join!(
            repo.books.count(&all_books),
            repo.instances.count(&all_instances),
            repo.instances.count(&available),
            repo.instances.count(&on_loan),
        )?;
        let (num_authors, num_genres, num_languages) = tokio::try_join!(
            repo.authors.count(),
            repo.genres.count(),
            repo.languages.count(),
        )?;

        let num_books_matching = match title_contains.map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                Some(repo.books.count(&BookFilter::title_contains(needle)).await?)
            }
            _ => None,
        };

        Ok(CatalogSummary {
            num_books,
            num_instances,
            num_instances_available,
            num_instances_on_loan,
            num_authors,
            num_genres,
            num_languages,
            num_books_matching,
            num_visits,
        })
    }

    /// Round trip to storage, for readiness probes
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.genres.count().await?;
        Ok(())
    }
}
