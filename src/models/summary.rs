//! Home page summary counts

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct SummaryQuery {
    /// Also count books whose title contains this text (case-insensitive)
    pub title_contains: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CatalogSummary {
    pub num_books: i64,
    pub num_instances: i64,
    pub num_instances_available: i64,
    pub num_instances_on_loan: i64,
    pub num_authors: i64,
    pub num_genres: i64,
    pub num_languages: i64,
    /// Present when a title substring was requested
    pub num_books_matching: Option<i64>,
    /// Visits to the summary in this session before the current one
    pub num_visits: i64,
}
