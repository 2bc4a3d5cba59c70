//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{authors, books, display, genres, health, instances, languages, loans, stats};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Catalog API",
        version = "1.0.0",
        description = "Library catalog: books, authors, genres, copies and loans"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Summary
        stats::get_summary,
        // Genres
        genres::list_genres,
        genres::get_genre,
        genres::create_genre,
        genres::update_genre,
        genres::delete_genre,
        // Languages
        languages::list_languages,
        languages::get_language,
        languages::create_language,
        languages::update_language,
        languages::delete_language,
        // Authors
        authors::list_authors,
        authors::get_author,
        authors::create_author,
        authors::update_author,
        authors::delete_author,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Book instances
        instances::list_instances,
        instances::get_instance,
        instances::create_instance,
        instances::update_instance,
        instances::delete_instance,
        instances::renewal_form,
        instances::renew_instance,
        instances::stock_instance,
        instances::check_out_instance,
        instances::return_instance,
        instances::reserve_instance,
        // Loans
        loans::my_loans,
        loans::all_loans,
        // Display
        display::get_display,
        display::get_entity_display,
    ),
    components(
        schemas(
            crate::models::Genre,
            crate::models::GenreInput,
            crate::models::Language,
            crate::models::LanguageInput,
            crate::models::Author,
            crate::models::AuthorRef,
            crate::models::AuthorDetail,
            crate::models::AuthorInput,
            crate::models::Book,
            crate::models::BookSummary,
            crate::models::BookDetail,
            crate::models::BookInput,
            crate::models::BookInstance,
            crate::models::BookInstanceInput,
            crate::models::InstanceView,
            crate::models::LoanStatus,
            crate::models::book_instance::CheckoutInput,
            crate::models::book_instance::ReserveInput,
            crate::models::renewal::RenewalForm,
            crate::models::renewal::RenewalInput,
            crate::models::summary::CatalogSummary,
            crate::models::Permission,
            health::HealthResponse,
            crate::error::FieldErrors,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "stats", description = "Catalog summary"),
        (name = "genres", description = "Genres"),
        (name = "languages", description = "Languages"),
        (name = "authors", description = "Authors"),
        (name = "books", description = "Books"),
        (name = "instances", description = "Book copies"),
        (name = "loans", description = "Loans, renewals and copy status"),
        (name = "display", description = "Listing and form layout")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
