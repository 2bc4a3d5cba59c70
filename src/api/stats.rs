//! Home page summary endpoint

use axum::{
    extract::{Query, State},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::{
    error::AppResult,
    models::summary::{CatalogSummary, SummaryQuery},
    AppState,
};

/// Catalog counts and the number of earlier visits in this session
#[utoipa::path(
    get,
    path = "/summary",
    tag = "stats",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Catalog summary", body = CatalogSummary)
    )
)]
pub async fn get_summary(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<SummaryQuery>,
) -> AppResult<(CookieJar, Json<CatalogSummary>)> {
    let cookie_name = state.config.sessions.cookie_name.clone();
    let session_id = jar.get(&cookie_name).map(|c| c.value().to_string());

    let mut session = state.services.sessions.load(session_id.as_deref()).await?;
    let num_visits = session.record_visit();
    state.services.sessions.save(&session).await?;

    let summary = state
        .services
        .stats
        .summary(query.title_contains.as_deref(), num_visits)
        .await?;

    let jar = if session.is_new {
        jar.add(
            Cookie::build((cookie_name, session.id))
                .path("/")
                .http_only(true),
        )
    } else {
        jar
    };

    Ok((jar, Json(summary)))
}
