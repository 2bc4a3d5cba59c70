//! Active loan listings

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{InstanceView, Page, PageQuery},
    AppState,
};

use super::AuthenticatedUser;

/// Copies lent to the caller, soonest due first
#[utoipa::path(
    get,
    path = "/loans/mine",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Caller's active loans"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Page<InstanceView>>> {
    let loans = state.services.loans.my_loans(&claims, &page).await?;
    Ok(Json(loans))
}

/// Every active loan, soonest due first
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "All active loans"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Missing can_view_all_loans")
    )
)]
pub async fn all_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Page<InstanceView>>> {
    let loans = state.services.loans.all_loans(&claims, &page).await?;
    Ok(Json(loans))
}
