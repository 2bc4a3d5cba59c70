//! Book instance endpoints: copy CRUD, renewal and status changes

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Redirect,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        book_instance::{CheckoutInput, ReserveInput},
        renewal::{RenewalForm, RenewalInput},
        BookInstanceInput, InstanceFilter, InstanceView, Page, PageQuery,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Where a successful renewal sends the client
pub const RENEWAL_REDIRECT: &str = "/api/v1/loans";

/// List copies, undated first then by due date
#[utoipa::path(
    get,
    path = "/instances",
    tag = "instances",
    params(InstanceFilter, PageQuery),
    responses(
        (status = 200, description = "Page of copies"),
        (status = 404, description = "Invalid page")
    )
)]
pub async fn list_instances(
    State(state): State<AppState>,
    Query(filter): Query<InstanceFilter>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Page<InstanceView>>> {
    let instances = state.services.catalog.list_instances(&filter, &page).await?;
    Ok(Json(instances))
}

#[utoipa::path(
    get,
    path = "/instances/{id}",
    tag = "instances",
    params(("id" = Uuid, Path, description = "Book instance ID")),
    responses(
        (status = 200, description = "Copy", body = InstanceView),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn get_instance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<InstanceView>> {
    let instance = state.services.catalog.get_instance(id).await?;
    Ok(Json(instance))
}

/// Register a new copy (in maintenance unless a status is given)
#[utoipa::path(
    post,
    path = "/instances",
    tag = "instances",
    security(("bearer_auth" = [])),
    request_body = BookInstanceInput,
    responses(
        (status = 201, description = "Copy created", body = InstanceView),
        (status = 400, description = "Invalid input or unknown book"),
        (status = 403, description = "Missing can_edit_catalog")
    )
)]
pub async fn create_instance(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(input): Json<BookInstanceInput>,
) -> AppResult<(StatusCode, Json<InstanceView>)> {
    claims.require_edit_catalog()?;

    let instance = state.services.catalog.create_instance(&input).await?;
    Ok((StatusCode::CREATED, Json(instance)))
}

#[utoipa::path(
    put,
    path = "/instances/{id}",
    tag = "instances",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book instance ID")),
    request_body = BookInstanceInput,
    responses(
        (status = 200, description = "Copy updated", body = InstanceView),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn update_instance(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(input): Json<BookInstanceInput>,
) -> AppResult<Json<InstanceView>> {
    claims.require_edit_catalog()?;

    let instance = state.services.catalog.update_instance(id, &input).await?;
    Ok(Json(instance))
}

#[utoipa::path(
    delete,
    path = "/instances/{id}",
    tag = "instances",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book instance ID")),
    responses(
        (status = 204, description = "Copy deleted"),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn delete_instance(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    claims.require_edit_catalog()?;

    state.services.catalog.delete_instance(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Renewal form with a proposed date
#[utoipa::path(
    get,
    path = "/instances/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book instance ID")),
    responses(
        (status = 200, description = "Renewal form", body = RenewalForm),
        (status = 403, description = "Missing can_mark_returned"),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn renewal_form(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RenewalForm>> {
    let form = state.services.loans.renewal_form(&claims, id).await?;
    Ok(Json(form))
}

/// Set a new due date, then redirect to all active loans
#[utoipa::path(
    post,
    path = "/instances/{id}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book instance ID")),
    request_body = RenewalInput,
    responses(
        (status = 303, description = "Renewed, redirect to all active loans"),
        (status = 400, description = "Invalid renewal date"),
        (status = 403, description = "Missing can_mark_returned"),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn renew_instance(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    input: Result<Json<RenewalInput>, JsonRejection>,
) -> AppResult<Redirect> {
    // An unreadable body is an empty form: the date is then reported missing
    let input = match input {
        Ok(Json(input)) => input,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unreadable renewal body");
            RenewalInput::default()
        }
    };
    state.services.loans.renew(&claims, id, &input).await?;
    Ok(Redirect::to(RENEWAL_REDIRECT))
}

/// Put a copy on the shelf
#[utoipa::path(
    post,
    path = "/instances/{id}/stock",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book instance ID")),
    responses(
        (status = 200, description = "Copy available", body = InstanceView),
        (status = 422, description = "Status change not allowed")
    )
)]
pub async fn stock_instance(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<InstanceView>> {
    let instance = state.services.loans.stock(&claims, id).await?;
    Ok(Json(instance))
}

/// Lend a copy
#[utoipa::path(
    post,
    path = "/instances/{id}/checkout",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book instance ID")),
    request_body = CheckoutInput,
    responses(
        (status = 200, description = "Copy on loan", body = InstanceView),
        (status = 400, description = "Due date in the past"),
        (status = 422, description = "Status change not allowed")
    )
)]
pub async fn check_out_instance(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(input): Json<CheckoutInput>,
) -> AppResult<Json<InstanceView>> {
    let instance = state.services.loans.check_out(&claims, id, &input).await?;
    Ok(Json(instance))
}

/// Mark a lent copy as returned
#[utoipa::path(
    post,
    path = "/instances/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book instance ID")),
    responses(
        (status = 200, description = "Copy available", body = InstanceView),
        (status = 422, description = "Copy is not on loan")
    )
)]
pub async fn return_instance(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<InstanceView>> {
    let instance = state.services.loans.mark_returned(&claims, id).await?;
    Ok(Json(instance))
}

/// Hold a copy for a borrower
#[utoipa::path(
    post,
    path = "/instances/{id}/reserve",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book instance ID")),
    request_body = ReserveInput,
    responses(
        (status = 200, description = "Copy reserved", body = InstanceView),
        (status = 422, description = "Status change not allowed")
    )
)]
pub async fn reserve_instance(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ReserveInput>,
) -> AppResult<Json<InstanceView>> {
    let instance = state.services.loans.reserve(&claims, id, &input).await?;
    Ok(Json(instance))
}
