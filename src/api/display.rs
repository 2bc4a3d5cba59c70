//! Listing and form layout for each entity

use axum::{extract::Path, Json};
use serde::Serialize;

use crate::{
    error::{AppError, AppResult},
    models::display::{entity_display, DerivedField, EntityDisplay, DERIVED_FIELDS, ENTITIES},
};

#[derive(Serialize)]
pub struct DisplayResponse {
    pub entities: &'static [EntityDisplay],
    pub derived_fields: &'static [DerivedField],
}

#[utoipa::path(
    get,
    path = "/display",
    tag = "display",
    responses(
        (status = 200, description = "Display configuration of every entity")
    )
)]
pub async fn get_display() -> Json<DisplayResponse> {
    Json(DisplayResponse {
        entities: ENTITIES,
        derived_fields: DERIVED_FIELDS,
    })
}

#[utoipa::path(
    get,
    path = "/display/{entity}",
    tag = "display",
    params(("entity" = String, Path, description = "Entity name, e.g. book_instance")),
    responses(
        (status = 200, description = "Display configuration"),
        (status = 404, description = "Unknown entity")
    )
)]
pub async fn get_entity_display(Path(entity): Path<String>) -> AppResult<Json<EntityDisplay>> {
    entity_display(&entity)
        .copied()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No display configuration for {}", entity)))
}
