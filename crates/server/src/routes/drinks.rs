use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use common::types::Message;
use models::{Drink, DrinkText};
use service::{
    drinks::{CreateDrink, UpdateDrink},
    errors::ServiceError,
    images::{IncomingImage, UploadStore},
};
use tracing::{debug, info};

use crate::errors::JsonApiError;
use crate::state::AppState;

/// Fields of the create/update multipart form.
#[derive(Debug, Default)]
pub struct DrinkForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub url_images: Option<String>,
    pub kept_existing: Option<String>,
    pub images: Vec<IncomingImage>,
}

/// Drain the multipart body. File parts are checked against the upload rules
/// here so an oversized request fails before anything touches the disk.
pub async fn read_form(mut multipart: Multipart, uploads: &UploadStore) -> Result<DrinkForm, JsonApiError> {
    let mut form = DrinkForm::default();
    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            // `image` is the single-file field older clients send
            "images" | "image" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                // an empty <input type="file"> still submits a blank part
                if bytes.is_empty() && file_name.as_deref().unwrap_or_default().is_empty() {
                    continue;
                }
                let image = IncomingImage { file_name, content_type, bytes: bytes.to_vec() };
                uploads.check(&image)?;
                form.images.push(image);
                uploads.check_count(form.images.len())?;
            }
            "name" => form.name = Some(field.text().await?),
            "description" => form.description = Some(field.text().await?),
            "urlImages" => form.url_images = Some(field.text().await?),
            "keptExistingImages" => form.kept_existing = Some(field.text().await?),
            other => debug!(field = %other, "ignoring unknown form field"),
        }
    }
    Ok(form)
}

/// Ids are integers; anything else names no drink.
fn parse_id(raw: &str) -> Result<i64, JsonApiError> {
    raw.trim().parse::<i64>().map_err(|_| ServiceError::not_found("Drink").into())
}

#[utoipa::path(
    get, path = "/api/drinks", tag = "drinks",
    responses(
        (status = 200, description = "All drinks", body = [crate::openapi::DrinkDoc]),
        (status = 500, description = "Storage error", body = crate::openapi::ErrorDoc)
    )
)]
pub async fn list_drinks(State(state): State<AppState>) -> Result<Json<Vec<Drink>>, JsonApiError> {
    Ok(Json(state.drinks.list().await?))
}

#[utoipa::path(
    get, path = "/api/drinks/{id}", tag = "drinks",
    params(("id" = i64, Path, description = "Drink id")),
    responses(
        (status = 200, description = "Drink", body = crate::openapi::DrinkDoc),
        (status = 404, description = "Unknown id", body = crate::openapi::ErrorDoc)
    )
)]
pub async fn get_drink(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Drink>, JsonApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.drinks.get(id).await?))
}

#[utoipa::path(
    post, path = "/api/drinks", tag = "drinks",
    request_body(content = crate::openapi::DrinkFormDoc, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Created", body = crate::openapi::DrinkDoc),
        (status = 400, description = "Missing fields or rejected upload", body = crate::openapi::ErrorDoc)
    )
)]
pub async fn create_drink(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Drink>), JsonApiError> {
    let uploads = state.drinks.uploads();
    let form = read_form(multipart, uploads).await?;
    let uploaded = uploads.persist(form.images).await?;

    let input = CreateDrink {
        name: form.name,
        description: form.description,
        uploaded: uploaded.clone(),
        url_images: form.url_images,
    };
    match state.drinks.create(input).await {
        Ok(drink) => Ok((StatusCode::CREATED, Json(drink))),
        Err(e) => {
            uploads.discard(&uploaded).await;
            Err(e.into())
        }
    }
}

#[utoipa::path(
    put, path = "/api/drinks/{id}", tag = "drinks",
    params(("id" = i64, Path, description = "Drink id")),
    request_body(content = crate::openapi::DrinkFormDoc, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Updated", body = crate::openapi::DrinkDoc),
        (status = 400, description = "Missing fields or rejected upload", body = crate::openapi::ErrorDoc),
        (status = 404, description = "Unknown id", body = crate::openapi::ErrorDoc)
    )
)]
pub async fn update_drink(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Drink>, JsonApiError> {
    let uploads = state.drinks.uploads();
    let form = read_form(multipart, uploads).await?;
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(not_found) => {
            // missing fields still win over an unknown id
            DrinkText::parse(form.name.as_deref(), form.description.as_deref()).map_err(ServiceError::from)?;
            return Err(not_found);
        }
    };
    let uploaded = uploads.persist(form.images).await?;

    let input = UpdateDrink {
        name: form.name,
        description: form.description,
        uploaded: uploaded.clone(),
        url_images: form.url_images,
        kept_existing: form.kept_existing,
    };
    match state.drinks.update(id, input).await {
        Ok(drink) => Ok(Json(drink)),
        Err(e) => {
            uploads.discard(&uploaded).await;
            Err(e.into())
        }
    }
}

#[utoipa::path(
    delete, path = "/api/drinks/{id}", tag = "drinks",
    params(("id" = i64, Path, description = "Drink id")),
    responses(
        (status = 200, description = "Deleted", body = crate::openapi::MessageDoc),
        (status = 404, description = "Unknown id", body = crate::openapi::ErrorDoc)
    )
)]
pub async fn delete_drink(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Message>, JsonApiError> {
    let id = parse_id(&id)?;
    state.drinks.delete(id).await?;
    info!(id, "delete request served");
    Ok(Json(Message::new("Drink deleted successfully")))
}
