use serde::Serialize;
use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

/// A menu item. `image` is always the first entry of `images`, or `""`.
#[derive(ToSchema)]
pub struct DrinkDoc {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub images: Vec<String>,
    pub image: String,
}

/// Multipart form accepted by create and update.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DrinkFormDoc {
    pub name: String,
    pub description: String,
    /// Up to 10 jpeg/png/gif/webp files, 5 MB each.
    #[schema(value_type = Option<Vec<String>>, format = Binary)]
    pub images: Option<Vec<Vec<u8>>>,
    /// JSON array of URLs, or a single URL.
    pub url_images: Option<String>,
    /// Update only: JSON array of current images to keep. Omit to keep all
    /// images when nothing else is sent; send `[]` to clear them.
    pub kept_existing_images: Option<String>,
}

#[derive(ToSchema)]
pub struct MessageDoc { pub message: String }

#[derive(ToSchema)]
pub struct ErrorDoc { pub error: String }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::drinks::list_drinks,
        crate::routes::drinks::get_drink,
        crate::routes::drinks::create_drink,
        crate::routes::drinks::update_drink,
        crate::routes::drinks::delete_drink,
    ),
    components(
        schemas(
            HealthResponse,
            DrinkDoc,
            DrinkFormDoc,
            MessageDoc,
            ErrorDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "drinks")
    )
)]
pub struct ApiDoc;
