use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

pub const REQUIRED_FIELDS_MESSAGE: &str = "Name and description are required";

/// A menu item.
///
/// `image` always mirrors `images[0]` (or `""` when there are no images); the
/// pair is only ever changed through [`Drink::set_images`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredDrink")]
pub struct Drink {
    pub id: i64,
    pub name: String,
    pub description: String,
    images: Vec<String>,
    image: String,
}

impl Drink {
    pub fn new(id: i64, text: DrinkText, images: Vec<String>) -> Self {
        let mut drink = Self {
            id,
            name: text.name,
            description: text.description,
            images: Vec::new(),
            image: String::new(),
        };
        drink.set_images(images);
        drink
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    /// Primary image, `""` when the drink has none.
    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn set_images(&mut self, images: Vec<String>) {
        self.image = images.first().cloned().unwrap_or_default();
        self.images = images;
    }

    pub fn set_text(&mut self, text: DrinkText) {
        self.name = text.name;
        self.description = text.description;
    }
}

/// Validated, trimmed name/description pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrinkText {
    pub name: String,
    pub description: String,
}

impl DrinkText {
    /// Trim both fields; either one empty afterwards is a validation error.
    pub fn parse(name: Option<&str>, description: Option<&str>) -> Result<Self, ModelError> {
        let name = name.map(str::trim).unwrap_or_default();
        let description = description.map(str::trim).unwrap_or_default();
        if name.is_empty() || description.is_empty() {
            return Err(ModelError::Validation(REQUIRED_FIELDS_MESSAGE.into()));
        }
        Ok(Self { name: name.to_string(), description: description.to_string() })
    }
}

// On-disk layout. Older files carry only the single `image` field.
#[derive(Deserialize)]
struct StoredDrink {
    id: i64,
    name: String,
    description: String,
    #[serde(default)]
    images: Option<Vec<String>>,
    #[serde(default)]
    image: Option<String>,
}

impl From<StoredDrink> for Drink {
    fn from(raw: StoredDrink) -> Self {
        let images = match (raw.images, raw.image) {
            (Some(images), _) => images,
            (None, Some(image)) if !image.is_empty() => vec![image],
            _ => Vec::new(),
        };
        let mut drink = Drink {
            id: raw.id,
            name: raw.name,
            description: raw.description,
            images: Vec::new(),
            image: String::new(),
        };
        drink.set_images(images);
        drink
    }
}
