use serde::{Deserialize, Serialize};

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const NO_DESCRIPTION: &str = "No Description";

/// Field name of the identity key in the store file.
pub const IDENTITY_KEY: &str = "short_description";

/// One product as it appears on a listing page and in the store file.
///
/// `description` is the identity key: two records with the same description
/// are the same product and get merged by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(rename = "product_title")]
    pub title: String,
    #[serde(rename = "product_price", default)]
    pub price: Option<i64>,
    #[serde(rename = "path_to_image")]
    pub image_path: String,
    #[serde(rename = "short_description")]
    pub description: String,
}

impl ProductRecord {
    pub fn identity_key(&self) -> &str {
        &self.description
    }
}
