use serde::{Deserialize, Serialize};

/// A course document as the CMS stores it. Prices live on the document in
/// the author's chosen currency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub image_url: Option<String>,
}
