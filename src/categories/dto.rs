use serde::Deserialize;

/// Request body for creating or updating a category.
#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Query string for listing categories.
#[derive(Debug, Default, Deserialize)]
pub struct ListCategoriesQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}
