use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub color: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Category as returned by the API: the stored fields plus the derived
/// `postCount`, computed on read by counting referencing posts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResponse {
    #[serde(flatten)]
    pub category: Category,
    pub post_count: i64,
}

impl CategoryResponse {
    pub fn new(category: Category, post_count: i64) -> Self {
        Self { category, post_count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_flattens_category_and_adds_post_count() {
        let category = Category {
            id: Uuid::new_v4(),
            name: "Technology".into(),
            slug: "technology".into(),
            description: Some("Latest tech trends and innovations".into()),
            color: "#3B82F6".into(),
            is_active: true,
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(CategoryResponse::new(category, 3)).unwrap();
        assert_eq!(value["name"], "Technology");
        assert_eq!(value["postCount"], 3);
        assert_eq!(value["isActive"], true);
    }
}
