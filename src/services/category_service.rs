use chrono::Utc;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::identifier::Identifier;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{self, Category, CategoryResponse, Post};
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::filter::FilterData;

const DEFAULT_COLOR: &str = "#6B7280";

#[derive(Debug, Clone)]
pub struct CreateCategory {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateCategory {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub is_active: Option<bool>,
}

const INSERT_CATEGORY: &str = r#"
    INSERT INTO categories (id, name, slug, description, color, is_active, created_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7)
    RETURNING *
"#;

const UPDATE_CATEGORY: &str = r#"
    UPDATE categories
    SET name = $2, description = $3, color = $4, is_active = $5
    WHERE id = $1
    RETURNING *
"#;

pub struct CategoryService {
    pool: PgPool,
    categories: Repository<Category>,
    posts: Repository<Post>,
}

impl CategoryService {
    pub async fn new() -> Result<Self, ApiError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self {
            categories: Repository::new("categories", pool.clone()),
            posts: Repository::new("posts", pool.clone()),
            pool,
        })
    }

    /// Active categories, name ascending, each with its derived post count.
    /// The counts are independent reads issued concurrently.
    pub async fn list(&self) -> Result<Vec<CategoryResponse>, ApiError> {
        let categories = self
            .categories
            .select_any(FilterData {
                where_clause: Some(json!({ "is_active": true })),
                order: Some(json!("name asc")),
                ..Default::default()
            })
            .await?;

        let counts = futures::future::try_join_all(
            categories.iter().map(|category| self.post_count(category.id)),
        )
        .await?;

        Ok(categories
            .into_iter()
            .zip(counts)
            .map(|(category, count)| CategoryResponse::new(category, count))
            .collect())
    }

    /// Dual id/slug lookup restricted to active categories.
    pub async fn get(&self, ident: &Identifier) -> Result<CategoryResponse, ApiError> {
        let mut where_doc = match ident.where_clause() {
            Value::Object(map) => map,
            _ => unreachable!("identifier filters are always objects"),
        };
        where_doc.insert("is_active".to_string(), json!(true));

        let category = self
            .categories
            .select_one(FilterData {
                where_clause: Some(Value::Object(where_doc)),
                ..Default::default()
            })
            .await?
            .ok_or_else(|| ApiError::not_found("Category not found"))?;

        let count = self.post_count(category.id).await?;
        Ok(CategoryResponse::new(category, count))
    }

    pub async fn create(&self, input: CreateCategory) -> Result<Category, ApiError> {
        let category: Category = sqlx::query_as(INSERT_CATEGORY)
            .bind(Uuid::new_v4())
            .bind(&input.name)
            .bind(models::slugify(&input.name))
            .bind(&input.description)
            .bind(input.color.as_deref().unwrap_or(DEFAULT_COLOR))
            .bind(input.is_active.unwrap_or(true))
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(map_category_write_error)?;
        Ok(category)
    }

    /// Update by id only; the slug is kept even when the name changes.
    pub async fn update(&self, id: Uuid, changes: UpdateCategory) -> Result<Category, ApiError> {
        let category = self.fetch_by_id(id).await?;

        let name = changes.name.unwrap_or(category.name);
        let description = changes.description.or(category.description);
        let color = changes.color.unwrap_or(category.color);
        let is_active = changes.is_active.unwrap_or(category.is_active);

        let updated: Category = sqlx::query_as(UPDATE_CATEGORY)
            .bind(category.id)
            .bind(&name)
            .bind(&description)
            .bind(&color)
            .bind(is_active)
            .fetch_one(&self.pool)
            .await
            .map_err(map_category_write_error)?;
        Ok(updated)
    }

    /// A category can only be deleted once nothing references it.
    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let category = self.fetch_by_id(id).await?;

        let referencing = self.post_count(category.id).await?;
        if referencing > 0 {
            return Err(ApiError::bad_request("Cannot delete category with existing posts"));
        }

        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(category.id)
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::from(DatabaseError::classify(e)))?;
        Ok(())
    }

    async fn fetch_by_id(&self, id: Uuid) -> Result<Category, ApiError> {
        self.categories
            .select_one(FilterData {
                where_clause: Some(json!({ "id": id })),
                ..Default::default()
            })
            .await?
            .ok_or_else(|| ApiError::not_found("Category not found"))
    }

    async fn post_count(&self, category_id: Uuid) -> Result<i64, ApiError> {
        Ok(self
            .posts
            .count(FilterData {
                where_clause: Some(json!({ "category_id": category_id })),
                ..Default::default()
            })
            .await?)
    }
}

fn map_category_write_error(err: sqlx::Error) -> ApiError {
    match DatabaseError::classify(err) {
        DatabaseError::UniqueViolation { .. } => {
            ApiError::conflict("A category with this name already exists")
        }
        other => ApiError::from(other),
    }
}
