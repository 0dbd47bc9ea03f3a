use axum::{extract::Path, Json};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::identifier::Identifier;
use crate::database::models::{Category, CategoryResponse};
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::category_service::{CategoryService, CreateCategory, UpdateCategory};
use crate::validation;

/// GET /api/categories - active categories with derived post counts
pub async fn list() -> ApiResult<Vec<CategoryResponse>> {
    let service = CategoryService::new().await?;
    Ok(ApiResponse::success(service.list().await?))
}

/// GET /api/categories/:id - fetch one active category by id or slug
pub async fn get(Path(id_or_slug): Path<String>) -> ApiResult<CategoryResponse> {
    let ident = Identifier::parse(&id_or_slug);
    let service = CategoryService::new().await?;
    Ok(ApiResponse::success(service.get(&ident).await?))
}

/// POST /api/categories - admin only
pub async fn create(user: AuthUser, Json(body): Json<Value>) -> ApiResult<Category> {
    user.require_admin()?;
    validation::category_rules().check(&body)?;

    let input = CreateCategory {
        name: text_field(&body, "name").unwrap_or_default(),
        description: text_field(&body, "description"),
        color: text_field(&body, "color"),
        is_active: body.get("isActive").and_then(Value::as_bool),
    };

    let service = CategoryService::new().await?;
    Ok(ApiResponse::created(service.create(input).await?))
}

/// PUT /api/categories/:id - admin only; id lookup, slug unchanged
pub async fn update(
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Category> {
    user.require_admin()?;
    validation::category_rules().check(&body)?;

    let id = parse_category_id(&id)?;
    let changes = UpdateCategory {
        name: text_field(&body, "name"),
        description: text_field(&body, "description"),
        color: text_field(&body, "color"),
        is_active: body.get("isActive").and_then(Value::as_bool),
    };

    let service = CategoryService::new().await?;
    Ok(ApiResponse::success(service.update(id, changes).await?))
}

/// DELETE /api/categories/:id - admin only; fails while posts reference it
pub async fn delete(user: AuthUser, Path(id): Path<String>) -> ApiResult<Value> {
    user.require_admin()?;

    let id = parse_category_id(&id)?;
    let service = CategoryService::new().await?;
    service.delete(id).await?;
    Ok(ApiResponse::success(json!({})))
}

fn parse_category_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found("Category not found"))
}

fn text_field(body: &Value, field: &str) -> Option<String> {
    body.get(field)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
