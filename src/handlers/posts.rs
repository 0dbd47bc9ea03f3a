use axum::{
    extract::{FromRequest, Multipart, Path, Query, Request},
    http::header::CONTENT_TYPE,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::config;
use crate::database::identifier::Identifier;
use crate::database::models::{CommentResponse, PostResponse};
use crate::error::{ApiError, FieldError};
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::post_service::{CreatePost, PostService, UpdatePost};
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i32>,
    pub limit: Option<i32>,
    pub category: Option<String>,
    pub search: Option<String>,
}

/// GET /api/posts - published posts with pagination, category filter, and
/// text search
pub async fn list(Query(query): Query<ListQuery>) -> ApiResult<Vec<PostResponse>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(config::config().api.default_page_size)
        .max(1);

    let category = match query.category.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(Uuid::parse_str(raw).map_err(|_| {
            ApiError::validation_error(vec![FieldError::new(
                "category",
                "Valid category ID is required",
            )])
        })?),
        None => None,
    };
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let service = PostService::new().await?;
    let (posts, pagination) = service.list(page, limit, category, search).await?;
    Ok(ApiResponse::paginated(posts, pagination))
}

/// GET /api/posts/:id - fetch one post by store id or slug, populated
pub async fn get(Path(id_or_slug): Path<String>) -> ApiResult<PostResponse> {
    let ident = Identifier::parse(&id_or_slug);
    let service = PostService::new().await?;
    Ok(ApiResponse::success(service.get(&ident).await?))
}

/// POST /api/posts - create a post (multipart with optional image, or JSON)
pub async fn create(user: AuthUser, request: Request) -> ApiResult<PostResponse> {
    let (body, upload) = read_post_body(request).await?;
    validation::post_create_rules().check(&body)?;

    let input = CreatePost {
        title: required_text(&body, "title"),
        content: required_text(&body, "content"),
        category: parse_category_field(&body)?,
        tags: parse_tags(body.get("tags")),
        featured_image: upload,
    };

    let service = PostService::new().await?;
    Ok(ApiResponse::created(service.create(user.user_id, input).await?))
}

/// PUT /api/posts/:id - partial update; owner or admin only
pub async fn update(
    user: AuthUser,
    Path(id_or_slug): Path<String>,
    request: Request,
) -> ApiResult<PostResponse> {
    let (body, upload) = read_post_body(request).await?;
    validation::post_update_rules().check(&body)?;

    let category = match body.get("category") {
        Some(_) => Some(parse_category_field(&body)?),
        None => None,
    };
    let changes = UpdatePost {
        title: optional_text(&body, "title"),
        content: optional_text(&body, "content"),
        category,
        tags: body.get("tags").map(|value| parse_tags(Some(value))),
        featured_image: upload,
    };

    let service = PostService::new().await?;
    let ident = Identifier::parse(&id_or_slug);
    Ok(ApiResponse::success(service.update(&user, &ident, changes).await?))
}

/// DELETE /api/posts/:id - owner or admin only
pub async fn delete(user: AuthUser, Path(id_or_slug): Path<String>) -> ApiResult<Value> {
    let service = PostService::new().await?;
    let ident = Identifier::parse(&id_or_slug);
    service.delete(&user, &ident).await?;
    Ok(ApiResponse::success(json!({})))
}

/// POST /api/posts/:id/comments - append a comment, returning only the new
/// comment with its author populated
pub async fn add_comment(
    user: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<CommentResponse> {
    validation::comment_rules().check(&body)?;

    let post_id =
        Uuid::parse_str(&id).map_err(|_| ApiError::not_found("Post not found"))?;
    let content = body.get("content").and_then(Value::as_str).unwrap_or_default();

    let service = PostService::new().await?;
    Ok(ApiResponse::created(service.add_comment(&user, post_id, content).await?))
}

/// Create/update bodies arrive either as JSON or as multipart form data
/// with an optional image part. Both are normalized into a JSON object so
/// the same rule sets apply; an uploaded image is stored immediately and
/// only its filename travels further.
async fn read_post_body(request: Request) -> Result<(Value, Option<String>), ApiError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| ApiError::bad_request(format!("Invalid multipart payload: {}", e)))?;
        read_multipart(multipart).await
    } else {
        let Json(body) = Json::<Value>::from_request(request, &())
            .await
            .map_err(|_| ApiError::bad_request("Invalid JSON body"))?;
        Ok((body, None))
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<(Value, Option<String>), ApiError> {
    let mut fields = Map::new();
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart payload: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let original_name = field.file_name().map(|s| s.to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Invalid multipart payload: {}", e)))?;
            if bytes.is_empty() {
                continue;
            }
            if bytes.len() > config::config().uploads.max_upload_bytes {
                return Err(ApiError::bad_request("Image exceeds the upload size limit"));
            }
            upload = Some(store_upload(original_name.as_deref(), &bytes).await?);
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(format!("Invalid multipart payload: {}", e)))?;
            insert_form_field(&mut fields, &name, text);
        }
    }

    Ok((Value::Object(fields), upload))
}

fn insert_form_field(fields: &mut Map<String, Value>, name: &str, text: String) {
    if name == "tags" {
        // Forms send tags either as a JSON array or a comma-separated list
        if let Ok(parsed @ Value::Array(_)) = serde_json::from_str(&text) {
            fields.insert(name.to_string(), parsed);
            return;
        }
    }
    fields.insert(name.to_string(), Value::String(text));
}

/// Write the image under the uploads directory with a fresh uuid filename,
/// keeping the original extension when it looks safe.
async fn store_upload(original_name: Option<&str>, bytes: &[u8]) -> Result<String, ApiError> {
    let dir = &config::config().uploads.dir;
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        tracing::error!("Failed to create upload directory {}: {}", dir, e);
        ApiError::internal_server_error("Server Error")
    })?;

    let extension = original_name
        .and_then(|name| std::path::Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()) && ext.len() <= 8)
        .unwrap_or("bin");
    let filename = format!("{}.{}", Uuid::new_v4(), extension.to_ascii_lowercase());

    let path = std::path::Path::new(dir).join(&filename);
    tokio::fs::write(&path, bytes).await.map_err(|e| {
        tracing::error!("Failed to store upload {}: {}", path.display(), e);
        ApiError::internal_server_error("Server Error")
    })?;

    Ok(filename)
}

// Field accessors used after rule sets have run; "required" fields are
// guaranteed present by validation.

fn required_text(body: &Value, field: &str) -> String {
    body.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn optional_text(body: &Value, field: &str) -> Option<String> {
    body.get(field)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
}

fn parse_category_field(body: &Value) -> Result<Uuid, ApiError> {
    body.get("category")
        .and_then(Value::as_str)
        .map(str::trim)
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| {
            ApiError::validation_error(vec![FieldError::new(
                "category",
                "Valid category ID is required",
            )])
        })
}

fn parse_tags(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(text)) => text
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_accept_arrays_and_comma_lists() {
        assert_eq!(
            parse_tags(Some(&json!(["react", " hooks "]))),
            vec!["react".to_string(), "hooks".to_string()]
        );
        assert_eq!(
            parse_tags(Some(&json!("rust, axum , "))),
            vec!["rust".to_string(), "axum".to_string()]
        );
        assert!(parse_tags(None).is_empty());
    }

    #[test]
    fn form_tags_field_parses_json_arrays() {
        let mut fields = Map::new();
        insert_form_field(&mut fields, "tags", "[\"a\",\"b\"]".to_string());
        assert_eq!(fields["tags"], json!(["a", "b"]));

        let mut fields = Map::new();
        insert_form_field(&mut fields, "tags", "a,b".to_string());
        assert_eq!(fields["tags"], json!("a,b"));
    }

    #[test]
    fn category_field_must_be_a_uuid() {
        let err = parse_category_field(&json!({ "category": "tech" })).unwrap_err();
        assert_eq!(err.status_code(), 400);
        let ok = parse_category_field(
            &json!({ "category": "0a0b0c0d-0000-4000-8000-000000000001" }),
        );
        assert!(ok.is_ok());
    }
}
