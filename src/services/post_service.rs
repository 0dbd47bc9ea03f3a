use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde_json::{json, Map, Value};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::identifier::Identifier;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{
    self, Category, Comment, CommentResponse, Post, PostResponse, User,
};
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::Pagination;

/// Fields accepted when creating a post. The image is already stored by the
/// upload path; only its filename reaches the service.
#[derive(Debug, Clone)]
pub struct CreatePost {
    pub title: String,
    pub content: String,
    pub category: Uuid,
    pub tags: Vec<String>,
    pub featured_image: Option<String>,
}

/// Partial update: absent fields retain their stored values.
#[derive(Debug, Clone, Default)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<Uuid>,
    pub tags: Option<Vec<String>>,
    pub featured_image: Option<String>,
}

const INSERT_POST: &str = r#"
    INSERT INTO posts (id, title, slug, content, excerpt, category_id, author_id,
                       tags, featured_image, is_published, view_count, comments,
                       created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
    RETURNING *
"#;

const UPDATE_POST: &str = r#"
    UPDATE posts
    SET title = $2, content = $3, excerpt = $4, category_id = $5, tags = $6,
        featured_image = $7, updated_at = $8
    WHERE id = $1
    RETURNING *
"#;

// jsonb || jsonb concatenates arrays, so the append happens in one
// statement and is atomic per post.
const APPEND_COMMENT: &str = r#"
    UPDATE posts
    SET comments = comments || $2, updated_at = $3
    WHERE id = $1
    RETURNING *
"#;

pub struct PostService {
    pool: PgPool,
    posts: Repository<Post>,
    users: Repository<User>,
    categories: Repository<Category>,
}

impl PostService {
    pub async fn new() -> Result<Self, ApiError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self {
            posts: Repository::new("posts", pool.clone()),
            users: Repository::new("users", pool.clone()),
            categories: Repository::new("categories", pool.clone()),
            pool,
        })
    }

    /// Published posts, newest first, optionally narrowed to a category
    /// and/or a case-insensitive substring search across title, content,
    /// and tags.
    pub async fn list(
        &self,
        page: i32,
        limit: i32,
        category: Option<Uuid>,
        search: Option<&str>,
    ) -> Result<(Vec<PostResponse>, Pagination), ApiError> {
        let mut where_doc = Map::new();
        where_doc.insert("is_published".to_string(), json!(true));
        if let Some(category) = category {
            where_doc.insert("category_id".to_string(), json!(category));
        }
        if let Some(term) = search {
            let pattern = format!("%{}%", term);
            where_doc.insert(
                "$or".to_string(),
                json!([
                    { "title": { "$ilike": pattern.clone() } },
                    { "content": { "$ilike": pattern } },
                    { "tags": { "$find": term } },
                ]),
            );
        }
        let where_doc = Value::Object(where_doc);

        let posts = self
            .posts
            .select_any(FilterData {
                where_clause: Some(where_doc.clone()),
                order: Some(json!("created_at desc")),
                limit: Some(limit),
                offset: Some((page - 1) * limit),
                ..Default::default()
            })
            .await?;
        let total = self
            .posts
            .count(FilterData {
                where_clause: Some(where_doc),
                ..Default::default()
            })
            .await?;

        let responses = self.populate_many(posts).await?;
        Ok((responses, Pagination::new(page, limit, total)))
    }

    pub async fn get(&self, ident: &Identifier) -> Result<PostResponse, ApiError> {
        let post = self.fetch(ident).await?;
        self.populate_one(post).await
    }

    pub async fn create(&self, author_id: Uuid, input: CreatePost) -> Result<PostResponse, ApiError> {
        self.ensure_category_exists(input.category).await?;

        let now = Utc::now();
        let post: Post = sqlx::query_as(INSERT_POST)
            .bind(Uuid::new_v4())
            .bind(&input.title)
            .bind(models::slugify(&input.title))
            .bind(&input.content)
            .bind(models::derive_excerpt(&input.content))
            .bind(input.category)
            .bind(author_id)
            .bind(&input.tags)
            .bind(&input.featured_image)
            .bind(true)
            .bind(0_i32)
            .bind(Json(Vec::<Comment>::new()))
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "A post with this title already exists"))?;

        self.populate_one(post).await
    }

    pub async fn update(
        &self,
        actor: &AuthUser,
        ident: &Identifier,
        changes: UpdatePost,
    ) -> Result<PostResponse, ApiError> {
        let post = self.fetch(ident).await?;
        ensure_can_modify(actor, &post, "update")?;

        if let Some(category) = changes.category {
            self.ensure_category_exists(category).await?;
        }

        // Merge omitted fields from the stored post. The slug is never
        // regenerated: a renamed post keeps its original URL.
        let title = changes.title.unwrap_or(post.title);
        let (content, excerpt) = match changes.content {
            Some(content) => {
                let excerpt = models::derive_excerpt(&content);
                (content, Some(excerpt))
            }
            None => (post.content, post.excerpt),
        };
        let category_id = changes.category.unwrap_or(post.category_id);
        let tags = changes.tags.unwrap_or(post.tags);
        let featured_image = changes.featured_image.or(post.featured_image);

        let updated: Post = sqlx::query_as(UPDATE_POST)
            .bind(post.id)
            .bind(&title)
            .bind(&content)
            .bind(&excerpt)
            .bind(category_id)
            .bind(&tags)
            .bind(&featured_image)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "A post with this title already exists"))?;

        self.populate_one(updated).await
    }

    pub async fn delete(&self, actor: &AuthUser, ident: &Identifier) -> Result<(), ApiError> {
        let post = self.fetch(ident).await?;
        ensure_can_modify(actor, &post, "delete")?;

        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post.id)
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::from(DatabaseError::classify(e)))?;
        Ok(())
    }

    /// Append a comment to the post's embedded sequence and return only the
    /// new comment, author populated.
    pub async fn add_comment(
        &self,
        actor: &AuthUser,
        post_id: Uuid,
        content: &str,
    ) -> Result<CommentResponse, ApiError> {
        let comment = Comment {
            author: actor.user_id,
            content: content.trim().to_string(),
            created_at: Utc::now(),
        };

        let updated: Option<Post> = sqlx::query_as(APPEND_COMMENT)
            .bind(post_id)
            .bind(Json(vec![comment]))
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ApiError::from(DatabaseError::classify(e)))?;
        let post = updated.ok_or_else(|| ApiError::not_found("Post not found"))?;

        let appended = post
            .comments
            .0
            .last()
            .cloned()
            .ok_or_else(|| ApiError::internal_server_error("Server Error"))?;
        let users = self.users.select_ids(vec![appended.author]).await?;
        let users_by_id: HashMap<Uuid, User> = users.into_iter().map(|u| (u.id, u)).collect();
        Ok(CommentResponse::populate(&appended, &users_by_id))
    }

    async fn fetch(&self, ident: &Identifier) -> Result<Post, ApiError> {
        self.posts
            .select_one(FilterData {
                where_clause: Some(ident.where_clause()),
                ..Default::default()
            })
            .await?
            .ok_or_else(|| ApiError::not_found("Post not found"))
    }

    async fn ensure_category_exists(&self, category_id: Uuid) -> Result<(), ApiError> {
        let found = self
            .categories
            .select_one(FilterData {
                where_clause: Some(json!({ "id": category_id })),
                ..Default::default()
            })
            .await?;
        match found {
            Some(_) => Ok(()),
            None => Err(ApiError::bad_request("Category not found")),
        }
    }

    async fn populate_one(&self, post: Post) -> Result<PostResponse, ApiError> {
        let mut responses = self.populate_many(vec![post]).await?;
        responses
            .pop()
            .ok_or_else(|| ApiError::internal_server_error("Server Error"))
    }

    /// Resolve author, category, and comment-author references for a batch
    /// of posts with one lookup per collection.
    async fn populate_many(&self, posts: Vec<Post>) -> Result<Vec<PostResponse>, ApiError> {
        let mut user_ids: HashSet<Uuid> = HashSet::new();
        let mut category_ids: HashSet<Uuid> = HashSet::new();
        for post in &posts {
            user_ids.insert(post.author_id);
            category_ids.insert(post.category_id);
            for comment in post.comments.0.iter() {
                user_ids.insert(comment.author);
            }
        }

        let users = self.users.select_ids(user_ids.into_iter().collect()).await?;
        let categories = self
            .categories
            .select_ids(category_ids.into_iter().collect())
            .await?;

        let users_by_id: HashMap<Uuid, User> = users.into_iter().map(|u| (u.id, u)).collect();
        let categories_by_id: HashMap<Uuid, Category> =
            categories.into_iter().map(|c| (c.id, c)).collect();

        Ok(posts
            .into_iter()
            .map(|post| PostResponse::populate(post, &users_by_id, &categories_by_id))
            .collect())
    }
}

fn ensure_can_modify(actor: &AuthUser, post: &Post, action: &str) -> Result<(), ApiError> {
    if post.author_id != actor.user_id && !actor.is_admin() {
        tracing::warn!(
            "User {} denied {} on post {} owned by {}",
            actor.user_id,
            action,
            post.id,
            post.author_id
        );
        return Err(ApiError::unauthorized(format!(
            "Not authorized to {} this post",
            action
        )));
    }
    Ok(())
}

fn map_write_error(err: sqlx::Error, conflict_message: &str) -> ApiError {
    match DatabaseError::classify(err) {
        DatabaseError::UniqueViolation { .. } => ApiError::conflict(conflict_message),
        other => ApiError::from(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn owner_may_modify_own_post() {
        let author = testing::sample_user("Jane", "jane@example.com");
        let category = testing::sample_category("Tech");
        let post = testing::sample_post("Mine", author.id, category.id);
        let actor = AuthUser { user_id: author.id, role: "user".into() };
        assert!(ensure_can_modify(&actor, &post, "update").is_ok());
    }

    #[test]
    fn stranger_gets_401_with_action_in_message() {
        let author = testing::sample_user("Jane", "jane@example.com");
        let category = testing::sample_category("Tech");
        let post = testing::sample_post("Hers", author.id, category.id);
        let actor = AuthUser { user_id: Uuid::new_v4(), role: "user".into() };
        let err = ensure_can_modify(&actor, &post, "delete").unwrap_err();
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.message(), "Not authorized to delete this post");
    }

    #[test]
    fn admin_may_modify_any_post() {
        let author = testing::sample_user("Jane", "jane@example.com");
        let category = testing::sample_category("Tech");
        let post = testing::sample_post("Hers", author.id, category.id);
        let actor = AuthUser { user_id: Uuid::new_v4(), role: "admin".into() };
        assert!(ensure_can_modify(&actor, &post, "update").is_ok());
    }

    #[test]
    fn unique_violations_become_domain_conflicts() {
        // RowNotFound is the only sqlx error constructible without a live
        // database; it must pass through untouched.
        let err = map_write_error(sqlx::Error::RowNotFound, "A post with this title already exists");
        assert_eq!(err.status_code(), 500);
    }
}
