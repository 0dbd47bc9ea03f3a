use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::category::Category;
use super::user::User;

/// A comment embedded in its post's document. Append-only; stored in the
/// post's JSONB comments array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub author: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub category_id: Uuid,
    pub author_id: Uuid,
    pub tags: Vec<String>,
    pub featured_image: Option<String>,
    pub is_published: bool,
    pub view_count: i32,
    pub comments: Json<Vec<Comment>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Author reference populated into responses: name and avatar only.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorRef {
    pub id: Uuid,
    pub name: String,
    pub avatar: Option<String>,
}

impl AuthorRef {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            avatar: user.avatar.clone(),
        }
    }
}

/// Category reference populated into responses: name and color only.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

impl CategoryRef {
    pub fn from_category(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            color: category.color.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub author: Option<AuthorRef>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl CommentResponse {
    pub fn populate(comment: &Comment, users_by_id: &HashMap<Uuid, User>) -> Self {
        Self {
            author: users_by_id.get(&comment.author).map(AuthorRef::from_user),
            content: comment.content.clone(),
            created_at: comment.created_at,
        }
    }
}

/// Post as returned by the API, with author, category, and comment authors
/// populated. Missing references serialize as null, the way the original
/// store's populate behaves.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub category: Option<CategoryRef>,
    pub author: Option<AuthorRef>,
    pub tags: Vec<String>,
    pub featured_image: Option<String>,
    pub is_published: bool,
    pub view_count: i32,
    pub comments: Vec<CommentResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostResponse {
    pub fn populate(
        post: Post,
        users_by_id: &HashMap<Uuid, User>,
        categories_by_id: &HashMap<Uuid, Category>,
    ) -> Self {
        let comments = post
            .comments
            .0
            .iter()
            .map(|comment| CommentResponse::populate(comment, users_by_id))
            .collect();
        Self {
            id: post.id,
            title: post.title,
            slug: post.slug,
            content: post.content,
            excerpt: post.excerpt,
            category: categories_by_id
                .get(&post.category_id)
                .map(CategoryRef::from_category),
            author: users_by_id.get(&post.author_id).map(AuthorRef::from_user),
            tags: post.tags,
            featured_image: post.featured_image,
            is_published: post.is_published,
            view_count: post.view_count,
            comments,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn populate_resolves_author_category_and_comment_authors() {
        let author = testing::sample_user("Jane Writer", "jane@example.com");
        let commenter = testing::sample_user("Sam Reader", "sam@example.com");
        let category = testing::sample_category("Programming");
        let mut post = testing::sample_post("Hello World", author.id, category.id);
        post.comments.0.push(Comment {
            author: commenter.id,
            content: "Great read".into(),
            created_at: Utc::now(),
        });

        let users = HashMap::from([(author.id, author.clone()), (commenter.id, commenter)]);
        let categories = HashMap::from([(category.id, category)]);
        let response = PostResponse::populate(post, &users, &categories);

        assert_eq!(response.author.as_ref().unwrap().name, "Jane Writer");
        assert_eq!(response.category.as_ref().unwrap().name, "Programming");
        assert_eq!(response.comments.len(), 1);
        assert_eq!(response.comments[0].author.as_ref().unwrap().name, "Sam Reader");
    }

    #[test]
    fn populate_tolerates_missing_references() {
        let author = testing::sample_user("Jane Writer", "jane@example.com");
        let category = testing::sample_category("Programming");
        let post = testing::sample_post("Orphaned", author.id, category.id);

        let response = PostResponse::populate(post, &HashMap::new(), &HashMap::new());
        assert!(response.author.is_none());
        assert!(response.category.is_none());
    }

    #[test]
    fn response_serializes_camel_case() {
        let author = testing::sample_user("Jane Writer", "jane@example.com");
        let category = testing::sample_category("Programming");
        let post = testing::sample_post("Hello World", author.id, category.id);
        let users = HashMap::from([(author.id, author)]);
        let categories = HashMap::from([(category.id, category.clone())]);

        let value =
            serde_json::to_value(PostResponse::populate(post, &users, &categories)).unwrap();
        assert_eq!(value["isPublished"], true);
        assert_eq!(value["viewCount"], 0);
        assert!(value.get("featuredImage").is_some());
        assert_eq!(value["author"]["name"], "Jane Writer");
    }
}
