//! Fixture builders shared by unit tests.

use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use crate::database::models::{self, Category, Post, User};

pub fn sample_user(name: &str, email: &str) -> User {
    User {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: email.to_string(),
        password: "$2b$12$test-hash".to_string(),
        role: models::user::ROLE_USER.to_string(),
        avatar: None,
        created_at: Utc::now(),
    }
}

pub fn sample_admin(name: &str, email: &str) -> User {
    User {
        role: models::user::ROLE_ADMIN.to_string(),
        ..sample_user(name, email)
    }
}

pub fn sample_category(name: &str) -> Category {
    Category {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: models::slugify(name),
        description: None,
        color: "#3B82F6".to_string(),
        is_active: true,
        created_at: Utc::now(),
    }
}

pub fn sample_post(title: &str, author_id: Uuid, category_id: Uuid) -> Post {
    let content = format!("Contents of {}", title);
    Post {
        id: Uuid::new_v4(),
        title: title.to_string(),
        slug: models::slugify(title),
        excerpt: Some(models::derive_excerpt(&content)),
        content,
        category_id,
        author_id,
        tags: vec![],
        featured_image: None,
        is_published: true,
        view_count: 0,
        comments: Json(vec![]),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
