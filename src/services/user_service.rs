use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{self, Claims};
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{user::ROLE_USER, User};
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::filter::FilterData;

const INSERT_USER: &str = r#"
    INSERT INTO users (id, name, email, password, role, avatar, created_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7)
    RETURNING *
"#;

pub struct UserService {
    pool: PgPool,
    users: Repository<User>,
}

impl UserService {
    pub async fn new() -> Result<Self, ApiError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self {
            users: Repository::new("users", pool.clone()),
            pool,
        })
    }

    /// Create an account and hand back a session token for it.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(String, User), ApiError> {
        let hash = auth::hash_password(password).map_err(|e| {
            tracing::error!("Password hashing failed: {}", e);
            ApiError::internal_server_error("Server Error")
        })?;

        let user: User = sqlx::query_as(INSERT_USER)
            .bind(Uuid::new_v4())
            .bind(name.trim())
            .bind(email.trim().to_ascii_lowercase())
            .bind(&hash)
            .bind(ROLE_USER)
            .bind(Option::<String>::None)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match DatabaseError::classify(e) {
                DatabaseError::UniqueViolation { .. } => {
                    ApiError::conflict("An account with this email already exists")
                }
                other => ApiError::from(other),
            })?;

        let token = issue_token(&user)?;
        Ok((token, user))
    }

    /// The failure message never says whether the email or the password
    /// was wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<(String, User), ApiError> {
        let user = self
            .users
            .select_one(FilterData {
                where_clause: Some(json!({ "email": email.trim().to_ascii_lowercase() })),
                ..Default::default()
            })
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

        if !auth::verify_password(password, &user.password) {
            return Err(ApiError::unauthorized("Invalid credentials"));
        }

        let token = issue_token(&user)?;
        Ok((token, user))
    }

    pub async fn get(&self, user_id: Uuid) -> Result<User, ApiError> {
        self.users
            .select_one(FilterData {
                where_clause: Some(json!({ "id": user_id })),
                ..Default::default()
            })
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))
    }
}

fn issue_token(user: &User) -> Result<String, ApiError> {
    auth::generate_jwt(Claims::new(user.id, user.role.clone())).map_err(|e| {
        tracing::error!("Token generation failed: {}", e);
        ApiError::internal_server_error("Server Error")
    })
}
