use axum::Json;
use serde_json::{json, Value};

use crate::database::models::User;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::user_service::UserService;
use crate::validation;

/// POST /auth/register - create an account, returning a session token
pub async fn register(Json(body): Json<Value>) -> ApiResult<Value> {
    validation::register_rules().check(&body)?;

    let service = UserService::new().await?;
    let (token, user) = service
        .register(
            text_field(&body, "name"),
            text_field(&body, "email"),
            text_field(&body, "password"),
        )
        .await?;

    Ok(ApiResponse::created(session_payload(token, &user)?))
}

/// POST /auth/login - exchange credentials for a session token
pub async fn login(Json(body): Json<Value>) -> ApiResult<Value> {
    validation::login_rules().check(&body)?;

    let service = UserService::new().await?;
    let (token, user) = service
        .login(text_field(&body, "email"), text_field(&body, "password"))
        .await?;

    Ok(ApiResponse::success(session_payload(token, &user)?))
}

/// GET /api/auth/me - the authenticated account
pub async fn me(user: AuthUser) -> ApiResult<User> {
    let service = UserService::new().await?;
    Ok(ApiResponse::success(service.get(user.user_id).await?))
}

fn text_field<'a>(body: &'a Value, field: &str) -> &'a str {
    body.get(field).and_then(Value::as_str).unwrap_or_default()
}

fn session_payload(token: String, user: &User) -> Result<Value, crate::error::ApiError> {
    let user_value = serde_json::to_value(user).map_err(|e| {
        tracing::error!("Failed to serialize user: {}", e);
        crate::error::ApiError::internal_server_error("Server Error")
    })?;
    Ok(json!({ "token": token, "user": user_value }))
}
