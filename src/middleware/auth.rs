use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use jsonwebtoken::{decode, DecodingKey, Validation};
use uuid::Uuid;

use crate::auth::Claims;
use crate::config;
use crate::database::models::user::ROLE_ADMIN;
use crate::error::ApiError;

/// Authenticated user context extracted from the bearer JWT. Using it as a
/// handler argument is what gates the route: extraction fails with 401
/// before the handler body runs.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            role: claims.role,
        }
    }
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    /// Role gate for admin-only operations
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            tracing::warn!("User {} denied admin-only operation (role: {})", self.user_id, self.role);
            Err(ApiError::forbidden("Admin access required"))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_jwt_from_headers(&parts.headers).map_err(ApiError::unauthorized)?;
        let claims = validate_jwt(&token).map_err(ApiError::unauthorized)?;
        Ok(AuthUser::from(claims))
    }
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

/// Validate JWT token and extract claims
fn validate_jwt(token: &str) -> Result<Claims, String> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err("JWT secret not configured".to_string());
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| format!("Invalid JWT token: {}", e))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_header_is_rejected() {
        let err = extract_jwt_from_headers(&HeaderMap::new()).unwrap_err();
        assert_eq!(err, "Missing Authorization header");
    }

    #[test]
    fn non_bearer_scheme_is_rejected() {
        let headers = headers_with_auth("Basic dXNlcjpwYXNz");
        assert!(extract_jwt_from_headers(&headers).is_err());
    }

    #[test]
    fn bearer_token_is_extracted() {
        let headers = headers_with_auth("Bearer abc.def.ghi");
        assert_eq!(extract_jwt_from_headers(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn generated_tokens_validate_back_to_claims() {
        // Dev config carries a default secret
        let user_id = Uuid::new_v4();
        let token =
            crate::auth::generate_jwt(Claims::new(user_id, "admin".to_string())).unwrap();
        let claims = validate_jwt(&token).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.role, "admin");
    }

    #[test]
    fn garbage_tokens_fail_validation() {
        assert!(validate_jwt("not-a-token").is_err());
    }

    #[test]
    fn admin_gate() {
        let admin = AuthUser { user_id: Uuid::new_v4(), role: "admin".into() };
        let user = AuthUser { user_id: Uuid::new_v4(), role: "user".into() };
        assert!(admin.require_admin().is_ok());
        assert_eq!(user.require_admin().unwrap_err().status_code(), 403);
    }
}
