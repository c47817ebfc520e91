use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;
use uuid::Uuid;

use crate::auth::jwt::JwtService;
use crate::errors::AppError;
use crate::state::AppState;

/// Authenticated caller resolved from a bearer token.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub is_admin: bool,
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Resolves `Authorization` into an `AuthUser` request extension.
///
/// Requests without a valid token continue anonymously; handlers that take
/// `AuthUser` as an extractor reject them with 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match extract_auth_user(request.headers(), &state.jwt) {
        Some(user) => {
            debug!(user_id = %user.user_id, admin = user.is_admin, "Authenticated request");
            request.extensions_mut().insert(user);
        }
        None => debug!("No valid authentication token"),
    }

    next.run(request).await
}

/// Accepts both `Bearer <token>` and a raw token.
fn extract_auth_user(headers: &HeaderMap, jwt: &JwtService) -> Option<AuthUser> {
    let auth_str = headers.get("authorization")?.to_str().ok()?.trim();
    let token = auth_str.strip_prefix("Bearer ").unwrap_or(auth_str);
    if token.is_empty() {
        return None;
    }

    let claims = jwt.verify_token(token).ok()?;

    Some(AuthUser {
        user_id: claims.user_id,
        email: claims.email,
        is_admin: claims.is_admin,
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
