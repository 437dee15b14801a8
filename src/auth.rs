use axum::{
    Form,
    extract::{FromRef, FromRequest, FromRequestParts, Multipart, Request},
    http::{header, request::Parts},
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};

use crate::{
    config::AppConfig, error::AppError, models::LoginForm, repository::RepositoryState,
    services::accounts,
};

/// Lifetime of an issued access token.
pub const ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 30;

/// Claims
///
/// Payload of the bearer token. Signed with the server secret (HS256) and validated
/// on every authenticated request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the username the token was issued to.
    pub sub: String,
    /// Expiration Time (exp): seconds since the epoch after which the token is rejected.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// Issues a token for `username` expiring `ACCESS_TOKEN_EXPIRE_MINUTES` from now.
pub fn issue_token(username: &str, secret: &str) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: username.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::minutes(ACCESS_TOKEN_EXPIRE_MINUTES)).timestamp() as usize,
    };
    encode_claims(&claims, secret)
}

pub fn encode_claims(claims: &Claims, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token creation failed: {e}")))
}

/// Verifies the signature and expiry of `token` and returns its claims.
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;
    // Expiry is exact; a token is dead the second its `exp` passes.
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::Unauthorized("Token has expired".to_string()),
        _ => AppError::Unauthorized("Could not validate credentials".to_string()),
    })
}

// --- Credential Store ---

/// Hashes `password` with bcrypt on the blocking pool.
pub async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

/// Checks `password` against a stored bcrypt hash on the blocking pool.
pub async fn verify_password(password: String, hashed: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed))
        .await
        .map_err(|e| AppError::Internal(format!("verification task failed: {e}")))?
        .map_err(|e| AppError::Internal(format!("password verification failed: {e}")))
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Handlers take it as an
/// argument; its presence means the bearer token was valid and the user still exists.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

/// Extracts the raw token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// AuthUser Extractor Implementation
///
/// 1. Reuses an identity already resolved by `auth_middleware` for this request.
/// 2. Otherwise pulls the Repository and AppConfig out of the application state,
///    reads the bearer token and resolves it to a live user.
///
/// Rejection: `AppError::Unauthorized`, rendered as 401 with a `WWW-Authenticate` header.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let user =
            accounts::resolve_current_user(repo.as_ref(), &config, bearer_token(parts)).await?;

        Ok(AuthUser {
            id: user.id,
            username: user.username,
        })
    }
}

/// LoginForm Extractor Implementation
///
/// Browser clients post credentials either URL-encoded or as `multipart/form-data`
/// (a `FormData` body). Both are accepted; the `Content-Type` header picks the parser.
impl<S> FromRequest<S> for LoginForm
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(form) = Form::<LoginForm>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Ok(form);
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let (mut username, mut password) = (None, None);
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(IntoResponse::into_response)?
        {
            let name = field.name().map(str::to_string);
            let value = field.text().await.map_err(IntoResponse::into_response)?;
            match name.as_deref() {
                Some("username") => username = Some(value),
                Some("password") => password = Some(value),
                _ => {}
            }
        }

        match (username, password) {
            (Some(username), Some(password)) => Ok(LoginForm { username, password }),
            _ => Err(AppError::BadRequest(
                "username and password fields are required".to_string(),
            )
            .into_response()),
        }
    }
}
