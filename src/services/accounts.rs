use crate::{
    auth::{decode_token, hash_password, issue_token, verify_password},
    config::AppConfig,
    error::AppError,
    models::{NewUser, RegisterRequest, TokenResponse, User},
    repository::Repository,
};

use super::require_text;

const USERNAME_MAX: usize = 50;
const EMAIL_MAX: usize = 100;

/// register
///
/// Creates a user after checking that neither the username nor the email is taken,
/// in that order. The password is stored only as a bcrypt hash.
pub async fn register(
    repo: &dyn Repository,
    config: &AppConfig,
    req: RegisterRequest,
) -> Result<User, AppError> {
    require_text("username", &req.username, USERNAME_MAX)?;
    require_text("email", &req.email, EMAIL_MAX)?;
    if !is_valid_email(&req.email) {
        return Err(AppError::BadRequest("email is not a valid address".to_string()));
    }
    if req.password.is_empty() {
        return Err(AppError::BadRequest("password must not be empty".to_string()));
    }

    if repo.get_user_by_username(&req.username).await?.is_some() {
        return Err(AppError::Conflict("Username already registered".to_string()));
    }
    if repo.get_user_by_email(&req.email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let hashed_password = hash_password(req.password, config.bcrypt_cost).await?;
    let user = repo
        .create_user(NewUser {
            username: req.username,
            email: req.email,
            hashed_password,
        })
        .await?;

    tracing::info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

/// login
///
/// Exchanges a username and password for a bearer token. Unknown usernames and
/// wrong passwords are indistinguishable to the caller.
pub async fn login(
    repo: &dyn Repository,
    config: &AppConfig,
    username: &str,
    password: String,
) -> Result<TokenResponse, AppError> {
    let rejected = || AppError::Unauthorized("Incorrect username or password".to_string());

    let Some(user) = repo.get_user_by_username(username).await? else {
        tracing::warn!(%username, "login failed: unknown user");
        return Err(rejected());
    };

    if !verify_password(password, user.hashed_password.clone()).await? {
        tracing::warn!(%username, "login failed: wrong password");
        return Err(rejected());
    }

    let access_token = issue_token(&user.username, &config.jwt_secret)?;
    tracing::info!(user_id = user.id, "token issued");
    Ok(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    })
}

/// resolve_current_user
///
/// Turns a bearer token into the user it was issued to. Fails with `Unauthorized`
/// when the token is missing, malformed, badly signed, expired, or names a user
/// that no longer exists.
pub async fn resolve_current_user(
    repo: &dyn Repository,
    config: &AppConfig,
    token: Option<&str>,
) -> Result<User, AppError> {
    let token = token.ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))?;
    let claims = decode_token(token, &config.jwt_secret)?;

    repo.get_user_by_username(&claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Could not validate credentials".to_string()))
}

/// Minimal structural check: one `@`, a non-empty local part, a dotted domain, no spaces.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}
