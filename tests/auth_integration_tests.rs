use axum::{
    extract::FromRequestParts,
    http::{Request, StatusCode, header, request::Parts},
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use markdown_cms::{
    AppConfig, AppError, AppState, InMemoryRepository, RepositoryState,
    auth::{self, ACCESS_TOKEN_EXPIRE_MINUTES, AuthUser, Claims},
    error::unique_violation_detail,
    models::RegisterRequest,
    services::accounts,
};
use std::sync::Arc;

// --- Helpers ---

fn test_state() -> AppState {
    AppState {
        repo: Arc::new(InMemoryRepository::new()) as RepositoryState,
        config: AppConfig::default(),
    }
}

async fn seed_user(state: &AppState, username: &str) -> i64 {
    accounts::register(
        state.repo.as_ref(),
        &state.config,
        RegisterRequest {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "secret123".to_string(),
        },
    )
    .await
    .expect("seed user")
    .id
}

fn parts_with_auth(value: Option<&str>) -> Parts {
    let mut builder = Request::builder().uri("/api/auth/me");
    if let Some(value) = value {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(()).unwrap().into_parts().0
}

fn unauthorized_detail(result: Result<AuthUser, AppError>) -> String {
    match result {
        Err(AppError::Unauthorized(detail)) => detail,
        other => panic!("expected Unauthorized, got {other:?}"),
    }
}

// --- Token Handling ---

#[test]
fn test_issued_token_round_trips_with_expiry() {
    let secret = "unit-secret";
    let token = auth::issue_token("alice", secret).unwrap();
    let claims = auth::decode_token(&token, secret).unwrap();

    assert_eq!(claims.sub, "alice");
    assert_eq!(
        (claims.exp - claims.iat) as i64,
        ACCESS_TOKEN_EXPIRE_MINUTES * 60
    );
}

#[test]
fn test_expired_token_is_rejected() {
    let past = Utc::now() - Duration::minutes(5);
    let claims = Claims {
        sub: "alice".to_string(),
        iat: (past - Duration::minutes(30)).timestamp() as usize,
        exp: past.timestamp() as usize,
    };
    let token = auth::encode_claims(&claims, "s").unwrap();

    match auth::decode_token(&token, "s") {
        Err(AppError::Unauthorized(detail)) => assert_eq!(detail, "Token has expired"),
        other => panic!("expected expiry rejection, got {other:?}"),
    }
}

#[test]
fn test_token_signed_with_other_secret_is_rejected() {
    let token = auth::issue_token("alice", "secret-a").unwrap();
    match auth::decode_token(&token, "secret-b") {
        Err(AppError::Unauthorized(detail)) => {
            assert_eq!(detail, "Could not validate credentials")
        }
        other => panic!("expected signature rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_password_hash_verifies_only_original() {
    let hashed = auth::hash_password("hunter2".to_string(), 4).await.unwrap();
    assert_ne!(hashed, "hunter2");
    assert!(auth::verify_password("hunter2".to_string(), hashed.clone()).await.unwrap());
    assert!(!auth::verify_password("hunter3".to_string(), hashed).await.unwrap());
}

// --- AuthUser Extractor ---

#[tokio::test]
async fn test_extractor_resolves_valid_token() {
    let state = test_state();
    let id = seed_user(&state, "alice").await;
    let token = auth::issue_token("alice", &state.config.jwt_secret).unwrap();

    let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));
    let user = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();

    assert_eq!(user.id, id);
    assert_eq!(user.username, "alice");
}

#[tokio::test]
async fn test_extractor_rejects_missing_header() {
    let state = test_state();
    let mut parts = parts_with_auth(None);

    let detail = unauthorized_detail(AuthUser::from_request_parts(&mut parts, &state).await);
    assert_eq!(detail, "Not authenticated");
}

#[tokio::test]
async fn test_extractor_rejects_other_schemes() {
    let state = test_state();
    seed_user(&state, "alice").await;
    let token = auth::issue_token("alice", &state.config.jwt_secret).unwrap();

    let mut parts = parts_with_auth(Some(&format!("Basic {token}")));
    unauthorized_detail(AuthUser::from_request_parts(&mut parts, &state).await);
}

#[tokio::test]
async fn test_extractor_rejects_malformed_token() {
    let state = test_state();
    let mut parts = parts_with_auth(Some("Bearer not.a.jwt"));

    let detail = unauthorized_detail(AuthUser::from_request_parts(&mut parts, &state).await);
    assert_eq!(detail, "Could not validate credentials");
}

#[tokio::test]
async fn test_extractor_rejects_token_for_unknown_user() {
    let state = test_state();
    let token = auth::issue_token("ghost", &state.config.jwt_secret).unwrap();

    let mut parts = parts_with_auth(Some(&format!("Bearer {token}")));
    let detail = unauthorized_detail(AuthUser::from_request_parts(&mut parts, &state).await);
    assert_eq!(detail, "Could not validate credentials");
}

#[tokio::test]
async fn test_extractor_reuses_identity_from_extensions() {
    let state = test_state();
    let mut parts = parts_with_auth(None);
    parts.extensions.insert(AuthUser {
        id: 7,
        username: "cached".to_string(),
    });

    let user = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
    assert_eq!(user.id, 7);
}

// --- Error Rendering ---

#[test]
fn test_unauthorized_response_has_bearer_challenge() {
    let response = AppError::Unauthorized("Not authenticated".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );
}

#[test]
fn test_forbidden_response_has_no_challenge() {
    let response = AppError::Forbidden("nope".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
}

#[test]
fn test_internal_errors_are_opaque() {
    let response = AppError::Internal("secret detail".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_unique_violation_detail_matches_pre_checks() {
    assert_eq!(
        unique_violation_detail(Some("users_username_key")),
        "Username already registered"
    );
    assert_eq!(
        unique_violation_detail(Some("users_email_key")),
        "Email already registered"
    );
    assert_eq!(
        unique_violation_detail(Some("tags_name_key")),
        "Tag name already exists"
    );
    assert_eq!(unique_violation_detail(None), "Resource already exists");
}
