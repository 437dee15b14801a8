use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    models::{
        ArticleListItem, ArticleResponse, CreateArticleRequest, LoginForm, RegisterRequest, Tag,
        TagRequest, TokenResponse, UpdateArticleRequest, UserResponse,
    },
    services::{accounts, articles, tags},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

// --- Filter Structs ---

/// ArticleFilter
///
/// Query parameters accepted by both article listing endpoints.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ArticleFilter {
    /// Only return articles carrying this tag. An unknown id yields an empty list.
    pub tag_id: Option<i64>,
}

// --- Auth ---

/// register
///
/// [Public Route] Creates an account. Usernames and emails are unique.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registered", body = UserResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username or email taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = accounts::register(state.repo.as_ref(), &state.config, payload).await?;
    Ok(Json(user.into()))
}

/// login
///
/// [Public Route] Exchanges form credentials for a bearer token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body(
        description = "Credentials, URL-encoded or multipart",
        content(
            (LoginForm = "application/x-www-form-urlencoded"),
            (LoginForm = "multipart/form-data")
        )
    ),
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Incorrect username or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    form: LoginForm,
) -> Result<Json<TokenResponse>, AppError> {
    let token =
        accounts::login(state.repo.as_ref(), &state.config, &form.username, form.password).await?;
    Ok(Json(token))
}

/// get_me
///
/// [Authenticated Route] The user the bearer token resolves to.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses((status = 200, description = "Current user", body = UserResponse))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .repo
        .get_user(id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Could not validate credentials".to_string()))?;
    Ok(Json(user.into()))
}

// --- Articles ---

/// list_my_articles
///
/// [Authenticated Route] Every article owned by the caller, drafts included.
#[utoipa::path(
    get,
    path = "/api/articles",
    params(ArticleFilter),
    responses((status = 200, description = "My articles", body = [ArticleListItem]))
)]
pub async fn list_my_articles(
    user: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<ArticleFilter>,
) -> Result<Json<Vec<ArticleListItem>>, AppError> {
    let list = articles::list_owned(state.repo.as_ref(), &user, filter.tag_id).await?;
    Ok(Json(list))
}

/// list_public_articles
///
/// [Public Route] Every published article.
#[utoipa::path(
    get,
    path = "/api/articles/public",
    params(ArticleFilter),
    responses((status = 200, description = "Published articles", body = [ArticleListItem]))
)]
pub async fn list_public_articles(
    State(state): State<AppState>,
    Query(filter): Query<ArticleFilter>,
) -> Result<Json<Vec<ArticleListItem>>, AppError> {
    let list = articles::list_public(state.repo.as_ref(), filter.tag_id).await?;
    Ok(Json(list))
}

/// get_article
///
/// [Authenticated Route] A single article. Drafts are visible to their owner only.
#[utoipa::path(
    get,
    path = "/api/articles/{id}",
    params(("id" = i64, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Found", body = ArticleResponse),
        (status = 403, description = "Draft owned by someone else"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_article(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ArticleResponse>, AppError> {
    let article = articles::view(state.repo.as_ref(), &user, id).await?;
    Ok(Json(article))
}

/// create_article
///
/// [Authenticated Route] Creates a Draft article owned by the caller.
#[utoipa::path(
    post,
    path = "/api/articles",
    request_body = CreateArticleRequest,
    responses((status = 201, description = "Created", body = ArticleResponse))
)]
pub async fn create_article(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateArticleRequest>,
) -> Result<(StatusCode, Json<ArticleResponse>), AppError> {
    let article = articles::create(state.repo.as_ref(), &user, payload).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

/// update_article
///
/// [Authenticated Route] Partial update. Owner only.
#[utoipa::path(
    put,
    path = "/api/articles/{id}",
    params(("id" = i64, Path, description = "Article ID")),
    request_body = UpdateArticleRequest,
    responses(
        (status = 200, description = "Updated", body = ArticleResponse),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_article(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateArticleRequest>,
) -> Result<Json<ArticleResponse>, AppError> {
    let article = articles::update(state.repo.as_ref(), &user, id, payload.into()).await?;
    Ok(Json(article))
}

/// delete_article
///
/// [Authenticated Route] Owner only.
#[utoipa::path(
    delete,
    path = "/api/articles/{id}",
    params(("id" = i64, Path, description = "Article ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_article(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    articles::delete(state.repo.as_ref(), &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// publish_article
///
/// [Authenticated Route] Draft -> Published. Idempotent. Owner only.
#[utoipa::path(
    post,
    path = "/api/articles/{id}/publish",
    params(("id" = i64, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Published", body = ArticleResponse),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn publish_article(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ArticleResponse>, AppError> {
    let article = articles::publish(state.repo.as_ref(), &user, id).await?;
    Ok(Json(article))
}

/// unpublish_article
///
/// [Authenticated Route] Published -> Draft. Idempotent. Owner only.
#[utoipa::path(
    post,
    path = "/api/articles/{id}/unpublish",
    params(("id" = i64, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Unpublished", body = ArticleResponse),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn unpublish_article(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ArticleResponse>, AppError> {
    let article = articles::unpublish(state.repo.as_ref(), &user, id).await?;
    Ok(Json(article))
}

// --- Tags ---

#[utoipa::path(
    get,
    path = "/api/tags",
    responses((status = 200, description = "All tags", body = [Tag]))
)]
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, AppError> {
    Ok(Json(tags::list(state.repo.as_ref()).await?))
}

#[utoipa::path(
    get,
    path = "/api/tags/{id}",
    params(("id" = i64, Path, description = "Tag ID")),
    responses(
        (status = 200, description = "Found", body = Tag),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Tag>, AppError> {
    Ok(Json(tags::get(state.repo.as_ref(), id).await?))
}

/// create_tag
///
/// [Authenticated Route] Tag names are unique; color defaults to `#3B82F6`.
#[utoipa::path(
    post,
    path = "/api/tags",
    request_body = TagRequest,
    responses(
        (status = 201, description = "Created", body = Tag),
        (status = 409, description = "Duplicate name")
    )
)]
pub async fn create_tag(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<TagRequest>,
) -> Result<(StatusCode, Json<Tag>), AppError> {
    let tag = tags::create(state.repo.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// update_tag
///
/// [Authenticated Route] Any authenticated user may rename or recolor any tag.
#[utoipa::path(
    put,
    path = "/api/tags/{id}",
    params(("id" = i64, Path, description = "Tag ID")),
    request_body = TagRequest,
    responses(
        (status = 200, description = "Updated", body = Tag),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Duplicate name")
    )
)]
pub async fn update_tag(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<TagRequest>,
) -> Result<Json<Tag>, AppError> {
    Ok(Json(tags::update(state.repo.as_ref(), id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/tags/{id}",
    params(("id" = i64, Path, description = "Tag ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_tag(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    tags::delete(state.repo.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
