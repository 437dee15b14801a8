use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

/// Color assigned to a tag when the client does not pick one.
pub const DEFAULT_TAG_COLOR: &str = "#3B82F6";

fn default_tag_color() -> String {
    DEFAULT_TAG_COLOR.to_string()
}

// --- Core Records (Mapped to Database) ---

/// User
///
/// A row of the `users` table. Carries the password hash, so it is never serialized;
/// responses go through `UserResponse`.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub created_at: DateTime<Utc>,
}

/// ArticleState
///
/// The two-state visibility lifecycle of an article, derived from `is_published`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleState {
    Draft,
    Published,
}

impl From<bool> for ArticleState {
    fn from(is_published: bool) -> Self {
        if is_published {
            ArticleState::Published
        } else {
            ArticleState::Draft
        }
    }
}

impl ArticleState {
    pub fn is_published(self) -> bool {
        self == ArticleState::Published
    }
}

/// Article
///
/// A row of the `articles` table, without its tags. `author_id` is fixed at creation.
#[derive(Debug, Clone, FromRow, Default)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub is_published: bool,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
    // NULL until the first effective mutation.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Article {
    pub fn state(&self) -> ArticleState {
        ArticleState::from(self.is_published)
    }

    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.author_id == user_id
    }
}

/// Tag
///
/// A row of the `tags` table. Also the wire shape for tag endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Tag {
    #[ts(type = "number")]
    pub id: i64,
    pub name: String,
    #[schema(example = "#3B82F6")]
    pub color: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// ArticleTag
///
/// One association row joined with its tag, used to attach tags to a batch of articles.
#[derive(Debug, Clone, FromRow)]
pub struct ArticleTag {
    pub article_id: i64,
    #[sqlx(flatten)]
    pub tag: Tag,
}

/// NewUser
///
/// Insert payload for a user whose password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hashed_password: String,
}

/// ArticleChanges
///
/// Partial update applied to an article in one transaction. `None` leaves a field
/// untouched; `tag_ids: Some(vec![])` clears the tag set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tag_ids: Option<Vec<i64>>,
}

impl ArticleChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.tag_ids.is_none()
    }
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for `POST /api/auth/register`. The password is hashed before it
/// reaches the repository and is never logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: String,
    #[schema(example = "alice@example.com")]
    pub email: String,
    pub password: String,
}

/// LoginForm
///
/// Form-encoded credentials for `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// CreateArticleRequest
///
/// Input payload for `POST /api/articles`. Tag ids that match no tag are dropped.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateArticleRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    #[ts(type = "number[]")]
    pub tag_ids: Vec<i64>,
}

/// UpdateArticleRequest
///
/// Partial update payload for `PUT /api/articles/{id}`. An absent `tag_ids` key keeps
/// the current tags, an empty list clears them, a non-empty list replaces them.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateArticleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "number[] | null")]
    pub tag_ids: Option<Vec<i64>>,
}

impl From<UpdateArticleRequest> for ArticleChanges {
    fn from(req: UpdateArticleRequest) -> Self {
        ArticleChanges {
            title: req.title,
            content: req.content,
            tag_ids: req.tag_ids,
        }
    }
}

/// TagRequest
///
/// Input payload for creating and updating tags. `color` falls back to the default.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TagRequest {
    pub name: String,
    #[serde(default = "default_tag_color")]
    #[schema(example = "#3B82F6")]
    pub color: String,
}

// --- Response Schemas (Output) ---

/// UserResponse
///
/// Public view of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserResponse {
    #[ts(type = "number")]
    pub id: i64,
    pub username: String,
    pub email: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

/// TokenResponse
///
/// Bearer token returned by a successful login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenResponse {
    pub access_token: String,
    #[schema(example = "bearer")]
    pub token_type: String,
}

/// ArticleResponse
///
/// Full article with its author and tags, returned by single-article endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ArticleResponse {
    #[ts(type = "number")]
    pub id: i64,
    pub title: String,
    pub content: String,
    pub is_published: bool,
    #[ts(type = "number")]
    pub author_id: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub updated_at: Option<DateTime<Utc>>,
    pub author: UserResponse,
    pub tags: Vec<Tag>,
}

/// ArticleListItem
///
/// Article summary used by list endpoints; the Markdown body is left out.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ArticleListItem {
    #[ts(type = "number")]
    pub id: i64,
    pub title: String,
    pub is_published: bool,
    #[ts(type = "number")]
    pub author_id: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub updated_at: Option<DateTime<Utc>>,
    pub author: UserResponse,
    pub tags: Vec<Tag>,
}

impl ArticleResponse {
    pub fn new(article: Article, author: UserResponse, tags: Vec<Tag>) -> Self {
        ArticleResponse {
            id: article.id,
            title: article.title,
            content: article.content,
            is_published: article.is_published,
            author_id: article.author_id,
            created_at: article.created_at,
            updated_at: article.updated_at,
            author,
            tags,
        }
    }
}

impl From<ArticleResponse> for ArticleListItem {
    fn from(full: ArticleResponse) -> Self {
        ArticleListItem {
            id: full.id,
            title: full.title,
            is_published: full.is_published,
            author_id: full.author_id,
            created_at: full.created_at,
            updated_at: full.updated_at,
            author: full.author,
            tags: full.tags,
        }
    }
}
