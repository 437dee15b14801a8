use super::{ArticleQuery, RepoResult, Repository};
use crate::models::{Article, ArticleChanges, ArticleTag, NewUser, Tag, User};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction, query_builder::QueryBuilder};

// Arbitrary key serializing concurrent schema bootstraps.
const SCHEMA_LOCK_KEY: i64 = 0x6d64_636d_7301;

const SCHEMA: [&str; 5] = [
    r#"CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        username VARCHAR(50) NOT NULL UNIQUE,
        email VARCHAR(100) NOT NULL UNIQUE,
        hashed_password VARCHAR(100) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS tags (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(50) NOT NULL UNIQUE,
        color VARCHAR(7) NOT NULL DEFAULT '#3B82F6',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS articles (
        id BIGSERIAL PRIMARY KEY,
        title VARCHAR(200) NOT NULL,
        content TEXT NOT NULL,
        is_published BOOLEAN NOT NULL DEFAULT FALSE,
        author_id BIGINT NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ
    )"#,
    r#"CREATE TABLE IF NOT EXISTS article_tags (
        article_id BIGINT NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
        tag_id BIGINT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
        PRIMARY KEY (article_id, tag_id)
    )"#,
    "CREATE INDEX IF NOT EXISTS article_tags_tag_id_idx ON article_tags (tag_id)",
];

const ARTICLE_COLUMNS: &str = "id, title, content, is_published, author_id, created_at, updated_at";
const USER_COLUMNS: &str = "id, username, email, hashed_password, created_at";
const TAG_COLUMNS: &str = "id, name, color, created_at";

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Associates `tag_ids` with the article, silently skipping ids with no tag row.
    async fn attach_tags(
        tx: &mut Transaction<'_, Postgres>,
        article_id: i64,
        tag_ids: &[i64],
    ) -> RepoResult<()> {
        if tag_ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            "INSERT INTO article_tags (article_id, tag_id)
             SELECT $1, id FROM tags WHERE id = ANY($2)
             ON CONFLICT DO NOTHING",
        )
        .bind(article_id)
        .bind(tag_ids)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// ensure_schema
    ///
    /// Runs every `CREATE ... IF NOT EXISTS` statement in one transaction holding an
    /// advisory lock, so replicas starting together do not race on the catalog.
    async fn ensure_schema(&self) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(SCHEMA_LOCK_KEY)
            .execute(&mut *tx)
            .await?;
        for statement in SCHEMA {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        tracing::info!("database schema ready");
        Ok(())
    }

    async fn get_user(&self, id: i64) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_users(&self, ids: &[i64]) -> RepoResult<Vec<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, hashed_password) VALUES ($1, $2, $3)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.username)
        .bind(user.email)
        .bind(user.hashed_password)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_article(&self, id: i64) -> RepoResult<Option<Article>> {
        sqlx::query_as::<_, Article>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// list_articles
    ///
    /// Builds the filter with QueryBuilder so every value is a bound parameter.
    /// The tag filter is an EXISTS against the join table, so an unknown tag id
    /// simply matches nothing.
    async fn list_articles(&self, query: ArticleQuery) -> RepoResult<Vec<Article>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles a WHERE TRUE"
        ));

        if let Some(author_id) = query.author_id {
            builder.push(" AND a.author_id = ");
            builder.push_bind(author_id);
        }

        if query.published_only {
            builder.push(" AND a.is_published = TRUE");
        }

        if let Some(tag_id) = query.tag_id {
            builder.push(
                " AND EXISTS (SELECT 1 FROM article_tags j WHERE j.article_id = a.id AND j.tag_id = ",
            );
            builder.push_bind(tag_id);
            builder.push(")");
        }

        builder.push(" ORDER BY a.created_at DESC, a.id DESC");

        builder
            .build_query_as::<Article>()
            .fetch_all(&self.pool)
            .await
    }

    async fn create_article(
        &self,
        author_id: i64,
        title: &str,
        content: &str,
        tag_ids: &[i64],
    ) -> RepoResult<Article> {
        let mut tx = self.pool.begin().await?;
        let article = sqlx::query_as::<_, Article>(&format!(
            "INSERT INTO articles (title, content, author_id, is_published) VALUES ($1, $2, $3, FALSE)
             RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(title)
        .bind(content)
        .bind(author_id)
        .fetch_one(&mut *tx)
        .await?;

        Self::attach_tags(&mut tx, article.id, tag_ids).await?;
        tx.commit().await?;
        Ok(article)
    }

    /// update_article
    ///
    /// COALESCE keeps columns whose field was not supplied. Tag replacement is a
    /// delete-then-insert on the join table inside the same transaction.
    async fn update_article(
        &self,
        id: i64,
        changes: &ArticleChanges,
    ) -> RepoResult<Option<Article>> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query_as::<_, Article>(&format!(
            "UPDATE articles
             SET title = COALESCE($2, title),
                 content = COALESCE($3, content),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.title.as_deref())
        .bind(changes.content.as_deref())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(article) = updated else {
            return Ok(None);
        };

        if let Some(tag_ids) = &changes.tag_ids {
            sqlx::query("DELETE FROM article_tags WHERE article_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            Self::attach_tags(&mut tx, id, tag_ids).await?;
        }

        tx.commit().await?;
        Ok(Some(article))
    }

    async fn set_article_published(
        &self,
        id: i64,
        is_published: bool,
    ) -> RepoResult<Option<Article>> {
        sqlx::query_as::<_, Article>(&format!(
            "UPDATE articles SET is_published = $2, updated_at = NOW() WHERE id = $1
             RETURNING {ARTICLE_COLUMNS}"
        ))
        .bind(id)
        .bind(is_published)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_article(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_article_tags(&self, article_ids: &[i64]) -> RepoResult<Vec<ArticleTag>> {
        if article_ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, ArticleTag>(
            "SELECT j.article_id, t.id, t.name, t.color, t.created_at
             FROM article_tags j
             JOIN tags t ON t.id = j.tag_id
             WHERE j.article_id = ANY($1)
             ORDER BY t.name",
        )
        .bind(article_ids)
        .fetch_all(&self.pool)
        .await
    }

    async fn list_tags(&self) -> RepoResult<Vec<Tag>> {
        sqlx::query_as::<_, Tag>(&format!("SELECT {TAG_COLUMNS} FROM tags ORDER BY name"))
            .fetch_all(&self.pool)
            .await
    }

    async fn get_tag(&self, id: i64) -> RepoResult<Option<Tag>> {
        sqlx::query_as::<_, Tag>(&format!("SELECT {TAG_COLUMNS} FROM tags WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn get_tag_by_name(&self, name: &str) -> RepoResult<Option<Tag>> {
        sqlx::query_as::<_, Tag>(&format!("SELECT {TAG_COLUMNS} FROM tags WHERE name = $1"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_tag(&self, name: &str, color: &str) -> RepoResult<Tag> {
        sqlx::query_as::<_, Tag>(&format!(
            "INSERT INTO tags (name, color) VALUES ($1, $2) RETURNING {TAG_COLUMNS}"
        ))
        .bind(name)
        .bind(color)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_tag(&self, id: i64, name: &str, color: &str) -> RepoResult<Option<Tag>> {
        sqlx::query_as::<_, Tag>(&format!(
            "UPDATE tags SET name = $2, color = $3 WHERE id = $1 RETURNING {TAG_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .bind(color)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_tag(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
