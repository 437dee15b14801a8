use super::{ArticleQuery, RepoResult, Repository};
use crate::models::{Article, ArticleChanges, ArticleTag, NewUser, Tag, User};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Store {
    users: Vec<User>,
    articles: Vec<Article>,
    tags: Vec<Tag>,
    // (article_id, tag_id)
    article_tags: BTreeSet<(i64, i64)>,
    next_user_id: i64,
    next_article_id: i64,
    next_tag_id: i64,
}

impl Store {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn attach_tags(&mut self, article_id: i64, tag_ids: &[i64]) {
        for tag_id in tag_ids {
            if self.tags.iter().any(|t| t.id == *tag_id) {
                self.article_tags.insert((article_id, *tag_id));
            }
        }
    }
}

/// InMemoryRepository
///
/// A `Repository` kept entirely in process memory, used by the test suites to
/// exercise the services and the router without a database. Each call holds the
/// store lock for its whole duration, which gives every write the same
/// all-or-nothing behavior as a transaction. Uniqueness of usernames, emails and
/// tag names is left to the callers' existence checks.
#[derive(Default)]
pub struct InMemoryRepository {
    store: Mutex<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn ensure_schema(&self) -> RepoResult<()> {
        Ok(())
    }

    async fn get_user(&self, id: i64) -> RepoResult<Option<User>> {
        Ok(self.store().users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        Ok(self
            .store()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(self.store().users.iter().find(|u| u.email == email).cloned())
    }

    async fn get_users(&self, ids: &[i64]) -> RepoResult<Vec<User>> {
        Ok(self
            .store()
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut store = self.store();
        let user = User {
            id: Store::next_id(&mut store.next_user_id),
            username: user.username,
            email: user.email,
            hashed_password: user.hashed_password,
            created_at: Utc::now(),
        };
        store.users.push(user.clone());
        Ok(user)
    }

    async fn get_article(&self, id: i64) -> RepoResult<Option<Article>> {
        Ok(self.store().articles.iter().find(|a| a.id == id).cloned())
    }

    async fn list_articles(&self, query: ArticleQuery) -> RepoResult<Vec<Article>> {
        let store = self.store();
        let mut articles: Vec<Article> = store
            .articles
            .iter()
            .filter(|a| query.author_id.is_none_or(|author| a.author_id == author))
            .filter(|a| !query.published_only || a.is_published)
            .filter(|a| {
                query
                    .tag_id
                    .is_none_or(|tag| store.article_tags.contains(&(a.id, tag)))
            })
            .cloned()
            .collect();
        articles.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(articles)
    }

    async fn create_article(
        &self,
        author_id: i64,
        title: &str,
        content: &str,
        tag_ids: &[i64],
    ) -> RepoResult<Article> {
        let mut store = self.store();
        let article = Article {
            id: Store::next_id(&mut store.next_article_id),
            title: title.to_string(),
            content: content.to_string(),
            is_published: false,
            author_id,
            created_at: Utc::now(),
            updated_at: None,
        };
        store.articles.push(article.clone());
        store.attach_tags(article.id, tag_ids);
        Ok(article)
    }

    async fn update_article(
        &self,
        id: i64,
        changes: &ArticleChanges,
    ) -> RepoResult<Option<Article>> {
        let mut store = self.store();
        let Some(article) = store.articles.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        if let Some(title) = &changes.title {
            article.title = title.clone();
        }
        if let Some(content) = &changes.content {
            article.content = content.clone();
        }
        article.updated_at = Some(Utc::now());
        let updated = article.clone();

        if let Some(tag_ids) = &changes.tag_ids {
            store.article_tags.retain(|(article_id, _)| *article_id != id);
            store.attach_tags(id, tag_ids);
        }
        Ok(Some(updated))
    }

    async fn set_article_published(
        &self,
        id: i64,
        is_published: bool,
    ) -> RepoResult<Option<Article>> {
        let mut store = self.store();
        let updated = store.articles.iter_mut().find(|a| a.id == id).map(|article| {
            article.is_published = is_published;
            article.updated_at = Some(Utc::now());
            article.clone()
        });
        Ok(updated)
    }

    async fn delete_article(&self, id: i64) -> RepoResult<bool> {
        let mut store = self.store();
        let before = store.articles.len();
        store.articles.retain(|a| a.id != id);
        store.article_tags.retain(|(article_id, _)| *article_id != id);
        Ok(store.articles.len() < before)
    }

    async fn get_article_tags(&self, article_ids: &[i64]) -> RepoResult<Vec<ArticleTag>> {
        let store = self.store();
        let mut rows: Vec<ArticleTag> = store
            .article_tags
            .iter()
            .filter(|(article_id, _)| article_ids.contains(article_id))
            .filter_map(|(article_id, tag_id)| {
                store.tags.iter().find(|t| t.id == *tag_id).map(|tag| ArticleTag {
                    article_id: *article_id,
                    tag: tag.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| a.tag.name.cmp(&b.tag.name));
        Ok(rows)
    }

    async fn list_tags(&self) -> RepoResult<Vec<Tag>> {
        let mut tags = self.store().tags.clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn get_tag(&self, id: i64) -> RepoResult<Option<Tag>> {
        Ok(self.store().tags.iter().find(|t| t.id == id).cloned())
    }

    async fn get_tag_by_name(&self, name: &str) -> RepoResult<Option<Tag>> {
        Ok(self.store().tags.iter().find(|t| t.name == name).cloned())
    }

    async fn create_tag(&self, name: &str, color: &str) -> RepoResult<Tag> {
        let mut store = self.store();
        let tag = Tag {
            id: Store::next_id(&mut store.next_tag_id),
            name: name.to_string(),
            color: color.to_string(),
            created_at: Utc::now(),
        };
        store.tags.push(tag.clone());
        Ok(tag)
    }

    async fn update_tag(&self, id: i64, name: &str, color: &str) -> RepoResult<Option<Tag>> {
        let mut store = self.store();
        let updated = store.tags.iter_mut().find(|t| t.id == id).map(|tag| {
            tag.name = name.to_string();
            tag.color = color.to_string();
            tag.clone()
        });
        Ok(updated)
    }

    async fn delete_tag(&self, id: i64) -> RepoResult<bool> {
        let mut store = self.store();
        let before = store.tags.len();
        store.tags.retain(|t| t.id != id);
        store.article_tags.retain(|(_, tag_id)| *tag_id != id);
        Ok(store.tags.len() < before)
    }
}
