use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use markdown_cms::{
    AppConfig, AppError, AppState, InMemoryRepository, RepositoryState,
    auth::AuthUser,
    handlers::{self, ArticleFilter},
    models::{ArticleChanges, CreateArticleRequest, RegisterRequest, TagRequest},
    repository::Repository,
    services::{accounts, articles, tags},
};
use std::sync::Arc;

// --- Fixtures ---

struct Fixture {
    state: AppState,
    alice: AuthUser,
    bob: AuthUser,
}

impl Fixture {
    async fn new() -> Self {
        let state = AppState {
            repo: Arc::new(InMemoryRepository::new()) as RepositoryState,
            config: AppConfig::default(),
        };
        let alice = register(&state, "alice").await;
        let bob = register(&state, "bob").await;
        Fixture { state, alice, bob }
    }

    fn repo(&self) -> &dyn Repository {
        self.state.repo.as_ref()
    }

    async fn draft(&self, owner: &AuthUser, title: &str, tag_ids: Vec<i64>) -> i64 {
        articles::create(
            self.repo(),
            owner,
            CreateArticleRequest {
                title: title.to_string(),
                content: "# body".to_string(),
                tag_ids,
            },
        )
        .await
        .unwrap()
        .id
    }

    async fn tag(&self, name: &str) -> i64 {
        tags::create(self.repo(), tag_request(name, "#3B82F6"))
            .await
            .unwrap()
            .id
    }
}

async fn register(state: &AppState, username: &str) -> AuthUser {
    let user = accounts::register(
        state.repo.as_ref(),
        &state.config,
        RegisterRequest {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "secret123".to_string(),
        },
    )
    .await
    .unwrap();
    AuthUser {
        id: user.id,
        username: user.username,
    }
}

fn tag_request(name: &str, color: &str) -> TagRequest {
    TagRequest {
        name: name.to_string(),
        color: color.to_string(),
    }
}

// --- Accounts ---

#[tokio::test]
async fn test_register_checks_username_before_email() {
    let fx = Fixture::new().await;

    let err = accounts::register(
        fx.repo(),
        &fx.state.config,
        RegisterRequest {
            username: "alice".to_string(),
            email: "bob@example.com".to_string(),
            password: "pw".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(ref d) if d == "Username already registered"));

    let err = accounts::register(
        fx.repo(),
        &fx.state.config,
        RegisterRequest {
            username: "carol".to_string(),
            email: "bob@example.com".to_string(),
            password: "pw".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(ref d) if d == "Email already registered"));
}

#[tokio::test]
async fn test_register_rejects_invalid_input() {
    let fx = Fixture::new().await;

    for (username, email, password) in [
        ("", "x@example.com", "pw"),
        ("carol", "not-an-email", "pw"),
        ("carol", "carol@example.com", ""),
    ] {
        let err = accounts::register(
            fx.repo(),
            &fx.state.config,
            RegisterRequest {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)), "{username}/{email}");
    }
}

#[tokio::test]
async fn test_login_token_names_the_user() {
    let fx = Fixture::new().await;

    let token = accounts::login(fx.repo(), &fx.state.config, "alice", "secret123".to_string())
        .await
        .unwrap();
    assert_eq!(token.token_type, "bearer");

    let user = accounts::resolve_current_user(
        fx.repo(),
        &fx.state.config,
        Some(&token.access_token),
    )
    .await
    .unwrap();
    assert_eq!(user.id, fx.alice.id);

    let err = accounts::login(fx.repo(), &fx.state.config, "alice", "nope".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}

// --- Article Lifecycle ---

#[tokio::test]
async fn test_new_article_is_private_draft() {
    let fx = Fixture::new().await;
    let id = fx.draft(&fx.alice, "Draft", vec![]).await;

    let own = articles::view(fx.repo(), &fx.alice, id).await.unwrap();
    assert!(!own.is_published);
    assert_eq!(own.author.id, fx.alice.id);
    assert!(own.updated_at.is_none());

    let err = articles::view(fx.repo(), &fx.bob, id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    assert!(articles::list_public(fx.repo(), None).await.unwrap().is_empty());
    assert_eq!(articles::list_owned(fx.repo(), &fx.alice, None).await.unwrap().len(), 1);
    assert!(articles::list_owned(fx.repo(), &fx.bob, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_publish_is_idempotent() {
    let fx = Fixture::new().await;
    let id = fx.draft(&fx.alice, "Post", vec![]).await;

    let first = articles::publish(fx.repo(), &fx.alice, id).await.unwrap();
    assert!(first.is_published);
    assert!(first.updated_at.is_some());

    let second = articles::publish(fx.repo(), &fx.alice, id).await.unwrap();
    assert!(second.is_published);
    assert_eq!(second.updated_at, first.updated_at);

    let visible = articles::view(fx.repo(), &fx.bob, id).await.unwrap();
    assert_eq!(visible.id, id);
    assert_eq!(articles::list_public(fx.repo(), None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unpublish_draft_changes_nothing() {
    let fx = Fixture::new().await;
    let id = fx.draft(&fx.alice, "Post", vec![]).await;

    let unchanged = articles::unpublish(fx.repo(), &fx.alice, id).await.unwrap();
    assert!(!unchanged.is_published);
    assert!(unchanged.updated_at.is_none());

    articles::publish(fx.repo(), &fx.alice, id).await.unwrap();
    let back = articles::unpublish(fx.repo(), &fx.alice, id).await.unwrap();
    assert!(!back.is_published);
    assert!(articles::list_public(fx.repo(), None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_owner_only_mutations() {
    let fx = Fixture::new().await;
    let id = fx.draft(&fx.alice, "Mine", vec![]).await;
    articles::publish(fx.repo(), &fx.alice, id).await.unwrap();

    let changes = ArticleChanges {
        title: Some("Stolen".to_string()),
        ..Default::default()
    };
    let errors = [
        articles::update(fx.repo(), &fx.bob, id, changes).await.unwrap_err(),
        articles::unpublish(fx.repo(), &fx.bob, id).await.unwrap_err(),
        articles::publish(fx.repo(), &fx.bob, id).await.unwrap_err(),
        articles::delete(fx.repo(), &fx.bob, id).await.unwrap_err(),
    ];
    for err in errors {
        assert!(matches!(err, AppError::Forbidden(_)), "{err:?}");
    }

    let intact = articles::view(fx.repo(), &fx.alice, id).await.unwrap();
    assert_eq!(intact.title, "Mine");
    assert!(intact.is_published);
}

#[tokio::test]
async fn test_missing_article_reports_not_found_before_ownership() {
    let fx = Fixture::new().await;

    let errors = [
        articles::view(fx.repo(), &fx.bob, 404).await.unwrap_err(),
        articles::update(fx.repo(), &fx.bob, 404, ArticleChanges::default())
            .await
            .unwrap_err(),
        articles::publish(fx.repo(), &fx.bob, 404).await.unwrap_err(),
        articles::unpublish(fx.repo(), &fx.bob, 404).await.unwrap_err(),
        articles::delete(fx.repo(), &fx.bob, 404).await.unwrap_err(),
    ];
    for err in errors {
        assert!(matches!(err, AppError::NotFound(_)), "{err:?}");
    }
}

#[tokio::test]
async fn test_update_applies_only_supplied_fields() {
    let fx = Fixture::new().await;
    let rust = fx.tag("rust").await;
    let id = fx.draft(&fx.alice, "Original", vec![rust]).await;

    let updated = articles::update(
        fx.repo(),
        &fx.alice,
        id,
        ArticleChanges {
            content: Some("new body".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(updated.title, "Original");
    assert_eq!(updated.content, "new body");
    assert_eq!(updated.tags.len(), 1);
    assert!(updated.updated_at.is_some());
    assert!(!updated.is_published);
}

#[tokio::test]
async fn test_empty_update_is_a_no_op() {
    let fx = Fixture::new().await;
    let id = fx.draft(&fx.alice, "Same", vec![]).await;

    let same = articles::update(fx.repo(), &fx.alice, id, ArticleChanges::default())
        .await
        .unwrap();
    assert!(same.updated_at.is_none());
}

#[tokio::test]
async fn test_update_tag_ids_replace_or_clear() {
    let fx = Fixture::new().await;
    let rust = fx.tag("rust").await;
    let web = fx.tag("web").await;
    let id = fx.draft(&fx.alice, "Tagged", vec![rust]).await;

    let replaced = articles::update(
        fx.repo(),
        &fx.alice,
        id,
        ArticleChanges {
            tag_ids: Some(vec![web, web, 9999]),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let names: Vec<&str> = replaced.tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["web"]);

    let cleared = articles::update(
        fx.repo(),
        &fx.alice,
        id,
        ArticleChanges {
            tag_ids: Some(vec![]),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(cleared.tags.is_empty());
}

#[tokio::test]
async fn test_update_rejects_blank_title() {
    let fx = Fixture::new().await;
    let id = fx.draft(&fx.alice, "Title", vec![]).await;

    let err = articles::update(
        fx.repo(),
        &fx.alice,
        id,
        ArticleChanges {
            title: Some(" ".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_create_drops_unknown_and_duplicate_tags() {
    let fx = Fixture::new().await;
    let rust = fx.tag("rust").await;
    let id = fx.draft(&fx.alice, "Post", vec![rust, rust, 12345]).await;

    let article = articles::view(fx.repo(), &fx.alice, id).await.unwrap();
    assert_eq!(article.tags.len(), 1);
    assert_eq!(article.tags[0].id, rust);
}

#[tokio::test]
async fn test_listings_filter_by_tag_newest_first() {
    let fx = Fixture::new().await;
    let rust = fx.tag("rust").await;
    let older = fx.draft(&fx.alice, "Older", vec![rust]).await;
    let untagged = fx.draft(&fx.alice, "Untagged", vec![]).await;
    let newer = fx.draft(&fx.alice, "Newer", vec![rust]).await;
    for id in [older, untagged, newer] {
        articles::publish(fx.repo(), &fx.alice, id).await.unwrap();
    }

    let ids: Vec<i64> = articles::list_public(fx.repo(), Some(rust))
        .await
        .unwrap()
        .iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(ids, vec![newer, older]);

    assert!(articles::list_public(fx.repo(), Some(9999)).await.unwrap().is_empty());
    assert_eq!(
        articles::list_owned(fx.repo(), &fx.alice, Some(rust))
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn test_delete_removes_article() {
    let fx = Fixture::new().await;
    let id = fx.draft(&fx.alice, "Temp", vec![]).await;

    articles::delete(fx.repo(), &fx.alice, id).await.unwrap();
    let err = articles::view(fx.repo(), &fx.alice, id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

// --- Tags ---

#[tokio::test]
async fn test_tag_names_are_unique() {
    let fx = Fixture::new().await;
    fx.tag("rust").await;

    let err = tags::create(fx.repo(), tag_request("rust", "#000000"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(ref d) if d == "Tag 'rust' already exists"));

    // Exact match only.
    assert!(tags::create(fx.repo(), tag_request("Rust", "#000000")).await.is_ok());
}

#[tokio::test]
async fn test_tag_rename_collision_and_recolor() {
    let fx = Fixture::new().await;
    let rust = fx.tag("rust").await;
    fx.tag("web").await;

    let err = tags::update(fx.repo(), rust, tag_request("web", "#3B82F6"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let recolored = tags::update(fx.repo(), rust, tag_request("rust", "#FF0000"))
        .await
        .unwrap();
    assert_eq!(recolored.color, "#FF0000");

    let err = tags::update(fx.repo(), 9999, tag_request("web", "#3B82F6"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_deleting_tag_detaches_it() {
    let fx = Fixture::new().await;
    let rust = fx.tag("rust").await;
    let id = fx.draft(&fx.alice, "Post", vec![rust]).await;

    tags::delete(fx.repo(), rust).await.unwrap();

    let article = articles::view(fx.repo(), &fx.alice, id).await.unwrap();
    assert!(article.tags.is_empty());
    assert!(matches!(
        tags::get(fx.repo(), rust).await.unwrap_err(),
        AppError::NotFound(_)
    ));
    assert!(matches!(
        tags::delete(fx.repo(), rust).await.unwrap_err(),
        AppError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_tags_listed_by_name() {
    let fx = Fixture::new().await;
    fx.tag("zeta").await;
    fx.tag("alpha").await;

    let names: Vec<String> = tags::list(fx.repo())
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["alpha", "zeta"]);
}

// --- Handlers ---

#[tokio::test]
async fn test_create_article_handler_returns_created() {
    let fx = Fixture::new().await;

    let (status, Json(article)) = handlers::create_article(
        fx.alice.clone(),
        State(fx.state.clone()),
        Json(CreateArticleRequest {
            title: "Via handler".to_string(),
            content: String::new(),
            tag_ids: vec![],
        }),
    )
    .await
    .unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(article.author_id, fx.alice.id);
}

#[tokio::test]
async fn test_delete_handlers_return_no_content() {
    let fx = Fixture::new().await;
    let id = fx.draft(&fx.alice, "Temp", vec![]).await;
    let tag = fx.tag("temp").await;

    let status = handlers::delete_article(fx.alice.clone(), State(fx.state.clone()), Path(id))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let status = handlers::delete_tag(fx.alice.clone(), State(fx.state.clone()), Path(tag))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_list_my_articles_handler_includes_drafts() {
    let fx = Fixture::new().await;
    fx.draft(&fx.alice, "One", vec![]).await;
    fx.draft(&fx.bob, "Other", vec![]).await;

    let Json(list) = handlers::list_my_articles(
        fx.alice.clone(),
        State(fx.state.clone()),
        Query(ArticleFilter { tag_id: None }),
    )
    .await
    .unwrap();

    assert_eq!(list.len(), 1);
    assert_eq!(list[0].title, "One");
}

#[tokio::test]
async fn test_get_me_handler() {
    let fx = Fixture::new().await;

    let Json(me) = handlers::get_me(fx.bob.clone(), State(fx.state.clone()))
        .await
        .unwrap();
    assert_eq!(me.username, "bob");
}
