//! PostgresRepository against a real database.
//!
//! `#[sqlx::test]` creates a throwaway database per test (from `DATABASE_URL`) and
//! applies `./migrations`. Ignored by default:
//! `DATABASE_URL=postgres://... cargo test -- --ignored`.

use catalog_api::{
    models::{
        CreateTermRequest, NewComment, NewReview, NewTitle, NewUser, ReviewChanges, Role,
        TermKind, TitleChanges, TitleFilter, User, UserChanges,
    },
    repository::{PostgresRepository, RepoError, Repository, constraints},
};
use sqlx::PgPool;

// --- Test Data Helpers ---

async fn create_test_user(repo: &PostgresRepository, username: &str) -> User {
    repo.create_user(NewUser {
        username: username.to_string(),
        email: format!("{username}@test.com"),
        ..Default::default()
    })
    .await
    .expect("Failed to create test user")
}

async fn create_term(repo: &PostgresRepository, kind: TermKind, slug: &str) -> i64 {
    repo.create_term(
        kind,
        CreateTermRequest {
            name: slug.to_uppercase(),
            slug: slug.to_string(),
        },
    )
    .await
    .expect("Failed to create term")
    .id
}

// --- Users ---

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn test_user_uniqueness_reports_constraint(pool: PgPool) {
    let repo = PostgresRepository::new(pool);
    create_test_user(&repo, "alice").await;

    let err = repo
        .create_user(NewUser {
            username: "alice".into(),
            email: "different@test.com".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::UniqueViolation(c) if c == constraints::USERNAME));

    let err = repo
        .create_user(NewUser {
            username: "alice2".into(),
            email: "alice@test.com".into(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::UniqueViolation(c) if c == constraints::EMAIL));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn test_user_partial_update_and_codes(pool: PgPool) {
    let repo = PostgresRepository::new(pool);
    let user = create_test_user(&repo, "reader").await;
    assert_eq!(user.role, Role::User);

    let updated = repo
        .update_user(
            user.id,
            UserChanges {
                bio: Some("hello".into()),
                role: Some(Role::Moderator),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.bio, "hello");
    assert_eq!(updated.role, Role::Moderator);
    assert_eq!(updated.email, "reader@test.com");

    assert_eq!(repo.get_confirmation_code(user.id).await.unwrap(), None);
    assert!(repo.set_confirmation_code(user.id, "abc").await.unwrap());
    assert!(repo.set_confirmation_code(user.id, "def").await.unwrap());
    assert_eq!(
        repo.get_confirmation_code(user.id).await.unwrap().as_deref(),
        Some("def")
    );

    let found = repo.list_users(Some("EAD".into())).await.unwrap();
    assert_eq!(found.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn test_search_treats_wildcards_literally(pool: PgPool) {
    let repo = PostgresRepository::new(pool);
    create_test_user(&repo, "alice").await;
    create_term(&repo, TermKind::Genre, "drama").await;

    assert!(repo.list_users(Some("%".into())).await.unwrap().is_empty());
    assert!(repo.list_users(Some("_".into())).await.unwrap().is_empty());
    assert!(
        repo.list_terms(TermKind::Genre, Some("%".into()))
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        repo.list_terms(TermKind::Genre, Some("RAM".into()))
            .await
            .unwrap()
            .len(),
        1
    );
}

// --- Titles & rating ---

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn test_title_rating_and_filters(pool: PgPool) {
    let repo = PostgresRepository::new(pool);
    let books = create_term(&repo, TermKind::Category, "books").await;
    let scifi = create_term(&repo, TermKind::Genre, "sci-fi").await;

    let dune = repo
        .create_title(NewTitle {
            name: "Dune".into(),
            year: Some(1965),
            description: String::new(),
            category_id: Some(books),
            genre_ids: vec![scifi],
        })
        .await
        .unwrap();
    assert_eq!(dune.rating, None);
    assert_eq!(dune.genre.len(), 1);

    repo.create_title(NewTitle {
        name: "Emma".into(),
        year: Some(1815),
        ..Default::default()
    })
    .await
    .unwrap();

    for (name, score) in [("a", 7), ("b", 9)] {
        let author = create_test_user(&repo, name).await;
        repo.create_review(NewReview {
            title_id: dune.id,
            author_id: author.id,
            text: "ok".into(),
            score,
        })
        .await
        .unwrap();
    }
    let dune = repo.get_title(dune.id).await.unwrap().unwrap();
    assert_eq!(dune.rating, Some(8.0));

    let by_name = repo
        .list_titles(TitleFilter {
            name: Some("dUnE".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_name.len(), 1);

    let by_genre = repo
        .list_titles(TitleFilter {
            genre: Some("sci-fi".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_genre.len(), 1);

    let by_year = repo
        .list_titles(TitleFilter {
            year: Some(1815),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_year[0].name, "Emma");

    let renamed = repo
        .update_title(
            dune.id,
            TitleChanges {
                name: Some("Dune Messiah".into()),
                genre_ids: Some(vec![]),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(renamed.name, "Dune Messiah");
    assert!(renamed.genre.is_empty());
    assert_eq!(renamed.year, Some(1965));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn test_category_delete_nulls_titles(pool: PgPool) {
    let repo = PostgresRepository::new(pool);
    let books = create_term(&repo, TermKind::Category, "books").await;
    let title = repo
        .create_title(NewTitle {
            name: "Solaris".into(),
            category_id: Some(books),
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(repo.delete_term(TermKind::Category, "books").await.unwrap());
    let title = repo.get_title(title.id).await.unwrap().unwrap();
    assert!(title.category.is_none());
}

// --- Reviews & comments ---

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn test_review_uniqueness_and_cascades(pool: PgPool) {
    let repo = PostgresRepository::new(pool);
    let author = create_test_user(&repo, "author").await;
    let title = repo
        .create_title(NewTitle {
            name: "Dune".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let review = repo
        .create_review(NewReview {
            title_id: title.id,
            author_id: author.id,
            text: "good".into(),
            score: 8,
        })
        .await
        .unwrap();
    assert_eq!(review.author, "author");

    let err = repo
        .create_review(NewReview {
            title_id: title.id,
            author_id: author.id,
            text: "again".into(),
            score: 2,
        })
        .await
        .unwrap_err();
    assert!(
        matches!(err, RepoError::UniqueViolation(c) if c == constraints::REVIEW_TITLE_AUTHOR)
    );

    let edited = repo
        .update_review(
            review.id,
            ReviewChanges {
                score: Some(10),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(edited.score, 10);
    assert_eq!(edited.text, "good");

    let comment = repo
        .create_comment(NewComment {
            review_id: review.id,
            author_id: author.id,
            text: "self-reply".into(),
        })
        .await
        .unwrap();
    assert_eq!(comment.author, "author");

    assert!(repo.delete_title(title.id).await.unwrap());
    assert!(repo.get_comment(review.id, comment.id).await.unwrap().is_none());
    assert!(repo.list_reviews(title.id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "needs a Postgres DATABASE_URL"]
async fn test_user_delete_cascades_to_reviews(pool: PgPool) {
    let repo = PostgresRepository::new(pool);
    let author = create_test_user(&repo, "author").await;
    let title = repo
        .create_title(NewTitle {
            name: "Dune".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    repo.create_review(NewReview {
        title_id: title.id,
        author_id: author.id,
        text: "good".into(),
        score: 8,
    })
    .await
    .unwrap();

    assert!(repo.delete_user(author.id).await.unwrap());
    assert!(repo.list_reviews(title.id).await.unwrap().is_empty());
    let title = repo.get_title(title.id).await.unwrap().unwrap();
    assert_eq!(title.rating, None);
}
