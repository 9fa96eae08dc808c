use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{Request, header, request::Parts},
};
use catalog_api::{
    AppState, InMemoryRepository, MockNotifier,
    auth::{AuthUser, Claims, decode_token, issue_token},
    config::{AppConfig, Env},
    error::ApiError,
    models::{NewUser, Role, User, UserChanges},
    repository::Repository,
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use std::sync::Arc;
use uuid::Uuid;

// --- Test Utilities ---

struct Ctx {
    repo: Arc<InMemoryRepository>,
    state: AppState,
}

fn ctx(env: Env) -> Ctx {
    let repo = Arc::new(InMemoryRepository::new());
    let state = AppState {
        repo: repo.clone(),
        notifier: Arc::new(MockNotifier::new()),
        config: AppConfig {
            dev_auth_bypass: env == Env::Local,
            env,
            ..AppConfig::default()
        },
    };
    Ctx { repo, state }
}

async fn seed_user(repo: &InMemoryRepository, username: &str) -> User {
    repo.create_user(NewUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        ..Default::default()
    })
    .await
    .unwrap()
}

fn parts(headers: &[(&str, String)]) -> Parts {
    let mut builder = Request::builder().uri("/api/v1/users/me");
    for (name, value) in headers {
        builder = builder.header(*name, value.as_str());
    }
    builder.body(()).unwrap().into_parts().0
}

fn bearer(token: &str) -> (&'static str, String) {
    (header::AUTHORIZATION.as_str(), format!("Bearer {token}"))
}

async fn required(parts: &mut Parts, state: &AppState) -> Result<AuthUser, ApiError> {
    <AuthUser as FromRequestParts<AppState>>::from_request_parts(parts, state).await
}

async fn optional(parts: &mut Parts, state: &AppState) -> Result<Option<AuthUser>, ApiError> {
    <AuthUser as OptionalFromRequestParts<AppState>>::from_request_parts(parts, state).await
}

// --- Tests ---

#[tokio::test]
async fn issued_token_round_trips_to_the_same_identity() {
    let Ctx { repo, state } = ctx(Env::Production);
    let user = seed_user(&repo, "alice").await;

    let token = issue_token(&state.config, &user).unwrap();
    let claims = decode_token(&state.config, &token).unwrap();
    assert_eq!(claims.sub, user.id);
    assert_eq!(claims.username, "alice");

    let mut parts = parts(&[bearer(&token)]);
    let auth = required(&mut parts, &state).await.unwrap();
    assert_eq!(auth.id, user.id);
    assert_eq!(auth.username, "alice");
    assert_eq!(auth.role, Role::User);
}

#[tokio::test]
async fn missing_credentials_are_401_when_required_and_none_when_optional() {
    let Ctx { state, .. } = ctx(Env::Production);

    let mut p = parts(&[]);
    assert!(matches!(
        required(&mut p, &state).await,
        Err(ApiError::Unauthenticated)
    ));

    let mut p = parts(&[]);
    assert!(optional(&mut p, &state).await.unwrap().is_none());
}

#[tokio::test]
async fn malformed_token_is_rejected_even_when_optional() {
    let Ctx { state, .. } = ctx(Env::Production);

    let mut p = parts(&[bearer("not-a-jwt")]);
    assert!(matches!(
        optional(&mut p, &state).await,
        Err(ApiError::Unauthenticated)
    ));

    let mut p = parts(&[(header::AUTHORIZATION.as_str(), "Basic abc".to_string())]);
    assert!(matches!(
        required(&mut p, &state).await,
        Err(ApiError::Unauthenticated)
    ));
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let Ctx { repo, state } = ctx(Env::Production);
    let user = seed_user(&repo, "late").await;

    let past = (Utc::now().timestamp() - 7200) as usize;
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        iat: past,
        exp: past + 60,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.config.jwt_secret.as_bytes()),
    )
    .unwrap();

    let mut p = parts(&[bearer(&token)]);
    assert!(matches!(
        required(&mut p, &state).await,
        Err(ApiError::Unauthenticated)
    ));
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() {
    let Ctx { repo, state } = ctx(Env::Production);
    let user = seed_user(&repo, "mallory").await;

    let forged_config = AppConfig {
        jwt_secret: "some-other-secret".into(),
        ..AppConfig::default()
    };
    let token = issue_token(&forged_config, &user).unwrap();

    let mut p = parts(&[bearer(&token)]);
    assert!(matches!(
        required(&mut p, &state).await,
        Err(ApiError::Unauthenticated)
    ));
}

#[tokio::test]
async fn deleted_account_loses_access_immediately() {
    let Ctx { repo, state } = ctx(Env::Production);
    let user = seed_user(&repo, "gone").await;
    let token = issue_token(&state.config, &user).unwrap();

    repo.delete_user(user.id).await.unwrap();

    let mut p = parts(&[bearer(&token)]);
    assert!(matches!(
        required(&mut p, &state).await,
        Err(ApiError::Unauthenticated)
    ));
}

#[tokio::test]
async fn role_changes_apply_without_a_new_token() {
    let Ctx { repo, state } = ctx(Env::Production);
    let user = seed_user(&repo, "promoted").await;
    let token = issue_token(&state.config, &user).unwrap();

    repo.update_user(
        user.id,
        UserChanges {
            role: Some(Role::Moderator),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let mut p = parts(&[bearer(&token)]);
    let auth = required(&mut p, &state).await.unwrap();
    assert!(auth.is_moderator());
    assert!(!auth.is_admin());
}

#[tokio::test]
async fn huge_token_ttl_saturates_instead_of_expiring() {
    let Ctx { repo, mut state } = ctx(Env::Production);
    state.config.token_ttl_secs = u64::MAX;
    let user = seed_user(&repo, "alice").await;

    let token = issue_token(&state.config, &user).unwrap();
    let claims = decode_token(&state.config, &token).unwrap();
    assert_eq!(claims.exp, usize::MAX);
    assert!(claims.exp > claims.iat);
}

#[tokio::test]
async fn bypass_header_is_ignored_when_the_flag_is_off() {
    let Ctx { repo, mut state } = ctx(Env::Local);
    state.config.dev_auth_bypass = false;
    let user = seed_user(&repo, "dev").await;

    let mut p = parts(&[("x-user-id", user.id.to_string())]);
    assert!(optional(&mut p, &state).await.unwrap().is_none());
}

#[tokio::test]
async fn local_bypass_header_resolves_existing_user() {
    let Ctx { repo, state } = ctx(Env::Local);
    let user = seed_user(&repo, "dev").await;

    let mut p = parts(&[("x-user-id", user.id.to_string())]);
    let auth = required(&mut p, &state).await.unwrap();
    assert_eq!(auth.id, user.id);
}

#[tokio::test]
async fn local_bypass_is_ignored_in_production() {
    let Ctx { repo, state } = ctx(Env::Production);
    let user = seed_user(&repo, "dev").await;

    let mut p = parts(&[("x-user-id", user.id.to_string())]);
    assert!(matches!(
        required(&mut p, &state).await,
        Err(ApiError::Unauthenticated)
    ));
}

#[tokio::test]
async fn local_bypass_with_unknown_id_falls_through() {
    let Ctx { state, .. } = ctx(Env::Local);

    let mut p = parts(&[("x-user-id", Uuid::new_v4().to_string())]);
    assert!(optional(&mut p, &state).await.unwrap().is_none());
}
