use crate::{
    config::BootstrapAdmin,
    models::{NewUser, Role, User, UserChanges},
    repository::{RepoResult, Repository},
};

/// ensure_superuser
///
/// Makes sure the configured bootstrap account exists as an admin superuser. Creates it
/// when the username is free, promotes it otherwise. Safe to run on every startup.
pub async fn ensure_superuser(repo: &dyn Repository, admin: &BootstrapAdmin) -> RepoResult<User> {
    match repo.get_user_by_username(&admin.username).await? {
        Some(user) if user.is_superuser && user.role == Role::Admin => Ok(user),
        Some(user) => {
            let promoted = repo
                .update_user(
                    user.id,
                    UserChanges {
                        role: Some(Role::Admin),
                        is_superuser: Some(true),
                        ..Default::default()
                    },
                )
                .await?
                .unwrap_or(user);
            tracing::info!(username = %promoted.username, "promoted bootstrap superuser");
            Ok(promoted)
        }
        None => {
            let user = repo
                .create_user(NewUser {
                    username: admin.username.clone(),
                    email: admin.email.clone(),
                    role: Role::Admin,
                    is_superuser: true,
                    ..Default::default()
                })
                .await?;
            tracing::info!(username = %user.username, "seeded bootstrap superuser");
            Ok(user)
        }
    }
}
