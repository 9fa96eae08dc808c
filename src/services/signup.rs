use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::issue_token,
    config::AppConfig,
    error::{ApiError, FieldErrors},
    models::{NewUser, SignUpRequest, TokenRequest, TokenResponse},
    notifier::{ConfirmationMessage, Notifier},
    repository::Repository,
};

/// generate_confirmation_code
///
/// 128 random bits, hex-encoded without dashes.
pub fn generate_confirmation_code() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Username and email both belong to other accounts: report both fields.
fn collision(username_taken: bool, email_taken: bool) -> ApiError {
    match (username_taken, email_taken) {
        (true, false) => ApiError::username_taken(),
        (false, true) => ApiError::email_taken(),
        _ => {
            let mut fields = FieldErrors::new();
            for err in [ApiError::username_taken(), ApiError::email_taken()] {
                if let ApiError::Conflict { fields: taken, .. } = err {
                    fields.extend(taken);
                }
            }
            ApiError::Conflict {
                code: "USERNAME_TAKEN",
                fields,
            }
        }
    }
}

/// sign_up
///
/// Registers `req.username` / `req.email`, or re-sends a code when the exact pair is
/// already registered. Every call stores a fresh code, so only the most recent one can
/// be exchanged. Delivery failures are logged and do not fail the signup.
pub async fn sign_up(
    repo: &dyn Repository,
    notifier: &dyn Notifier,
    req: SignUpRequest,
) -> Result<SignUpRequest, ApiError> {
    req.validate()?;

    let by_username = repo.get_user_by_username(&req.username).await?;
    let by_email = repo.get_user_by_email(&req.email).await?;

    let user = match (by_username, by_email) {
        (Some(named), Some(mailed)) if named.id == mailed.id => {
            tracing::info!(username = %named.username, "re-issuing confirmation code");
            named
        }
        (None, None) => {
            let user = repo
                .create_user(NewUser {
                    username: req.username.clone(),
                    email: req.email.clone(),
                    ..Default::default()
                })
                .await?;
            tracing::info!(username = %user.username, "user registered");
            user
        }
        (named, mailed) => return Err(collision(named.is_some(), mailed.is_some())),
    };

    let code = generate_confirmation_code();
    repo.set_confirmation_code(user.id, &code).await?;

    let message = ConfirmationMessage {
        username: user.username,
        email: user.email,
        code,
    };
    if let Err(e) = notifier.send_confirmation_code(&message).await {
        tracing::warn!(username = %message.username, error = %e, "confirmation code delivery failed");
    }

    Ok(req)
}

/// obtain_token
///
/// Exchanges the most recent confirmation code for a bearer token.
pub async fn obtain_token(
    repo: &dyn Repository,
    config: &AppConfig,
    req: TokenRequest,
) -> Result<TokenResponse, ApiError> {
    req.validate()?;

    let user = repo
        .get_user_by_username(&req.username)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    let stored = repo.get_confirmation_code(user.id).await?;
    if stored.as_deref() != Some(req.confirmation_code.as_str()) {
        tracing::warn!(username = %user.username, "confirmation code mismatch");
        return Err(ApiError::InvalidCredentials);
    }

    let token = issue_token(config, &user)?;
    Ok(TokenResponse { token })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_unique_hex() {
        let a = generate_confirmation_code();
        let b = generate_confirmation_code();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn double_collision_reports_both_fields() {
        let ApiError::Conflict { code, fields } = collision(true, true) else {
            panic!("expected a conflict");
        };
        assert_eq!(code, "USERNAME_TAKEN");
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
    }
}
