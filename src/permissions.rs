//! Authorization engine.
//!
//! One rule table for every resource. Handlers pass the caller explicitly
//! (`None` for anonymous requests) together with the owner of the record being touched,
//! and get back either `Ok(())` or the denial to return.

use uuid::Uuid;

use crate::{auth::AuthUser, error::ApiError};

/// Resource
///
/// What an operation targets. `OwnProfile` is the caller's own account reached through
/// `/users/me`; `User` is any account reached by username.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Category,
    Genre,
    Title,
    Review,
    Comment,
    User,
    OwnProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
}

impl Operation {
    /// Read-only operations.
    pub fn is_safe(self) -> bool {
        matches!(self, Operation::List | Operation::Retrieve)
    }
}

/// Denial
///
/// Why an operation was refused. Kept apart from "not found" so callers never have to
/// fold a refusal into a 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// The operation needs a signed-in caller and there is none.
    Unauthenticated,
    /// The caller is known but lacks the role or ownership required.
    PermissionDenied,
}

impl From<Denial> for ApiError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthenticated => ApiError::Unauthenticated,
            Denial::PermissionDenied => ApiError::PermissionDenied,
        }
    }
}

/// decide
///
/// Evaluates the rule table, first match wins:
///
/// 1. Safe operations on catalog records, reviews and comments are open to everyone.
/// 2. Unsafe operations on categories, genres and titles need an admin. Anonymous
///    callers get `PermissionDenied`, not `Unauthenticated`.
/// 3. Creating a review or comment needs any signed-in caller.
/// 4. Changing an existing review or comment needs its author, a moderator or an admin.
/// 5. Accounts other than the caller's own are admin-only; a caller may still read
///    their own record by username.
/// 6. The caller's own profile is open to any signed-in caller.
///
/// Superusers count as admins throughout.
pub fn decide(
    actor: Option<&AuthUser>,
    resource: Resource,
    operation: Operation,
    owner: Option<Uuid>,
) -> Result<(), Denial> {
    match resource {
        Resource::Category | Resource::Genre | Resource::Title => {
            if operation.is_safe() || actor.is_some_and(AuthUser::is_admin) {
                Ok(())
            } else {
                Err(Denial::PermissionDenied)
            }
        }
        Resource::Review | Resource::Comment => {
            if operation.is_safe() {
                return Ok(());
            }
            let actor = actor.ok_or(Denial::Unauthenticated)?;
            if operation == Operation::Create {
                return Ok(());
            }
            let is_owner = owner == Some(actor.id);
            if is_owner || actor.is_moderator() || actor.is_admin() {
                Ok(())
            } else {
                Err(Denial::PermissionDenied)
            }
        }
        Resource::User => {
            let actor = actor.ok_or(Denial::Unauthenticated)?;
            let reads_self = operation == Operation::Retrieve && owner == Some(actor.id);
            if actor.is_admin() || reads_self {
                Ok(())
            } else {
                Err(Denial::PermissionDenied)
            }
        }
        Resource::OwnProfile => {
            actor.ok_or(Denial::Unauthenticated)?;
            match operation {
                Operation::Retrieve | Operation::Update => Ok(()),
                _ => Err(Denial::PermissionDenied),
            }
        }
    }
}

/// authorize
///
/// `decide` for handlers: logs refusals and converts them into `ApiError`.
pub fn authorize(
    actor: Option<&AuthUser>,
    resource: Resource,
    operation: Operation,
    owner: Option<Uuid>,
) -> Result<(), ApiError> {
    decide(actor, resource, operation, owner).map_err(|denial| {
        tracing::warn!(
            actor = ?actor.map(|a| &a.username),
            ?resource,
            ?operation,
            ?denial,
            "request denied"
        );
        ApiError::from(denial)
    })
}
