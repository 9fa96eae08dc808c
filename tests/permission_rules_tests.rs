use catalog_api::{
    auth::AuthUser,
    models::Role,
    permissions::{Denial, Operation, Resource, decide},
};
use uuid::Uuid;

const ALL_OPS: [Operation; 5] = [
    Operation::List,
    Operation::Retrieve,
    Operation::Create,
    Operation::Update,
    Operation::Delete,
];

const UNSAFE_OPS: [Operation; 3] = [Operation::Create, Operation::Update, Operation::Delete];

fn actor(role: Role, is_superuser: bool) -> AuthUser {
    AuthUser {
        id: Uuid::new_v4(),
        username: format!("{role}"),
        role,
        is_superuser,
    }
}

#[test]
fn catalog_reads_are_open_to_everyone() {
    let reader = actor(Role::User, false);
    for resource in [Resource::Category, Resource::Genre, Resource::Title] {
        for op in [Operation::List, Operation::Retrieve] {
            assert_eq!(decide(None, resource, op, None), Ok(()));
            assert_eq!(decide(Some(&reader), resource, op, None), Ok(()));
        }
    }
}

#[test]
fn catalog_writes_need_an_admin() {
    let user = actor(Role::User, false);
    let moderator = actor(Role::Moderator, false);
    let admin = actor(Role::Admin, false);
    let superuser = actor(Role::User, true);

    for resource in [Resource::Category, Resource::Genre, Resource::Title] {
        for op in UNSAFE_OPS {
            assert_eq!(decide(None, resource, op, None), Err(Denial::PermissionDenied));
            assert_eq!(
                decide(Some(&user), resource, op, None),
                Err(Denial::PermissionDenied)
            );
            assert_eq!(
                decide(Some(&moderator), resource, op, None),
                Err(Denial::PermissionDenied)
            );
            assert_eq!(decide(Some(&admin), resource, op, None), Ok(()));
            assert_eq!(decide(Some(&superuser), resource, op, None), Ok(()));
        }
    }
}

#[test]
fn review_and_comment_creation_needs_a_signed_in_caller() {
    let user = actor(Role::User, false);
    for resource in [Resource::Review, Resource::Comment] {
        assert_eq!(
            decide(None, resource, Operation::Create, None),
            Err(Denial::Unauthenticated)
        );
        assert_eq!(decide(Some(&user), resource, Operation::Create, None), Ok(()));
        assert_eq!(decide(None, resource, Operation::List, None), Ok(()));
    }
}

#[test]
fn review_changes_need_owner_moderator_or_admin() {
    let author = actor(Role::User, false);
    let stranger = actor(Role::User, false);
    let moderator = actor(Role::Moderator, false);
    let admin = actor(Role::Admin, false);
    let superuser = actor(Role::User, true);

    for resource in [Resource::Review, Resource::Comment] {
        for op in [Operation::Update, Operation::Delete] {
            let owner = Some(author.id);
            assert_eq!(decide(None, resource, op, owner), Err(Denial::Unauthenticated));
            assert_eq!(decide(Some(&author), resource, op, owner), Ok(()));
            assert_eq!(
                decide(Some(&stranger), resource, op, owner),
                Err(Denial::PermissionDenied)
            );
            assert_eq!(decide(Some(&moderator), resource, op, owner), Ok(()));
            assert_eq!(decide(Some(&admin), resource, op, owner), Ok(()));
            assert_eq!(decide(Some(&superuser), resource, op, owner), Ok(()));
        }
    }
}

#[test]
fn user_directory_is_admin_only_with_self_read() {
    let user = actor(Role::User, false);
    let moderator = actor(Role::Moderator, false);
    let admin = actor(Role::Admin, false);

    for op in ALL_OPS {
        assert_eq!(decide(None, Resource::User, op, None), Err(Denial::Unauthenticated));
        assert_eq!(decide(Some(&admin), Resource::User, op, Some(user.id)), Ok(()));
        assert_eq!(
            decide(Some(&moderator), Resource::User, op, Some(user.id)),
            Err(Denial::PermissionDenied)
        );
    }

    assert_eq!(
        decide(Some(&user), Resource::User, Operation::Retrieve, Some(user.id)),
        Ok(())
    );
    assert_eq!(
        decide(Some(&user), Resource::User, Operation::Update, Some(user.id)),
        Err(Denial::PermissionDenied)
    );
}

#[test]
fn own_profile_is_open_to_any_signed_in_caller() {
    let user = actor(Role::User, false);
    for op in [Operation::Retrieve, Operation::Update] {
        assert_eq!(
            decide(None, Resource::OwnProfile, op, None),
            Err(Denial::Unauthenticated)
        );
        assert_eq!(
            decide(Some(&user), Resource::OwnProfile, op, Some(user.id)),
            Ok(())
        );
    }
}
