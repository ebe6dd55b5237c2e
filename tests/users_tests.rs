// tests for the user directory and sessions

use learnhub::{Error, Identity, ProfileUpdate, Role, Session, Store, UserDirectory};

async fn users() -> UserDirectory {
    Store::connect("sqlite::memory:").await.unwrap().users()
}

#[tokio::test]
async fn test_first_user_is_admin() {
    let users = users().await;

    let first = users.ensure_user(&Identity::new("u1", "ada@example.com")).await.unwrap();
    let second = users.ensure_user(&Identity::new("u2", "bob@example.com")).await.unwrap();

    assert_eq!(first.role, Role::Admin);
    assert_eq!(second.role, Role::User);
}

#[tokio::test]
async fn test_ensure_user_is_idempotent() {
    let users = users().await;
    let identity = Identity::new("u1", "ada@example.com");

    let a = users.ensure_user(&identity).await.unwrap();
    let b = users.ensure_user(&identity).await.unwrap();
    assert_eq!(a.created_at, b.created_at);
    assert_eq!(users.users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_identity_required() {
    let users = users().await;
    let err = users.ensure_user(&Identity::new("", "x@example.com")).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_last_admin_cannot_be_demoted() {
    let users = users().await;
    users.ensure_user(&Identity::new("u1", "ada@example.com")).await.unwrap();

    let err = users.set_role("u1", Role::User).await.unwrap_err();
    assert!(matches!(err, Error::LastAdmin));
    assert!(users.is_admin("u1").await.unwrap());
}

#[tokio::test]
async fn test_demote_with_second_admin() {
    let users = users().await;
    users.ensure_user(&Identity::new("u1", "ada@example.com")).await.unwrap();
    users.ensure_user(&Identity::new("u2", "bob@example.com")).await.unwrap();

    users.set_role("u2", Role::Admin).await.unwrap();
    let demoted = users.set_role("u1", Role::User).await.unwrap();
    assert_eq!(demoted.role, Role::User);

    // u2 is now the only admin
    assert!(matches!(users.set_role("u2", Role::User).await, Err(Error::LastAdmin)));
}

#[tokio::test]
async fn test_set_role_unknown_user() {
    let users = users().await;
    let err = users.set_role("ghost", Role::Admin).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_users_oldest_first() {
    let users = users().await;
    for (uid, email) in [("a", "a@x.io"), ("b", "b@x.io"), ("c", "c@x.io")] {
        users.ensure_user(&Identity::new(uid, email)).await.unwrap();
    }

    let uids: Vec<String> = users.users().await.unwrap().into_iter().map(|u| u.uid).collect();
    assert_eq!(uids, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_update_profile() {
    let users = users().await;
    users.ensure_user(&Identity::new("u1", "ada@example.com")).await.unwrap();

    let updated = users
        .update_profile(
            "u1",
            ProfileUpdate {
                display_name: Some("Ada".to_string()),
                profile_image: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.display_name.as_deref(), Some("Ada"));

    let err = users.update_profile("u1", ProfileUpdate::default()).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = users
        .update_profile(
            "ghost",
            ProfileUpdate {
                display_name: Some("Nobody".to_string()),
                profile_image: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_session_sign_in_and_out() {
    let users = users().await;

    let session = Session::sign_in(&users, Identity::new("u1", "ada@example.com"))
        .await
        .unwrap();
    assert!(session.is_admin());
    assert!(session.require_admin().is_ok());
    assert!(session.user().last_login.is_some());

    let identity = session.sign_out();
    assert_eq!(identity.uid, "u1");
}

#[tokio::test]
async fn test_session_non_admin_and_refresh() {
    let users = users().await;
    Session::sign_in(&users, Identity::new("u1", "ada@example.com")).await.unwrap();
    let session = Session::sign_in(&users, Identity::new("u2", "bob@example.com"))
        .await
        .unwrap();

    assert!(matches!(session.require_admin(), Err(Error::Forbidden)));

    users.set_role("u2", Role::Admin).await.unwrap();
    let session = session.refresh(&users).await.unwrap();
    assert!(session.is_admin());
}

#[tokio::test]
async fn test_resume_unknown_user() {
    let users = users().await;
    let err = Session::resume(&users, "ghost").await.unwrap_err();
    assert!(matches!(err, Error::Unauthenticated));
}

#[tokio::test]
async fn test_profile_image_set_then_cleared() {
    let users = users().await;
    users.ensure_user(&Identity::new("u1", "ada@example.com")).await.unwrap();

    let set = users
        .update_profile(
            "u1",
            ProfileUpdate {
                display_name: Some("Ada".to_string()),
                profile_image: Some(Some("data:image/png;base64,AAAA".to_string())),
            },
        )
        .await
        .unwrap();
    assert_eq!(set.profile_image.as_deref(), Some("data:image/png;base64,AAAA"));

    let cleared = users
        .update_profile(
            "u1",
            ProfileUpdate {
                display_name: None,
                profile_image: Some(None),
            },
        )
        .await
        .unwrap();
    assert_eq!(cleared.profile_image, None);
    assert_eq!(cleared.display_name.as_deref(), Some("Ada"));
}
