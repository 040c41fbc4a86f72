use lisa_auth_types::token::{TokenKind, validate_access_token, validate_token};
use lisa_domain::pagination::PageRequest;
use lisa_domain::user::UserRole;
use lisa_shop::error::ShopError;
use lisa_shop::usecase::account::{
    GetUserUseCase, ListUsersUseCase, LoginUseCase, RegisterInput, RegisterUseCase,
    SetUserRoleUseCase, UpdateProfileInput, UpdateProfileUseCase,
};
use lisa_shop::usecase::token::RefreshSessionUseCase;

use crate::helpers::{MemoryStore, TEST_JWT_SECRET, admin, customer, test_user, token_settings};

fn register_usecase(store: &MemoryStore) -> RegisterUseCase<MemoryStore> {
    RegisterUseCase {
        users: store.clone(),
        tokens: token_settings(),
        admin_emails: vec!["boss@shop.test".to_owned()],
    }
}

fn input(email: &str, password: &str) -> RegisterInput {
    RegisterInput {
        email: email.to_owned(),
        password: password.to_owned(),
        first_name: Some("Ann".to_owned()),
        last_name: None,
    }
}

// ── RegisterUseCase ──────────────────────────────────────────────────────────

#[tokio::test]
async fn should_register_customer_with_hashed_password() {
    let store = MemoryStore::new();

    let (user, session) = register_usecase(&store)
        .execute(input("  Ann@Shop.Test ", "correct horse"))
        .await
        .unwrap();

    assert_eq!(user.email, "ann@shop.test");
    assert_eq!(user.role, UserRole::Customer);
    assert_eq!(user.first_name.as_deref(), Some("Ann"));
    let hash = user.password_hash.as_deref().unwrap();
    assert!(hash.starts_with("$argon2"), "unexpected hash {hash}");
    assert_ne!(hash, "correct horse");

    let info = validate_access_token(&session.access_token, TEST_JWT_SECRET).unwrap();
    assert_eq!(info.user_id, user.id);
    assert_eq!(info.role, UserRole::Customer);
    assert_eq!(store.user_count(), 1);
}

#[tokio::test]
async fn should_grant_admin_to_configured_email() {
    let store = MemoryStore::new();

    let (user, session) = register_usecase(&store)
        .execute(input("boss@shop.test", "correct horse"))
        .await
        .unwrap();

    assert_eq!(user.role, UserRole::Admin);
    let info = validate_access_token(&session.access_token, TEST_JWT_SECRET).unwrap();
    assert_eq!(info.role, UserRole::Admin);
}

#[tokio::test]
async fn should_reject_duplicate_email_case_insensitively() {
    let store = MemoryStore::new();
    let usecase = register_usecase(&store);
    usecase.execute(input("ann@shop.test", "correct horse")).await.unwrap();

    let result = usecase.execute(input("ANN@shop.test", "another one")).await;

    assert!(
        matches!(result, Err(ShopError::UserAlreadyExists)),
        "expected UserAlreadyExists, got {result:?}"
    );
    assert_eq!(store.user_count(), 1);
}

#[tokio::test]
async fn should_validate_email_and_password() {
    let store = MemoryStore::new();
    let usecase = register_usecase(&store);

    let result = usecase.execute(input("not-an-email", "correct horse")).await;
    assert!(
        matches!(result, Err(ShopError::Validation(_))),
        "expected Validation, got {result:?}"
    );

    let result = usecase.execute(input("ann@shop.test", "short")).await;
    assert!(
        matches!(result, Err(ShopError::Validation(_))),
        "expected Validation, got {result:?}"
    );
    assert_eq!(store.user_count(), 0);
}

// ── LoginUseCase ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_login_with_registered_password() {
    let store = MemoryStore::new();
    let (registered, _) = register_usecase(&store)
        .execute(input("ann@shop.test", "correct horse"))
        .await
        .unwrap();
    let login = LoginUseCase {
        users: store.clone(),
        tokens: token_settings(),
    };

    let (user, session) = login.execute("Ann@shop.test", "correct horse").await.unwrap();

    assert_eq!(user.id, registered.id);
    let info = validate_token(&session.refresh_token, TokenKind::Refresh, TEST_JWT_SECRET).unwrap();
    assert_eq!(info.user_id, user.id);
}

#[tokio::test]
async fn should_not_reveal_which_credential_was_wrong() {
    let store = MemoryStore::new();
    register_usecase(&store)
        .execute(input("ann@shop.test", "correct horse"))
        .await
        .unwrap();
    store.add_user(test_user("oauth-only@shop.test", UserRole::Customer));
    let login = LoginUseCase {
        users: store.clone(),
        tokens: token_settings(),
    };

    for (email, password) in [
        ("ann@shop.test", "wrong horse"),
        ("nobody@shop.test", "correct horse"),
        ("oauth-only@shop.test", "correct horse"),
    ] {
        let result = login.execute(email, password).await;
        assert!(
            matches!(result, Err(ShopError::InvalidCredentials)),
            "expected InvalidCredentials for {email}, got {result:?}"
        );
    }
}

// ── RefreshSessionUseCase ────────────────────────────────────────────────────

#[tokio::test]
async fn should_refresh_with_current_role() {
    let store = MemoryStore::new();
    let (user, session) = register_usecase(&store)
        .execute(input("ann@shop.test", "correct horse"))
        .await
        .unwrap();
    store.data.lock().unwrap().users[0].role = UserRole::Admin;
    let refresh = RefreshSessionUseCase {
        users: store.clone(),
        tokens: token_settings(),
    };

    let renewed = refresh.execute(&session.refresh_token).await.unwrap();

    let info = validate_access_token(&renewed.access_token, TEST_JWT_SECRET).unwrap();
    assert_eq!(info.user_id, user.id);
    assert_eq!(info.role, UserRole::Admin);
}

#[tokio::test]
async fn should_reject_access_token_as_refresh_token() {
    let store = MemoryStore::new();
    let (_, session) = register_usecase(&store)
        .execute(input("ann@shop.test", "correct horse"))
        .await
        .unwrap();
    let refresh = RefreshSessionUseCase {
        users: store.clone(),
        tokens: token_settings(),
    };

    let result = refresh.execute(&session.access_token).await;
    assert!(
        matches!(result, Err(ShopError::InvalidToken)),
        "expected InvalidToken, got {result:?}"
    );

    let result = refresh.execute("garbage").await;
    assert!(
        matches!(result, Err(ShopError::InvalidToken)),
        "expected InvalidToken, got {result:?}"
    );
}

// ── Profile ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_update_only_given_profile_fields() {
    let store = MemoryStore::new();
    let mut user = test_user("ann@shop.test", UserRole::Customer);
    user.first_name = Some("Ann".to_owned());
    let id = user.id;
    store.add_user(user);

    let updated = UpdateProfileUseCase {
        users: store.clone(),
    }
    .execute(
        id,
        UpdateProfileInput {
            first_name: None,
            last_name: Some(" Petrova ".to_owned()),
        },
    )
    .await
    .unwrap();

    assert_eq!(updated.first_name.as_deref(), Some("Ann"));
    assert_eq!(updated.last_name.as_deref(), Some("Petrova"));
}

#[tokio::test]
async fn should_reject_empty_profile_update() {
    let store = MemoryStore::new();
    let user = test_user("ann@shop.test", UserRole::Customer);
    let id = user.id;
    store.add_user(user);

    let result = UpdateProfileUseCase {
        users: store.clone(),
    }
    .execute(
        id,
        UpdateProfileInput {
            first_name: None,
            last_name: None,
        },
    )
    .await;

    assert!(
        matches!(result, Err(ShopError::Validation(_))),
        "expected Validation, got {result:?}"
    );
}

#[tokio::test]
async fn should_report_missing_user() {
    let store = MemoryStore::new();

    let result = GetUserUseCase {
        users: store.clone(),
    }
    .execute(customer().user_id)
    .await;

    assert!(
        matches!(result, Err(ShopError::UserNotFound)),
        "expected UserNotFound, got {result:?}"
    );
}

// ── Admin ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_let_admin_change_roles() {
    let store = MemoryStore::new();
    let user = test_user("ann@shop.test", UserRole::Customer);
    let id = user.id;
    store.add_user(user);
    let usecase = SetUserRoleUseCase {
        users: store.clone(),
    };

    usecase.execute(admin(), id, UserRole::Admin).await.unwrap();
    assert_eq!(store.user_by_email("ann@shop.test").unwrap().role, UserRole::Admin);

    let result = usecase.execute(customer(), id, UserRole::Customer).await;
    assert!(
        matches!(result, Err(ShopError::Forbidden)),
        "expected Forbidden, got {result:?}"
    );

    let result = usecase.execute(admin(), customer().user_id, UserRole::Admin).await;
    assert!(
        matches!(result, Err(ShopError::UserNotFound)),
        "expected UserNotFound, got {result:?}"
    );
}

#[tokio::test]
async fn should_not_let_admin_demote_themselves() {
    let store = MemoryStore::new();
    let me = admin();
    let mut user = test_user("boss@shop.test", UserRole::Admin);
    user.id = me.user_id;
    store.add_user(user);

    let result = SetUserRoleUseCase {
        users: store.clone(),
    }
    .execute(me, me.user_id, UserRole::Customer)
    .await;

    assert!(
        matches!(result, Err(ShopError::Validation(_))),
        "expected Validation, got {result:?}"
    );
    assert_eq!(store.user_by_email("boss@shop.test").unwrap().role, UserRole::Admin);
}

#[tokio::test]
async fn should_list_users_for_admins_only() {
    let store = MemoryStore::new();
    store.add_user(test_user("a@shop.test", UserRole::Customer));
    store.add_user(test_user("b@shop.test", UserRole::Customer));
    let usecase = ListUsersUseCase {
        users: store.clone(),
    };
    let page = PageRequest {
        per_page: 20,
        page: 1,
    };

    assert_eq!(usecase.execute(admin(), page).await.unwrap().len(), 2);
    let result = usecase.execute(customer(), page).await;
    assert!(
        matches!(result, Err(ShopError::Forbidden)),
        "expected Forbidden, got {result:?}"
    );
}
