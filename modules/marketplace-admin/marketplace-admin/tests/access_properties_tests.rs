#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Access-control guarantees checked through the module's public API.

mod common;

use console_security::{ActivityType, AdminType, Role};
use marketplace_admin::AccessApi;
use marketplace_admin::domain::error::DomainError;
use marketplace_admin::domain::session::PROFILES_TABLE;
use memory_backend_plugin::OpKind;
use tokio_util::sync::CancellationToken;

use common::{PASSWORD, TestApp};

#[tokio::test]
async fn super_admin_reaches_every_partner_and_type() {
    let app = TestApp::new();
    app.user("root@example.com", Role::Admin, Some(AdminType::SuperAdmin));
    app.partner(10, None);
    let (_, ctx) = app
        .module
        .gate()
        .sign_in("root@example.com", PASSWORD)
        .await
        .unwrap();
    let access = app.module.access();

    for id in [10, 11, 9_999] {
        assert!(access.can_access_partner(&ctx, id).await);
    }
    for t in ActivityType::ALL {
        assert!(access.has_access_to_activity_type(&ctx, t).await);
        assert!(access.can_access_activity(&ctx, t, 42).await);
    }
    assert_eq!(access.partner_ids(&ctx).await, [10]);
}

#[tokio::test]
async fn partner_admin_owning_partner_10() {
    let app = TestApp::new();
    let owner = app.user("pa@example.com", Role::Admin, Some(AdminType::PartnerAdmin));
    app.partner(10, Some(owner));
    app.partner(11, None);
    app.restaurant(15, Some(10), "Mine");
    app.restaurant(16, Some(11), "Theirs");
    app.accommodation(5, Some(11));
    let (_, ctx) = app
        .module
        .gate()
        .sign_in("pa@example.com", PASSWORD)
        .await
        .unwrap();
    let access = app.module.access();

    assert!(access.can_access_partner(&ctx, 10).await);
    assert!(!access.can_access_partner(&ctx, 11).await);
    assert!(access.can_access_activity(&ctx, ActivityType::Restaurant, 15).await);
    assert!(!access.can_access_activity(&ctx, ActivityType::Restaurant, 16).await);
    assert!(!access.can_access_activity(&ctx, ActivityType::Accommodation, 5).await);
    assert!(access.has_access_to_activity_type(&ctx, ActivityType::Restaurant).await);
    assert!(!access.has_access_to_activity_type(&ctx, ActivityType::Accommodation).await);

    let first = access.partner_ids(&ctx).await;
    let counts = app.backend.total_operations();
    assert_eq!(access.partner_ids(&ctx).await, first);
    assert_eq!(app.backend.total_operations(), counts, "second call was not cached");
}

#[tokio::test]
async fn missing_profile_is_provisioned_once_and_gated() {
    let app = TestApp::new();
    app.backend.seed_user("new@example.com", PASSWORD);

    for _ in 0..2 {
        let err = app
            .module
            .gate()
            .sign_in("new@example.com", PASSWORD)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AccessDenied(_)));
    }
    assert_eq!(app.backend.rows(PROFILES_TABLE).len(), 1);
    assert_eq!(app.backend.operations_of(PROFILES_TABLE, OpKind::Insert), 1);
    assert_eq!(app.backend.operations("partners"), 0);
}

#[tokio::test]
async fn user_role_is_signed_out_before_any_partner_or_activity_query() {
    let app = TestApp::new();
    app.user("user@example.com", Role::User, None);
    app.partner(10, None);

    let err = app
        .module
        .gate()
        .sign_in("user@example.com", PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::AccessDenied(_)));

    assert_eq!(app.backend.operations("partners"), 0);
    for t in ActivityType::ALL {
        assert_eq!(app.backend.operations(t.table()), 0);
    }
}

#[tokio::test]
async fn auth_watcher_drops_state_on_sign_out() {
    let app = TestApp::new();
    let owner = app.user("pa@example.com", Role::Admin, None);
    let cancel = CancellationToken::new();
    let watcher = app.module.spawn_auth_watcher(cancel.clone());

    let (_, ctx) = app
        .module
        .gate()
        .sign_in("pa@example.com", PASSWORD)
        .await
        .unwrap();
    assert!(app.module.access().partner_ids(&ctx).await.is_empty());

    // ownership changes behind the resolver's back; only the sign-out
    // event makes it visible
    app.partner(10, Some(owner));
    assert!(app.module.access().partner_ids(&ctx).await.is_empty());

    app.module.gate().sign_out(ctx.access_token()).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(app.module.access().partner_ids(&ctx).await, [10]);

    cancel.cancel();
    watcher.await.unwrap();
}
