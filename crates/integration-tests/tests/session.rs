//! Sign-in, session persistence and device management.

#![allow(clippy::unwrap_used)]

use std::path::PathBuf;

use clubhouse_client::session::SessionStore;
use clubhouse_client::{
    ApiClient, ApiError, AuthContext, ClientConfig, FileSessionStore, SessionError,
};
use clubhouse_core::{ClubId, EventId, SessionId, UserType};
use clubhouse_integration_tests::{MockBackend, PASSWORD, TOKEN};
use secrecy::ExposeSecret;

fn session_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("clubhouse-it-{}", uuid::Uuid::new_v4()))
        .join("session.json")
}

fn client(backend: &MockBackend, auth: AuthContext) -> ApiClient {
    let config = ClientConfig::for_api(backend.api_url().as_str()).unwrap();
    ApiClient::new(&config, auth).unwrap()
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_persists_session_to_file() {
    let backend = MockBackend::start().await.unwrap();
    let path = session_path();
    let api = client(&backend, AuthContext::new(FileSessionStore::new(&path)));

    let account = api
        .login("fan@example.com", PASSWORD, UserType::Member, "laptop")
        .await
        .unwrap();
    assert_eq!(account.user_type, UserType::Member);
    assert_eq!(backend.recorded().logins, ["fan@example.com"]);

    let stored = FileSessionStore::new(&path).load().unwrap().unwrap();
    assert_eq!(stored.token.expose_secret(), TOKEN);
    assert_eq!(stored.user_type, UserType::Member);

    // A new process restores the session and is authenticated straight away.
    let restored = AuthContext::new(FileSessionStore::new(&path));
    assert_eq!(restored.init().await.unwrap(), Some(UserType::Member));
    let api = client(&backend, restored);
    let sessions = api.list_sessions().await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert!(sessions.iter().any(|s| s.current));

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let backend = MockBackend::start().await.unwrap();
    let api = client(&backend, AuthContext::in_memory());

    let err = api
        .login("fan@example.com", "hunter2", UserType::Member, "laptop")
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized(_)));
    assert!(api.auth().current().await.is_none());
}

#[tokio::test]
async fn test_requests_without_session_are_rejected() {
    let backend = MockBackend::start().await.unwrap();
    let api = client(&backend, AuthContext::in_memory());

    assert!(matches!(
        api.list_sessions().await,
        Err(ApiError::Unauthorized(_))
    ));
    assert!(matches!(
        api.my_membership(&ClubId::new("club-1")).await,
        Err(ApiError::Unauthorized(_))
    ));
}

// =============================================================================
// Logout & devices
// =============================================================================

#[tokio::test]
async fn test_logout_tears_down_session() {
    let backend = MockBackend::start().await.unwrap();
    let path = session_path();
    let api = client(&backend, AuthContext::new(FileSessionStore::new(&path)));

    api.login("fan@example.com", PASSWORD, UserType::Admin, "laptop")
        .await
        .unwrap();
    api.logout().await.unwrap();

    assert_eq!(backend.recorded().logouts, 1);
    assert!(api.auth().current().await.is_none());
    assert!(FileSessionStore::new(&path).load().unwrap().is_none());

    // Logging out again is harmless even though the backend answers 401.
    api.logout().await.unwrap();
    assert_eq!(backend.recorded().logouts, 1);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[tokio::test]
async fn test_revoke_device_session() {
    let backend = MockBackend::start().await.unwrap();
    let api = client(&backend, AuthContext::in_memory());
    api.login("fan@example.com", PASSWORD, UserType::Member, "laptop")
        .await
        .unwrap();

    api.revoke_session(&SessionId::new("sess-2")).await.unwrap();
    assert!(matches!(
        api.revoke_session(&SessionId::new("sess-404")).await,
        Err(ApiError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_role_gate_follows_signed_in_user_type() {
    let backend = MockBackend::start().await.unwrap();
    let api = client(&backend, AuthContext::in_memory());

    assert!(matches!(
        api.auth().require_role(&[UserType::Admin]).await,
        Err(SessionError::NotSignedIn)
    ));

    api.login("owner@example.com", PASSWORD, UserType::SystemOwner, "laptop")
        .await
        .unwrap();
    let session = api
        .auth()
        .require_role(&[UserType::Admin, UserType::SystemOwner])
        .await
        .unwrap();
    assert_eq!(session.user_type, UserType::SystemOwner);
    assert!(matches!(
        api.auth().require_role(&[UserType::Member]).await,
        Err(SessionError::Forbidden {
            actual: UserType::SystemOwner
        })
    ));
}

// =============================================================================
// Clubs
// =============================================================================

#[tokio::test]
async fn test_membership_lookup() {
    let backend = MockBackend::start().await.unwrap();
    let api = client(&backend, AuthContext::in_memory());
    api.login("fan@example.com", PASSWORD, UserType::Member, "laptop")
        .await
        .unwrap();

    let clubs = api.list_clubs().await.unwrap();
    assert_eq!(clubs.len(), 2);

    let plans = api.list_membership_plans(&clubs[0].id).await.unwrap();
    assert_eq!(plans[0].duration_days, 365);

    let membership = api.my_membership(&ClubId::new("club-1")).await.unwrap();
    assert!(membership.unwrap().status.is_active());
    assert!(
        api.my_membership(&ClubId::new("club-2"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_identifiers_cannot_reach_other_endpoints() {
    let backend = MockBackend::start().await.unwrap();
    let api = client(&backend, AuthContext::in_memory());
    api.login("fan@example.com", PASSWORD, UserType::Member, "laptop")
        .await
        .unwrap();

    assert!(api.get_event(&EventId::new("evt-paid")).await.is_ok());
    for id in ["evt-paid?preview=1", "evt-paid#top", "../clubs/club-1", "evt-paid/orders"] {
        let result = api.get_event(&EventId::new(id)).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))), "{id}: {result:?}");
    }

    assert!(matches!(
        api.revoke_session(&SessionId::new("..")).await,
        Err(ApiError::InvalidPathSegment(_))
    ));
    assert!(matches!(
        api.my_membership(&ClubId::new(".")).await,
        Err(ApiError::InvalidPathSegment(_))
    ));
}
